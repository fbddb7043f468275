// ============================================================
// Layer 3 — Classification Metrics
// ============================================================
// Pure-Rust metrics over integer class labels:
//
//   confusion_counts  — TP / FP / TN / FN per class
//   ClassificationReport
//     accuracy        — matches / samples
//     precision       — macro mean of TP / (TP + FP)
//     recall          — macro mean of TP / (TP + FN)
//     f1              — macro mean of 2PR / (P + R)
//
// The class set is the union of labels seen in y_true and
// y_pred. A class with a zero denominator contributes 0 to
// the macro mean. All report figures are rounded to 4 dp.

use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum MetricError {
    #[error("label length mismatch: {y_true} true labels vs {y_pred} predictions")]
    LengthMismatch { y_true: usize, y_pred: usize },

    #[error("top-k list is empty")]
    EmptyTopK,

    #[error("k={k} is invalid for {classes} classes")]
    InvalidK { k: usize, classes: usize },

    #[error("cannot score an empty batch")]
    EmptyBatch,

    #[error("batch mismatch: {logits} rows of logits vs {targets} targets")]
    BatchMismatch { logits: usize, targets: usize },
}

/// Per-class confusion counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassCounts {
    pub tp:  usize,
    pub tn:  usize,
    pub fp:  usize,
    pub fn_: usize,
}

impl ClassCounts {
    pub fn precision(&self) -> f64 {
        ratio(self.tp, self.tp + self.fp)
    }

    pub fn recall(&self) -> f64 {
        ratio(self.tp, self.tp + self.fn_)
    }

    pub fn f1(&self) -> f64 {
        let (p, r) = (self.precision(), self.recall());
        if p + r == 0.0 { 0.0 } else { 2.0 * p * r / (p + r) }
    }

    /// True-negative rate, TN / (TN + FP).
    pub fn specificity(&self) -> f64 {
        ratio(self.tn, self.tn + self.fp)
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}

fn round4(v: f64) -> f64 {
    (v * 10_000.0).round() / 10_000.0
}

fn check_lengths(y_true: &[usize], y_pred: &[usize]) -> Result<(), MetricError> {
    if y_true.len() != y_pred.len() {
        return Err(MetricError::LengthMismatch {
            y_true: y_true.len(),
            y_pred: y_pred.len(),
        });
    }
    Ok(())
}

/// Count TP, TN, FP and FN for every class appearing in either slice.
///
/// Walks every (sample, class) pair, so the cost is
/// O(classes × samples).
pub fn confusion_counts(
    y_true: &[usize],
    y_pred: &[usize],
) -> Result<BTreeMap<usize, ClassCounts>, MetricError> {
    check_lengths(y_true, y_pred)?;

    let mut counts: BTreeMap<usize, ClassCounts> = y_true
        .iter()
        .chain(y_pred.iter())
        .map(|&c| (c, ClassCounts::default()))
        .collect();

    for (&truth, &pred) in y_true.iter().zip(y_pred) {
        for (&cls, c) in counts.iter_mut() {
            match (truth == cls, pred == cls) {
                (true,  true)  => c.tp  += 1,
                (true,  false) => c.fn_ += 1,
                (false, true)  => c.fp  += 1,
                (false, false) => c.tn  += 1,
            }
        }
    }

    Ok(counts)
}

/// Summary of one evaluation pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub samples:   usize,
    pub accuracy:  f64,
    pub precision: f64,
    pub recall:    f64,
    pub f1:        f64,
    pub per_class: BTreeMap<usize, ClassCounts>,
}

impl ClassificationReport {
    pub fn from_labels(y_true: &[usize], y_pred: &[usize]) -> Result<Self, MetricError> {
        let per_class = confusion_counts(y_true, y_pred)?;
        if y_true.is_empty() {
            return Ok(Self::default());
        }

        let matches = y_true.iter().zip(y_pred).filter(|(t, p)| t == p).count();
        let n_classes = per_class.len() as f64;
        let macro_mean = |f: fn(&ClassCounts) -> f64| {
            per_class.values().map(f).sum::<f64>() / n_classes
        };

        Ok(Self {
            samples:   y_true.len(),
            accuracy:  round4(ratio(matches, y_true.len())),
            precision: round4(macro_mean(ClassCounts::precision)),
            recall:    round4(macro_mean(ClassCounts::recall)),
            f1:        round4(macro_mean(ClassCounts::f1)),
            per_class,
        })
    }
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "acc={:.4} precision={:.4} recall={:.4} f1={:.4} (n={})",
            self.accuracy, self.precision, self.recall, self.f1, self.samples,
        )?;
        for (cls, c) in &self.per_class {
            writeln!(
                f,
                "  class {:>3}: TP={} TN={} FP={} FN={} specificity={:.4}",
                cls, c.tp, c.tn, c.fp, c.fn_, c.specificity(),
            )?;
        }
        Ok(())
    }
}
