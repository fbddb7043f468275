// ============================================================
// Layer 5 — Test Epoch
// ============================================================
// Scores a model on a held-out loader without building an
// autodiff graph (the model lives on the inner backend).
//
//   for each batch
//     forward → mean CE, top-1
//     argmax predictions + true labels collected
//   ClassificationReport over everything collected
//   record_test_stats(epoch, loss.avg, top1.avg)

use std::time::Instant;

use anyhow::Result;
use burn::prelude::*;

use crate::data::{batcher::ClassificationBatch, prefetch::PrefetchLoader};
use crate::domain::{classification::ClassificationReport, meter::AverageMeter};
use crate::infra::stats::StatsRecorder;
use crate::ml::{
    accuracy::{accuracy, argmax_labels, labels_of},
    loss::cross_entropy,
    model::Classifier,
};

/// Result of one pass over the test loader.
#[derive(Debug, Clone, PartialEq)]
pub struct EvalOutcome {
    /// Per-sample mean cross-entropy.
    pub loss:        f64,
    /// Top-1 accuracy in percent.
    pub top1:        f64,
    pub report:      ClassificationReport,
    pub labels:      Vec<usize>,
    pub predictions: Vec<usize>,
}

impl EvalOutcome {
    /// Fraction of correct predictions in [0, 1], unrounded.
    pub fn accuracy_fraction(&self) -> f64 {
        if self.labels.is_empty() {
            return 0.0;
        }
        let correct = self
            .labels
            .iter()
            .zip(&self.predictions)
            .filter(|(l, p)| l == p)
            .count();
        correct as f64 / self.labels.len() as f64
    }
}

fn progress_line(
    i:          usize,
    n_batches:  usize,
    batch_time: &AverageMeter,
    losses:     &AverageMeter,
    top1:       &AverageMeter,
) -> String {
    format!(
        "Test: [{}/{}]\tTime {}\tLoss {}\tPrec@1 {}",
        i,
        n_batches,
        batch_time.val_avg(3),
        losses.val_avg(4),
        top1.val_avg(3),
    )
}

pub fn test_epoch<B, M, I>(
    model:      &M,
    loader:     &PrefetchLoader<I, ClassificationBatch<B>>,
    print_freq: usize,
    epoch:      usize,
    rec:        &mut StatsRecorder,
) -> Result<EvalOutcome>
where
    B: Backend,
    M: Classifier<B> + ?Sized,
    I: Send + 'static,
{
    let mut batch_time = AverageMeter::time();
    let mut losses     = AverageMeter::loss();
    let mut top1       = AverageMeter::top1();

    let n_batches      = loader.len();
    let print_freq     = print_freq.max(1);
    let mut labels      = Vec::with_capacity(loader.num_items());
    let mut predictions = Vec::with_capacity(loader.num_items());

    let mut end = Instant::now();
    let mut batches = loader.iter();
    for (i, batch) in batches.by_ref().enumerate() {
        let batch_size = batch.len();
        let logits     = model.classify(batch.inputs).logits;

        let loss: f64 = cross_entropy(logits.clone(), batch.targets.clone())
            .into_scalar()
            .elem();
        let prec1 = accuracy(logits.clone(), batch.targets.clone(), &[1])?[0];
        losses.update(loss, batch_size);
        top1.update(prec1, batch_size);

        predictions.extend(argmax_labels(logits));
        labels.extend(labels_of(batch.targets));

        batch_time.update(end.elapsed().as_secs_f64(), 1);
        end = Instant::now();

        if i % print_freq == 0 {
            tracing::info!("{}", progress_line(i, n_batches, &batch_time, &losses, &top1));
        }
    }
    batches.finish()?;

    tracing::info!(" * Prec@1 {:.3}", top1.avg);
    let report = ClassificationReport::from_labels(&labels, &predictions)?;
    tracing::info!("{report}");

    rec.record_test_stats(epoch, losses.avg, top1.avg);

    Ok(EvalOutcome { loss: losses.avg, top1: top1.avg, report, labels, predictions })
}
