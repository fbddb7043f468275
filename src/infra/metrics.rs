// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Appends one CSV row per epoch to {checkpoint_dir}/metrics.csv
// so learning curves can be plotted without parsing logs.
//
// Example CSV output:
//   epoch,train_loss,train_acc,test_loss,test_acc,precision,recall,f1,lr
//   0,1.098612,35.000000,1.050000,41.250000,0.401200,0.412500,0.398800,0.100000
//   1,0.954100,52.500000,0.921000,55.000000,0.548100,0.550000,0.545300,0.097553
//
// The header is written only when the file is created, so a
// resumed run keeps appending to the same file.

use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};
use serde::{Deserialize, Serialize};

const HEADER: &str = "epoch,train_loss,train_acc,test_loss,test_acc,precision,recall,f1,lr";

/// One row of metrics data for a single epoch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpochMetrics {
    pub epoch:      usize,
    /// Per-sample mean training loss
    pub train_loss: f64,
    /// Top-1 training accuracy in percent
    pub train_acc:  f64,
    pub test_loss:  f64,
    /// Top-1 test accuracy in percent
    pub test_acc:   f64,
    /// Macro precision / recall / F1 in [0, 1]
    pub precision:  f64,
    pub recall:     f64,
    pub f1:         f64,
    /// Learning rate after this epoch's schedule step
    pub lr:         f64,
}

impl EpochMetrics {
    /// Returns true if this epoch beat the previous best test accuracy
    pub fn is_improvement(&self, best_test_acc: f64) -> bool {
        self.test_acc > best_test_acc
    }
}

/// Logs epoch metrics to a CSV file for later analysis.
pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Create the directory and the CSV header if needed.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)
            .with_context(|| format!("Cannot create metrics dir '{}'", dir.display()))?;

        let csv_path = dir.join("metrics.csv");
        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)?;
            writeln!(f, "{HEADER}")?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    /// Append one epoch's metrics as a new row.
    pub fn log(&self, m: &EpochMetrics) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)
            .with_context(|| format!("Cannot open '{}'", self.csv_path.display()))?;

        writeln!(
            f,
            "{},{:.6},{:.6},{:.6},{:.6},{:.6},{:.6},{:.6},{:.6}",
            m.epoch,
            m.train_loss,
            m.train_acc,
            m.test_loss,
            m.test_acc,
            m.precision,
            m.recall,
            m.f1,
            m.lr,
        )?;

        tracing::debug!(
            "Logged epoch {} metrics: train_loss={:.4}, test_acc={:.2}",
            m.epoch,
            m.train_loss,
            m.test_acc,
        );
        Ok(())
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn row(epoch: usize, test_acc: f64) -> EpochMetrics {
        EpochMetrics {
            epoch,
            train_loss: 1.0,
            train_acc:  50.0,
            test_loss:  0.5,
            test_acc,
            precision:  0.25,
            recall:     0.5,
            f1:         0.3333,
            lr:         0.1,
        }
    }

    #[test]
    fn test_is_improvement() {
        let m = row(2, 60.0);
        assert!(m.is_improvement(55.0));
        assert!(!m.is_improvement(60.0));
    }

    #[test]
    fn test_header_written_once_and_rows_appended() {
        let dir = tempfile::tempdir().unwrap();

        let logger = MetricsLogger::new(dir.path()).unwrap();
        logger.log(&row(0, 40.0)).unwrap();
        // A second logger over the same dir must not rewrite the header
        let logger = MetricsLogger::new(dir.path()).unwrap();
        logger.log(&row(1, 45.0)).unwrap();

        let text = fs::read_to_string(logger.csv_path()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], HEADER);
        assert!(lines[1].starts_with("0,1.000000,50.000000,"));
        assert!(lines[2].starts_with("1,"));
        assert!(lines[2].ends_with(",0.100000"));
    }
}
