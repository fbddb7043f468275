// ============================================================
// Layer 6 — Stats Recorder
// ============================================================
// Per-epoch history of a training run. Stored inside the
// checkpoint state so a resumed run keeps its full history.
//
//   train_step / train_loss / train_acc / lr   one per train epoch
//   test_step  / test_loss  / test_acc         one per test epoch
//   ckpts                                      epochs that produced a best checkpoint

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatsRecorder {
    pub train_step: Vec<usize>,
    pub train_loss: Vec<f64>,
    pub train_acc:  Vec<f64>,
    pub lr:         Vec<f64>,
    pub test_step:  Vec<usize>,
    pub test_loss:  Vec<f64>,
    pub test_acc:   Vec<f64>,
    pub ckpts:      Vec<usize>,
}

impl StatsRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_train_stats(&mut self, step: usize, loss: f64, acc: f64, lr: f64) -> &mut Self {
        self.train_step.push(step);
        self.train_loss.push(loss);
        self.train_acc.push(acc);
        self.lr.push(lr);
        self
    }

    pub fn record_test_stats(&mut self, step: usize, loss: f64, acc: f64) -> &mut Self {
        self.test_step.push(step);
        self.test_loss.push(loss);
        self.test_acc.push(acc);
        self
    }

    pub fn record_ckpt(&mut self, step: usize) -> &mut Self {
        self.ckpts.push(step);
        self
    }

    /// Highest test accuracy seen so far.
    pub fn best_test_acc(&self) -> Option<f64> {
        self.test_acc.iter().copied().fold(None, |best, acc| match best {
            Some(b) if b >= acc => Some(b),
            _ => Some(acc),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_append_in_parallel_columns() {
        let mut rec = StatsRecorder::new();
        rec.record_train_stats(0, 2.3, 10.0, 0.1)
            .record_train_stats(1, 1.9, 30.0, 0.05);
        rec.record_test_stats(0, 2.1, 25.0);
        rec.record_ckpt(0);

        assert_eq!(rec.train_step, vec![0, 1]);
        assert_eq!(rec.lr, vec![0.1, 0.05]);
        assert_eq!(rec.test_acc, vec![25.0]);
        assert_eq!(rec.ckpts, vec![0]);
    }

    #[test]
    fn test_best_test_acc() {
        let mut rec = StatsRecorder::new();
        assert_eq!(rec.best_test_acc(), None);
        rec.record_test_stats(0, 1.0, 40.0)
            .record_test_stats(1, 0.9, 55.5)
            .record_test_stats(2, 0.8, 50.0);
        assert_eq!(rec.best_test_acc(), Some(55.5));
    }

    #[test]
    fn test_json_shape() {
        let mut rec = StatsRecorder::new();
        rec.record_ckpt(3);
        let json = serde_json::to_value(&rec).unwrap();
        assert_eq!(json["ckpts"], serde_json::json!([3]));
        assert_eq!(json["train_loss"], serde_json::json!([]));
    }
}
