// ============================================================
// Layer 5 — Loss Functions
// ============================================================
// Three training objectives, all built from Burn tensor ops:
//
//   cross_entropy           mean_i  CE_i
//   weighted_cross_entropy  sum_i(CE_i * w_i) / sum_i(w_i)
//   DistillationLoss        alpha * T² * KL(p_teacher^T || p_student^T)
//                         + (1 - alpha) * CE
//
// where CE_i = -log softmax(logits_i)[target_i] and p^T is the
// softmax of logits / T.

use burn::{prelude::*, tensor::activation::log_softmax};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum LossError {
    #[error("distillation temperature must be positive, got {0}")]
    Temperature(f64),

    #[error("distillation alpha must lie in [0, 1], got {0}")]
    Alpha(f64),
}

/// Cross-entropy of every row: [batch, classes] × [batch] → [batch].
pub fn per_sample_cross_entropy<B: Backend>(
    logits:  Tensor<B, 2>,
    targets: Tensor<B, 1, Int>,
) -> Tensor<B, 1> {
    let [batch_size, _] = logits.dims();
    log_softmax(logits, 1)
        .gather(1, targets.reshape([batch_size, 1]))
        .reshape([batch_size])
        .neg()
}

pub fn cross_entropy<B: Backend>(logits: Tensor<B, 2>, targets: Tensor<B, 1, Int>) -> Tensor<B, 1> {
    per_sample_cross_entropy(logits, targets).mean()
}

/// Sample-weighted mean cross-entropy. `weights` must not require grad.
///
/// A batch whose weights are all zero contributes a loss of 0.
pub fn weighted_cross_entropy<B: Backend>(
    logits:  Tensor<B, 2>,
    targets: Tensor<B, 1, Int>,
    weights: Tensor<B, 1>,
) -> Tensor<B, 1> {
    let per_sample = per_sample_cross_entropy(logits, targets);
    (per_sample * weights.clone()).sum() / weights.sum().clamp_min(1e-12)
}

/// Knowledge-distillation objective.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DistillationLoss {
    /// Softmax temperature T applied to both student and teacher logits.
    pub temperature: f64,
    /// Weight of the soft-target term; `1.0` ignores the hard labels.
    pub alpha:       f64,
}

impl Default for DistillationLoss {
    fn default() -> Self {
        Self { temperature: 4.0, alpha: 1.0 }
    }
}

impl DistillationLoss {
    pub fn new(temperature: f64, alpha: f64) -> Result<Self, LossError> {
        if !(temperature > 0.0 && temperature.is_finite()) {
            return Err(LossError::Temperature(temperature));
        }
        if !(0.0..=1.0).contains(&alpha) {
            return Err(LossError::Alpha(alpha));
        }
        Ok(Self { temperature, alpha })
    }

    pub fn forward<B: Backend>(
        &self,
        student: Tensor<B, 2>,
        teacher: Tensor<B, 2>,
        targets: Tensor<B, 1, Int>,
    ) -> Tensor<B, 1> {
        let t = self.temperature;
        let [batch_size, _] = student.dims();

        let log_p_student = log_softmax(student.clone().div_scalar(t), 1);
        let log_p_teacher = log_softmax(teacher.detach().div_scalar(t), 1);
        let p_teacher     = log_p_teacher.clone().exp();

        // KL(teacher || student), summed over classes, averaged over the batch
        let kl = (p_teacher * (log_p_teacher - log_p_student))
            .sum()
            .div_scalar(batch_size as f64);
        let soft = kl.mul_scalar(t * t);

        if self.alpha >= 1.0 {
            return soft;
        }
        let hard = cross_entropy(student, targets);
        soft.mul_scalar(self.alpha) + hard.mul_scalar(1.0 - self.alpha)
    }
}
