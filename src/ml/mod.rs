// ============================================================
// Layer 5 — ML Layer (Burn)
// ============================================================
// Everything that touches tensors lives here:
//
//   model.rs     — Classifier trait + MLP with optional aux head
//   loss.rs      — cross-entropy, weighted CE, distillation
//   accuracy.rs  — top-k accuracy on logits
//   schedule.rs  — optimizer / LR schedule selection
//   trainer.rs   — one training epoch
//   evaluator.rs — one test epoch + classification report
//
// Gradients, optimizers and schedule formulas are Burn's; this
// layer only wires them together.

/// Classifier architecture
pub mod model;

/// Loss functions
pub mod loss;

/// Top-k accuracy
pub mod accuracy;

/// Optimizer and learning-rate schedule selection
pub mod schedule;

/// Training epoch
pub mod trainer;

/// Test epoch
pub mod evaluator;

/// Backend used for evaluation and distillation teachers.
#[cfg(not(feature = "wgpu"))]
pub type InnerBackend = burn::backend::NdArray<f32>;
#[cfg(feature = "wgpu")]
pub type InnerBackend = burn::backend::Wgpu;

/// Backend used for training.
pub type TrainBackend = burn::backend::Autodiff<InnerBackend>;
