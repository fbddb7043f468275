// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Cross-cutting persistence used by the application layer:
//
//   checkpoint.rs — model / optimizer / state persistence
//                   Burn's NamedMpkGzFileRecorder for tensors,
//                   serde_json for CheckpointState and
//                   TrainConfig so eval can rebuild the model.
//
//   stats.rs      — per-epoch history (train/test loss, acc,
//                   learning rate, best-checkpoint epochs)
//
//   metrics.rs    — one CSV row per epoch for plotting

/// Checkpoint saving and loading
pub mod checkpoint;

/// Run history recorder
pub mod stats;

/// Training metrics CSV logger
pub mod metrics;
