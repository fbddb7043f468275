// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores training state with Burn's gzip-compressed
// named MessagePack recorder at half precision.
//
// What gets saved per epoch:
//   1. Model weights      (.mpk.gz) — all learned parameters
//   2. Optimizer state    (.mpk.gz) — momentum / Adam moments
//   3. state.json                   — epoch, Prec@1, best Prec@1,
//                                     learning rate, stats history
//
// File layout:
//   checkpoints/
//     model_epoch_0.mpk.gz   ← weights after epoch 0
//     optim_epoch_0.mpk.gz   ← optimizer after epoch 0
//     ...
//     model_best.mpk.gz      ← weights of the best test Prec@1
//     state.json             ← latest CheckpointState
//     train_config.json      ← model + run hyperparameters
//     metrics.csv            ← written by MetricsLogger
//
// The recorder appends the .mpk.gz extension itself, so paths
// below are built without it.

use anyhow::{bail, Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
};
use burn::{
    module::AutodiffModule,
    optim::Optimizer,
    prelude::*,
    record::{HalfPrecisionSettings, NamedMpkGzFileRecorder, Recorder},
    tensor::backend::AutodiffBackend,
};
use serde::{Deserialize, Serialize};

use crate::application::train_use_case::TrainConfig;
use crate::infra::stats::StatsRecorder;

type CkptRecorder = NamedMpkGzFileRecorder<HalfPrecisionSettings>;

/// Everything besides tensors needed to resume a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CheckpointState {
    /// Last finished epoch (0-based).
    pub epoch:      usize,
    /// Test Prec@1 of that epoch, in percent.
    pub prec1:      f64,
    pub best_prec1: f64,
    /// Learning rate for the next epoch.
    pub lr:         f64,
    pub stats:      StatsRecorder,
}

/// Which saved weights to load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckpointSlot {
    Epoch(usize),
    Best,
}

/// Manages saving and loading of checkpoints.
/// All files are stored in the configured directory.
pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Creates the directory if it doesn't already exist.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create checkpoint dir '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    /// Open an existing checkpoint directory without creating it.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        if !dir.is_dir() {
            bail!("checkpoint dir '{}' does not exist", dir.display());
        }
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn model_path(&self, slot: CheckpointSlot) -> PathBuf {
        match slot {
            CheckpointSlot::Epoch(epoch) => self.dir.join(format!("model_epoch_{epoch}")),
            CheckpointSlot::Best         => self.dir.join("model_best"),
        }
    }

    fn optim_path(&self, epoch: usize) -> PathBuf {
        self.dir.join(format!("optim_epoch_{epoch}"))
    }

    fn state_path(&self) -> PathBuf {
        self.dir.join("state.json")
    }

    fn config_path(&self) -> PathBuf {
        self.dir.join("train_config.json")
    }

    /// Write model, optimizer and state for `state.epoch`; when
    /// `is_best` the weights are also copied to the best slot.
    pub fn save_checkpoint<B, M, O>(
        &self,
        model:   &M,
        optim:   &O,
        state:   &CheckpointState,
        is_best: bool,
    ) -> Result<()>
    where
        B: AutodiffBackend,
        M: AutodiffModule<B>,
        O: Optimizer<M, B>,
    {
        tracing::info!(
            "=> Saving checkpoint for epoch {}, with Prec@1 {:.3}.",
            state.epoch,
            state.prec1,
        );
        let recorder = CkptRecorder::new();

        let path = self.model_path(CheckpointSlot::Epoch(state.epoch));
        model
            .clone()
            .save_file(path.clone(), &recorder)
            .with_context(|| format!("Failed to save model to '{}'", path.display()))?;

        let path = self.optim_path(state.epoch);
        Recorder::<B>::record(&recorder, optim.to_record(), path.clone())
            .with_context(|| format!("Failed to save optimizer to '{}'", path.display()))?;

        let path = self.state_path();
        fs::write(&path, serde_json::to_string_pretty(state)?)
            .with_context(|| format!("Cannot write state to '{}'", path.display()))?;

        if is_best {
            let path = self.model_path(CheckpointSlot::Best);
            model
                .clone()
                .save_file(path.clone(), &recorder)
                .with_context(|| format!("Failed to save best model to '{}'", path.display()))?;
            tracing::debug!("Updated best model (Prec@1 {:.3})", state.prec1);
        }

        tracing::debug!("Saved checkpoint: epoch {}", state.epoch);
        Ok(())
    }

    /// Load weights into `model`. The architecture must match the
    /// saved record or loading fails.
    pub fn load_model<B: Backend, M: Module<B>>(
        &self,
        model:  M,
        slot:   CheckpointSlot,
        device: &B::Device,
    ) -> Result<M> {
        let path = self.model_path(slot);
        tracing::info!("Loading weights from '{}'", path.display());
        model
            .load_file(path.clone(), &CkptRecorder::new(), device)
            .with_context(|| {
                format!("Cannot load checkpoint '{}'. Have you trained the model first?",
                    path.display())
            })
    }

    pub fn load_optimizer<B, M, O>(&self, optim: O, epoch: usize, device: &B::Device) -> Result<O>
    where
        B: AutodiffBackend,
        M: AutodiffModule<B>,
        O: Optimizer<M, B>,
    {
        let path = self.optim_path(epoch);
        let record = Recorder::<B>::load::<O::Record>(&CkptRecorder::new(), path.clone(), device)
            .with_context(|| format!("Cannot load optimizer state '{}'", path.display()))?;
        Ok(optim.load_record(record))
    }

    /// Read state.json of the last saved epoch.
    pub fn load_state(&self) -> Result<CheckpointState> {
        let path = self.state_path();
        let json = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read '{}'. Nothing to resume from.", path.display()))?;
        serde_json::from_str(&json)
            .with_context(|| format!("Malformed checkpoint state '{}'", path.display()))
    }

    /// Saved before training starts so `eval` can rebuild the model.
    pub fn save_config(&self, cfg: &TrainConfig) -> Result<()> {
        let path = self.config_path();
        fs::write(&path, serde_json::to_string_pretty(cfg)?)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;
        tracing::debug!("Saved training config to '{}'", path.display());
        Ok(())
    }

    pub fn load_config(&self) -> Result<TrainConfig> {
        let path = self.config_path();
        let json = fs::read_to_string(&path)
            .with_context(|| {
                format!(
                    "Cannot read config from '{}'. \
                     Make sure you have run 'train' before 'eval'.",
                    path.display()
                )
            })?;
        Ok(serde_json::from_str(&json)?)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::{
        backend::{Autodiff, NdArray},
        optim::{momentum::MomentumConfig, SgdConfig},
    };

    use crate::ml::model::{MlpClassifier, MlpClassifierConfig};

    type Inner = NdArray<f32>;
    type TestBackend = Autodiff<Inner>;

    fn max_abs_diff(a: Tensor<Inner, 2>, b: Tensor<Inner, 2>) -> f32 {
        a.sub(b).abs().max().into_scalar()
    }

    fn state(epoch: usize, prec1: f64) -> CheckpointState {
        let mut stats = StatsRecorder::new();
        stats.record_train_stats(epoch, 0.7, 60.0, 0.05);
        CheckpointState { epoch, prec1, best_prec1: prec1, lr: 0.05, stats }
    }

    #[test]
    fn test_save_and_reload_into_inner_backend() {
        let dir = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path().join("ckpt")).unwrap();

        let config = MlpClassifierConfig::new(3, vec![5], 2);
        let model: MlpClassifier<TestBackend> = config.init(&Default::default());
        let optim = SgdConfig::new()
            .with_momentum(Some(MomentumConfig::new()))
            .init::<TestBackend, MlpClassifier<TestBackend>>();

        ckpt.save_checkpoint(&model, &optim, &state(2, 75.0), true).unwrap();

        for name in ["model_epoch_2.mpk.gz", "optim_epoch_2.mpk.gz", "model_best.mpk.gz", "state.json"] {
            assert!(ckpt.dir().join(name).exists(), "missing {name}");
        }

        let fresh: MlpClassifier<Inner> = config.init(&Default::default());
        let loaded = ckpt.load_model(fresh, CheckpointSlot::Best, &Default::default()).unwrap();
        let original = model.valid();
        // weights are stored at half precision
        assert!(max_abs_diff(original.head.weight.val(), loaded.head.weight.val()) < 1e-2);
    }

    #[test]
    fn test_best_slot_only_written_when_best() {
        let dir = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path()).unwrap();
        let model: MlpClassifier<TestBackend> =
            MlpClassifierConfig::new(2, vec![], 2).init(&Default::default());
        let optim = SgdConfig::new().init::<TestBackend, MlpClassifier<TestBackend>>();

        ckpt.save_checkpoint(&model, &optim, &state(0, 10.0), false).unwrap();
        assert!(ckpt.dir().join("model_epoch_0.mpk.gz").exists());
        assert!(!ckpt.dir().join("model_best.mpk.gz").exists());
    }

    #[test]
    fn test_optimizer_state_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path()).unwrap();
        let model: MlpClassifier<TestBackend> =
            MlpClassifierConfig::new(2, vec![3], 2).init(&Default::default());
        let optim = SgdConfig::new().init::<TestBackend, MlpClassifier<TestBackend>>();
        ckpt.save_checkpoint(&model, &optim, &state(1, 50.0), false).unwrap();

        let fresh = SgdConfig::new().init::<TestBackend, MlpClassifier<TestBackend>>();
        assert!(ckpt.load_optimizer(fresh, 1, &Default::default()).is_ok());

        let fresh = SgdConfig::new().init::<TestBackend, MlpClassifier<TestBackend>>();
        assert!(ckpt.load_optimizer(fresh, 7, &Default::default()).is_err());
    }

    #[test]
    fn test_state_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path()).unwrap();
        assert!(ckpt.load_state().is_err());

        let model: MlpClassifier<TestBackend> =
            MlpClassifierConfig::new(2, vec![], 2).init(&Default::default());
        let optim = SgdConfig::new().init::<TestBackend, MlpClassifier<TestBackend>>();
        let saved = state(4, 81.25);
        ckpt.save_checkpoint(&model, &optim, &saved, false).unwrap();

        assert_eq!(ckpt.load_state().unwrap(), saved);
    }

    #[test]
    fn test_open_requires_existing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("typo");

        assert!(CheckpointManager::open(&missing).is_err());
        assert!(!missing.exists());
        assert!(CheckpointManager::open(dir.path()).is_ok());
    }

    #[test]
    fn test_missing_weights_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path()).unwrap();
        let model: MlpClassifier<Inner> =
            MlpClassifierConfig::new(2, vec![], 2).init(&Default::default());
        let err = ckpt.load_model(model, CheckpointSlot::Best, &Default::default()).unwrap_err();
        assert!(err.to_string().contains("model_best"));
    }
}
