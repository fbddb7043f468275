// ============================================================
// Layer 2 — Eval Use Case
// ============================================================
// Scores a trained checkpoint on a labelled CSV:
//   1. Read train_config.json to rebuild the architecture
//   2. Load the best (or last saved epoch's) weights
//   3. Run one test epoch and return the outcome

use anyhow::{bail, Result};
use burn::prelude::*;

use crate::data::{
    batcher::{ClassificationBatch, ClassificationBatcher},
    dataset::{ClassificationDataset, ClassificationSample},
    loader::CsvFeatureLoader,
    prefetch::{PrefetchLoader, PrefetchLoaderBuilder},
};
use crate::infra::{
    checkpoint::{CheckpointManager, CheckpointSlot},
    stats::StatsRecorder,
};
use crate::ml::{evaluator::{test_epoch, EvalOutcome}, InnerBackend};

pub struct EvalUseCase {
    data_path:   String,
    has_headers: bool,
    ckpt:        CheckpointManager,
    best:        bool,
    batch_size:  usize,
    print_freq:  usize,
}

impl EvalUseCase {
    pub fn new(
        data_path:      String,
        checkpoint_dir: String,
        best:           bool,
        batch_size:     usize,
    ) -> Result<Self> {
        Ok(Self {
            data_path,
            has_headers: true,
            ckpt: CheckpointManager::open(checkpoint_dir)?,
            best,
            batch_size,
            print_freq: 20,
        })
    }

    pub fn with_headers(mut self, yes: bool) -> Self {
        self.has_headers = yes;
        self
    }

    pub fn execute(&self) -> Result<EvalOutcome> {
        let cfg    = self.ckpt.load_config()?;
        let device = Device::<InnerBackend>::default();

        let samples = CsvFeatureLoader::new(&self.data_path)
            .has_headers(self.has_headers)
            .load()?;
        let dataset = ClassificationDataset::new(samples);
        if dataset.num_features() != cfg.num_features {
            bail!(
                "'{}' has {} features, the checkpoint expects {}",
                self.data_path,
                dataset.num_features(),
                cfg.num_features,
            );
        }
        if dataset.num_classes() > cfg.num_classes {
            bail!(
                "'{}' has labels up to {}, the checkpoint knows {} classes",
                self.data_path,
                dataset.num_classes() - 1,
                cfg.num_classes,
            );
        }

        let slot = if self.best {
            CheckpointSlot::Best
        } else {
            CheckpointSlot::Epoch(self.ckpt.load_state()?.epoch)
        };
        let model = self.ckpt.load_model(
            cfg.model_config().init::<InnerBackend>(&device),
            slot,
            &device,
        )?;

        let loader: PrefetchLoader<ClassificationSample, ClassificationBatch<InnerBackend>> =
            PrefetchLoaderBuilder::new(ClassificationBatcher::<InnerBackend>::new(device))
                .batch_size(self.batch_size)
                .build(dataset);

        tracing::info!("Evaluating {:?} weights on {} samples", slot, loader.num_items());
        let mut rec = StatsRecorder::new();
        test_epoch(&model, &loader, self.print_freq, 0, &mut rec)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    use crate::application::train_use_case::{TrainConfig, TrainUseCase};
    use crate::ml::schedule::ScheduleKind;

    fn write_csv(path: &std::path::Path, rows: usize) {
        let mut text = String::from("x0,x1,label\n");
        for i in 0..rows {
            let label = i % 2;
            let sign  = if label == 1 { 1.0 } else { -1.0 };
            text.push_str(&format!("{},{},{}\n", sign * 2.0, sign * 0.5, label));
        }
        fs::write(path, text).unwrap();
    }

    fn trained(dir: &std::path::Path) -> String {
        let data = dir.join("train.csv");
        write_csv(&data, 32);
        let cfg = TrainConfig {
            data_path:      data.display().to_string(),
            checkpoint_dir: dir.join("ckpt").display().to_string(),
            epochs:         2,
            batch_size:     8,
            hidden_sizes:   vec![4],
            schedule:       ScheduleKind::Constant,
            print_freq:     100,
            ..TrainConfig::default()
        };
        let ckpt_dir = cfg.checkpoint_dir.clone();
        TrainUseCase::new(cfg).execute().unwrap();
        ckpt_dir
    }

    #[test]
    fn test_eval_best_and_last() {
        let dir = tempfile::tempdir().unwrap();
        let ckpt_dir = trained(dir.path());
        let data = dir.path().join("test.csv");
        write_csv(&data, 10);

        for best in [true, false] {
            let out = EvalUseCase::new(data.display().to_string(), ckpt_dir.clone(), best, 4)
                .unwrap()
                .execute()
                .unwrap();
            assert_eq!(out.report.samples, 10);
            assert_eq!(out.labels.len(), 10);
            assert!((0.0..=100.0).contains(&out.top1));
        }
    }

    #[test]
    fn test_feature_width_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let ckpt_dir = trained(dir.path());
        let data = dir.path().join("wide.csv");
        fs::write(&data, "a,b,c,label\n1,2,3,0\n").unwrap();

        let err = EvalUseCase::new(data.display().to_string(), ckpt_dir, true, 4)
            .unwrap()
            .execute()
            .unwrap_err();
        assert!(err.to_string().contains("3 features"));
    }

    #[test]
    fn test_untrained_dir_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("test.csv");
        write_csv(&data, 4);
        let empty = dir.path().join("empty");
        fs::create_dir(&empty).unwrap();

        let use_case =
            EvalUseCase::new(data.display().to_string(), empty.display().to_string(), true, 4).unwrap();
        assert!(use_case.execute().is_err());
    }

    #[test]
    fn test_missing_checkpoint_dir_is_not_created() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("test.csv");
        write_csv(&data, 4);
        let typo = dir.path().join("ckpt_typo");

        let result = EvalUseCase::new(data.display().to_string(), typo.display().to_string(), true, 4);

        assert!(result.is_err());
        assert!(!typo.exists());
    }
}
