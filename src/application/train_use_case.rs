// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates a full training run in order:
//
//   Step 1: Load the labelled CSV              (Layer 4 - data)
//   Step 2: Seeded train/test split            (Layer 4 - data)
//   Step 3: Save config                        (Layer 6 - infra)
//   Step 4: Build the train loader, weighted   (Layer 4 - data)
//           if a weights file is given
//   Step 5: Pick optimizer + LR schedule       (Layer 5 - ml)
//   Step 6: Resume / load teacher if asked     (Layer 6 - infra)
//   Step 7: Per epoch: train, test, metrics    (Layer 5 + 6)
//           row, checkpoint (best tracking)
//
// Epochs are numbered from 0. A resumed run continues at
// state.epoch + 1 with the schedule replayed to that point.

use anyhow::{bail, Context, Result};
use burn::{
    module::AutodiffModule,
    optim::{decay::WeightDecayConfig, momentum::MomentumConfig, AdamConfig, Optimizer, SgdConfig},
    prelude::*,
};
use serde::{Deserialize, Serialize};

use crate::data::{
    batcher::{ClassificationBatch, ClassificationBatcher},
    dataset::{ClassificationDataset, ClassificationSample},
    loader::{load_weights, CsvFeatureLoader},
    prefetch::{PrefetchLoader, PrefetchLoaderBuilder},
    splitter::split_train_val,
    weighted::WeightedSubset,
};
use crate::infra::{
    checkpoint::{CheckpointManager, CheckpointSlot, CheckpointState},
    metrics::{EpochMetrics, MetricsLogger},
    stats::StatsRecorder,
};
use crate::ml::{
    evaluator::test_epoch,
    loss::DistillationLoss,
    model::{Classifier, MlpClassifier, MlpClassifierConfig},
    schedule::{LrSchedule, OptimizerKind, ScheduleKind, ScheduleParams},
    trainer::{train_epoch, TrainSettings},
    InnerBackend, TrainBackend,
};

// ─── Training Configuration ──────────────────────────────────────────────────
// All hyperparameters for a training run.
// Saved as train_config.json so eval (and distillation from this
// run) can rebuild the same model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainConfig {
    pub data_path:      String,
    pub has_headers:    bool,
    pub weights_path:   Option<String>,
    pub teacher_dir:    Option<String>,
    pub checkpoint_dir: String,
    pub epochs:         usize,
    pub batch_size:     usize,
    pub lr:             f64,
    pub min_lr:         f64,
    pub momentum:       f64,
    pub nesterov:       bool,
    pub weight_decay:   f64,
    pub optimizer:      OptimizerKind,
    pub schedule:       ScheduleKind,
    pub step_size:      usize,
    pub gamma:          f64,
    pub hidden_sizes:   Vec<usize>,
    pub dropout:        f64,
    pub aux_head:       bool,
    pub aux_weight:     f64,
    pub temperature:    f64,
    pub alpha:          f64,
    pub print_freq:     usize,
    pub val_fraction:   f64,
    pub seed:           u64,
    pub prefetch:       usize,
    pub resume:         bool,
    /// Filled in from the data before the config is saved.
    #[serde(default)]
    pub num_features:   usize,
    #[serde(default)]
    pub num_classes:    usize,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            data_path:      "data/train.csv".to_string(),
            has_headers:    true,
            weights_path:   None,
            teacher_dir:    None,
            checkpoint_dir: "checkpoints".to_string(),
            epochs:         30,
            batch_size:     64,
            lr:             0.1,
            min_lr:         0.0,
            momentum:       0.9,
            nesterov:       true,
            weight_decay:   5e-4,
            optimizer:      OptimizerKind::Sgd,
            schedule:       ScheduleKind::Cosine,
            step_size:      30,
            gamma:          0.1,
            hidden_sizes:   vec![128, 64],
            dropout:        0.0,
            aux_head:       false,
            aux_weight:     0.0,
            temperature:    4.0,
            alpha:          1.0,
            print_freq:     20,
            val_fraction:   0.2,
            seed:           42,
            prefetch:       2,
            resume:         false,
            num_features:   0,
            num_classes:    0,
        }
    }
}

impl TrainConfig {
    pub fn model_config(&self) -> MlpClassifierConfig {
        MlpClassifierConfig::new(self.num_features, self.hidden_sizes.clone(), self.num_classes)
            .with_dropout(self.dropout)
            .with_aux_head(self.aux_head)
    }

    pub fn schedule_params(&self) -> ScheduleParams {
        ScheduleParams {
            kind:      self.schedule,
            lr:        self.lr,
            min_lr:    self.min_lr,
            epochs:    self.epochs,
            step_size: self.step_size,
            gamma:     self.gamma,
        }
    }

    fn train_settings(&self) -> Result<TrainSettings> {
        Ok(TrainSettings {
            print_freq:   self.print_freq,
            aux_weight:   self.aux_weight,
            distillation: DistillationLoss::new(self.temperature, self.alpha)?,
        })
    }

    /// Reject settings that would only fail (or go NaN) mid-run.
    pub fn validate(&self) -> Result<()> {
        self.train_settings()?;
        if !(0.0..1.0).contains(&self.val_fraction) {
            bail!("val_fraction must lie in [0, 1), got {}", self.val_fraction);
        }
        Ok(())
    }
}

/// Outcome of a finished run.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainSummary {
    pub epochs_run: usize,
    pub best_prec1: f64,
    pub stats:      StatsRecorder,
}

type TestLoader = PrefetchLoader<ClassificationSample, ClassificationBatch<InnerBackend>>;

/// Pieces shared by every optimizer/loader combination.
struct RunContext {
    ckpt:        CheckpointManager,
    test_loader: TestLoader,
    device:      Device<TrainBackend>,
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    pub fn execute(mut self) -> Result<TrainSummary> {
        self.config.validate()?;

        // ── Step 1: Load labelled samples ────────────────────────────────────
        tracing::info!("Loading samples from '{}'", self.config.data_path);
        let samples = CsvFeatureLoader::new(&self.config.data_path)
            .has_headers(self.config.has_headers)
            .load()?;
        let all = ClassificationDataset::new(samples);
        self.config.num_features = all.num_features();
        self.config.num_classes  = all.num_classes();
        tracing::info!(
            "Loaded {} samples: {} features, {} classes",
            all.samples().len(),
            self.config.num_features,
            self.config.num_classes,
        );

        // ── Step 2: Seeded split over indices ────────────────────────────────
        // Splitting indices keeps the weights file aligned with the rows.
        let indices: Vec<usize> = (0..all.samples().len()).collect();
        let (train_idx, test_idx) =
            split_train_val(indices, 1.0 - self.config.val_fraction, self.config.seed);
        tracing::info!("Split: {} train, {} test", train_idx.len(), test_idx.len());

        let device = Device::<TrainBackend>::default();
        let test_set = ClassificationDataset::new(
            test_idx.iter().map(|&i| all.samples()[i].clone()).collect(),
        );
        let test_loader: TestLoader =
            PrefetchLoaderBuilder::new(ClassificationBatcher::<InnerBackend>::new(device.clone()))
                .batch_size(self.config.batch_size)
                .prefetch(self.config.prefetch)
                .build(test_set);

        // ── Step 3: Save config ──────────────────────────────────────────────
        let ckpt = CheckpointManager::new(&self.config.checkpoint_dir)?;
        ckpt.save_config(&self.config)?;
        let ctx = RunContext { ckpt, test_loader, device: device.clone() };

        // ── Step 4: Train loader, weighted or plain ──────────────────────────
        let batcher = ClassificationBatcher::<TrainBackend>::new(device);
        match &self.config.weights_path {
            Some(path) => {
                let weights = load_weights(path)?;
                if weights.len() != all.samples().len() {
                    bail!(
                        "weights file '{}' has {} entries for {} samples",
                        path,
                        weights.len(),
                        all.samples().len(),
                    );
                }
                if self.config.teacher_dir.is_some() {
                    tracing::warn!("Sample weights given: distillation teacher is ignored");
                }
                let train_weights = train_idx.iter().map(|&i| weights[i]).collect();
                let subset = WeightedSubset::new(all, train_idx, train_weights)?;
                let loader = PrefetchLoaderBuilder::new(batcher)
                    .batch_size(self.config.batch_size)
                    .shuffle(self.config.seed)
                    .prefetch(self.config.prefetch)
                    .build(subset);
                self.with_optimizer(ctx, loader, true)
            }
            None => {
                let train_set = ClassificationDataset::new(
                    train_idx.iter().map(|&i| all.samples()[i].clone()).collect(),
                );
                let loader: PrefetchLoader<ClassificationSample, _> =
                    PrefetchLoaderBuilder::new(batcher)
                        .batch_size(self.config.batch_size)
                        .shuffle(self.config.seed)
                        .prefetch(self.config.prefetch)
                        .build(train_set);
                self.with_optimizer(ctx, loader, false)
            }
        }
    }

    // ── Step 5: Optimizer selection ──────────────────────────────────────────
    fn with_optimizer<I: Send + 'static>(
        &self,
        ctx:      RunContext,
        loader:   PrefetchLoader<I, ClassificationBatch<TrainBackend>>,
        weighted: bool,
    ) -> Result<TrainSummary> {
        let cfg = &self.config;
        let weight_decay =
            (cfg.weight_decay > 0.0).then(|| WeightDecayConfig::new(cfg.weight_decay as f32));

        match cfg.optimizer {
            OptimizerKind::Sgd => {
                let momentum = (cfg.momentum > 0.0).then(|| {
                    MomentumConfig::new()
                        .with_momentum(cfg.momentum)
                        .with_dampening(0.0)
                        .with_nesterov(cfg.nesterov)
                });
                let optim = SgdConfig::new()
                    .with_momentum(momentum)
                    .with_weight_decay(weight_decay)
                    .init::<TrainBackend, MlpClassifier<TrainBackend>>();
                self.fit(ctx, loader, weighted, optim)
            }
            OptimizerKind::Adam => {
                let optim = AdamConfig::new()
                    .with_weight_decay(weight_decay)
                    .init::<TrainBackend, MlpClassifier<TrainBackend>>();
                self.fit(ctx, loader, weighted, optim)
            }
        }
    }

    /// Teacher from a previous run's best checkpoint, on the inner backend.
    fn load_teacher(&self, device: &Device<InnerBackend>) -> Result<Option<MlpClassifier<InnerBackend>>> {
        let Some(dir) = &self.config.teacher_dir else {
            return Ok(None);
        };
        let teacher_ckpt = CheckpointManager::open(dir)
            .with_context(|| format!("Cannot open teacher checkpoint dir '{dir}'"))?;
        let teacher_cfg  = teacher_ckpt
            .load_config()
            .with_context(|| format!("Cannot load teacher config from '{dir}'"))?;
        if teacher_cfg.num_classes != self.config.num_classes
            || teacher_cfg.num_features != self.config.num_features
        {
            bail!(
                "teacher expects {} features / {} classes, data has {} / {}",
                teacher_cfg.num_features,
                teacher_cfg.num_classes,
                self.config.num_features,
                self.config.num_classes,
            );
        }
        let teacher = teacher_ckpt.load_model(
            teacher_cfg.model_config().init::<InnerBackend>(device),
            CheckpointSlot::Best,
            device,
        )?;
        tracing::info!("Distilling from teacher in '{}'", dir);
        Ok(Some(teacher))
    }

    // ── Steps 6–7: Resume, teacher, epoch loop ───────────────────────────────
    fn fit<I, O>(
        &self,
        ctx:       RunContext,
        loader:    PrefetchLoader<I, ClassificationBatch<TrainBackend>>,
        weighted:  bool,
        mut optim: O,
    ) -> Result<TrainSummary>
    where
        I: Send + 'static,
        O: Optimizer<MlpClassifier<TrainBackend>, TrainBackend>,
    {
        let cfg = &self.config;
        let RunContext { ckpt, test_loader, device } = ctx;

        let mut model: MlpClassifier<TrainBackend> = cfg.model_config().init(&device);
        let mut schedule = LrSchedule::new(cfg.schedule_params())?;
        let mut rec = StatsRecorder::new();
        let mut best_prec1: Option<f64> = None;
        let mut start_epoch = 0;

        if cfg.resume {
            let saved = ckpt.load_state()?;
            model = ckpt.load_model(model, CheckpointSlot::Epoch(saved.epoch), &device)?;
            optim = ckpt.load_optimizer::<TrainBackend, MlpClassifier<TrainBackend>, O>(
                optim, saved.epoch, &device,
            )?;
            schedule.fast_forward(saved.epoch + 1);
            start_epoch = saved.epoch + 1;
            best_prec1  = Some(saved.best_prec1);
            rec         = saved.stats;
            tracing::info!(
                "=> Resumed from epoch {} (best Prec@1 {:.3}, lr {:.5})",
                saved.epoch,
                saved.best_prec1,
                schedule.current(),
            );
        }

        // Weighted batches never use the teacher.
        let teacher = if weighted {
            None
        } else {
            self.load_teacher(&device)?
        };
        let teacher = teacher.as_ref().map(|t| t as &dyn Classifier<InnerBackend>);

        let settings = cfg.train_settings()?;
        let metrics  = MetricsLogger::new(ckpt.dir())?;
        let mut epochs_run = 0;

        for epoch in start_epoch..cfg.epochs {
            let (trained, summary) = train_epoch(
                model, &mut optim, &mut schedule, &loader, teacher, &settings, epoch, &mut rec,
            )?;
            model = trained;

            let outcome = test_epoch(&model.valid(), &test_loader, cfg.print_freq, epoch, &mut rec)?;

            let row = EpochMetrics {
                epoch,
                train_loss: summary.loss,
                train_acc:  summary.top1,
                test_loss:  outcome.loss,
                test_acc:   outcome.top1,
                precision:  outcome.report.precision,
                recall:     outcome.report.recall,
                f1:         outcome.report.f1,
                lr:         summary.lr,
            };
            metrics.log(&row)?;

            let is_best = best_prec1.map_or(true, |best| row.is_improvement(best));
            if is_best {
                best_prec1 = Some(outcome.top1);
                rec.record_ckpt(epoch);
            }
            let best = best_prec1.unwrap_or(outcome.top1);

            let state = CheckpointState {
                epoch,
                prec1: outcome.top1,
                best_prec1: best,
                lr: summary.lr,
                stats: rec.clone(),
            };
            ckpt.save_checkpoint(&model, &optim, &state, is_best)?;
            epochs_run += 1;
        }

        let best_prec1 = rec.best_test_acc().unwrap_or(0.0);
        tracing::info!("Training complete! Best Prec@1 {:.3}", best_prec1);
        Ok(TrainSummary { epochs_run, best_prec1, stats: rec })
    }
}
