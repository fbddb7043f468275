// ============================================================
// Layer 5 — Train Epoch
// ============================================================
// One pass over the training loader:
//
//   for each batch
//     forward        student logits (+ aux logits)
//     loss           weighted CE   if the batch carries weights
//                    distillation  if a teacher is given
//                    CE + aux_weight * CE(aux) otherwise
//     accuracy       top-1 of the batch
//     backward       loss.backward() → GradientsParams
//     step           optimizer.step(lr, model, grads)
//   schedule.advance()  once, after the last batch
//   record_train_stats(epoch, loss.avg, top1.avg, new lr)
//
// The teacher runs on the inner (non-autodiff) backend, so no
// graph is built for it and its logits carry no gradient.

use std::time::Instant;

use anyhow::Result;
use burn::{
    module::AutodiffModule,
    optim::{GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};

use crate::data::{batcher::ClassificationBatch, prefetch::PrefetchLoader};
use crate::domain::meter::AverageMeter;
use crate::infra::stats::StatsRecorder;
use crate::ml::{
    accuracy::accuracy,
    loss::{cross_entropy, weighted_cross_entropy, DistillationLoss},
    model::Classifier,
    schedule::LrSchedule,
};

/// Knobs of the per-batch loop that do not change between epochs.
#[derive(Debug, Clone, Copy)]
pub struct TrainSettings {
    /// Log a progress line every `print_freq` batches.
    pub print_freq:   usize,
    /// Scale of the auxiliary-head cross-entropy; 0 disables it.
    pub aux_weight:   f64,
    pub distillation: DistillationLoss,
}

impl Default for TrainSettings {
    fn default() -> Self {
        Self {
            print_freq:   20,
            aux_weight:   0.0,
            distillation: DistillationLoss::default(),
        }
    }
}

/// Averages of one training epoch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpochSummary {
    pub loss:    f64,
    pub top1:    f64,
    /// Learning rate for the next epoch.
    pub lr:      f64,
    pub batches: usize,
}

fn progress_line(
    epoch:      usize,
    i:          usize,
    n_batches:  usize,
    batch_time: &AverageMeter,
    losses:     &AverageMeter,
    top1:       &AverageMeter,
    lr:         f64,
) -> String {
    format!(
        "Epoch: [{}][{}/{}]\tTime {}\tLoss {}\tPrec@1 {}\tLR {:.5}",
        epoch,
        i,
        n_batches,
        batch_time.val_avg(3),
        losses.val_avg(4),
        top1.val_avg(3),
        lr,
    )
}

/// Train `model` for one epoch and return it with the epoch averages.
#[allow(clippy::too_many_arguments)]
pub fn train_epoch<B, M, O, I>(
    mut model: M,
    optim:     &mut O,
    schedule:  &mut LrSchedule,
    loader:    &PrefetchLoader<I, ClassificationBatch<B>>,
    teacher:   Option<&dyn Classifier<B::InnerBackend>>,
    settings:  &TrainSettings,
    epoch:     usize,
    rec:       &mut StatsRecorder,
) -> Result<(M, EpochSummary)>
where
    B: AutodiffBackend,
    M: AutodiffModule<B> + Classifier<B>,
    O: Optimizer<M, B>,
    I: Send + 'static,
{
    let mut batch_time = AverageMeter::time();
    let mut losses     = AverageMeter::loss();
    let mut top1       = AverageMeter::top1();

    let lr         = schedule.current();
    let n_batches  = loader.len();
    let print_freq = settings.print_freq.max(1);
    let mut seen   = 0usize;

    let mut end = Instant::now();
    let mut batches = loader.iter();
    for (i, batch) in batches.by_ref().enumerate() {
        let batch_size = batch.len();
        let output     = model.classify(batch.inputs.clone());

        // Measure accuracy before the logits are consumed by the loss.
        let prec1 = accuracy(output.logits.clone().detach(), batch.targets.clone(), &[1])?[0];

        let loss = match (batch.weights, teacher) {
            (Some(weights), _) => {
                weighted_cross_entropy(output.logits, batch.targets, weights)
            }
            (None, Some(teacher)) => {
                let teacher_logits = teacher.classify(batch.inputs.inner()).logits;
                settings.distillation.forward(
                    output.logits,
                    Tensor::from_inner(teacher_logits),
                    batch.targets,
                )
            }
            (None, None) => {
                let loss = cross_entropy(output.logits, batch.targets.clone());
                match output.aux_logits {
                    Some(aux) if settings.aux_weight != 0.0 => {
                        loss + cross_entropy(aux, batch.targets).mul_scalar(settings.aux_weight)
                    }
                    _ => loss,
                }
            }
        };

        let loss_val: f64 = loss.clone().into_scalar().elem();
        losses.update(loss_val, batch_size);
        top1.update(prec1, batch_size);

        let grads = GradientsParams::from_grads(loss.backward(), &model);
        model = optim.step(lr, model, grads);

        batch_time.update(end.elapsed().as_secs_f64(), 1);
        end = Instant::now();
        seen += 1;

        if i % print_freq == 0 {
            tracing::info!(
                "{}",
                progress_line(epoch, i, n_batches, &batch_time, &losses, &top1, lr)
            );
        }
    }
    batches.finish()?;

    let next_lr = schedule.advance();
    rec.record_train_stats(epoch, losses.avg, top1.avg, next_lr);

    Ok((
        model,
        EpochSummary { loss: losses.avg, top1: top1.avg, lr: next_lr, batches: seen },
    ))
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::{
        backend::{Autodiff, NdArray},
        optim::SgdConfig,
    };

    use crate::data::{
        batcher::ClassificationBatcher,
        dataset::{ClassificationDataset, ClassificationSample},
        prefetch::PrefetchLoaderBuilder,
        weighted::WeightedSubset,
    };
    use crate::ml::{
        model::{MlpClassifier, MlpClassifierConfig},
        schedule::{ScheduleKind, ScheduleParams},
    };

    type Inner = NdArray<f32>;
    type TestBackend = Autodiff<Inner>;

    /// Two well separated clusters: x0 > 0 → class 1, else class 0.
    fn blobs() -> ClassificationDataset {
        ClassificationDataset::new(
            (0..32)
                .map(|i| {
                    let label = i % 2;
                    let sign = if label == 1 { 1.0 } else { -1.0 };
                    let jitter = (i as f32) * 0.01;
                    ClassificationSample::new(vec![sign * (1.0 + jitter), sign * 0.5], label)
                })
                .collect(),
        )
    }

    fn schedule(kind: ScheduleKind) -> LrSchedule {
        LrSchedule::new(ScheduleParams {
            kind,
            lr: 0.5,
            min_lr: 0.0,
            epochs: 10,
            step_size: 1,
            gamma: 0.5,
        })
        .unwrap()
    }

    fn model() -> MlpClassifier<TestBackend> {
        MlpClassifierConfig::new(2, vec![8], 2).init(&Default::default())
    }

    #[test]
    fn test_loss_decreases_and_stats_are_recorded() {
        let loader = PrefetchLoaderBuilder::new(ClassificationBatcher::<TestBackend>::new(Default::default()))
            .batch_size(8)
            .shuffle(1)
            .build(blobs());
        let mut optim = SgdConfig::new().init::<TestBackend, MlpClassifier<TestBackend>>();
        let mut sched = schedule(ScheduleKind::Constant);
        let mut rec   = StatsRecorder::new();
        let settings  = TrainSettings { print_freq: 1, ..Default::default() };

        let mut model = model();
        let mut summaries = Vec::new();
        for epoch in 0..15 {
            let (m, s) = train_epoch(model, &mut optim, &mut sched, &loader, None, &settings, epoch, &mut rec)
                .unwrap();
            model = m;
            summaries.push(s);
        }

        assert_eq!(summaries[0].batches, 4);
        assert!(summaries.last().unwrap().loss < summaries[0].loss);
        assert!(summaries.last().unwrap().top1 >= 90.0);
        assert_eq!(rec.train_step, (0..15).collect::<Vec<_>>());
        assert_eq!(rec.lr, vec![0.5; 15]);
    }

    #[test]
    fn test_schedule_steps_once_per_epoch() {
        let loader = PrefetchLoaderBuilder::new(ClassificationBatcher::<TestBackend>::new(Default::default()))
            .batch_size(4)
            .build(blobs());
        let mut optim = SgdConfig::new().init::<TestBackend, MlpClassifier<TestBackend>>();
        let mut sched = schedule(ScheduleKind::Cosine);
        let mut rec   = StatsRecorder::new();

        let (_, summary) = train_epoch(
            model(), &mut optim, &mut sched, &loader, None, &TrainSettings::default(), 0, &mut rec,
        )
        .unwrap();

        // 8 batches, but the rate moved exactly one cosine step
        assert_eq!(summary.batches, 8);
        assert!(summary.lr < 0.5);
        assert_eq!(sched.current(), summary.lr);
        assert_eq!(rec.lr, vec![summary.lr]);
    }

    #[test]
    fn test_weighted_epoch_runs() {
        let weights = (0..32).map(|i| if i < 16 { 1.0 } else { 0.0 }).collect();
        let subset = WeightedSubset::full(blobs(), weights).unwrap();
        let loader = PrefetchLoaderBuilder::new(ClassificationBatcher::<TestBackend>::new(Default::default()))
            .batch_size(16)
            .build(subset);
        let mut optim = SgdConfig::new().init::<TestBackend, MlpClassifier<TestBackend>>();
        let mut sched = schedule(ScheduleKind::Constant);
        let mut rec   = StatsRecorder::new();

        let (_, summary) = train_epoch(
            model(), &mut optim, &mut sched, &loader, None, &TrainSettings::default(), 0, &mut rec,
        )
        .unwrap();

        assert_eq!(summary.batches, 2);
        assert!(summary.loss.is_finite());
        assert_eq!(rec.train_loss.len(), 1);
    }

    #[test]
    fn test_distillation_epoch_runs_with_inner_backend_teacher() {
        let loader = PrefetchLoaderBuilder::new(ClassificationBatcher::<TestBackend>::new(Default::default()))
            .batch_size(8)
            .build(blobs());
        let teacher: MlpClassifier<Inner> =
            MlpClassifierConfig::new(2, vec![4], 2).init(&Default::default());
        let mut optim = SgdConfig::new().init::<TestBackend, MlpClassifier<TestBackend>>();
        let mut sched = schedule(ScheduleKind::Constant);
        let mut rec   = StatsRecorder::new();
        let settings  = TrainSettings {
            distillation: DistillationLoss::new(2.0, 0.5).unwrap(),
            ..Default::default()
        };

        let (_, summary) = train_epoch(
            model(), &mut optim, &mut sched, &loader, Some(&teacher), &settings, 3, &mut rec,
        )
        .unwrap();

        assert!(summary.loss.is_finite() && summary.loss > 0.0);
        assert_eq!(rec.train_step, vec![3]);
    }

    #[test]
    fn test_progress_line_format() {
        let mut time = AverageMeter::time();
        let mut loss = AverageMeter::loss();
        let mut top1 = AverageMeter::top1();
        time.update(0.125, 1);
        loss.update(0.6931, 8);
        top1.update(50.0, 8);

        assert_eq!(
            progress_line(3, 1, 4, &time, &loss, &top1, 0.1),
            "Epoch: [3][1/4]\tTime 0.125 (0.125)\tLoss 0.6931 (0.6931)\tPrec@1 50.000 (50.000)\tLR 0.10000",
        );
    }

    #[test]
    fn test_batching_failure_aborts_epoch() {
        let samples = vec![
            ClassificationSample::new(vec![1.0, 0.5], 1),
            ClassificationSample::new(vec![-1.0], 0),
        ];
        let loader = PrefetchLoaderBuilder::new(ClassificationBatcher::<TestBackend>::new(Default::default()))
            .batch_size(2)
            .build(ClassificationDataset::new(samples));
        let mut optim = SgdConfig::new().init::<TestBackend, MlpClassifier<TestBackend>>();
        let mut sched = schedule(ScheduleKind::Constant);
        let mut rec   = StatsRecorder::new();

        let result = train_epoch(
            model(), &mut optim, &mut sched, &loader, None, &TrainSettings::default(), 0, &mut rec,
        );

        assert!(result.is_err());
        assert!(rec.train_step.is_empty());
    }

    #[test]
    fn test_empty_loader_still_steps_schedule() {
        let loader = PrefetchLoaderBuilder::new(ClassificationBatcher::<TestBackend>::new(Default::default()))
            .build(ClassificationDataset::default());
        let mut optim = SgdConfig::new().init::<TestBackend, MlpClassifier<TestBackend>>();
        let mut sched = schedule(ScheduleKind::Cosine);
        let mut rec   = StatsRecorder::new();

        let (_, summary) = train_epoch(
            model(), &mut optim, &mut sched, &loader, None, &TrainSettings::default(), 0, &mut rec,
        )
        .unwrap();

        assert_eq!(summary.batches, 0);
        assert_eq!(summary.loss, 0.0);
        assert!(sched.current() < 0.5);
    }
}
