// ============================================================
// Layer 5 — Optimizer & Learning-Rate Schedule Selection
// ============================================================
// Burn optimizers take the learning rate as an argument to
// step(), so the schedule lives next to the training loop:
//
//   epoch e uses  current()
//   end of epoch  advance()  → rate for epoch e + 1
//
// The schedule formulas themselves come from burn::lr_scheduler.

use anyhow::{anyhow, Result};
use burn::lr_scheduler::{
    constant::ConstantLr,
    cosine::{CosineAnnealingLrScheduler, CosineAnnealingLrSchedulerConfig},
    step::{StepLrScheduler, StepLrSchedulerConfig},
    LrScheduler,
};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptimizerKind {
    /// SGD with (optionally Nesterov) momentum
    Sgd,
    Adam,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleKind {
    Constant,
    /// Cosine annealing from `lr` to `min_lr` over all epochs
    Cosine,
    /// Multiply by `gamma` every `step_size` epochs
    Step,
}

/// Parameters needed to build any of the schedules.
#[derive(Debug, Clone, Copy)]
pub struct ScheduleParams {
    pub kind:      ScheduleKind,
    pub lr:        f64,
    pub min_lr:    f64,
    pub epochs:    usize,
    pub step_size: usize,
    pub gamma:     f64,
}

enum Inner {
    Constant(ConstantLr),
    Cosine(CosineAnnealingLrScheduler),
    Step(StepLrScheduler),
}

/// Per-epoch learning rate driven by a Burn scheduler.
pub struct LrSchedule {
    inner:   Inner,
    current: f64,
}

impl LrSchedule {
    pub fn new(params: ScheduleParams) -> Result<Self> {
        let inner = match params.kind {
            ScheduleKind::Constant => Inner::Constant(ConstantLr::from(params.lr)),
            // For both Burn schedulers the first step() yields the initial
            // rate; consume it so advance() moves to epoch 1.
            ScheduleKind::Cosine => {
                let mut cosine = CosineAnnealingLrSchedulerConfig::new(params.lr, params.epochs.max(1))
                    .with_min_lr(params.min_lr)
                    .init()
                    .map_err(|e| anyhow!("invalid cosine schedule: {e}"))?;
                cosine.step();
                Inner::Cosine(cosine)
            }
            ScheduleKind::Step => {
                let mut step = StepLrSchedulerConfig::new(params.lr, params.step_size.max(1))
                    .with_gamma(params.gamma)
                    .init()
                    .map_err(|e| anyhow!("invalid step schedule: {e}"))?;
                step.step();
                Inner::Step(step)
            }
        };
        Ok(Self { inner, current: params.lr })
    }

    /// Rate in effect for the current epoch.
    pub fn current(&self) -> f64 {
        self.current
    }

    /// Move to the next epoch and return its rate.
    pub fn advance(&mut self) -> f64 {
        self.current = match &mut self.inner {
            Inner::Constant(s) => s.step(),
            Inner::Cosine(s)   => s.step(),
            Inner::Step(s)     => s.step(),
        };
        self.current
    }

    /// Replay `epochs` finished epochs (used when resuming).
    pub fn fast_forward(&mut self, epochs: usize) {
        for _ in 0..epochs {
            self.advance();
        }
    }
}
