// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the two subcommands, `train` and `eval`, and all
// their configurable flags.
//
// Boolean flags take an optional value: `--resume` alone means
// true, `--resume no` / `--resume 0` mean false.

use clap::{ArgAction, Args, Subcommand};

use crate::application::train_use_case::TrainConfig;
use crate::ml::schedule::{OptimizerKind, ScheduleKind};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train a classifier on a labelled CSV
    Train(TrainArgs),

    /// Score a trained checkpoint on a labelled CSV
    Eval(EvalArgs),
}

/// Parse a human-friendly boolean (case-insensitive).
pub fn parse_bool(s: &str) -> Result<bool, String> {
    match s.to_ascii_lowercase().as_str() {
        "yes" | "true" | "t" | "y" | "1" => Ok(true),
        "no" | "false" | "f" | "n" | "0" => Ok(false),
        _ => Err("Boolean value expected.".to_string()),
    }
}

/// All arguments for the `train` command.
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// CSV file: feature columns followed by an integer label column
    #[arg(long)]
    pub data: String,

    /// Whether the CSV's first row is a header
    #[arg(long, action = ArgAction::Set, value_parser = parse_bool,
          num_args = 0..=1, default_value = "true", default_missing_value = "true")]
    pub has_headers: bool,

    /// One non-negative weight per CSV row; enables weighted training
    #[arg(long)]
    pub weights: Option<String>,

    /// Checkpoint dir of a trained model to distill from
    #[arg(long)]
    pub teacher: Option<String>,

    /// Directory for checkpoints, state.json and metrics.csv
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    #[arg(long, default_value_t = 30)]
    pub epochs: usize,

    #[arg(long, default_value_t = 64)]
    pub batch_size: usize,

    /// Initial learning rate
    #[arg(long, default_value_t = 0.1)]
    pub lr: f64,

    /// Floor of the cosine schedule
    #[arg(long, default_value_t = 0.0)]
    pub min_lr: f64,

    /// SGD momentum; 0 disables it
    #[arg(long, default_value_t = 0.9)]
    pub momentum: f64,

    #[arg(long, action = ArgAction::Set, value_parser = parse_bool,
          num_args = 0..=1, default_value = "true", default_missing_value = "true")]
    pub nesterov: bool,

    #[arg(long, default_value_t = 5e-4)]
    pub weight_decay: f64,

    #[arg(long, value_enum, default_value_t = OptimizerKind::Sgd)]
    pub optimizer: OptimizerKind,

    #[arg(long, value_enum, default_value_t = ScheduleKind::Cosine)]
    pub schedule: ScheduleKind,

    /// Epochs between decays of the step schedule
    #[arg(long, default_value_t = 30)]
    pub step_size: usize,

    /// Decay factor of the step schedule
    #[arg(long, default_value_t = 0.1)]
    pub gamma: f64,

    /// Hidden layer widths, e.g. `--hidden 128,64`
    #[arg(long, value_delimiter = ',', default_value = "128,64")]
    pub hidden: Vec<usize>,

    #[arg(long, default_value_t = 0.0)]
    pub dropout: f64,

    /// Add an auxiliary classification head
    #[arg(long, action = ArgAction::Set, value_parser = parse_bool,
          num_args = 0..=1, default_value = "false", default_missing_value = "true")]
    pub aux_head: bool,

    /// Weight of the auxiliary head's loss
    #[arg(long, default_value_t = 0.0)]
    pub aux_weight: f64,

    /// Distillation softmax temperature
    #[arg(long, default_value_t = 4.0)]
    pub temperature: f64,

    /// Share of the soft-target term in the distillation loss
    #[arg(long, default_value_t = 1.0)]
    pub alpha: f64,

    /// Log a progress line every N batches
    #[arg(long, default_value_t = 20)]
    pub print_freq: usize,

    /// Fraction of rows held out for the test epoch
    #[arg(long, default_value_t = 0.2)]
    pub val_fraction: f64,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Batches built ahead of the training loop
    #[arg(long, default_value_t = 2)]
    pub prefetch: usize,

    /// Continue from the last checkpoint in --checkpoint-dir
    #[arg(long, action = ArgAction::Set, value_parser = parse_bool,
          num_args = 0..=1, default_value = "false", default_missing_value = "true")]
    pub resume: bool,
}

/// Convert CLI TrainArgs into the application-layer TrainConfig.
/// The application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            data_path:      a.data,
            has_headers:    a.has_headers,
            weights_path:   a.weights,
            teacher_dir:    a.teacher,
            checkpoint_dir: a.checkpoint_dir,
            epochs:         a.epochs,
            batch_size:     a.batch_size,
            lr:             a.lr,
            min_lr:         a.min_lr,
            momentum:       a.momentum,
            nesterov:       a.nesterov,
            weight_decay:   a.weight_decay,
            optimizer:      a.optimizer,
            schedule:       a.schedule,
            step_size:      a.step_size,
            gamma:          a.gamma,
            hidden_sizes:   a.hidden,
            dropout:        a.dropout,
            aux_head:       a.aux_head,
            aux_weight:     a.aux_weight,
            temperature:    a.temperature,
            alpha:          a.alpha,
            print_freq:     a.print_freq,
            val_fraction:   a.val_fraction,
            seed:           a.seed,
            prefetch:       a.prefetch,
            resume:         a.resume,
            num_features:   0,
            num_classes:    0,
        }
    }
}

/// All arguments for the `eval` command
#[derive(Args, Debug)]
pub struct EvalArgs {
    /// CSV file to score
    #[arg(long)]
    pub data: String,

    #[arg(long, action = ArgAction::Set, value_parser = parse_bool,
          num_args = 0..=1, default_value = "true", default_missing_value = "true")]
    pub has_headers: bool,

    /// Directory where checkpoints were saved during training
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// Use the best checkpoint instead of the last epoch's
    #[arg(long, action = ArgAction::Set, value_parser = parse_bool,
          num_args = 0..=1, default_value = "true", default_missing_value = "true")]
    pub best: bool,

    #[arg(long, default_value_t = 256)]
    pub batch_size: usize,
}
