// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Entry point for all user interaction, parsed with `clap`.
// All work is delegated to Layer 2 (application).
//
// Two commands are supported:
//   1. `train` — trains a classifier on a labelled CSV
//   2. `eval`  — loads a checkpoint and scores a labelled CSV

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, EvalArgs, TrainArgs};

#[derive(Parser, Debug)]
#[command(
    name = "classifier-harness",
    version,
    about = "Train and evaluate feature-vector classifiers with Burn."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Dispatch to the matching use case.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args) => run_train(args),
            Commands::Eval(args)  => run_eval(args),
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    tracing::info!("Starting training on '{}'", args.data);
    let checkpoint_dir = args.checkpoint_dir.clone();
    let summary = TrainUseCase::new(args.into()).execute()?;

    println!(
        "Training complete: {} epochs, best Prec@1 {:.3}. Checkpoints in '{}'.",
        summary.epochs_run, summary.best_prec1, checkpoint_dir,
    );
    Ok(())
}

fn run_eval(args: EvalArgs) -> Result<()> {
    use crate::application::eval_use_case::EvalUseCase;

    let outcome = EvalUseCase::new(args.data, args.checkpoint_dir, args.best, args.batch_size)?
        .with_headers(args.has_headers)
        .execute()?;

    println!("\nLoss {:.4}  Prec@1 {:.3}", outcome.loss, outcome.top1);
    println!("{}", outcome.report);
    Ok(())
}
