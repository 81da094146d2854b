// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Entry point for all user interaction. Parses arguments with
// `clap` and hands everything else to Layer 2 (application).
//
// Two commands are supported:
//   1. `train` — trains the style network on two image folders
//   2. `eval`  — stylizes one pair or a folder cross product
//
// Running without a subcommand is a usage error (non-zero exit).

// Declare the commands submodule
pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, EvalArgs, TrainArgs};

type EvalBackend = burn::backend::Wgpu;

/// Tracing file written by `train`; `eval` logs to the console only
pub const TRAIN_LOG_FILE: &str = "training.log";

#[derive(Parser, Debug)]
#[command(
    name = "style-align",
    version = "0.1.0",
    about = "Train a three-stage style-transfer network, then stylize images with it."
)]
pub struct Cli {
    /// The subcommand to run (train or eval)
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Log file the command appends to, if any.
    pub fn log_file(&self) -> Option<&'static str> {
        match self.command {
            Commands::Train(_) => Some(TRAIN_LOG_FILE),
            Commands::Eval(_)  => None,
        }
    }

    /// Match on the subcommand and dispatch to the correct use case.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args) => run_train(args),
            Commands::Eval(args)  => run_eval(args),
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    tracing::info!(
        "Starting training: content '{}', style '{}'",
        args.content_folder.display(),
        args.style_folder.display()
    );
    let use_case = TrainUseCase::new(args.into());
    let summary  = use_case.execute()?;

    println!(
        "Training complete: {} iterations, {} snapshots in '{}'.",
        summary.iterations,
        summary.snapshots.len(),
        use_case.config().checkpoint_dir.display()
    );
    Ok(())
}

fn run_eval(args: EvalArgs) -> Result<()> {
    use crate::application::eval_use_case::EvalUseCase;

    let device   = burn::backend::wgpu::WgpuDevice::default();
    let use_case = EvalUseCase::new(args.into());
    let report   = use_case.execute::<EvalBackend>(&device)?;

    println!("Wrote {} image(s).", report.written.len());
    if report.failed > 0 {
        println!("{} pair(s) failed; see the log for details.", report.failed);
    }
    Ok(())
}
