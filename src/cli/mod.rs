// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// This is the entry point for all user interaction.
// It uses the `clap` crate to parse command line arguments.
// All business logic is delegated to Layer 2 (application).
//
// Two commands are supported:
//   1. `train`     — trains a translator on a parallel corpus
//   2. `translate` — loads a checkpoint and translates a sentence
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, TrainArgs, TranslateArgs};

use crate::domain::traits::Translator;

#[derive(Parser, Debug)]
#[command(
    name = "seq2seq-nmt",
    version = "0.1.0",
    about = "Train a recurrent seq2seq translator with attention, then translate sentences."
)]
pub struct Cli {
    /// The subcommand to run (train or translate)
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Match on the subcommand and dispatch to the correct use case.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)     => run_train(args),
            Commands::Translate(args) => run_translate(args),
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    let (tracing_only, threshold) = (args.param_tracing, args.param_threshold);
    let cfg = args.into_config()?;

    if tracing_only {
        for line in TrainUseCase::new(cfg).trace_params(threshold)? {
            println!("{line}");
        }
        return Ok(());
    }

    tracing::info!("Starting training on corpus: {}", cfg.corpus);

    let summary = TrainUseCase::new(cfg).execute()?;
    match summary.best_bleu {
        Some(best) => println!("Training complete. Best BLEU {:.2} at epoch {}.", best.value, best.epoch),
        None => println!("Training complete."),
    }
    Ok(())
}

fn run_translate(args: TranslateArgs) -> Result<()> {
    use crate::application::translate_use_case::TranslateUseCase;

    let use_case    = TranslateUseCase::new(&args.checkpoint_dir)?;
    let translation = use_case.translate(&args.sentence)?;
    println!("\n{}", translation);
    Ok(())
}
