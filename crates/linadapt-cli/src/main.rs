//! Linadapt CLI - fine-tune and evaluate linear embedding adapters.
//!
//! # Usage
//!
//! ```bash
//! # Build training and validation datasets from documents
//! linadapt generate corpus/train/ --val-files corpus/val/
//!
//! # Train the adapter
//! linadapt train train_dataset.json -o adapter.safetensors
//!
//! # Evaluate base vs fine-tuned (vs a remote reference model)
//! linadapt eval val_dataset.json --adapter adapter.safetensors
//! linadapt eval val_dataset.json --adapter adapter.safetensors \
//!     --remote-model text-embedding-3-small
//! ```

mod config;
mod eval;
mod generate;
mod output;
mod train;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// Fine-tune a linear adapter over a frozen embedding model and measure the
/// retrieval quality it buys.
#[derive(Parser)]
#[command(name = "linadapt", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Generate a question/context dataset from source documents
    Generate(generate::GenerateArgs),
    /// Train the linear adapter on a generated dataset
    Train(train::TrainArgs),
    /// Evaluate retrieval quality of base, adapted, and remote embeddings
    Eval(eval::EvalArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Generate(args) => generate::run(args).await,
        Command::Train(args) => train::run(args),
        Command::Eval(args) => eval::run(args).await,
    }
}
