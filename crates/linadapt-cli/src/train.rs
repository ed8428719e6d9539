//! `linadapt train` - fine-tune the linear adapter on a generated dataset.
//!
//! Embeds every query/context pair once with the frozen base model, then
//! runs the contrastive training loop and writes the adapter weights to a
//! safetensors file.

use crate::config;
use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use linadapt_core::config::{
    DEFAULT_BATCH_SIZE, DEFAULT_EPOCHS, DEFAULT_LEARNING_RATE, DEFAULT_TEMPERATURE,
};
use linadapt_core::dataset::RetrievalDataset;
use linadapt_core::embedding::{
    embed_texts, Embedder, JinaBertConfig, JinaBertEmbedder, LinearAdapter, TokenizerHandle,
};
use linadapt_core::training::{AdapterTrainer, TrainerConfig};
use std::path::PathBuf;

/// Arguments for the train subcommand.
#[derive(clap::Args, Debug)]
pub struct TrainArgs {
    /// Training dataset JSON (from `linadapt generate`)
    dataset: PathBuf,

    /// Output path for the adapter weights
    #[arg(short, long, default_value = "adapter.safetensors")]
    output: PathBuf,

    /// Number of training epochs
    #[arg(long, default_value_t = DEFAULT_EPOCHS)]
    epochs: usize,

    /// Training batch size
    #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
    batch_size: usize,

    /// AdamW learning rate
    #[arg(long, default_value_t = DEFAULT_LEARNING_RATE)]
    learning_rate: f64,

    /// InfoNCE temperature
    #[arg(long, default_value_t = DEFAULT_TEMPERATURE)]
    temperature: f64,

    /// Shuffle seed
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Directory for per-epoch checkpoints
    #[arg(long)]
    checkpoint_dir: Option<PathBuf>,

    /// Resume from existing adapter weights instead of the identity
    #[arg(long)]
    resume: Option<PathBuf>,
}

pub fn run(args: TrainArgs) -> Result<()> {
    let dataset = RetrievalDataset::load(&args.dataset)?;
    let pairs = dataset.training_pairs();
    eprintln!(
        "Loaded {} training pairs from {}",
        pairs.len(),
        args.dataset.display()
    );

    let (tokenizer, embedder) = load_base_model()?;

    let (query_texts, context_texts): (Vec<String>, Vec<String>) = pairs.into_iter().unzip();
    let query_embeddings = embed_with_progress(&embedder, &tokenizer, &query_texts, "Queries")?;
    let context_embeddings =
        embed_with_progress(&embedder, &tokenizer, &context_texts, "Contexts")?;

    let mut adapter = match &args.resume {
        Some(path) => LinearAdapter::load(path, embedder.embedding_dim(), embedder.device())?,
        None => LinearAdapter::identity(embedder.embedding_dim(), embedder.device())?,
    };

    if let Some(dir) = &args.checkpoint_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }

    let trainer = AdapterTrainer::new(TrainerConfig {
        epochs: args.epochs,
        batch_size: args.batch_size,
        learning_rate: args.learning_rate,
        temperature: args.temperature,
        seed: args.seed,
        checkpoint_dir: args.checkpoint_dir.clone(),
    });

    let history = trainer.train(
        &mut adapter,
        &query_embeddings,
        &context_embeddings,
        |stats| {
            eprintln!(
                "Epoch {}/{}: mean loss {:.4}",
                stats.epoch + 1,
                args.epochs,
                stats.mean_loss
            );
        },
    )?;

    adapter.save(&args.output)?;
    if let Some(last) = history.last() {
        eprintln!(
            "Saved adapter to {} (final mean loss {:.4})",
            args.output.display(),
            last.mean_loss
        );
    }
    Ok(())
}

/// Loads the tokenizer and base embedding model from the model directory.
pub fn load_base_model() -> Result<(TokenizerHandle, JinaBertEmbedder)> {
    let model_config = JinaBertConfig::default();
    let tokenizer = TokenizerHandle::from_bytes(
        config::load_tokenizer_bytes()?,
        model_config.max_position_embeddings,
    )?;
    let embedder = JinaBertEmbedder::from_bytes(
        config::load_model_bytes()?,
        tokenizer.vocab_size(),
        model_config,
    )?;
    Ok((tokenizer, embedder))
}

/// Embeds texts with a progress bar, batched to the training batch size.
pub fn embed_with_progress(
    embedder: &dyn Embedder,
    tokenizer: &TokenizerHandle,
    texts: &[String],
    label: &'static str,
) -> Result<Vec<Vec<f32>>> {
    let pb = ProgressBar::new(texts.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{msg} [{bar:40}] {pos}/{len}")
            .unwrap(),
    );
    pb.set_message(label);

    let embeddings = embed_texts(embedder, tokenizer, texts, DEFAULT_BATCH_SIZE, |done| {
        pb.set_position(done as u64)
    })?;
    pb.finish();
    Ok(embeddings)
}
