//! `linadapt generate` - build retrieval datasets from source documents.
//!
//! Loads PDF/Markdown/text files, chunks them with the embedding model's
//! tokenizer, and generates questions per chunk, either through an LLM
//! endpoint or with the offline term-based generator. Training and
//! validation corpora are kept separate at the file level so the adapter is
//! never evaluated on chunks it trained against.

use crate::config;
use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use linadapt_core::config::{CHARS_PER_TOKEN_ESTIMATE, MAX_CHUNK_TOKENS, QUESTIONS_PER_CHUNK};
use linadapt_core::corpus::{chunk_corpus, load_corpus, Chunker, NodeId, SourceDocument, TextChunk};
use linadapt_core::dataset::{QuestionGenerator, RetrievalDataset, TermQueryGenerator};
use linadapt_core::embedding::TokenizerHandle;
use std::path::{Path, PathBuf};

/// Arguments for the generate subcommand.
#[derive(clap::Args, Debug)]
pub struct GenerateArgs {
    /// Training source files or directories (.pdf, .md, .txt)
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Validation source files or directories (omit to skip the val dataset)
    #[arg(long, num_args = 1..)]
    val_files: Vec<PathBuf>,

    /// Output path for the training dataset JSON
    #[arg(short, long, default_value = "train_dataset.json")]
    output: PathBuf,

    /// Output path for the validation dataset JSON
    #[arg(long, default_value = "val_dataset.json")]
    val_output: PathBuf,

    /// Questions to generate per chunk
    #[arg(long, default_value_t = QUESTIONS_PER_CHUNK)]
    questions: usize,

    /// Maximum chunk size in tokens
    #[arg(long, default_value_t = MAX_CHUNK_TOKENS)]
    max_chunk_tokens: usize,

    /// Chat-completions model for question generation
    #[arg(long, default_value = "gpt-4o-mini")]
    model: String,

    /// Generate keyword queries locally instead of calling an LLM
    #[arg(long)]
    offline: bool,

    /// Seed for offline query generation
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

pub async fn run(args: GenerateArgs) -> Result<()> {
    build_one(&args, &args.inputs, &args.output).await?;
    if !args.val_files.is_empty() {
        build_one(&args, &args.val_files, &args.val_output).await?;
    }
    Ok(())
}

/// Loads one corpus, generates its dataset, and writes it out.
async fn build_one(args: &GenerateArgs, inputs: &[PathBuf], output: &Path) -> Result<()> {
    let documents = load_corpus(inputs)?;
    eprintln!("Loaded {} documents", documents.len());

    let nodes = chunk_documents(&documents, args.max_chunk_tokens)?;
    eprintln!("Split into {} chunks", nodes.len());

    let node_texts: Vec<(NodeId, String)> = nodes
        .into_iter()
        .map(|(id, chunk)| (id, chunk.text))
        .collect();

    let dataset = generate_dataset(args, node_texts).await?;

    dataset.save(output)?;
    eprintln!(
        "Wrote {} queries over {} chunks to {}",
        dataset.num_queries(),
        dataset.num_nodes(),
        output.display()
    );
    Ok(())
}

async fn generate_dataset(
    args: &GenerateArgs,
    node_texts: Vec<(NodeId, String)>,
) -> Result<RetrievalDataset> {
    if args.offline {
        let dataset = TermQueryGenerator::new(node_texts, args.seed)
            .with_queries_per_chunk(args.questions)
            .generate_dataset()?;
        return Ok(dataset);
    }

    let generator = QuestionGenerator::openai(&args.model)
        .context("Question generation needs an API key (or pass --offline)")?
        .with_questions_per_chunk(args.questions);

    let pb = ProgressBar::new(node_texts.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{msg} [{bar:40}] {pos}/{len}")
            .unwrap(),
    );
    pb.set_message("Generating questions");
    let dataset = generator
        .generate_dataset(&node_texts, |done| pb.set_position(done as u64))
        .await?;
    pb.finish();
    Ok(dataset)
}

/// Chunks every document, preferring token-based sizing when the tokenizer
/// is available and falling back to a character estimate otherwise.
fn chunk_documents(
    documents: &[SourceDocument],
    max_tokens: usize,
) -> Result<Vec<(NodeId, TextChunk)>> {
    match config::load_tokenizer_bytes()
        .ok()
        .and_then(|bytes| TokenizerHandle::from_bytes(bytes, max_tokens).ok())
    {
        Some(handle) => {
            let nodes = chunk_corpus(documents, |kind| {
                Chunker::token_based(kind, max_tokens, handle.inner().clone())
            })?;
            Ok(nodes)
        }
        None => {
            eprintln!("Tokenizer not found, using character-based chunk sizing");
            let max_chars = max_tokens * CHARS_PER_TOKEN_ESTIMATE;
            let nodes =
                chunk_corpus(documents, |kind| Chunker::character_based(kind, max_chars))?;
            Ok(nodes)
        }
    }
}
