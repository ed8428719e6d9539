//! Embedding model abstractions and implementations.
//!
//! This module provides traits and implementations for text embedding models,
//! plus the trainable linear adapter layered on top of them.
//!
//! ## Core Traits
//!
//! - [`Embedder`] - Embedding model inference interface
//! - [`ModelConfig`] - Model configuration parameters
//!
//! ## Implementations
//!
//! - [`JinaBertConfig`] - Configuration for JinaBERT models
//! - [`JinaBertEmbedder`] - JinaBERT implementation using Candle
//! - [`TokenizerHandle`] - Wrapper for HuggingFace tokenizers
//! - [`LinearAdapter`] - Trainable linear projection over base embeddings
//! - [`AdaptedEmbedder`] - Base embedder composed with an adapter
//! - [`RemoteEmbedder`] - Client for OpenAI-compatible embeddings APIs
//!
//! ## Example
//!
//! ```ignore
//! use linadapt_core::embedding::{Embedder, JinaBertConfig, JinaBertEmbedder, TokenizerHandle};
//!
//! // Load tokenizer
//! let tokenizer_bytes = std::fs::read("tokenizer.json")?;
//! let tokenizer = TokenizerHandle::from_bytes(tokenizer_bytes, 512)?;
//!
//! // Create embedder
//! let model_bytes = std::fs::read("model.safetensors")?;
//! let config = JinaBertConfig::default();
//! let embedder = JinaBertEmbedder::from_bytes(model_bytes, tokenizer.vocab_size(), config)?;
//!
//! // Generate embeddings
//! let tokens = tokenizer.tokenize("Hello, world!")?;
//! let embedding = embedder.embed_tokens(tokens)?;
//! ```

mod traits;

pub mod adapter;
pub mod config;
pub mod model;
pub mod remote;
pub mod tokenizer;

// Re-export traits
pub use traits::{Embedder, ModelConfig};

// Re-export config
pub use config::JinaBertConfig;

// Re-export model
pub use model::JinaBertEmbedder;

// Re-export tokenizer
pub use tokenizer::TokenizerHandle;

// Re-export adapter
pub use adapter::{AdaptedEmbedder, LinearAdapter};

// Re-export remote client
pub use remote::RemoteEmbedder;

use crate::error::EmbeddingError;

/// Embeds a list of texts in batches.
///
/// Texts are tokenized with `tokenizer` (which truncates to its configured
/// max length) and fed to the embedder `batch_size` at a time. `progress` is
/// invoked after each batch with the number of texts embedded so far.
///
/// # Errors
///
/// Returns the first tokenization or inference error encountered.
pub fn embed_texts(
    embedder: &dyn Embedder,
    tokenizer: &TokenizerHandle,
    texts: &[String],
    batch_size: usize,
    mut progress: impl FnMut(usize),
) -> Result<Vec<Vec<f32>>, EmbeddingError> {
    let mut embeddings = Vec::with_capacity(texts.len());
    for batch in texts.chunks(batch_size.max(1)) {
        let token_batches: Vec<Vec<u32>> = batch
            .iter()
            .map(|text| tokenizer.tokenize(text))
            .collect::<Result<_, _>>()?;
        embeddings.extend(embedder.embed_batch_tokens(token_batches)?);
        progress(embeddings.len());
    }
    Ok(embeddings)
}
