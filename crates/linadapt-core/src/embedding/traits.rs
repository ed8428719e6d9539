//! Traits for embedding operations.

use crate::error::EmbeddingError;

/// Trait for embedding model operations.
///
/// This is the seam between the pipeline and concrete models: the base
/// JinaBERT model and the adapter-wrapped model both implement it, so the
/// evaluation and training code never cares which one it is talking to.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` so embedders can be shared behind
/// an `Arc` across the pipeline stages.
pub trait Embedder: Send + Sync {
    /// Returns the maximum number of position embeddings (sequence length).
    ///
    /// Tokens beyond this limit will be truncated by the tokenizer.
    fn max_position_embeddings(&self) -> usize;

    /// Returns the embedding dimension (vector size).
    fn embedding_dim(&self) -> usize;

    /// Generates an embedding from token IDs.
    fn embed_tokens(&self, token_ids: Vec<u32>) -> Result<Vec<f32>, EmbeddingError>;

    /// Generates embeddings for a batch of token sequences.
    ///
    /// More efficient than calling `embed_tokens` in a loop when processing
    /// many texts.
    fn embed_batch_tokens(
        &self,
        batch_token_ids: Vec<Vec<u32>>,
    ) -> Result<Vec<Vec<f32>>, EmbeddingError>;
}

/// Trait for embedding model configurations.
pub trait ModelConfig: Clone + Send + Sync {
    /// Returns the model identifier (e.g., "jinaai/jina-embeddings-v2-small-en").
    fn model_id(&self) -> &str;

    /// Returns the output embedding dimension.
    fn embedding_dim(&self) -> usize;

    /// Returns the maximum sequence length the model can handle.
    fn max_sequence_length(&self) -> usize;

    /// Whether embeddings should be L2 normalized (unit vectors).
    fn normalize_embeddings(&self) -> bool;
}
