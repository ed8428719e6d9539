//! Production configuration constants.
//!
//! These values define the default pipeline configuration and are used
//! throughout the codebase and in tests to keep the stages consistent.

// =============================================================================
// Base Model Configuration
// =============================================================================

/// Embedding vector dimension (JinaBERT hidden_size).
///
/// JinaBERT v2 small produces 512-dimensional embeddings. The linear adapter
/// is a square matrix of this dimension, so this must match the model's
/// `hidden_size` configuration.
pub const EMBEDDING_DIM: usize = 512;

/// Whether embeddings are L2-normalized.
///
/// Unit-length embeddings let dot product stand in for cosine similarity,
/// both in the contrastive loss and at retrieval time.
pub const EMBEDDINGS_NORMALIZED: bool = true;

// =============================================================================
// Text Chunking Configuration
// =============================================================================

/// Maximum tokens per chunk.
///
/// Chunks are sized to fit within this token limit while preserving
/// semantic boundaries (sentences, paragraphs).
pub const MAX_CHUNK_TOKENS: usize = 512;

/// Approximate characters per token for English text.
///
/// Used for the character-based chunk sizer when no tokenizer is available.
pub const CHARS_PER_TOKEN_ESTIMATE: usize = 4;

/// Target chunk size in characters, derived from the token limit.
pub const TARGET_CHUNK_CHARS: usize = MAX_CHUNK_TOKENS * CHARS_PER_TOKEN_ESTIMATE;

// =============================================================================
// Dataset Generation Configuration
// =============================================================================

/// Default number of synthetic questions generated per chunk.
pub const QUESTIONS_PER_CHUNK: usize = 2;

// =============================================================================
// Training Configuration
// =============================================================================

/// Default number of training epochs over the synthetic dataset.
pub const DEFAULT_EPOCHS: usize = 4;

/// Default training batch size.
///
/// Each batch of N pairs provides N-1 in-batch negatives per query, so the
/// batch size directly controls contrastive signal strength.
pub const DEFAULT_BATCH_SIZE: usize = 10;

/// Default AdamW learning rate for the adapter.
pub const DEFAULT_LEARNING_RATE: f64 = 1e-3;

/// Default InfoNCE temperature.
pub const DEFAULT_TEMPERATURE: f64 = 0.05;

// =============================================================================
// Evaluation Configuration
// =============================================================================

/// Default k values reported by the evaluation.
pub const DEFAULT_K_VALUES: &[usize] = &[1, 5, 10];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_chunk_chars_calculation() {
        assert_eq!(TARGET_CHUNK_CHARS, 2048);
    }

    #[test]
    fn test_batch_size_supports_negatives() {
        // InfoNCE needs at least one in-batch negative
        let batch = DEFAULT_BATCH_SIZE;
        assert!(batch >= 2, "Batch size must provide in-batch negatives");
    }

    #[test]
    fn test_chunk_tokens_within_model_limit() {
        let max_tokens = MAX_CHUNK_TOKENS;
        assert!(max_tokens <= 2048, "MAX_CHUNK_TOKENS exceeds model limit");
        assert!(max_tokens >= 128, "MAX_CHUNK_TOKENS too small for useful chunks");
    }
}
