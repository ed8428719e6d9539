//! Configuration for the base embedding model.

use super::traits::ModelConfig;
use serde::{Deserialize, Serialize};

/// Configuration for JinaBERT embedding models.
///
/// JinaBERT uses ALiBi (Attention with Linear Biases) positional embeddings,
/// which allows extrapolation beyond the training sequence length.
///
/// # Memory Considerations
///
/// ALiBi bias memory scales as `heads * seq_len^2 * 4 bytes`, so
/// `max_position_embeddings` should stay modest on memory-constrained
/// machines (~128MB at 2048 tokens with 8 heads).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JinaBertConfig {
    /// Model identifier (e.g., "jinaai/jina-embeddings-v2-small-en")
    pub model_id: String,

    /// Whether to apply L2 normalization to embeddings
    pub normalize_embeddings: bool,

    /// Hidden dimension size (embedding output dimension)
    pub hidden_size: usize,

    /// Number of transformer layers
    pub num_hidden_layers: usize,

    /// Number of attention heads per layer
    pub num_attention_heads: usize,

    /// Intermediate (FFN) dimension size
    pub intermediate_size: usize,

    /// Maximum position embeddings (sequence length limit)
    pub max_position_embeddings: usize,
}

impl Default for JinaBertConfig {
    fn default() -> Self {
        // jinaai/jina-embeddings-v2-small-en
        Self {
            model_id: "jinaai/jina-embeddings-v2-small-en".to_string(),
            normalize_embeddings: true,
            hidden_size: 512,
            num_hidden_layers: 4,
            num_attention_heads: 8,
            intermediate_size: 2048,
            max_position_embeddings: 2048,
        }
    }
}

impl ModelConfig for JinaBertConfig {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn embedding_dim(&self) -> usize {
        self.hidden_size
    }

    fn max_sequence_length(&self) -> usize {
        self.max_position_embeddings
    }

    fn normalize_embeddings(&self) -> bool {
        self.normalize_embeddings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = JinaBertConfig::default();
        assert_eq!(config.embedding_dim(), 512);
        assert_eq!(config.max_sequence_length(), 2048);
        assert!(config.normalize_embeddings());
    }
}
