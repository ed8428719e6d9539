//! Tokenization utilities.
//!
//! Wraps a HuggingFace tokenizer with right-side truncation so sequences
//! never exceed the model's position limit.

use crate::error::EmbeddingError;
use tokenizers::tokenizer::{Tokenizer, TruncationDirection, TruncationParams, TruncationStrategy};

/// Handle for a configured tokenizer.
///
/// Owned type managed by the caller; the same handle must be used for chunk
/// sizing and embedding so token counts stay consistent across stages.
pub struct TokenizerHandle {
    tokenizer: Tokenizer,
    max_length: usize,
}

impl TokenizerHandle {
    /// Creates a tokenizer from JSON bytes with truncation configured.
    ///
    /// # Errors
    ///
    /// Returns `EmbeddingError::TokenizerUnavailable` if the bytes cannot be
    /// deserialized, or `EmbeddingError::InvalidConfig` if truncation cannot
    /// be configured.
    pub fn from_bytes(tokenizer_bytes: Vec<u8>, max_length: usize) -> Result<Self, EmbeddingError> {
        let mut tokenizer = Tokenizer::from_bytes(tokenizer_bytes).map_err(|e| {
            EmbeddingError::TokenizerUnavailable(format!("Failed to deserialize tokenizer: {}", e))
        })?;

        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length,
                stride: 0,
                strategy: TruncationStrategy::OnlyFirst,
                direction: TruncationDirection::Right,
            }))
            .map_err(|e| {
                EmbeddingError::InvalidConfig(format!(
                    "Failed to configure tokenizer truncation: {}",
                    e
                ))
            })?;

        Ok(Self {
            tokenizer,
            max_length,
        })
    }

    /// Returns the configured maximum length.
    pub fn max_length(&self) -> usize {
        self.max_length
    }

    /// Returns a reference to the underlying tokenizer.
    ///
    /// Used to build the token-based chunk sizer.
    pub fn inner(&self) -> &Tokenizer {
        &self.tokenizer
    }

    /// Tokenizes text into token IDs, including special tokens (CLS, SEP).
    ///
    /// # Errors
    ///
    /// Returns `EmbeddingError::TokenizationFailed` if encoding fails or
    /// produces no tokens.
    pub fn tokenize(&self, text: &str) -> Result<Vec<u32>, EmbeddingError> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| EmbeddingError::TokenizationFailed(format!("Encoding failed: {}", e)))?;

        let ids = encoding.get_ids();
        if ids.is_empty() {
            return Err(EmbeddingError::TokenizationFailed(
                "Tokenizer returned no tokens".to_string(),
            ));
        }

        Ok(ids.to_vec())
    }

    /// Returns the vocabulary size (including added tokens).
    pub fn vocab_size(&self) -> usize {
        self.tokenizer.get_vocab_size(true)
    }
}

impl Clone for TokenizerHandle {
    fn clone(&self) -> Self {
        Self {
            tokenizer: self.tokenizer.clone(),
            max_length: self.max_length,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_bytes_rejects_garbage() {
        let result = TokenizerHandle::from_bytes(vec![0x7f, 0x00, 0x42], 512);
        assert!(matches!(
            result,
            Err(EmbeddingError::TokenizerUnavailable(_))
        ));
    }

    #[test]
    fn test_from_bytes_rejects_non_tokenizer_json() {
        let result = TokenizerHandle::from_bytes(b"{\"not\": \"a tokenizer\"}".to_vec(), 512);
        assert!(result.is_err());
    }
}
