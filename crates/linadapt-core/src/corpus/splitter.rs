//! Semantic text chunking via the `text-splitter` crate.
//!
//! Chunk size can be measured in model tokens (the production path, so chunk
//! sizes accurately predict token counts at embedding time) or in characters
//! (offline and test path, no tokenizer required).
//!
//! **Important:** when token sizing is used, the tokenizer instance passed
//! here must be the same one used for embedding. Otherwise chunk sizes drift
//! from real token counts and chunks get truncated at embedding time.

use super::types::TextChunk;
use crate::error::CorpusError;
use text_splitter::{ChunkConfig, ChunkSizer, MarkdownSplitter, TextSplitter};
use tokenizers::Tokenizer;

/// ChunkSizer implementation backed by a HuggingFace tokenizer.
struct TokenSizer<'a> {
    tokenizer: &'a Tokenizer,
}

impl ChunkSizer for TokenSizer<'_> {
    fn size(&self, chunk: &str) -> usize {
        self.tokenizer
            .encode(chunk, false)
            .map(|encoding| encoding.len())
            .unwrap_or(0)
    }
}

/// How chunk size is measured.
enum Sizing {
    /// Token counts from the embedding model's tokenizer
    Tokens(Tokenizer),
    /// Plain character counts (text-splitter's default sizer)
    Characters,
}

/// Structure-aware splitting mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkerKind {
    /// Semantic sentence/paragraph chunking for plain text
    Text,
    /// Header-aware chunking for Markdown
    Markdown,
}

/// Semantic chunker producing [`TextChunk`]s with byte offsets.
pub struct Chunker {
    kind: ChunkerKind,
    max_size: usize,
    sizing: Sizing,
}

impl Chunker {
    /// Creates a token-sized chunker.
    ///
    /// # Arguments
    ///
    /// * `kind` - Splitting mode (plain text or Markdown)
    /// * `max_tokens` - Maximum tokens per chunk
    /// * `tokenizer` - The embedding model's tokenizer (cloned in)
    pub fn token_based(kind: ChunkerKind, max_tokens: usize, tokenizer: Tokenizer) -> Self {
        Self {
            kind,
            max_size: max_tokens,
            sizing: Sizing::Tokens(tokenizer),
        }
    }

    /// Creates a character-sized chunker (no tokenizer required).
    pub fn character_based(kind: ChunkerKind, max_chars: usize) -> Self {
        Self {
            kind,
            max_size: max_chars,
            sizing: Sizing::Characters,
        }
    }

    /// Returns the maximum chunk size in this chunker's unit.
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Splits text into chunks, preserving semantic boundaries.
    ///
    /// Chunks are ordered by their position in the source document
    /// (ascending `start_byte`). Empty or whitespace-only input yields an
    /// empty vector.
    pub fn chunk(&self, text: &str) -> Result<Vec<TextChunk>, CorpusError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(vec![]);
        }
        if self.max_size == 0 {
            return Err(CorpusError::InvalidConfig(
                "chunk size must be greater than zero".to_string(),
            ));
        }

        let chunks = match &self.sizing {
            Sizing::Tokens(tokenizer) => {
                let sizer = TokenSizer { tokenizer };
                let config = ChunkConfig::new(self.max_size)
                    .with_sizer(sizer)
                    .with_trim(true);
                match self.kind {
                    ChunkerKind::Text => {
                        calculate_chunk_boundaries(text, TextSplitter::new(config).chunks(text))
                    }
                    ChunkerKind::Markdown => {
                        calculate_chunk_boundaries(text, MarkdownSplitter::new(config).chunks(text))
                    }
                }
            }
            Sizing::Characters => {
                let config = ChunkConfig::new(self.max_size).with_trim(true);
                match self.kind {
                    ChunkerKind::Text => {
                        calculate_chunk_boundaries(text, TextSplitter::new(config).chunks(text))
                    }
                    ChunkerKind::Markdown => {
                        calculate_chunk_boundaries(text, MarkdownSplitter::new(config).chunks(text))
                    }
                }
            }
        };

        Ok(chunks)
    }
}

/// Calculates chunk boundaries by tracking cumulative position.
///
/// Unlike `text.find(chunk)` which fails with duplicate text, this tracks
/// position cumulatively as we iterate through chunks.
fn calculate_chunk_boundaries<'a, I>(text: &str, chunks_iter: I) -> Vec<TextChunk>
where
    I: Iterator<Item = &'a str>,
{
    let mut result = Vec::new();
    let mut search_start = 0;

    for (index, chunk) in chunks_iter.enumerate() {
        let start_byte = if let Some(pos) = text[search_start..].find(chunk) {
            search_start + pos
        } else {
            // Fallback: search from beginning (shouldn't happen with
            // well-behaved splitters)
            text.find(chunk).unwrap_or(0)
        };
        let end_byte = start_byte + chunk.len();

        result.push(TextChunk {
            index,
            text: chunk.to_string(),
            start_byte,
            end_byte,
        });

        search_start = end_byte;
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_text_chunking() {
        let chunker = Chunker::character_based(ChunkerKind::Text, 2048);
        let chunks = chunker
            .chunk("First sentence. Second sentence. Third sentence.")
            .unwrap();

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].index, 0);
        assert_eq!(chunks[0].start_byte, 0);
    }

    #[test]
    fn test_empty_and_whitespace_text() {
        let chunker = Chunker::character_based(ChunkerKind::Text, 100);
        assert!(chunker.chunk("").unwrap().is_empty());
        assert!(chunker.chunk("   \n\t  ").unwrap().is_empty());
    }

    #[test]
    fn test_small_chunk_size_splits() {
        let chunker = Chunker::character_based(ChunkerKind::Text, 20);
        let text = "This is a longer piece of text. It should be split. Into multiple chunks.";
        let chunks = chunker.chunk(text).unwrap();

        assert!(chunks.len() > 1, "Expected multiple chunks, got {}", chunks.len());
        // Ordered by position
        for pair in chunks.windows(2) {
            assert!(pair[0].start_byte < pair[1].start_byte);
        }
    }

    #[test]
    fn test_zero_size_is_config_error() {
        let chunker = Chunker::character_based(ChunkerKind::Text, 0);
        let err = chunker.chunk("some text").unwrap_err();
        assert!(matches!(err, CorpusError::InvalidConfig(_)));
    }

    #[test]
    fn test_markdown_chunking_respects_headers() {
        let chunker = Chunker::character_based(ChunkerKind::Markdown, 40);
        let text = "# Revenue\n\nRevenue grew this year.\n\n# Expenses\n\nExpenses also grew.";
        let chunks = chunker.chunk(text).unwrap();

        assert!(chunks.len() >= 2);
        assert!(chunks[0].text.contains("Revenue"));
    }

    #[test]
    fn test_duplicate_text_boundaries() {
        // Two identical sentences must get distinct, increasing offsets
        let chunker = Chunker::character_based(ChunkerKind::Text, 20);
        let text = "Same sentence here. Same sentence here.";
        let chunks = chunker.chunk(text).unwrap();

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].text, chunks[1].text);
        assert!(chunks[1].start_byte > chunks[0].start_byte);
    }

    #[test]
    fn test_unicode_handling() {
        let chunker = Chunker::character_based(ChunkerKind::Text, 2048);
        let chunks = chunker
            .chunk("Hello 世界. This is a test. Здравствуй мир!")
            .unwrap();
        assert!(!chunks.is_empty());
    }

    #[test]
    fn test_offsets_are_byte_indices() {
        // Multibyte characters ahead of a chunk shift its byte offsets past
        // its character position; slicing by the offsets must still work
        let chunker = Chunker::character_based(ChunkerKind::Text, 20);
        let text = "Привет мир, привет. Second sentence here.";
        let chunks = chunker.chunk(text).unwrap();

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert_eq!(&text[chunk.start_byte..chunk.end_byte], chunk.text);
            assert_eq!(chunk.end_byte - chunk.start_byte, chunk.text.len());
        }
    }
}
