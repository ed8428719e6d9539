//! Types for corpus loading and chunking.

use serde::{Deserialize, Serialize};

/// A loaded source document before chunking.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    /// Source path or label (used to derive node IDs)
    pub source: String,
    /// Full extracted text
    pub text: String,
}

/// A chunk of text with metadata about its position in the source document.
#[derive(Debug, Clone, PartialEq)]
pub struct TextChunk {
    /// Index of this chunk in the document (0-based)
    pub index: usize,
    /// The text content of this chunk
    pub text: String,
    /// Byte offset where this chunk starts in the original document
    pub start_byte: usize,
    /// Byte offset where this chunk ends in the original document
    pub end_byte: usize,
}

/// Stable identifier for a corpus chunk.
///
/// Formatted as `{file-stem}-{chunk-index}` so IDs survive re-generation of
/// the dataset as long as the corpus files and chunking config are unchanged.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Builds a node ID from a source label and chunk index.
    pub fn new(source_stem: &str, chunk_index: usize) -> Self {
        Self(format!("{}-{}", source_stem, chunk_index))
    }

    /// Wraps an existing ID string (deserialization, tests).
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id_format() {
        let id = NodeId::new("lyft-10k", 3);
        assert_eq!(id.as_str(), "lyft-10k-3");
    }

    #[test]
    fn test_node_id_roundtrip_json() {
        let id = NodeId::new("report", 0);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"report-0\"");
        let back: NodeId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_chunk_ordering() {
        let a = TextChunk {
            index: 0,
            text: "First".to_string(),
            start_byte: 0,
            end_byte: 5,
        };
        let b = TextChunk {
            index: 1,
            text: "Second".to_string(),
            start_byte: 6,
            end_byte: 12,
        };
        assert!(a.start_byte < b.start_byte);
    }
}
