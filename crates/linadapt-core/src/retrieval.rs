//! Exact nearest-neighbor retrieval over a flat embedding index.
//!
//! Evaluation compares retrieval quality between embedding spaces, so the
//! index must not contribute its own error: a brute-force cosine scan over
//! all documents returns the true top-k, unlike an approximate structure.
//! Eval corpora are small enough (hundreds of chunks) that the O(N) scan is
//! not a concern.

use crate::corpus::NodeId;
use crate::error::EvalError;
use std::collections::BTreeMap;
use tracing::debug;

/// A single retrieval hit.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    /// ID of the retrieved document
    pub node_id: NodeId,
    /// Cosine similarity to the query, in [-1, 1]
    pub score: f32,
}

/// Brute-force cosine similarity index.
pub struct FlatIndex {
    /// Embeddings in insertion order
    embeddings: Vec<Box<[f32]>>,
    /// Node ID for each embedding position
    node_ids: Vec<NodeId>,
    /// Dimensionality of embeddings (must match the model)
    dimension: usize,
}

impl FlatIndex {
    /// Creates an empty index for embeddings of the given dimension.
    pub fn new(dimension: usize) -> Self {
        Self {
            embeddings: Vec::new(),
            node_ids: Vec::new(),
            dimension,
        }
    }

    /// Builds an index from a node-to-embedding map.
    ///
    /// # Errors
    ///
    /// Returns `EvalError::DimensionMismatch` if any embedding has the wrong
    /// dimension.
    pub fn from_embeddings(
        dimension: usize,
        embeddings: &BTreeMap<NodeId, Vec<f32>>,
    ) -> Result<Self, EvalError> {
        let mut index = Self::new(dimension);
        for (node_id, embedding) in embeddings {
            index.add(node_id.clone(), embedding)?;
        }
        Ok(index)
    }

    /// Adds a document embedding to the index.
    ///
    /// # Errors
    ///
    /// Returns `EvalError::DimensionMismatch` if the embedding length does
    /// not match the index dimension.
    pub fn add(&mut self, node_id: NodeId, embedding: &[f32]) -> Result<(), EvalError> {
        if embedding.len() != self.dimension {
            return Err(EvalError::DimensionMismatch {
                expected: self.dimension,
                actual: embedding.len(),
            });
        }
        self.embeddings.push(embedding.into());
        self.node_ids.push(node_id);
        Ok(())
    }

    /// Returns the number of indexed documents.
    pub fn len(&self) -> usize {
        self.node_ids.len()
    }

    /// Returns true if the index is empty.
    pub fn is_empty(&self) -> bool {
        self.node_ids.is_empty()
    }

    /// Returns the top-k documents by cosine similarity to the query.
    ///
    /// Results are sorted by descending score; ties break by node ID so
    /// repeated runs return identical rankings.
    ///
    /// # Errors
    ///
    /// Returns `EvalError::DimensionMismatch` if the query length does not
    /// match the index dimension.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>, EvalError> {
        if query.len() != self.dimension {
            return Err(EvalError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }

        let mut hits: Vec<SearchHit> = self
            .embeddings
            .iter()
            .zip(&self.node_ids)
            .map(|(embedding, node_id)| SearchHit {
                node_id: node_id.clone(),
                score: cosine_similarity(query, embedding),
            })
            .collect();

        hits.sort_by(|a, b| match b.score.partial_cmp(&a.score) {
            Some(std::cmp::Ordering::Equal) | None => a.node_id.cmp(&b.node_id),
            Some(ord) => ord,
        });
        hits.truncate(k);

        debug!("FlatIndex search over {} docs returned {} hits", self.len(), hits.len());
        Ok(hits)
    }
}

/// Cosine similarity between two vectors.
///
/// Returns 0.0 for zero vectors rather than NaN.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(&x, &y)| x * y).sum();
    let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b: f32 = b.iter().map(|y| y * y).sum::<f32>().sqrt();

    if mag_a == 0.0 || mag_b == 0.0 {
        return 0.0;
    }
    dot / (mag_a * mag_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_index() -> FlatIndex {
        let mut index = FlatIndex::new(3);
        index.add(NodeId::from_string("doc-0"), &[1.0, 0.0, 0.0]).unwrap();
        index.add(NodeId::from_string("doc-1"), &[0.0, 1.0, 0.0]).unwrap();
        index.add(NodeId::from_string("doc-2"), &[0.0, 0.0, 1.0]).unwrap();
        index
    }

    #[test]
    fn test_search_returns_nearest_first() {
        let index = build_index();
        let hits = index.search(&[0.9, 0.1, 0.0], 2).unwrap();

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].node_id, NodeId::from_string("doc-0"));
        assert!(hits[0].score > hits[1].score);
    }

    #[test]
    fn test_search_k_larger_than_index() {
        let index = build_index();
        let hits = index.search(&[1.0, 0.0, 0.0], 10).unwrap();
        assert_eq!(hits.len(), 3);
    }

    #[test]
    fn test_add_dimension_mismatch() {
        let mut index = FlatIndex::new(3);
        let result = index.add(NodeId::from_string("bad"), &[1.0, 2.0]);
        assert!(matches!(
            result,
            Err(EvalError::DimensionMismatch {
                expected: 3,
                actual: 2
            })
        ));
    }

    #[test]
    fn test_search_dimension_mismatch() {
        let index = build_index();
        let result = index.search(&[1.0], 1);
        assert!(matches!(result, Err(EvalError::DimensionMismatch { .. })));
    }

    #[test]
    fn test_zero_vector_scores_zero() {
        let index = build_index();
        let hits = index.search(&[0.0, 0.0, 0.0], 3).unwrap();
        assert!(hits.iter().all(|h| h.score == 0.0));
    }

    #[test]
    fn test_tie_break_by_node_id() {
        let mut index = FlatIndex::new(2);
        index.add(NodeId::from_string("b"), &[1.0, 0.0]).unwrap();
        index.add(NodeId::from_string("a"), &[2.0, 0.0]).unwrap();

        // Cosine similarity ignores magnitude, so both score 1.0
        let hits = index.search(&[1.0, 0.0], 2).unwrap();
        assert_eq!(hits[0].node_id, NodeId::from_string("a"));
        assert_eq!(hits[1].node_id, NodeId::from_string("b"));
    }

    #[test]
    fn test_from_embeddings() {
        let mut map = BTreeMap::new();
        map.insert(NodeId::from_string("x"), vec![1.0, 0.0]);
        map.insert(NodeId::from_string("y"), vec![0.0, 1.0]);
        let index = FlatIndex::from_embeddings(2, &map).unwrap();
        assert_eq!(index.len(), 2);
    }
}
