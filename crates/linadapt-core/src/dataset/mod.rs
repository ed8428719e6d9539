//! Retrieval training datasets: question/context pairs over a chunked corpus.
//!
//! A [`RetrievalDataset`] holds queries, corpus chunks, and the mapping from
//! each query to the chunks it should retrieve. Ground truth is known by
//! construction: queries are generated *from* a specific chunk, so that chunk
//! is the relevant document.
//!
//! Datasets serialize to a single JSON file so generation (which needs LLM
//! calls) can run once and training/evaluation can reload the result.

pub mod generator;
pub mod synthetic;

pub use generator::QuestionGenerator;
pub use synthetic::TermQueryGenerator;

use crate::corpus::NodeId;
use crate::error::DatasetError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{info, warn};

/// Stable identifier for a generated query.
///
/// Formatted as `q-{node_id}-{n}` where `n` is the question's index within
/// its source chunk.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryId(String);

impl QueryId {
    /// Builds a query ID from the source node and question index.
    pub fn new(node_id: &NodeId, question_index: usize) -> Self {
        Self(format!("q-{}-{}", node_id, question_index))
    }

    /// Wraps an existing ID string.
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for QueryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Query/context pairs with relevance ground truth.
///
/// BTreeMaps keep JSON output deterministically ordered, so regenerated
/// datasets diff cleanly.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RetrievalDataset {
    /// Query ID -> query text
    pub queries: BTreeMap<QueryId, String>,
    /// Node ID -> chunk text
    pub corpus: BTreeMap<NodeId, String>,
    /// Query ID -> IDs of relevant chunks
    pub relevant_docs: BTreeMap<QueryId, Vec<NodeId>>,
}

impl RetrievalDataset {
    /// Creates an empty dataset.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a corpus chunk.
    pub fn add_node(&mut self, node_id: NodeId, text: String) {
        self.corpus.insert(node_id, text);
    }

    /// Adds a query with its relevant chunks.
    pub fn add_query(&mut self, query_id: QueryId, text: String, relevant: Vec<NodeId>) {
        self.queries.insert(query_id.clone(), text);
        self.relevant_docs.insert(query_id, relevant);
    }

    /// Returns the number of queries.
    pub fn num_queries(&self) -> usize {
        self.queries.len()
    }

    /// Returns the number of corpus chunks.
    pub fn num_nodes(&self) -> usize {
        self.corpus.len()
    }

    /// Loads a dataset from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns `DatasetError::Io` if the file cannot be read or
    /// `DatasetError::Serialization` if the JSON is malformed.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, DatasetError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| DatasetError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let dataset: Self = serde_json::from_str(&contents)?;
        info!(
            "Loaded dataset from {}: {} queries over {} nodes",
            path.display(),
            dataset.num_queries(),
            dataset.num_nodes()
        );
        Ok(dataset)
    }

    /// Saves the dataset to a JSON file (pretty-printed).
    ///
    /// # Errors
    ///
    /// Returns `DatasetError::Io` or `DatasetError::Serialization`.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), DatasetError> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(|source| DatasetError::Io {
            path: path.display().to_string(),
            source,
        })?;
        info!(
            "Saved dataset to {}: {} queries over {} nodes",
            path.display(),
            self.num_queries(),
            self.num_nodes()
        );
        Ok(())
    }

    /// Returns (query_text, relevant_node_text) training pairs.
    ///
    /// Only the first relevant node per query is used, matching the
    /// one-positive-per-query structure the in-batch-negatives loss expects.
    pub fn training_pairs(&self) -> Vec<(String, String)> {
        self.queries
            .iter()
            .filter_map(|(query_id, query_text)| {
                let Some(node_id) = self.relevant_docs.get(query_id).and_then(|ids| ids.first())
                else {
                    warn!("Query {} has no relevant docs, skipping", query_id);
                    return None;
                };
                let Some(node_text) = self.corpus.get(node_id) else {
                    warn!(
                        "Query {} references missing node {}, skipping",
                        query_id, node_id
                    );
                    return None;
                };
                Some((query_text.clone(), node_text.clone()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_dataset() -> RetrievalDataset {
        let mut dataset = RetrievalDataset::new();
        let node_a = NodeId::new("report", 0);
        let node_b = NodeId::new("report", 1);
        dataset.add_node(node_a.clone(), "Revenue grew 12% year over year.".to_string());
        dataset.add_node(node_b.clone(), "Operating costs were flat.".to_string());
        dataset.add_query(
            QueryId::new(&node_a, 0),
            "How much did revenue grow?".to_string(),
            vec![node_a],
        );
        dataset.add_query(
            QueryId::new(&node_b, 0),
            "What happened to operating costs?".to_string(),
            vec![node_b],
        );
        dataset
    }

    #[test]
    fn test_query_id_format() {
        let node = NodeId::new("lyft-10k", 7);
        let id = QueryId::new(&node, 1);
        assert_eq!(id.as_str(), "q-lyft-10k-7-1");
    }

    #[test]
    fn test_counts() {
        let dataset = sample_dataset();
        assert_eq!(dataset.num_queries(), 2);
        assert_eq!(dataset.num_nodes(), 2);
    }

    #[test]
    fn test_save_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dataset.json");

        let dataset = sample_dataset();
        dataset.save(&path).unwrap();
        let loaded = RetrievalDataset::load(&path).unwrap();

        assert_eq!(loaded.queries, dataset.queries);
        assert_eq!(loaded.corpus, dataset.corpus);
        assert_eq!(loaded.relevant_docs, dataset.relevant_docs);
    }

    #[test]
    fn test_load_missing_file() {
        let result = RetrievalDataset::load("/nonexistent/dataset.json");
        assert!(matches!(result, Err(DatasetError::Io { .. })));
    }

    #[test]
    fn test_training_pairs() {
        let dataset = sample_dataset();
        let pairs = dataset.training_pairs();
        assert_eq!(pairs.len(), 2);
        assert!(pairs
            .iter()
            .any(|(q, c)| q.contains("revenue") && c.contains("Revenue")));
    }

    #[test]
    fn test_training_pairs_skip_dangling_refs() {
        let mut dataset = sample_dataset();
        dataset.add_query(
            QueryId::from_string("q-missing-0"),
            "Question about a missing node?".to_string(),
            vec![NodeId::from_string("missing-0")],
        );
        // The dangling query contributes no pair
        assert_eq!(dataset.training_pairs().len(), 2);
    }
}
