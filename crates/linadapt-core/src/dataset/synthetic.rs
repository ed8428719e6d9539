//! Offline term-based query generation.
//!
//! Builds a retrieval dataset without any LLM calls by extracting distinctive
//! terms from each chunk (high term frequency, low document frequency) and
//! composing keyword queries from them. Useful for tests and for smoke runs
//! on machines without API access.
//!
//! Queries generated this way are keyword-shaped rather than natural
//! questions, so the resulting dataset is a weaker training signal than
//! [`super::QuestionGenerator`] output, but the ground truth structure is
//! identical.

use super::{QueryId, RetrievalDataset};
use crate::corpus::NodeId;
use crate::error::DatasetError;
use std::collections::{HashMap, HashSet};
use tracing::info;

/// Generates keyword queries from corpus chunks using TF-IDF term scoring.
pub struct TermQueryGenerator {
    corpus: Vec<(NodeId, String)>,
    /// Document frequency for each term (how many chunks contain it)
    doc_freq: HashMap<String, usize>,
    /// Term frequency per chunk
    term_freq: HashMap<NodeId, HashMap<String, usize>>,
    /// Simple LCG RNG state
    rng_state: u64,
    queries_per_chunk: usize,
    terms_per_query: usize,
}

impl TermQueryGenerator {
    /// Creates a generator from (node_id, text) pairs.
    ///
    /// # Arguments
    ///
    /// * `corpus` - Chunked corpus to generate queries over
    /// * `seed` - Random seed for reproducibility
    pub fn new(corpus: Vec<(NodeId, String)>, seed: u64) -> Self {
        let mut doc_freq: HashMap<String, usize> = HashMap::new();
        let mut term_freq: HashMap<NodeId, HashMap<String, usize>> = HashMap::new();

        // Build term statistics
        for (node_id, text) in &corpus {
            let terms = tokenize(text);
            let unique_terms: HashSet<_> = terms.iter().cloned().collect();

            for term in &unique_terms {
                *doc_freq.entry(term.clone()).or_insert(0) += 1;
            }

            let mut tf: HashMap<String, usize> = HashMap::new();
            for term in terms {
                *tf.entry(term).or_insert(0) += 1;
            }
            term_freq.insert(node_id.clone(), tf);
        }

        Self {
            corpus,
            doc_freq,
            term_freq,
            rng_state: seed,
            queries_per_chunk: 2,
            terms_per_query: 4,
        }
    }

    /// Sets how many queries to generate per chunk.
    pub fn with_queries_per_chunk(mut self, n: usize) -> Self {
        self.queries_per_chunk = n;
        self
    }

    /// Generates a dataset covering every chunk in the corpus.
    ///
    /// Chunks whose text yields no distinctive terms (very short or
    /// all-stopword chunks) are kept in the corpus map but get no queries.
    ///
    /// # Errors
    ///
    /// Returns `DatasetError::EmptyGeneration` if no chunk produced any
    /// query.
    pub fn generate_dataset(&mut self) -> Result<RetrievalDataset, DatasetError> {
        let mut dataset = RetrievalDataset::new();
        for (node_id, text) in &self.corpus {
            dataset.add_node(node_id.clone(), text.clone());
        }

        let node_ids: Vec<NodeId> = self.corpus.iter().map(|(id, _)| id.clone()).collect();
        for node_id in node_ids {
            for i in 0..self.queries_per_chunk {
                if let Some(query_text) = self.generate_query_for(&node_id) {
                    dataset.add_query(
                        QueryId::new(&node_id, i),
                        query_text,
                        vec![node_id.clone()],
                    );
                }
            }
        }

        if dataset.num_queries() == 0 {
            return Err(DatasetError::EmptyGeneration);
        }

        info!(
            "Generated {} term queries over {} nodes",
            dataset.num_queries(),
            dataset.num_nodes()
        );
        Ok(dataset)
    }

    /// Generates one keyword query targeting a specific chunk.
    ///
    /// Returns `None` if the chunk has no distinctive terms to build a
    /// query from.
    pub fn generate_query_for(&mut self, target_id: &NodeId) -> Option<String> {
        let tf = self.term_freq.get(target_id)?;
        let corpus_size = self.corpus.len();

        // Score terms by TF-IDF
        let mut term_scores: Vec<(String, f64)> = tf
            .iter()
            .filter_map(|(term, &count)| {
                let df = *self.doc_freq.get(term).unwrap_or(&1);
                // Skip very common terms (stopwords)
                if df as f64 > corpus_size as f64 * 0.5 {
                    return None;
                }
                let idf = ((corpus_size as f64) / (df as f64 + 1.0)).ln();
                Some((term.clone(), count as f64 * idf))
            })
            .collect();

        // Sort by score descending, then alphabetically for reproducibility
        term_scores.sort_by(|a, b| match b.1.partial_cmp(&a.1) {
            Some(std::cmp::Ordering::Equal) | None => a.0.cmp(&b.0),
            Some(ord) => ord,
        });

        if term_scores.is_empty() {
            return None;
        }

        let mut selected: Vec<String> = term_scores
            .iter()
            .take(self.terms_per_query.min(term_scores.len()))
            .map(|(term, _)| term.clone())
            .collect();
        self.shuffle(&mut selected);

        Some(selected.join(" "))
    }

    /// Returns corpus size.
    pub fn corpus_size(&self) -> usize {
        self.corpus.len()
    }

    // ========================================================================
    // Internal helpers
    // ========================================================================

    fn random_range(&mut self, min: usize, max: usize) -> usize {
        if max <= min {
            return min;
        }
        min + (self.next_random() as usize % (max - min))
    }

    fn next_random(&mut self) -> u64 {
        // LCG parameters from Numerical Recipes
        self.rng_state = self
            .rng_state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1);
        self.rng_state
    }

    fn shuffle<T>(&mut self, items: &mut [T]) {
        for i in (1..items.len()).rev() {
            let j = self.random_range(0, i + 1);
            items.swap(i, j);
        }
    }
}

/// Simple tokenizer for term extraction.
///
/// Splits on whitespace and punctuation, lowercases, and filters short tokens.
fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| c.is_whitespace() || c.is_ascii_punctuation())
        .filter(|s| s.len() >= 2)
        .map(|s| s.to_string())
        .collect()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_corpus() -> Vec<(NodeId, String)> {
        vec![
            (
                NodeId::new("doc", 0),
                "Machine learning algorithms for neural network training".to_string(),
            ),
            (
                NodeId::new("doc", 1),
                "Database optimization and query performance tuning".to_string(),
            ),
            (
                NodeId::new("doc", 2),
                "Web development with React and JavaScript frameworks".to_string(),
            ),
        ]
    }

    #[test]
    fn test_generator_creation() {
        let generator = TermQueryGenerator::new(sample_corpus(), 42);
        assert_eq!(generator.corpus_size(), 3);
        assert!(!generator.doc_freq.is_empty());
    }

    #[test]
    fn test_generate_query_for_target() {
        let mut generator = TermQueryGenerator::new(sample_corpus(), 42);
        let target = NodeId::new("doc", 0);

        let query = generator.generate_query_for(&target).unwrap();
        assert!(!query.is_empty());
        // Query terms come from the target chunk
        for term in query.split_whitespace() {
            assert!(
                "machine learning algorithms for neural network training".contains(term),
                "unexpected term: {}",
                term
            );
        }
    }

    #[test]
    fn test_generate_dataset_covers_all_chunks() {
        let mut generator = TermQueryGenerator::new(sample_corpus(), 42);
        let dataset = generator.generate_dataset().unwrap();

        assert_eq!(dataset.num_nodes(), 3);
        assert_eq!(dataset.num_queries(), 6);
        for relevant in dataset.relevant_docs.values() {
            assert_eq!(relevant.len(), 1);
        }
    }

    #[test]
    fn test_reproducibility() {
        let mut gen1 = TermQueryGenerator::new(sample_corpus(), 42);
        let mut gen2 = TermQueryGenerator::new(sample_corpus(), 42);

        let d1 = gen1.generate_dataset().unwrap();
        let d2 = gen2.generate_dataset().unwrap();
        assert_eq!(d1.queries, d2.queries);
    }

    #[test]
    fn test_empty_corpus() {
        let mut generator = TermQueryGenerator::new(vec![], 42);
        let result = generator.generate_dataset();
        assert!(matches!(result, Err(DatasetError::EmptyGeneration)));
    }

    #[test]
    fn test_tokenize() {
        let tokens = tokenize("Hello, World! This is a test.");
        assert!(tokens.contains(&"hello".to_string()));
        assert!(tokens.contains(&"world".to_string()));
        // Single char 'a' should be filtered
        assert!(!tokens.contains(&"a".to_string()));
    }
}
