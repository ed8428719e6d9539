//! Information Retrieval metrics for comparing embedding spaces.
//!
//! This module implements the two metrics the evaluation reports:
//! - Hit rate@k (does any relevant document appear in the top k?)
//! - MRR (Mean Reciprocal Rank of the first relevant document)
//!
//! Relevance is binary: a document is relevant to a query or it isn't, which
//! matches synthetically generated datasets where the source chunk of each
//! question is the ground truth.

use crate::corpus::NodeId;
use crate::retrieval::SearchHit;
use std::collections::HashSet;

/// Computes hit rate at k for a single query.
///
/// # Formula
///
/// ```text
/// hit@k = 1 if |relevant ∩ top_k| > 0 else 0
/// ```
///
/// # Arguments
///
/// * `results` - Ranked search hits, highest score first
/// * `relevant` - Ground truth relevant document IDs
/// * `k` - Cutoff position (only considers top k results)
///
/// # Returns
///
/// 1.0 if any relevant document appears in the top k, otherwise 0.0.
/// Returns 0.0 if `relevant` is empty.
pub fn hit_rate_at_k(results: &[SearchHit], relevant: &[NodeId], k: usize) -> f64 {
    let rel_set: HashSet<&NodeId> = relevant.iter().collect();
    let hit = results
        .iter()
        .take(k)
        .any(|hit| rel_set.contains(&hit.node_id));
    if hit {
        1.0
    } else {
        0.0
    }
}

/// Computes Reciprocal Rank for a single query.
///
/// Reciprocal Rank is 1/position of the first relevant result. This metric
/// is particularly useful when users typically stop at the first good result.
///
/// # Formula
///
/// ```text
/// RR = 1 / rank_of_first_relevant_result
/// ```
///
/// # Arguments
///
/// * `results` - Ranked search hits, highest score first
/// * `relevant` - Ground truth relevant document IDs
///
/// # Returns
///
/// Reciprocal Rank between 0.0 and 1.0. Returns 0.0 if no relevant document
/// is found in the results.
pub fn reciprocal_rank(results: &[SearchHit], relevant: &[NodeId]) -> f64 {
    let rel_set: HashSet<&NodeId> = relevant.iter().collect();
    for (i, hit) in results.iter().enumerate() {
        if rel_set.contains(&hit.node_id) {
            return 1.0 / (i + 1) as f64;
        }
    }
    0.0
}

/// Returns the mean of a slice of per-query metric values.
///
/// Returns 0.0 for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn hits(ids: &[&str]) -> Vec<SearchHit> {
        ids.iter()
            .enumerate()
            .map(|(i, id)| SearchHit {
                node_id: NodeId::from_string(*id),
                score: 1.0 - i as f32 * 0.1,
            })
            .collect()
    }

    fn relevant(ids: &[&str]) -> Vec<NodeId> {
        ids.iter().map(|id| NodeId::from_string(*id)).collect()
    }

    #[test]
    fn test_hit_rate_found_within_k() {
        let results = hits(&["a", "b", "c"]);
        assert_eq!(hit_rate_at_k(&results, &relevant(&["b"]), 2), 1.0);
        assert_eq!(hit_rate_at_k(&results, &relevant(&["c"]), 2), 0.0);
        assert_eq!(hit_rate_at_k(&results, &relevant(&["c"]), 3), 1.0);
    }

    #[test]
    fn test_hit_rate_empty_relevant() {
        let results = hits(&["a", "b"]);
        assert_eq!(hit_rate_at_k(&results, &[], 10), 0.0);
    }

    #[test]
    fn test_reciprocal_rank_positions() {
        let rel = relevant(&["c"]);

        // Relevant at position 1 -> RR = 1.0
        assert!((reciprocal_rank(&hits(&["c", "a", "b"]), &rel) - 1.0).abs() < 1e-9);

        // Relevant at position 3 -> RR = 1/3
        let rr = reciprocal_rank(&hits(&["a", "b", "c"]), &rel);
        assert!((rr - 1.0 / 3.0).abs() < 1e-9);

        // Relevant not retrieved -> RR = 0
        assert_eq!(reciprocal_rank(&hits(&["a", "b", "d"]), &rel), 0.0);
    }

    #[test]
    fn test_reciprocal_rank_first_of_many() {
        // With multiple relevant docs, the first one retrieved counts
        let rel = relevant(&["b", "c"]);
        let rr = reciprocal_rank(&hits(&["a", "b", "c"]), &rel);
        assert!((rr - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_mean() {
        assert_eq!(mean(&[]), 0.0);
        assert!((mean(&[1.0, 0.0, 0.5]) - 0.5).abs() < 1e-9);
    }
}
