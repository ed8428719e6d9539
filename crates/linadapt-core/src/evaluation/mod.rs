//! Retrieval quality evaluation.
//!
//! Scores an embedding space against a labeled dataset: every query's
//! embedding is searched against the full corpus index, and hit rate@k and
//! MRR are aggregated over all queries. Running this for the base model, the
//! adapter, and a remote reference model on the same dataset yields directly
//! comparable reports.

pub mod metrics;
pub mod stats;

pub use metrics::{hit_rate_at_k, mean, reciprocal_rank};
pub use stats::{cohens_d, interpret_cohens_d, paired_ttest, TTestResult};

use crate::config::DEFAULT_K_VALUES;
use crate::corpus::NodeId;
use crate::dataset::QueryId;
use crate::error::EvalError;
use crate::retrieval::FlatIndex;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Aggregated retrieval metrics for one embedding space.
#[derive(Debug, Clone, Serialize)]
pub struct RetrievalReport {
    /// Label for the evaluated system (e.g. "base", "adapter")
    pub name: String,
    /// Number of queries evaluated
    pub num_queries: usize,
    /// Mean hit rate at each k
    pub hit_rate_at_k: BTreeMap<usize, f64>,
    /// Mean Reciprocal Rank over all queries
    pub mrr: f64,
    /// Per-query reciprocal ranks, in query-ID order.
    ///
    /// Kept so reports over the same dataset can be compared with paired
    /// statistics.
    pub per_query_rr: Vec<f64>,
}

/// Statistical comparison of two reports over the same queries.
#[derive(Debug, Clone, Serialize)]
pub struct ReportComparison {
    /// Name of the first system
    pub system_a: String,
    /// Name of the second system
    pub system_b: String,
    /// MRR delta (A - B)
    pub mrr_delta: f64,
    /// Paired t-test t-statistic over per-query reciprocal ranks
    pub t_statistic: f64,
    /// Two-tailed p-value
    pub p_value: f64,
    /// Cohen's d effect size
    pub effect_size: f64,
    /// Plain-language effect size label
    pub effect_label: &'static str,
}

impl ReportComparison {
    /// Compares two reports evaluated on the same dataset.
    ///
    /// # Errors
    ///
    /// Returns `EvalError::Stats` if the reports cover different numbers of
    /// queries.
    pub fn between(a: &RetrievalReport, b: &RetrievalReport) -> Result<Self, EvalError> {
        let ttest = paired_ttest(&a.per_query_rr, &b.per_query_rr)?;
        let d = cohens_d(&a.per_query_rr, &b.per_query_rr);
        Ok(Self {
            system_a: a.name.clone(),
            system_b: b.name.clone(),
            mrr_delta: a.mrr - b.mrr,
            t_statistic: ttest.t_statistic,
            p_value: ttest.p_value,
            effect_size: d,
            effect_label: interpret_cohens_d(d),
        })
    }
}

/// Evaluates one embedding space against a labeled dataset.
///
/// Builds a flat index over `doc_embeddings`, retrieves the top
/// `max(k_values)` documents for every query, and aggregates hit rate and
/// reciprocal rank. Queries iterate in ID order, so `per_query_rr` lines up
/// across systems evaluated on the same dataset.
///
/// # Arguments
///
/// * `name` - Label for the system under evaluation
/// * `dimension` - Embedding dimensionality
/// * `doc_embeddings` - Corpus embeddings, keyed by node ID
/// * `query_embeddings` - Query embeddings, keyed by query ID
/// * `relevant_docs` - Ground truth: relevant node IDs per query
/// * `k_values` - Cutoffs for hit rate (empty falls back to the defaults)
///
/// # Errors
///
/// Returns `EvalError::NoQueries` if `relevant_docs` is empty and
/// `EvalError::MissingQueryEmbedding` if a labeled query has no embedding.
pub fn evaluate_retrieval(
    name: impl Into<String>,
    dimension: usize,
    doc_embeddings: &BTreeMap<NodeId, Vec<f32>>,
    query_embeddings: &BTreeMap<QueryId, Vec<f32>>,
    relevant_docs: &BTreeMap<QueryId, Vec<NodeId>>,
    k_values: &[usize],
) -> Result<RetrievalReport, EvalError> {
    let name = name.into();
    if relevant_docs.is_empty() {
        return Err(EvalError::NoQueries);
    }
    let k_values = if k_values.is_empty() {
        DEFAULT_K_VALUES
    } else {
        k_values
    };
    let max_k = k_values.iter().copied().max().unwrap_or(10);

    let index = FlatIndex::from_embeddings(dimension, doc_embeddings)?;

    let mut per_query_rr = Vec::with_capacity(relevant_docs.len());
    let mut per_k_hits: BTreeMap<usize, Vec<f64>> =
        k_values.iter().map(|&k| (k, Vec::new())).collect();

    for (query_id, relevant) in relevant_docs {
        if relevant.is_empty() {
            warn!("Query {} has no relevant docs", query_id);
        }
        let embedding = query_embeddings
            .get(query_id)
            .ok_or_else(|| EvalError::MissingQueryEmbedding(query_id.to_string()))?;
        let hits = index.search(embedding, max_k)?;

        per_query_rr.push(reciprocal_rank(&hits, relevant));
        for (&k, values) in per_k_hits.iter_mut() {
            values.push(hit_rate_at_k(&hits, relevant, k));
        }
    }

    let report = RetrievalReport {
        name,
        num_queries: per_query_rr.len(),
        hit_rate_at_k: per_k_hits.iter().map(|(&k, v)| (k, mean(v))).collect(),
        mrr: mean(&per_query_rr),
        per_query_rr,
    };

    info!(
        "Evaluated '{}': {} queries, MRR {:.4}",
        report.name, report.num_queries, report.mrr
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Three orthogonal docs; queries point at their targets with varying
    /// amounts of noise.
    fn fixture() -> (
        BTreeMap<NodeId, Vec<f32>>,
        BTreeMap<QueryId, Vec<f32>>,
        BTreeMap<QueryId, Vec<NodeId>>,
    ) {
        let mut docs = BTreeMap::new();
        docs.insert(NodeId::from_string("doc-0"), vec![1.0, 0.0, 0.0]);
        docs.insert(NodeId::from_string("doc-1"), vec![0.0, 1.0, 0.0]);
        docs.insert(NodeId::from_string("doc-2"), vec![0.0, 0.0, 1.0]);

        let mut queries = BTreeMap::new();
        let mut relevant = BTreeMap::new();

        // Exact match: rank 1
        queries.insert(QueryId::from_string("q-doc-0-0"), vec![1.0, 0.0, 0.0]);
        relevant.insert(
            QueryId::from_string("q-doc-0-0"),
            vec![NodeId::from_string("doc-0")],
        );

        // Nearer to doc-0 than its target doc-1: rank 2
        queries.insert(QueryId::from_string("q-doc-1-0"), vec![0.9, 0.5, 0.0]);
        relevant.insert(
            QueryId::from_string("q-doc-1-0"),
            vec![NodeId::from_string("doc-1")],
        );

        (docs, queries, relevant)
    }

    #[test]
    fn test_evaluate_retrieval_metrics() {
        let (docs, queries, relevant) = fixture();
        let report =
            evaluate_retrieval("base", 3, &docs, &queries, &relevant, &[1, 3]).unwrap();

        assert_eq!(report.num_queries, 2);
        // First query hits at rank 1, second at rank 2 -> MRR = (1 + 0.5) / 2
        assert!((report.mrr - 0.75).abs() < 1e-9);
        assert!((report.hit_rate_at_k[&1] - 0.5).abs() < 1e-9);
        assert!((report.hit_rate_at_k[&3] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_evaluate_retrieval_no_queries() {
        let (docs, queries, _) = fixture();
        let result = evaluate_retrieval("base", 3, &docs, &queries, &BTreeMap::new(), &[1]);
        assert!(matches!(result, Err(EvalError::NoQueries)));
    }

    #[test]
    fn test_evaluate_retrieval_missing_embedding() {
        let (docs, _, relevant) = fixture();
        let result = evaluate_retrieval("base", 3, &docs, &BTreeMap::new(), &relevant, &[1]);
        assert!(matches!(result, Err(EvalError::MissingQueryEmbedding(_))));
    }

    #[test]
    fn test_evaluate_retrieval_default_k_values() {
        let (docs, queries, relevant) = fixture();
        let report = evaluate_retrieval("base", 3, &docs, &queries, &relevant, &[]).unwrap();
        for k in DEFAULT_K_VALUES {
            assert!(report.hit_rate_at_k.contains_key(k));
        }
    }

    #[test]
    fn test_report_comparison() {
        let (docs, queries, relevant) = fixture();
        let report = evaluate_retrieval("base", 3, &docs, &queries, &relevant, &[1]).unwrap();

        let comparison = ReportComparison::between(&report, &report).unwrap();
        assert_eq!(comparison.mrr_delta, 0.0);
        assert_eq!(comparison.t_statistic, 0.0);
        assert_eq!(comparison.effect_label, "negligible");
    }
}
