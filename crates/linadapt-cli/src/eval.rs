//! `linadapt eval` - compare retrieval quality across embedding spaces.
//!
//! Evaluates the frozen base model, optionally the fine-tuned adapter, and
//! optionally a remote reference model against the same labeled dataset,
//! then reports hit rate@k and MRR per system with paired significance
//! tests against the base model.

use crate::output;
use crate::train::{embed_with_progress, load_base_model};
use anyhow::{anyhow, Context, Result};
use linadapt_core::corpus::NodeId;
use linadapt_core::dataset::{QueryId, RetrievalDataset};
use linadapt_core::embedding::{Embedder, LinearAdapter, RemoteEmbedder};
use linadapt_core::evaluation::{evaluate_retrieval, ReportComparison, RetrievalReport};
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

/// Arguments for the eval subcommand.
#[derive(clap::Args, Debug)]
pub struct EvalArgs {
    /// Evaluation dataset JSON (from `linadapt generate`)
    dataset: PathBuf,

    /// Adapter weights to evaluate against the base model
    #[arg(long)]
    adapter: Option<PathBuf>,

    /// Remote embeddings model to include as a reference system
    #[arg(long)]
    remote_model: Option<String>,

    /// Base URL for the remote embeddings API
    #[arg(long, default_value = "https://api.openai.com")]
    remote_url: String,

    /// k values for hit rate (comma-separated)
    #[arg(long, value_delimiter = ',')]
    k_values: Option<Vec<usize>>,

    /// Cache directory for base embeddings
    #[arg(long, default_value = "target/eval-cache")]
    cache_dir: PathBuf,

    /// Force recomputation of cached embeddings
    #[arg(long)]
    force_recompute: bool,

    /// Output results as JSON
    #[arg(long)]
    json: bool,
}

/// Full evaluation output.
#[derive(Debug, Serialize)]
pub struct EvalReport {
    pub dataset: String,
    pub num_nodes: usize,
    pub num_queries: usize,
    pub k_values: Vec<usize>,
    pub systems: Vec<RetrievalReport>,
    pub comparisons: Vec<ReportComparison>,
}

pub async fn run(args: EvalArgs) -> Result<()> {
    let dataset = RetrievalDataset::load(&args.dataset)?;
    let k_values = args.k_values.clone().unwrap_or_default();

    let node_ids: Vec<NodeId> = dataset.corpus.keys().cloned().collect();
    let node_texts: Vec<String> = dataset.corpus.values().cloned().collect();
    let query_ids: Vec<QueryId> = dataset.queries.keys().cloned().collect();
    let query_texts: Vec<String> = dataset.queries.values().cloned().collect();

    let (tokenizer, embedder) = load_base_model()?;
    let dim = embedder.embedding_dim();

    // Base embeddings (cached: they are identical across eval runs)
    std::fs::create_dir_all(&args.cache_dir)
        .with_context(|| format!("Failed to create {}", args.cache_dir.display()))?;
    let cache_path = args.cache_dir.join(format!(
        "{}-base.bin",
        args.dataset
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "dataset".to_string())
    ));

    let (doc_embs, query_embs) = if !args.force_recompute && cache_path.exists() {
        eprintln!("Loading base embeddings from cache...");
        load_cache(&cache_path, node_ids.len(), query_ids.len(), dim)?
    } else {
        eprintln!("Computing base embeddings...");
        let docs = embed_with_progress(&embedder, &tokenizer, &node_texts, "Documents")?;
        let queries = embed_with_progress(&embedder, &tokenizer, &query_texts, "Queries")?;
        save_cache(&cache_path, &docs, &queries, dim)?;
        (docs, queries)
    };

    let doc_map: BTreeMap<NodeId, Vec<f32>> =
        node_ids.iter().cloned().zip(doc_embs.iter().cloned()).collect();
    let query_map: BTreeMap<QueryId, Vec<f32>> =
        query_ids.iter().cloned().zip(query_embs.iter().cloned()).collect();

    let mut systems = Vec::new();
    systems.push(evaluate_retrieval(
        "base",
        dim,
        &doc_map,
        &query_map,
        &dataset.relevant_docs,
        &k_values,
    )?);

    // Fine-tuned system: project query embeddings through the adapter,
    // documents stay in base space
    if let Some(adapter_path) = &args.adapter {
        let adapter = LinearAdapter::load(adapter_path, dim, embedder.device())?;
        let mut adapted_queries = BTreeMap::new();
        for (query_id, embedding) in &query_map {
            adapted_queries.insert(query_id.clone(), adapter.project(embedding)?);
        }
        systems.push(evaluate_retrieval(
            "fine-tuned",
            dim,
            &doc_map,
            &adapted_queries,
            &dataset.relevant_docs,
            &k_values,
        )?);
    }

    // Remote reference system: embeds both sides itself, possibly at a
    // different dimensionality
    if let Some(model) = &args.remote_model {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| anyhow!("--remote-model requires OPENAI_API_KEY"))?;
        let remote = RemoteEmbedder::new(&args.remote_url, api_key, model);

        let remote_docs = embed_remote(&remote, &node_texts, "Documents (remote)").await?;
        let remote_queries = embed_remote(&remote, &query_texts, "Queries (remote)").await?;
        let remote_dim = remote_docs
            .first()
            .map(|e| e.len())
            .ok_or_else(|| anyhow!("Remote embedder returned no documents"))?;

        let remote_doc_map: BTreeMap<NodeId, Vec<f32>> =
            node_ids.iter().cloned().zip(remote_docs).collect();
        let remote_query_map: BTreeMap<QueryId, Vec<f32>> =
            query_ids.iter().cloned().zip(remote_queries).collect();

        systems.push(evaluate_retrieval(
            model.clone(),
            remote_dim,
            &remote_doc_map,
            &remote_query_map,
            &dataset.relevant_docs,
            &k_values,
        )?);
    }

    // Pair every non-base system against the base
    let mut comparisons = Vec::new();
    for system in systems.iter().skip(1) {
        comparisons.push(ReportComparison::between(system, &systems[0])?);
    }

    let report = EvalReport {
        dataset: args.dataset.display().to_string(),
        num_nodes: dataset.num_nodes(),
        num_queries: dataset.num_queries(),
        k_values: systems
            .first()
            .map(|s| s.hit_rate_at_k.keys().copied().collect())
            .unwrap_or_default(),
        systems,
        comparisons,
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        output::print_report(&report);
    }
    Ok(())
}

/// Embeds texts through the remote API.
async fn embed_remote(
    remote: &RemoteEmbedder,
    texts: &[String],
    label: &'static str,
) -> Result<Vec<Vec<f32>>> {
    eprintln!("{}: embedding {} texts via {}", label, texts.len(), remote.model());
    let embeddings = remote.embed_batch(texts).await?;
    Ok(embeddings)
}

/// Writes doc and query embeddings as little-endian f32 with a count header.
fn save_cache(
    path: &Path,
    doc_embs: &[Vec<f32>],
    query_embs: &[Vec<f32>],
    dim: usize,
) -> Result<()> {
    let mut f = std::fs::File::create(path)?;

    let header = [doc_embs.len() as u64, query_embs.len() as u64, dim as u64];
    for h in &header {
        f.write_all(&h.to_le_bytes())?;
    }
    for emb in doc_embs.iter().chain(query_embs) {
        for &v in emb {
            f.write_all(&v.to_le_bytes())?;
        }
    }
    eprintln!("Cached base embeddings to {}", path.display());
    Ok(())
}

/// Reads a cache written by `save_cache`, validating it against the dataset.
fn load_cache(
    path: &Path,
    num_docs: usize,
    num_queries: usize,
    dim: usize,
) -> Result<(Vec<Vec<f32>>, Vec<Vec<f32>>)> {
    let mut f = std::fs::File::open(path)?;

    let mut buf = [0u8; 8];
    let mut header = [0u64; 3];
    for h in &mut header {
        f.read_exact(&mut buf)?;
        *h = u64::from_le_bytes(buf);
    }
    if header != [num_docs as u64, num_queries as u64, dim as u64] {
        return Err(anyhow!(
            "Embedding cache {} does not match the dataset; rerun with --force-recompute",
            path.display()
        ));
    }

    let mut read_block = |count: usize| -> Result<Vec<Vec<f32>>> {
        let mut block = Vec::with_capacity(count);
        let mut vbuf = [0u8; 4];
        for _ in 0..count {
            let mut emb = Vec::with_capacity(dim);
            for _ in 0..dim {
                f.read_exact(&mut vbuf)?;
                emb.push(f32::from_le_bytes(vbuf));
            }
            block.push(emb);
        }
        Ok(block)
    };

    let docs = read_block(num_docs)?;
    let queries = read_block(num_queries)?;
    Ok((docs, queries))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.bin");

        let docs = vec![vec![1.0f32, 2.0], vec![3.0, 4.0]];
        let queries = vec![vec![5.0f32, 6.0]];
        save_cache(&path, &docs, &queries, 2).unwrap();

        let (loaded_docs, loaded_queries) = load_cache(&path, 2, 1, 2).unwrap();
        assert_eq!(loaded_docs, docs);
        assert_eq!(loaded_queries, queries);
    }

    #[test]
    fn test_cache_header_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.bin");
        save_cache(&path, &[vec![1.0f32]], &[], 1).unwrap();

        let result = load_cache(&path, 2, 0, 1);
        assert!(result.is_err());
    }
}
