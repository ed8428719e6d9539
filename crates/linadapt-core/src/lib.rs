//! # Linadapt Core
//!
//! Library for fine-tuning a linear adapter over a frozen embedding model
//! and measuring what it buys in retrieval quality.
//!
//! The pipeline: load documents, split them into chunks, generate synthetic
//! question/context pairs per chunk, train a linear projection on those pairs
//! with a contrastive loss, and evaluate hit rate and MRR for the base model,
//! the adapter, and an optional remote reference model over the same dataset.
//!
//! ## Modules
//!
//! - [`corpus`] - Document loading (PDF, Markdown, plain text) and chunking
//! - [`embedding`] - Base model inference, the linear adapter, remote APIs
//! - [`dataset`] - Query/context pair generation and serialization
//! - [`training`] - Contrastive adapter training
//! - [`retrieval`] - Exact top-k cosine retrieval
//! - [`evaluation`] - Hit rate / MRR metrics and significance testing
//! - [`config`] - Pipeline configuration constants
//! - [`error`] - Error types per pipeline stage

pub mod config;
pub mod corpus;
pub mod dataset;
pub mod embedding;
pub mod error;
pub mod evaluation;
pub mod retrieval;
pub mod training;
