//! Error types for linadapt-core.
//!
//! Each pipeline stage (corpus loading, embedding, dataset generation,
//! training, evaluation) has its own error enum so callers can match on the
//! failures they care about.

use thiserror::Error;

/// Errors that can occur while loading and chunking source documents.
#[derive(Debug, Error)]
pub enum CorpusError {
    /// Failed to read a source file
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// PDF text extraction failed
    #[error("Failed to extract text from {path}: {reason}")]
    PdfExtraction { path: String, reason: String },
    /// A file produced no text at all
    #[error("No text extracted from {0}")]
    EmptyDocument(String),
    /// Text chunking failed
    #[error("Failed to chunk text: {0}")]
    ChunkFailed(String),
    /// Two source files share a stem, so their chunk IDs would collide
    #[error("Duplicate file stem '{stem}': {first} and {second}")]
    DuplicateStem {
        stem: String,
        first: String,
        second: String,
    },
    /// Invalid chunking configuration
    #[error("Invalid chunking configuration: {0}")]
    InvalidConfig(String),
}

/// Errors that can occur during embedding operations.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    /// Failed to load model from bytes
    #[error("Failed to load model: {0}")]
    ModelLoad(String),
    /// Failed to create tensor during inference
    #[error("Failed to create tensor: {0}")]
    TensorCreation(String),
    /// Forward pass through the model failed
    #[error("Inference failed: {0}")]
    InferenceFailed(String),
    /// Failed to tokenize text
    #[error("Tokenization failed: {0}")]
    TokenizationFailed(String),
    /// Tokenizer not available or initialization failed
    #[error("Tokenizer unavailable: {0}")]
    TokenizerUnavailable(String),
    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    /// Adapter dimension does not match the base model
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    /// Remote embeddings endpoint failure
    #[error("Remote embedding request failed: {0}")]
    RemoteRequest(String),
}

/// Errors that can occur during dataset generation or persistence.
#[derive(Debug, Error)]
pub enum DatasetError {
    /// Failed to read or write a dataset file
    #[error("Dataset I/O error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// Dataset JSON could not be parsed or serialized
    #[error("Dataset serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    /// LLM question generation request failed
    #[error("Question generation failed: {0}")]
    Generation(String),
    /// No questions could be generated for any chunk
    #[error("Question generation produced no queries")]
    EmptyGeneration,
}

/// Errors that can occur during adapter training.
#[derive(Debug, Error)]
pub enum TrainingError {
    /// Embedding the training data failed
    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),
    /// A tensor operation in the loss or optimizer failed
    #[error("Tensor operation failed: {0}")]
    Tensor(String),
    /// The dataset contains no usable training pairs
    #[error("No usable training pairs in dataset")]
    EmptyDataset,
    /// Failed to save or load adapter weights
    #[error("Adapter checkpoint error: {0}")]
    Checkpoint(String),
}

/// Errors that can occur during retrieval evaluation.
#[derive(Debug, Error)]
pub enum EvalError {
    /// Vector dimension mismatch between query and index
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    /// The evaluation dataset has no queries
    #[error("Evaluation dataset has no queries")]
    NoQueries,
    /// A query has no embedding available
    #[error("Missing embedding for query {0}")]
    MissingQueryEmbedding(String),
    /// Statistical test could not be computed
    #[error("Statistics error: {0}")]
    Stats(String),
}

impl From<candle_core::Error> for TrainingError {
    fn from(e: candle_core::Error) -> Self {
        TrainingError::Tensor(e.to_string())
    }
}
