//! Remote embedding client for OpenAI-compatible `/v1/embeddings` endpoints.
//!
//! Used as a reference model in evaluation runs: the same queries and corpus
//! get embedded by a hosted model so its retrieval quality can be compared
//! against the local base model and the fine-tuned adapter.

use crate::error::EmbeddingError;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Global HTTP client for connection pooling.
///
/// reqwest::Client handles connection pooling internally, so reusing a single
/// client across requests is much more efficient than creating one per
/// request. Embedding runs make hundreds of calls to the same host.
static HTTP_CLIENT: Lazy<reqwest::Client> = Lazy::new(|| {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(60))
        .pool_max_idle_per_host(10)
        .build()
        .expect("Failed to build HTTP client")
});

/// Maximum texts per embeddings request.
const BATCH_SIZE: usize = 64;

#[derive(Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

/// Client for an OpenAI-compatible embeddings endpoint.
pub struct RemoteEmbedder {
    base_url: String,
    api_key: String,
    model: String,
}

impl RemoteEmbedder {
    /// Creates a client for the given endpoint and model.
    ///
    /// `base_url` is the API root (e.g. `https://api.openai.com`); the
    /// `/v1/embeddings` path is appended per request.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    /// Creates a client for the OpenAI API, reading the key from
    /// `OPENAI_API_KEY`.
    ///
    /// # Errors
    ///
    /// Returns `EmbeddingError::InvalidConfig` if the variable is unset.
    pub fn openai(model: impl Into<String>) -> Result<Self, EmbeddingError> {
        let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| {
            EmbeddingError::InvalidConfig("OPENAI_API_KEY environment variable not set".to_string())
        })?;
        Ok(Self::new("https://api.openai.com", api_key, model))
    }

    /// Returns the model identifier used in requests.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Embeds a single text.
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut embeddings = self.embed_batch(&[text.to_string()]).await?;
        embeddings
            .pop()
            .ok_or_else(|| EmbeddingError::RemoteRequest("Empty embeddings response".to_string()))
    }

    /// Embeds a list of texts, preserving input order.
    ///
    /// Requests are issued in batches of [`BATCH_SIZE`].
    ///
    /// # Errors
    ///
    /// Returns `EmbeddingError::RemoteRequest` on transport failures,
    /// non-success status codes, or responses that don't cover every input.
    pub async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut results = Vec::with_capacity(texts.len());
        for batch in texts.chunks(BATCH_SIZE) {
            results.extend(self.request_batch(batch).await?);
        }
        Ok(results)
    }

    async fn request_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let url = format!("{}/v1/embeddings", self.base_url);
        debug!("Requesting {} embeddings from {}", texts.len(), url);

        let response = HTTP_CLIENT
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&EmbeddingsRequest {
                model: &self.model,
                input: texts,
            })
            .send()
            .await
            .map_err(|e| EmbeddingError::RemoteRequest(format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::RemoteRequest(format!(
                "Embeddings request returned {}: {}",
                status, body
            )));
        }

        let parsed: EmbeddingsResponse = response
            .json()
            .await
            .map_err(|e| EmbeddingError::RemoteRequest(format!("Invalid response: {}", e)))?;

        if parsed.data.len() != texts.len() {
            return Err(EmbeddingError::RemoteRequest(format!(
                "Expected {} embeddings, got {}",
                texts.len(),
                parsed.data.len()
            )));
        }

        // Output order follows the declared index field, not response order
        let mut data = parsed.data;
        data.sort_by_key(|d| d.index);
        Ok(data.into_iter().map(|d| d.embedding).collect())
    }
}
