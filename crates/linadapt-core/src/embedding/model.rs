//! Base embedding model inference.
//!
//! JinaBERT inference through the Candle ML framework. This is the frozen
//! base model: training never touches these weights, only the linear adapter
//! stacked on top of them.

use super::config::JinaBertConfig;
use super::traits::Embedder;
use crate::error::EmbeddingError;
use candle_core::{DType, Device, Module, Tensor};
use candle_nn::{Activation, VarBuilder};
use candle_transformers::models::jina_bert::{BertModel, Config, PositionEmbeddingType};
use tracing::info;

/// JinaBERT embedding model.
///
/// BERT-based encoder using ALiBi positional embeddings, designed for
/// semantic similarity tasks. Produces mean-pooled, optionally L2-normalized
/// sentence embeddings.
pub struct JinaBertEmbedder {
    model: BertModel,
    config: JinaBertConfig,
    device: Device,
}

impl JinaBertEmbedder {
    /// Creates a model from safetensors bytes.
    ///
    /// # Arguments
    ///
    /// * `model_bytes` - Safetensors-format model weights
    /// * `vocab_size` - Size of tokenizer vocabulary
    /// * `config` - Model configuration
    ///
    /// # Errors
    ///
    /// Returns `EmbeddingError::ModelLoad` if initialization fails.
    pub fn from_bytes(
        model_bytes: Vec<u8>,
        vocab_size: usize,
        config: JinaBertConfig,
    ) -> Result<Self, EmbeddingError> {
        info!("Loading embedding model '{}'", config.model_id);

        let device = Self::select_device();
        let model = Self::create_model(model_bytes, vocab_size, &config, &device)?;

        Ok(Self {
            model,
            config,
            device,
        })
    }

    /// Returns a reference to the config.
    pub fn config(&self) -> &JinaBertConfig {
        &self.config
    }

    /// Returns a reference to the compute device.
    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Selects the best available compute device: CUDA, then Metal, then CPU.
    pub fn select_device() -> Device {
        if let Ok(cuda) = Device::new_cuda(0) {
            info!("Using CUDA GPU");
            return cuda;
        }
        if let Ok(metal) = Device::new_metal(0) {
            info!("Using Metal GPU");
            return metal;
        }
        info!("Using CPU");
        Device::Cpu
    }

    /// Creates the BertModel from bytes and configuration.
    ///
    /// Weights are loaded as F32: candle's jina_bert hardcodes F32 for the
    /// ALiBi positional bias, so F16 weights would cause dtype mismatches.
    fn create_model(
        model_bytes: Vec<u8>,
        vocab_size: usize,
        config: &JinaBertConfig,
        device: &Device,
    ) -> Result<BertModel, EmbeddingError> {
        info!(
            "Config: {}d hidden, {} layers, {} heads",
            config.hidden_size, config.num_hidden_layers, config.num_attention_heads
        );

        let model_config = Config::new(
            vocab_size,
            config.hidden_size,
            config.num_hidden_layers,
            config.num_attention_heads,
            config.intermediate_size,
            Activation::Gelu,
            config.max_position_embeddings,
            2,     // type_vocab_size
            0.02,  // initializer_range
            1e-12, // layer_norm_eps
            0,     // pad_token_id
            PositionEmbeddingType::Alibi,
        );

        // A safetensors file starts with an 8-byte little-endian header size
        if model_bytes.len() < 8 {
            return Err(EmbeddingError::ModelLoad(
                "Model file too small".to_string(),
            ));
        }

        let vb = VarBuilder::from_buffered_safetensors(model_bytes, DType::F32, device)
            .map_err(|e| {
                EmbeddingError::ModelLoad(format!("Failed to create VarBuilder: {}", e))
            })?;

        let model = BertModel::new(vb, &model_config)
            .map_err(|e| EmbeddingError::ModelLoad(format!("Failed to create BertModel: {}", e)))?;

        Ok(model)
    }

    /// Applies mean pooling across the token dimension.
    fn mean_pool(embeddings: &Tensor, n_tokens: usize) -> Result<Tensor, EmbeddingError> {
        embeddings
            .sum(1)
            .map_err(|e| EmbeddingError::InferenceFailed(format!("Failed to sum: {}", e)))?
            .affine(1.0 / n_tokens as f64, 0.0)
            .map_err(|e| EmbeddingError::InferenceFailed(format!("Failed to affine: {}", e)))
    }

    /// Applies L2 normalization to create unit vectors.
    fn normalize_l2(v: &Tensor) -> Result<Tensor, EmbeddingError> {
        v.broadcast_div(
            &v.sqr()
                .map_err(|e| EmbeddingError::InferenceFailed(format!("Failed to square: {}", e)))?
                .sum_keepdim(1)
                .map_err(|e| EmbeddingError::InferenceFailed(format!("Failed to sum: {}", e)))?
                .sqrt()
                .map_err(|e| EmbeddingError::InferenceFailed(format!("Failed to sqrt: {}", e)))?,
        )
        .map_err(|e| EmbeddingError::InferenceFailed(format!("Failed to normalize: {}", e)))
    }

    /// Shared forward path: tokens tensor -> pooled (normalized) embeddings.
    fn forward_pooled(&self, token_ids: &Tensor) -> Result<Tensor, EmbeddingError> {
        let embeddings = self
            .model
            .forward(token_ids)
            .map_err(|e| EmbeddingError::InferenceFailed(format!("Forward pass failed: {}", e)))?;

        let (_n_sentence, n_tokens, _hidden) = embeddings
            .dims3()
            .map_err(|e| EmbeddingError::InferenceFailed(format!("Failed to get dims: {}", e)))?;

        let pooled = Self::mean_pool(&embeddings, n_tokens)?;

        if self.config.normalize_embeddings {
            Self::normalize_l2(&pooled)
        } else {
            Ok(pooled)
        }
    }
}

impl Embedder for JinaBertEmbedder {
    fn max_position_embeddings(&self) -> usize {
        self.config.max_position_embeddings
    }

    fn embedding_dim(&self) -> usize {
        self.config.hidden_size
    }

    fn embed_tokens(&self, token_ids: Vec<u32>) -> Result<Vec<f32>, EmbeddingError> {
        let token_ids_tensor = Tensor::from_vec(token_ids.clone(), token_ids.len(), &self.device)
            .map_err(|e| EmbeddingError::TensorCreation(format!("Failed to create tensor: {}", e)))?
            .unsqueeze(0)
            .map_err(|e| EmbeddingError::TensorCreation(format!("Failed to unsqueeze: {}", e)))?;

        let pooled = self.forward_pooled(&token_ids_tensor)?;

        pooled
            .squeeze(0)
            .map_err(|e| EmbeddingError::InferenceFailed(format!("Failed to squeeze: {}", e)))?
            .to_vec1::<f32>()
            .map_err(|e| {
                EmbeddingError::InferenceFailed(format!("Failed to convert to vec: {}", e))
            })
    }

    fn embed_batch_tokens(
        &self,
        batch_token_ids: Vec<Vec<u32>>,
    ) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if batch_token_ids.is_empty() {
            return Ok(vec![]);
        }

        let max_len = batch_token_ids
            .iter()
            .map(|ids| ids.len())
            .max()
            .unwrap_or(0);

        // Pad all sequences to max length with the pad token (0)
        let batch_size = batch_token_ids.len();
        let flat: Vec<u32> = batch_token_ids
            .iter()
            .flat_map(|ids| {
                let mut padded = ids.clone();
                padded.resize(max_len, 0);
                padded
            })
            .collect();

        let token_ids_tensor =
            Tensor::from_vec(flat, (batch_size, max_len), &self.device).map_err(|e| {
                EmbeddingError::TensorCreation(format!("Failed to create batch tensor: {}", e))
            })?;

        let pooled = self.forward_pooled(&token_ids_tensor)?;

        let mut result = Vec::with_capacity(batch_size);
        for i in 0..batch_size {
            let embedding = pooled
                .get(i)
                .map_err(|e| {
                    EmbeddingError::InferenceFailed(format!("Failed to get embedding {}: {}", i, e))
                })?
                .to_vec1::<f32>()
                .map_err(|e| {
                    EmbeddingError::InferenceFailed(format!("Failed to convert to vec: {}", e))
                })?;
            result.push(embedding);
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_load_invalid_bytes() {
        let config = JinaBertConfig::default();
        let result = JinaBertEmbedder::from_bytes(vec![1, 2, 3], 30528, config);
        assert!(matches!(result, Err(EmbeddingError::ModelLoad(_))));
    }
}
