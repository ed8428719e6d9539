//! Linear adapter over a frozen base embedding model.
//!
//! The adapter is a single `dim x dim` linear layer (weight + bias) applied
//! to query embeddings. It is initialized to the identity so an untrained
//! adapter reproduces the base model exactly, and fine-tuning only has to
//! learn a delta from there.
//!
//! The weights live in a [`candle_nn::VarMap`], which makes the same layer
//! trainable (the optimizer steps the map's `Var`s) and serializable
//! (safetensors save/load) without any conversion step.

use super::traits::Embedder;
use crate::error::EmbeddingError;
use candle_core::{DType, Device, Module, Tensor, Var};
use candle_nn::{Linear, VarBuilder, VarMap};
use std::path::Path;
use tracing::info;

/// Variable names inside the adapter's VarMap / safetensors file.
const WEIGHT_NAME: &str = "adapter.weight";
const BIAS_NAME: &str = "adapter.bias";

/// Trainable linear projection from base embedding space to the task space.
pub struct LinearAdapter {
    varmap: VarMap,
    linear: Linear,
    dim: usize,
    device: Device,
}

impl LinearAdapter {
    /// Creates an identity-initialized adapter (weight = I, bias = 0).
    ///
    /// # Errors
    ///
    /// Returns `EmbeddingError::TensorCreation` if the variables cannot be
    /// allocated on the device.
    pub fn identity(dim: usize, device: &Device) -> Result<Self, EmbeddingError> {
        let adapter = Self::zeroed(dim, device)?;

        let eye = Tensor::eye(dim, DType::F32, device)
            .map_err(|e| EmbeddingError::TensorCreation(e.to_string()))?;
        adapter
            .var(WEIGHT_NAME)?
            .set(&eye)
            .map_err(|e| EmbeddingError::TensorCreation(e.to_string()))?;

        Ok(adapter)
    }

    /// Loads adapter weights from a safetensors file.
    ///
    /// # Errors
    ///
    /// Returns `EmbeddingError::ModelLoad` if the file cannot be read or the
    /// stored shapes do not match `dim`.
    pub fn load<P: AsRef<Path>>(
        path: P,
        dim: usize,
        device: &Device,
    ) -> Result<Self, EmbeddingError> {
        let mut adapter = Self::zeroed(dim, device)?;
        adapter
            .varmap
            .load(path.as_ref())
            .map_err(|e| EmbeddingError::ModelLoad(format!("Failed to load adapter: {}", e)))?;
        info!("Loaded adapter weights from {}", path.as_ref().display());

        // Rebuild the Linear from the freshly loaded vars
        adapter.linear = Self::build_linear(&adapter.varmap, dim, device)?;
        Ok(adapter)
    }

    /// Saves adapter weights to a safetensors file.
    ///
    /// # Errors
    ///
    /// Returns `EmbeddingError::ModelLoad` if serialization fails.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), EmbeddingError> {
        self.varmap
            .save(path.as_ref())
            .map_err(|e| EmbeddingError::ModelLoad(format!("Failed to save adapter: {}", e)))?;
        info!("Saved adapter weights to {}", path.as_ref().display());
        Ok(())
    }

    /// Returns the adapter dimension.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Returns the device the adapter lives on.
    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Returns the trainable variables for the optimizer.
    pub fn trainable_vars(&self) -> Vec<Var> {
        self.varmap.all_vars()
    }

    /// Projects a batch of embeddings `[N, dim] -> [N, dim]`.
    ///
    /// Gradients flow back to the adapter's variables, so this is the
    /// forward pass used during training as well as at inference.
    pub fn forward(&self, embeddings: &Tensor) -> Result<Tensor, EmbeddingError> {
        self.linear
            .forward(embeddings)
            .map_err(|e| EmbeddingError::InferenceFailed(format!("Adapter forward: {}", e)))
    }

    /// Projects a single embedding vector.
    ///
    /// # Errors
    ///
    /// Returns `EmbeddingError::DimensionMismatch` if the input length does
    /// not match the adapter dimension.
    pub fn project(&self, embedding: &[f32]) -> Result<Vec<f32>, EmbeddingError> {
        if embedding.len() != self.dim {
            return Err(EmbeddingError::DimensionMismatch {
                expected: self.dim,
                actual: embedding.len(),
            });
        }

        let input = Tensor::from_slice(embedding, (1, self.dim), &self.device)
            .map_err(|e| EmbeddingError::TensorCreation(e.to_string()))?;
        let output = self.forward(&input)?;

        output
            .squeeze(0)
            .map_err(|e| EmbeddingError::InferenceFailed(e.to_string()))?
            .to_vec1::<f32>()
            .map_err(|e| EmbeddingError::InferenceFailed(e.to_string()))
    }

    /// Allocates a zero-initialized adapter (weights overwritten by
    /// `identity` or `load`).
    fn zeroed(dim: usize, device: &Device) -> Result<Self, EmbeddingError> {
        let varmap = VarMap::new();
        let map_err = |e: candle_core::Error| EmbeddingError::TensorCreation(e.to_string());

        varmap
            .get((dim, dim), WEIGHT_NAME, candle_nn::init::ZERO, DType::F32, device)
            .map_err(map_err)?;
        varmap
            .get(dim, BIAS_NAME, candle_nn::init::ZERO, DType::F32, device)
            .map_err(map_err)?;

        let linear = Self::build_linear(&varmap, dim, device)?;

        Ok(Self {
            varmap,
            linear,
            dim,
            device: device.clone(),
        })
    }

    /// Builds the Linear layer view over the VarMap's variables.
    fn build_linear(
        varmap: &VarMap,
        dim: usize,
        device: &Device,
    ) -> Result<Linear, EmbeddingError> {
        let vb = VarBuilder::from_varmap(varmap, DType::F32, device);
        let weight = vb
            .get((dim, dim), WEIGHT_NAME)
            .map_err(|e| EmbeddingError::TensorCreation(e.to_string()))?;
        let bias = vb
            .get(dim, BIAS_NAME)
            .map_err(|e| EmbeddingError::TensorCreation(e.to_string()))?;
        Ok(Linear::new(weight, Some(bias)))
    }

    /// Looks up a variable by name in the VarMap.
    fn var(&self, name: &str) -> Result<Var, EmbeddingError> {
        let data = self
            .varmap
            .data()
            .lock()
            .map_err(|_| EmbeddingError::TensorCreation("VarMap lock poisoned".to_string()))?;
        data.get(name).cloned().ok_or_else(|| {
            EmbeddingError::TensorCreation(format!("Missing adapter variable {}", name))
        })
    }
}

/// Base embedder plus adapter, presented as a single [`Embedder`].
///
/// This is the "fine-tuned model" at evaluation time: query texts go through
/// the base model, then the adapter projection. The adapter applies to query
/// embeddings only; callers embed documents with the base model directly.
pub struct AdaptedEmbedder<E: Embedder> {
    base: E,
    adapter: LinearAdapter,
}

impl<E: Embedder> AdaptedEmbedder<E> {
    /// Wraps a base embedder with an adapter.
    ///
    /// # Errors
    ///
    /// Returns `EmbeddingError::DimensionMismatch` if the adapter dimension
    /// doesn't match the base model's embedding dimension.
    pub fn new(base: E, adapter: LinearAdapter) -> Result<Self, EmbeddingError> {
        if base.embedding_dim() != adapter.dim() {
            return Err(EmbeddingError::DimensionMismatch {
                expected: base.embedding_dim(),
                actual: adapter.dim(),
            });
        }
        Ok(Self { base, adapter })
    }

    /// Returns a reference to the wrapped adapter.
    pub fn adapter(&self) -> &LinearAdapter {
        &self.adapter
    }
}

impl<E: Embedder> Embedder for AdaptedEmbedder<E> {
    fn max_position_embeddings(&self) -> usize {
        self.base.max_position_embeddings()
    }

    fn embedding_dim(&self) -> usize {
        self.base.embedding_dim()
    }

    fn embed_tokens(&self, token_ids: Vec<u32>) -> Result<Vec<f32>, EmbeddingError> {
        let base_embedding = self.base.embed_tokens(token_ids)?;
        self.adapter.project(&base_embedding)
    }

    fn embed_batch_tokens(
        &self,
        batch_token_ids: Vec<Vec<u32>>,
    ) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let base = self.base.embed_batch_tokens(batch_token_ids)?;
        base.iter().map(|e| self.adapter.project(e)).collect()
    }
}
