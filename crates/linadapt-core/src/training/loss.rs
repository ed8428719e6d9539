//! Contrastive loss for adapter training.
//!
//! Implements the multiple-negatives ranking loss (InfoNCE with in-batch
//! negatives): each query pairs with its own context as the positive, and
//! every other context in the batch serves as a free negative.
//!
//! L = -log(exp(sim(q_i, c_i)/τ) / Σ_j exp(sim(q_i, c_j)/τ))

use crate::config::DEFAULT_TEMPERATURE;
use crate::error::TrainingError;
use candle_core::Tensor;

/// Multiple-negatives ranking loss over a batch of query/context embeddings.
#[derive(Debug, Clone)]
pub struct MultipleNegativesLoss {
    /// Softmax temperature: lower values sharpen the distribution
    temperature: f64,
}

impl Default for MultipleNegativesLoss {
    fn default() -> Self {
        Self {
            temperature: DEFAULT_TEMPERATURE,
        }
    }
}

impl MultipleNegativesLoss {
    /// Creates a loss with the given temperature.
    pub fn new(temperature: f64) -> Self {
        Self { temperature }
    }

    /// Returns the configured temperature.
    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    /// Computes the loss for a batch.
    ///
    /// # Arguments
    ///
    /// * `queries` - Query embeddings `[N, D]`, L2-normalized
    /// * `contexts` - Context embeddings `[N, D]`, L2-normalized, where
    ///   `contexts[i]` is the positive for `queries[i]`
    ///
    /// Returns a scalar loss tensor with gradients attached to `queries`.
    ///
    /// # Errors
    ///
    /// Returns `TrainingError::Tensor` if the shapes disagree or the batch
    /// is empty.
    pub fn forward(&self, queries: &Tensor, contexts: &Tensor) -> Result<Tensor, TrainingError> {
        let (n, d) = queries
            .dims2()
            .map_err(|e| TrainingError::Tensor(format!("Query batch must be 2D: {}", e)))?;
        let (cn, cd) = contexts
            .dims2()
            .map_err(|e| TrainingError::Tensor(format!("Context batch must be 2D: {}", e)))?;
        if n != cn || d != cd {
            return Err(TrainingError::Tensor(format!(
                "Shape mismatch: queries [{}, {}] vs contexts [{}, {}]",
                n, d, cn, cd
            )));
        }
        if n == 0 {
            return Err(TrainingError::Tensor("Empty batch".to_string()));
        }

        // Similarity matrix [N, N]: sim[i][j] = q_i . c_j / τ
        let logits = queries
            .matmul(&contexts.t()?)?
            .affine(1.0 / self.temperature, 0.0)?;

        // The positive for row i sits on the diagonal
        let labels = Tensor::arange(0u32, n as u32, queries.device())?;

        let loss = candle_nn::loss::cross_entropy(&logits, &labels)?;
        Ok(loss)
    }
}

/// L2-normalizes each row of a `[N, D]` tensor.
///
/// Cosine similarity reduces to a dot product over normalized rows, which is
/// what [`MultipleNegativesLoss::forward`] assumes.
pub fn normalize_rows(embeddings: &Tensor) -> Result<Tensor, TrainingError> {
    let norms = embeddings.sqr()?.sum_keepdim(1)?.sqrt()?;
    let normalized = embeddings.broadcast_div(&norms)?;
    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::{DType, Device};

    fn scalar(t: &Tensor) -> f32 {
        t.to_dtype(DType::F32)
            .unwrap()
            .to_scalar::<f32>()
            .unwrap()
    }

    #[test]
    fn test_loss_lower_for_aligned_pairs() {
        let device = Device::Cpu;
        let loss_fn = MultipleNegativesLoss::default();

        // Orthonormal queries matching their own contexts exactly
        let aligned = Tensor::from_slice(
            &[1.0f32, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0],
            (3, 3),
            &device,
        )
        .unwrap();
        let aligned_loss = scalar(&loss_fn.forward(&aligned, &aligned).unwrap());

        // Queries matching the wrong contexts (rows rotated by one)
        let rotated = Tensor::from_slice(
            &[0.0f32, 1.0, 0.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0],
            (3, 3),
            &device,
        )
        .unwrap();
        let misaligned_loss = scalar(&loss_fn.forward(&rotated, &aligned).unwrap());

        assert!(
            aligned_loss < misaligned_loss,
            "aligned {} should beat misaligned {}",
            aligned_loss,
            misaligned_loss
        );
        // Perfectly separated pairs at τ=0.05 drive the loss near zero
        assert!(aligned_loss < 0.01);
    }

    #[test]
    fn test_loss_shape_mismatch() {
        let device = Device::Cpu;
        let loss_fn = MultipleNegativesLoss::default();

        let q = Tensor::zeros((2, 4), DType::F32, &device).unwrap();
        let c = Tensor::zeros((3, 4), DType::F32, &device).unwrap();
        let result = loss_fn.forward(&q, &c);
        assert!(matches!(result, Err(TrainingError::Tensor(_))));
    }

    #[test]
    fn test_loss_requires_2d() {
        let device = Device::Cpu;
        let loss_fn = MultipleNegativesLoss::default();

        let q = Tensor::zeros(4, DType::F32, &device).unwrap();
        let result = loss_fn.forward(&q, &q);
        assert!(matches!(result, Err(TrainingError::Tensor(_))));
    }

    #[test]
    fn test_normalize_rows_unit_norm() {
        let device = Device::Cpu;
        let t = Tensor::from_slice(&[3.0f32, 4.0, 0.0, 5.0, 0.0, 12.0], (2, 3), &device).unwrap();
        let normalized = normalize_rows(&t).unwrap();

        let rows = normalized.to_vec2::<f32>().unwrap();
        for row in rows {
            let norm: f32 = row.iter().map(|x| x * x).sum::<f32>().sqrt();
            assert!((norm - 1.0).abs() < 1e-5, "row norm {}", norm);
        }
    }

    #[test]
    fn test_random_batch_loss_near_uniform() {
        let device = Device::Cpu;
        let loss_fn = MultipleNegativesLoss::new(1.0);
        let n = 4;

        // Identical rows: every context is equally similar to every query,
        // so the softmax is uniform and the loss is ln(N)
        let ones = Tensor::ones((n, 3), DType::F32, &device).unwrap();
        let normalized = normalize_rows(&ones).unwrap();
        let loss = scalar(&loss_fn.forward(&normalized, &normalized).unwrap());
        assert!((loss - (n as f32).ln()).abs() < 1e-4, "loss {}", loss);
    }
}
