//! Adapter training loop.
//!
//! The base embedding model stays frozen: query and context texts are
//! embedded once up front, and each epoch only runs the (cheap) adapter
//! forward pass over shuffled batches of those cached embeddings. Only the
//! adapter's weight and bias receive gradient updates.

use super::loss::{normalize_rows, MultipleNegativesLoss};
use crate::config::{
    DEFAULT_BATCH_SIZE, DEFAULT_EPOCHS, DEFAULT_LEARNING_RATE, DEFAULT_TEMPERATURE,
};
use crate::embedding::LinearAdapter;
use crate::error::TrainingError;
use candle_core::Tensor;
use candle_nn::{AdamW, Optimizer, ParamsAdamW};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::path::PathBuf;
use tracing::{debug, info};

/// Training hyperparameters.
#[derive(Debug, Clone)]
pub struct TrainerConfig {
    /// Number of passes over the training pairs
    pub epochs: usize,
    /// Pairs per batch (also the number of in-batch negatives + 1)
    pub batch_size: usize,
    /// AdamW learning rate
    pub learning_rate: f64,
    /// Loss temperature
    pub temperature: f64,
    /// Seed for batch shuffling
    pub seed: u64,
    /// If set, adapter weights are saved here after every epoch
    pub checkpoint_dir: Option<PathBuf>,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            epochs: DEFAULT_EPOCHS,
            batch_size: DEFAULT_BATCH_SIZE,
            learning_rate: DEFAULT_LEARNING_RATE,
            temperature: DEFAULT_TEMPERATURE,
            seed: 42,
            checkpoint_dir: None,
        }
    }
}

/// Per-epoch training statistics.
#[derive(Debug, Clone)]
pub struct EpochStats {
    /// Epoch number (0-based)
    pub epoch: usize,
    /// Mean loss over the epoch's batches
    pub mean_loss: f32,
    /// Number of batches stepped
    pub batches: usize,
}

/// Runs contrastive fine-tuning of a [`LinearAdapter`].
pub struct AdapterTrainer {
    config: TrainerConfig,
    loss_fn: MultipleNegativesLoss,
}

impl AdapterTrainer {
    /// Creates a trainer with the given configuration.
    pub fn new(config: TrainerConfig) -> Self {
        let loss_fn = MultipleNegativesLoss::new(config.temperature);
        Self { config, loss_fn }
    }

    /// Returns the trainer configuration.
    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    /// Trains the adapter on precomputed base embeddings.
    ///
    /// `query_embeddings[i]` and `context_embeddings[i]` must be the base
    /// model's embeddings for the i-th training pair. The adapter is applied
    /// to queries only; contexts stay in base embedding space.
    ///
    /// Trailing batches of size 1 are skipped (a single pair has no in-batch
    /// negatives). `progress` is invoked after each completed epoch.
    ///
    /// # Errors
    ///
    /// Returns `TrainingError::EmptyDataset` if fewer than two pairs are
    /// provided, `TrainingError::Tensor` on shape mismatches.
    pub fn train(
        &self,
        adapter: &mut LinearAdapter,
        query_embeddings: &[Vec<f32>],
        context_embeddings: &[Vec<f32>],
        mut progress: impl FnMut(&EpochStats),
    ) -> Result<Vec<EpochStats>, TrainingError> {
        if query_embeddings.len() != context_embeddings.len() {
            return Err(TrainingError::Tensor(format!(
                "Pair count mismatch: {} queries vs {} contexts",
                query_embeddings.len(),
                context_embeddings.len()
            )));
        }
        let n = query_embeddings.len();
        if n < 2 {
            return Err(TrainingError::EmptyDataset);
        }

        let device = adapter.device().clone();
        let dim = adapter.dim();
        let queries = to_tensor(query_embeddings, dim, &device)?;
        let contexts = to_tensor(context_embeddings, dim, &device)?;

        // Contexts are frozen, so normalize them once outside the loop
        let contexts = normalize_rows(&contexts)?;

        let mut optimizer = AdamW::new(
            adapter.trainable_vars(),
            ParamsAdamW {
                lr: self.config.learning_rate,
                ..Default::default()
            },
        )?;

        info!(
            "Training adapter: {} pairs, {} epochs, batch size {}, lr {}",
            n, self.config.epochs, self.config.batch_size, self.config.learning_rate
        );

        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let mut indices: Vec<u32> = (0..n as u32).collect();
        let mut history = Vec::with_capacity(self.config.epochs);

        for epoch in 0..self.config.epochs {
            indices.shuffle(&mut rng);

            let mut total_loss = 0.0f32;
            let mut batches = 0usize;

            for batch_indices in indices.chunks(self.config.batch_size.max(2)) {
                // A batch of one pair has no negatives to contrast against
                if batch_indices.len() < 2 {
                    debug!("Skipping trailing batch of 1 in epoch {}", epoch);
                    continue;
                }

                let idx =
                    Tensor::from_slice(batch_indices, batch_indices.len(), &device)?;
                let query_batch = queries.index_select(&idx, 0)?;
                let context_batch = contexts.index_select(&idx, 0)?;

                let projected = adapter.forward(&query_batch)?;
                let projected = normalize_rows(&projected)?;

                let loss = self.loss_fn.forward(&projected, &context_batch)?;
                optimizer.backward_step(&loss)?;

                total_loss += loss.to_scalar::<f32>()?;
                batches += 1;
            }

            if batches == 0 {
                return Err(TrainingError::EmptyDataset);
            }

            let stats = EpochStats {
                epoch,
                mean_loss: total_loss / batches as f32,
                batches,
            };
            info!(
                "Epoch {}/{}: mean loss {:.4} over {} batches",
                epoch + 1,
                self.config.epochs,
                stats.mean_loss,
                stats.batches
            );

            if let Some(dir) = &self.config.checkpoint_dir {
                let path = dir.join(format!("adapter-epoch-{}.safetensors", epoch));
                adapter
                    .save(&path)
                    .map_err(|e| TrainingError::Checkpoint(e.to_string()))?;
            }

            progress(&stats);
            history.push(stats);
        }

        Ok(history)
    }
}

/// Stacks `[N]` embedding vectors into an `[N, dim]` tensor.
fn to_tensor(
    embeddings: &[Vec<f32>],
    dim: usize,
    device: &candle_core::Device,
) -> Result<Tensor, TrainingError> {
    let n = embeddings.len();
    let mut flat = Vec::with_capacity(n * dim);
    for (i, embedding) in embeddings.iter().enumerate() {
        if embedding.len() != dim {
            return Err(TrainingError::Tensor(format!(
                "Embedding {} has dimension {}, expected {}",
                i,
                embedding.len(),
                dim
            )));
        }
        flat.extend_from_slice(embedding);
    }
    let tensor = Tensor::from_vec(flat, (n, dim), device)?;
    Ok(tensor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::Device;

    /// Toy pairs where queries are a fixed permutation of their contexts, so
    /// a linear map (the inverse permutation) can solve the task exactly.
    fn toy_pairs(n: usize, dim: usize) -> (Vec<Vec<f32>>, Vec<Vec<f32>>) {
        let mut queries = Vec::with_capacity(n);
        let mut contexts = Vec::with_capacity(n);
        for i in 0..n {
            let mut context = vec![0.0f32; dim];
            context[i % dim] = 1.0;
            context[(i + 1) % dim] = 0.3;
            let mut query = vec![0.0f32; dim];
            // Coordinates rotated by one relative to the context
            for j in 0..dim {
                query[(j + 1) % dim] = context[j];
            }
            queries.push(query);
            contexts.push(context);
        }
        (queries, contexts)
    }

    #[test]
    fn test_training_reduces_loss() {
        let device = Device::Cpu;
        let mut adapter = LinearAdapter::identity(4, &device).unwrap();
        let (queries, contexts) = toy_pairs(8, 4);

        let trainer = AdapterTrainer::new(TrainerConfig {
            epochs: 30,
            batch_size: 8,
            learning_rate: 0.05,
            ..Default::default()
        });

        let history = trainer
            .train(&mut adapter, &queries, &contexts, |_| {})
            .unwrap();

        assert_eq!(history.len(), 30);
        let first = history.first().unwrap().mean_loss;
        let last = history.last().unwrap().mean_loss;
        assert!(
            last < first,
            "loss should decrease: first {} last {}",
            first,
            last
        );
    }

    #[test]
    fn test_train_rejects_single_pair() {
        let device = Device::Cpu;
        let mut adapter = LinearAdapter::identity(4, &device).unwrap();
        let (queries, contexts) = toy_pairs(1, 4);

        let trainer = AdapterTrainer::new(TrainerConfig::default());
        let result = trainer.train(&mut adapter, &queries, &contexts, |_| {});
        assert!(matches!(result, Err(TrainingError::EmptyDataset)));
    }

    #[test]
    fn test_train_rejects_mismatched_pairs() {
        let device = Device::Cpu;
        let mut adapter = LinearAdapter::identity(4, &device).unwrap();
        let (queries, _) = toy_pairs(4, 4);
        let (_, contexts) = toy_pairs(3, 4);

        let trainer = AdapterTrainer::new(TrainerConfig::default());
        let result = trainer.train(&mut adapter, &queries, &contexts, |_| {});
        assert!(matches!(result, Err(TrainingError::Tensor(_))));
    }

    #[test]
    fn test_train_rejects_wrong_dimension() {
        let device = Device::Cpu;
        let mut adapter = LinearAdapter::identity(8, &device).unwrap();
        let (queries, contexts) = toy_pairs(4, 4);

        let trainer = AdapterTrainer::new(TrainerConfig::default());
        let result = trainer.train(&mut adapter, &queries, &contexts, |_| {});
        assert!(matches!(result, Err(TrainingError::Tensor(_))));
    }

    #[test]
    fn test_checkpoints_written_per_epoch() {
        let device = Device::Cpu;
        let dir = tempfile::tempdir().unwrap();
        let mut adapter = LinearAdapter::identity(4, &device).unwrap();
        let (queries, contexts) = toy_pairs(4, 4);

        let trainer = AdapterTrainer::new(TrainerConfig {
            epochs: 2,
            checkpoint_dir: Some(dir.path().to_path_buf()),
            ..Default::default()
        });
        trainer
            .train(&mut adapter, &queries, &contexts, |_| {})
            .unwrap();

        assert!(dir.path().join("adapter-epoch-0.safetensors").exists());
        assert!(dir.path().join("adapter-epoch-1.safetensors").exists());
    }

    #[test]
    fn test_epoch_progress_callback() {
        let device = Device::Cpu;
        let mut adapter = LinearAdapter::identity(4, &device).unwrap();
        let (queries, contexts) = toy_pairs(4, 4);

        let trainer = AdapterTrainer::new(TrainerConfig {
            epochs: 3,
            ..Default::default()
        });
        let mut seen = Vec::new();
        trainer
            .train(&mut adapter, &queries, &contexts, |stats| {
                seen.push(stats.epoch);
            })
            .unwrap();
        assert_eq!(seen, vec![0, 1, 2]);
    }
}
