//! Contrastive fine-tuning of the linear adapter.
//!
//! - [`MultipleNegativesLoss`] - InfoNCE loss with in-batch negatives
//! - [`AdapterTrainer`] - Epoch loop over cached base embeddings
//! - [`TrainerConfig`] - Hyperparameters with sane defaults

pub mod loss;
pub mod trainer;

pub use loss::{normalize_rows, MultipleNegativesLoss};
pub use trainer::{AdapterTrainer, EpochStats, TrainerConfig};
