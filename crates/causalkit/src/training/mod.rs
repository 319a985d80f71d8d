//! Uplift forest training.
//!
//! # Layout
//!
//! - [`params`]: typed hyperparameters read from the model config
//! - [`sampling`]: bootstrap rows, per-node features, per-tree RNG
//! - [`partition`]: row index buffer split per node
//! - [`histogram`]: per-arm bin statistics
//! - [`criterion`]: KL (classifier) and variance (regressor) split rules
//! - [`grower`]: grows one tree
//! - [`trainer`]: grows the forest, optionally in parallel

pub mod criterion;
pub mod grower;
pub mod histogram;
mod logger;
pub mod params;
pub mod partition;
pub mod sampling;
pub mod trainer;

pub use criterion::{KlCriterion, SplitCriterion, SplitGain, VarianceCriterion};
pub use grower::TreeGrower;
pub use logger::{TrainingLogger, Verbosity};
pub use params::{ConfigError, ForestParams};
pub use trainer::ForestTrainer;
