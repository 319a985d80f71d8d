//! Error type shared by all causal models.

use thiserror::Error;

use super::ModelKind;
use crate::io::native::{DeserializeError, SerializeError};
use crate::training::ConfigError;

/// Errors returned by [`CausalModel`](super::CausalModel) operations.
#[derive(Debug, Error)]
pub enum ModelError {
    /// The operation has no implementation for this model.
    #[error("{operation} is not implemented for this model")]
    NotImplemented { operation: &'static str },

    /// `predict` or `save` was called before `fit`.
    #[error("model has not been fitted")]
    NotFitted,

    /// Hyperparameters or column roles are invalid.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// A configured column does not appear in the input column names.
    #[error("column '{0}' not found in input")]
    MissingColumn(String),

    /// The number of column names does not match the data width.
    #[error("got {names} column names for data with {width} columns")]
    ShapeMismatch { names: usize, width: usize },

    #[error("cannot fit on an empty dataset")]
    EmptyData,

    #[error("invalid treatment value {value} in row {row}: expected an integer in 0..=255")]
    InvalidTreatment { row: usize, value: f32 },

    #[error("invalid response value {value} in row {row}")]
    InvalidResponse { row: usize, value: f32 },

    #[error("invalid weight {value} in row {row}: expected a finite non-negative number")]
    InvalidWeight { row: usize, value: f32 },

    /// Training data must contain a control arm and at least one treated arm.
    #[error("need at least 2 treatment arms, found {0}")]
    TooFewArms(usize),

    /// A saved model of a different kind was loaded.
    #[error("model kind mismatch: expected {expected}, found {actual}")]
    KindMismatch { expected: ModelKind, actual: ModelKind },

    #[error(transparent)]
    Serialize(#[from] SerializeError),

    #[error(transparent)]
    Deserialize(#[from] DeserializeError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to build thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl ModelError {
    pub(crate) fn not_implemented(operation: &'static str) -> Self {
        Self::NotImplemented { operation }
    }

    /// Returns true for [`ModelError::NotImplemented`].
    pub fn is_not_implemented(&self) -> bool {
        matches!(self, Self::NotImplemented { .. })
    }
}
