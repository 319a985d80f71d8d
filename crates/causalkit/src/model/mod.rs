//! Causal model interface.
//!
//! [`CausalModel`] is the contract every uplift model fulfils: it carries a
//! [`ModelKind`] and a [`ModelConfig`], and offers `fit`, `predict`, `save`
//! and `load`. The provided method bodies fail with
//! [`ModelError::NotImplemented`]; concrete models override them.
//!
//! - [`BaseModel`]: kind and config only. Every operation is unimplemented.
//! - [`RandomForestUpliftModel`]: uplift random forest (KL classifier or
//!   variance regressor).
//!
//! # Example
//!
//! ```
//! use causalkit::model::{BaseModel, CausalModel, ModelConfig, ModelKind};
//! use ndarray::Array2;
//!
//! let config = ModelConfig::builder()
//!     .features(vec!["a".into(), "b".into()])
//!     .treatment_columns(vec!["t".into()])
//!     .response_column("y")
//!     .build();
//! let model = BaseModel::new(ModelKind::RandomForestClassifier, config);
//! assert_eq!(model.model_kind(), ModelKind::RandomForestClassifier);
//!
//! let columns: Vec<String> = ["a", "b", "t", "y"].iter().map(|s| s.to_string()).collect();
//! let data = Array2::<f32>::zeros((3, 4));
//! let err = model.predict(&columns, data.view()).unwrap_err();
//! assert!(err.is_not_implemented());
//! ```

mod config;
mod error;
mod forest;
mod meta;

use std::path::Path;

use ndarray::{Array2, ArrayView2};

pub use config::{ModelConfig, ModelConfigBuilder, ParamValue};
pub use error::ModelError;
pub use forest::RandomForestUpliftModel;
pub use meta::{ModelKind, ParseModelKindError};

// =============================================================================
// CausalModel
// =============================================================================

/// Operations shared by all causal models.
///
/// `columns` names the columns of `data` in order. Only columns that are also
/// listed in `config().features` are used as features.
pub trait CausalModel {
    /// Model family, fixed at construction.
    fn model_kind(&self) -> ModelKind;

    fn config(&self) -> &ModelConfig;

    fn config_mut(&mut self) -> &mut ModelConfig;

    /// Train on `data` (rows x columns).
    fn fit(&mut self, _columns: &[String], _data: ArrayView2<'_, f32>) -> Result<(), ModelError> {
        Err(ModelError::not_implemented("fit"))
    }

    /// Uplift per record and treated arm: shape `(n_rows, n_treatments)`.
    fn predict(
        &self,
        _columns: &[String],
        _data: ArrayView2<'_, f32>,
    ) -> Result<Array2<f32>, ModelError> {
        Err(ModelError::not_implemented("predict"))
    }

    /// Persist the fitted model.
    fn save(&self, _path: &Path) -> Result<(), ModelError> {
        Err(ModelError::not_implemented("save"))
    }

    /// Restore a model written by [`save`](Self::save).
    fn load(_path: &Path) -> Result<Self, ModelError>
    where
        Self: Sized,
    {
        Err(ModelError::not_implemented("load"))
    }
}

// =============================================================================
// BaseModel
// =============================================================================

/// Model with a kind and config but no algorithm.
#[derive(Debug, Clone, PartialEq)]
pub struct BaseModel {
    kind: ModelKind,
    pub config: ModelConfig,
}

impl BaseModel {
    /// Store `kind` and `config` as given.
    pub fn new(kind: ModelKind, config: ModelConfig) -> Self {
        Self { kind, config }
    }
}

impl CausalModel for BaseModel {
    fn model_kind(&self) -> ModelKind {
        self.kind
    }

    fn config(&self) -> &ModelConfig {
        &self.config
    }

    fn config_mut(&mut self) -> &mut ModelConfig {
        &mut self.config
    }
}
