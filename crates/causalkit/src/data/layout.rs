//! Resolution of configured column roles against input column names.

use std::collections::HashMap;

use crate::model::{ModelConfig, ModelError};
use crate::training::ConfigError;

/// Positions of each role inside the input columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnLayout {
    /// One position per configured feature, in config order.
    pub features: Vec<usize>,
    pub treatment: Option<usize>,
    pub response: Option<usize>,
    pub weight: Option<usize>,
}

impl ColumnLayout {
    /// Layout for prediction: only feature columns are required.
    ///
    /// Treatment, response and weight columns are ignored even when present.
    pub fn for_prediction(
        config: &ModelConfig,
        columns: &[String],
        width: usize,
    ) -> Result<Self, ModelError> {
        let index = Self::index(columns, width)?;
        Ok(Self {
            features: Self::features(config, &index)?,
            treatment: None,
            response: None,
            weight: None,
        })
    }

    /// Layout for training: features, one treatment and a response are required,
    /// and the weight column too when one is configured.
    pub fn for_training(
        config: &ModelConfig,
        columns: &[String],
        width: usize,
    ) -> Result<Self, ModelError> {
        let index = Self::index(columns, width)?;

        let treatment = match config.treatment_columns.as_slice() {
            [only] => Self::require(&index, only)?,
            other => return Err(ConfigError::TreatmentColumns(other.len()).into()),
        };
        if config.response_column.is_empty() {
            return Err(ConfigError::MissingResponse.into());
        }
        let response = Self::require(&index, &config.response_column)?;
        let weight = if config.has_weight() {
            Some(Self::require(&index, &config.weight_column)?)
        } else {
            None
        };

        Ok(Self {
            features: Self::features(config, &index)?,
            treatment: Some(treatment),
            response: Some(response),
            weight,
        })
    }

    fn index(columns: &[String], width: usize) -> Result<HashMap<&str, usize>, ModelError> {
        if columns.len() != width {
            return Err(ModelError::ShapeMismatch {
                names: columns.len(),
                width,
            });
        }
        // First occurrence wins on duplicate names.
        let mut index = HashMap::with_capacity(columns.len());
        for (pos, name) in columns.iter().enumerate() {
            index.entry(name.as_str()).or_insert(pos);
        }
        Ok(index)
    }

    fn features(config: &ModelConfig, index: &HashMap<&str, usize>) -> Result<Vec<usize>, ModelError> {
        if config.features.is_empty() {
            return Err(ConfigError::NoFeatures.into());
        }
        config
            .features
            .iter()
            .map(|name| Self::require(index, name))
            .collect()
    }

    fn require(index: &HashMap<&str, usize>, name: &str) -> Result<usize, ModelError> {
        index
            .get(name)
            .copied()
            .ok_or_else(|| ModelError::MissingColumn(name.to_string()))
    }
}
