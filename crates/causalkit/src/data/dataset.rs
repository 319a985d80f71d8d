//! Training dataset for uplift models.

use ndarray::ArrayView2;

use super::binned::{BinnedMatrix, FeatureBinner};
use super::layout::ColumnLayout;
use crate::model::{ModelError, ModelKind};
use crate::training::ConfigError;

/// Binned features plus per-row treatment arm, response and weight.
#[derive(Debug, Clone)]
pub struct UpliftDataset {
    features: BinnedMatrix,
    treatment: Vec<u8>,
    response: Vec<f32>,
    weights: Vec<f32>,
    n_arms: usize,
}

impl UpliftDataset {
    /// Extract and validate training columns.
    ///
    /// Treatment values must be integers in `0..=255`; the arm count is the
    /// largest observed value plus one. Classifier responses must be 0 or 1.
    pub fn from_view(
        kind: ModelKind,
        binner: &FeatureBinner,
        layout: &ColumnLayout,
        data: ArrayView2<'_, f32>,
    ) -> Result<Self, ModelError> {
        if data.nrows() == 0 {
            return Err(ModelError::EmptyData);
        }
        let t_col = layout.treatment.ok_or(ConfigError::TreatmentColumns(0))?;
        let y_col = layout.response.ok_or(ConfigError::MissingResponse)?;

        let treatment = data
            .column(t_col)
            .iter()
            .enumerate()
            .map(|(row, &value)| parse_arm(value).ok_or(ModelError::InvalidTreatment { row, value }))
            .collect::<Result<Vec<u8>, _>>()?;

        let response = data.column(y_col).to_vec();
        for (row, &value) in response.iter().enumerate() {
            let valid = if kind.is_classifier() {
                value == 0.0 || value == 1.0
            } else {
                value.is_finite()
            };
            if !valid {
                return Err(ModelError::InvalidResponse { row, value });
            }
        }

        let weights = match layout.weight {
            Some(w_col) => {
                let weights = data.column(w_col).to_vec();
                if let Some((row, &value)) = weights
                    .iter()
                    .enumerate()
                    .find(|(_, w)| !(w.is_finite() && **w >= 0.0))
                {
                    return Err(ModelError::InvalidWeight { row, value });
                }
                weights
            }
            None => vec![1.0; data.nrows()],
        };

        let n_arms = treatment.iter().copied().max().map_or(0, |m| m as usize + 1);
        if n_arms < 2 {
            return Err(ModelError::TooFewArms(n_arms));
        }

        Ok(Self {
            features: binner.transform(layout, data),
            treatment,
            response,
            weights,
            n_arms,
        })
    }

    #[inline]
    pub fn features(&self) -> &BinnedMatrix {
        &self.features
    }

    #[inline]
    pub fn n_rows(&self) -> usize {
        self.treatment.len()
    }

    /// Number of arms, control included.
    #[inline]
    pub fn n_arms(&self) -> usize {
        self.n_arms
    }

    #[inline]
    pub fn arm(&self, row: usize) -> usize {
        self.treatment[row] as usize
    }

    #[inline]
    pub fn response(&self, row: usize) -> f32 {
        self.response[row]
    }

    #[inline]
    pub fn weight(&self, row: usize) -> f32 {
        self.weights[row]
    }
}

fn parse_arm(value: f32) -> Option<u8> {
    let in_range = value.is_finite() && (0.0..=255.0).contains(&value) && value.fract() == 0.0;
    in_range.then_some(value as u8)
}
