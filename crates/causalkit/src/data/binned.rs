//! Binned feature storage.
//!
//! [`FeatureBinner`] learns one [`BinMapper`] per configured feature and turns
//! raw `f32` rows into a column-major [`BinnedMatrix`] that training and
//! tree traversal read from.

use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};

use super::binning::{Bin, BinMapper};
use super::layout::ColumnLayout;
use crate::model::ModelConfig;

/// Column-major matrix of binned feature values.
#[derive(Debug, Clone, PartialEq)]
pub struct BinnedMatrix {
    /// `columns[f][row]`.
    columns: Vec<Vec<Bin>>,
    /// Bins seen in training per feature.
    n_bins: Vec<usize>,
    categorical: Vec<bool>,
    n_rows: usize,
}

impl BinnedMatrix {
    /// Build from binned columns. All columns must have the same length.
    pub fn from_columns(columns: Vec<Vec<Bin>>, n_bins: Vec<usize>, categorical: Vec<bool>) -> Self {
        debug_assert_eq!(columns.len(), n_bins.len());
        debug_assert_eq!(columns.len(), categorical.len());
        let n_rows = columns.first().map_or(0, Vec::len);
        Self {
            columns,
            n_bins,
            categorical,
            n_rows,
        }
    }

    #[inline]
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    #[inline]
    pub fn n_features(&self) -> usize {
        self.columns.len()
    }

    #[inline]
    pub fn get(&self, row: usize, feature: usize) -> Bin {
        self.columns[feature][row]
    }

    #[inline]
    pub fn column(&self, feature: usize) -> &[Bin] {
        &self.columns[feature]
    }

    #[inline]
    pub fn n_bins(&self, feature: usize) -> usize {
        self.n_bins[feature]
    }

    #[inline]
    pub fn is_categorical(&self, feature: usize) -> bool {
        self.categorical[feature]
    }
}

/// Learned per-feature bin mappers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureBinner {
    mappers: Vec<BinMapper>,
}

impl FeatureBinner {
    /// Learn mappers for every configured feature from the training rows.
    pub fn fit(
        config: &ModelConfig,
        layout: &ColumnLayout,
        data: ArrayView2<'_, f32>,
        max_bins: usize,
    ) -> Self {
        let mappers = config
            .features
            .iter()
            .zip(&layout.features)
            .map(|(name, &col)| {
                let values: Vec<f32> = data.column(col).iter().copied().collect();
                BinMapper::fit(&values, config.is_categorical(name), max_bins)
            })
            .collect();
        Self { mappers }
    }

    #[inline]
    pub fn n_features(&self) -> usize {
        self.mappers.len()
    }

    #[inline]
    pub fn mappers(&self) -> &[BinMapper] {
        &self.mappers
    }

    /// Whether any feature is categorical.
    pub fn has_categorical(&self) -> bool {
        self.mappers.iter().any(BinMapper::is_categorical)
    }

    /// Bin the feature columns selected by `layout`.
    pub fn transform(&self, layout: &ColumnLayout, data: ArrayView2<'_, f32>) -> BinnedMatrix {
        debug_assert_eq!(layout.features.len(), self.mappers.len());
        let columns = self
            .mappers
            .iter()
            .zip(&layout.features)
            .map(|(mapper, &col)| data.column(col).iter().map(|&v| mapper.bin(v)).collect())
            .collect();

        BinnedMatrix {
            columns,
            n_bins: self.mappers.iter().map(BinMapper::n_bins).collect(),
            categorical: self.mappers.iter().map(BinMapper::is_categorical).collect(),
            n_rows: data.nrows(),
        }
    }

    pub(crate) fn rebuild_lookups(&mut self) {
        self.mappers.iter_mut().for_each(BinMapper::rebuild_lookup);
    }
}
