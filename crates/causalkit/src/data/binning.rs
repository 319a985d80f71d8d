//! Feature discretization.
//!
//! Every feature is mapped to small integer bins before training:
//!
//! - Continuous features use quantile thresholds, each the inclusive upper
//!   bound of its bin. A value's bin is the number of thresholds below it.
//! - Categorical features rank categories by frequency. A value's bin is its
//!   rank; categories outside the kept set share one overflow bin.
//!
//! Missing values (NaN) have no bin. Infinite categories count as missing.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::training::params::MAX_BINS;

/// Binned feature value. `None` is missing.
pub type Bin = Option<u8>;

/// Two values closer than this are considered equal when placing thresholds.
const THRESHOLD_EPS: f32 = f32::EPSILON;

// =============================================================================
// Continuous
// =============================================================================

/// Quantile binning for a numeric feature.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContinuousBinMapper {
    /// Strictly increasing split points.
    thresholds: Vec<f32>,
}

impl ContinuousBinMapper {
    /// Learn thresholds from `values`, aiming for `max_bins` equal-count bins.
    ///
    /// Each boundary moves forward until the next value is strictly larger,
    /// so a run of equal values never straddles two bins. Fewer than
    /// `max_bins` bins result when the data has few distinct values.
    pub fn fit(values: &[f32], max_bins: usize) -> Self {
        let mut sorted: Vec<f32> = values.iter().copied().filter(|v| !v.is_nan()).collect();
        sorted.sort_by(f32::total_cmp);

        let n = sorted.len();
        let step = n / max_bins.max(1);
        let mut thresholds: Vec<f32> = Vec::new();

        for i in 1..max_bins {
            let mut pos = i * step;
            while pos + 1 < n {
                let (v, next) = (sorted[pos], sorted[pos + 1]);
                if v < next - THRESHOLD_EPS {
                    if v.is_finite() && thresholds.last() != Some(&v) {
                        thresholds.push(v);
                    }
                    break;
                }
                pos += 1;
            }
        }

        Self { thresholds }
    }

    pub fn from_thresholds(thresholds: Vec<f32>) -> Self {
        Self { thresholds }
    }

    #[inline]
    pub fn thresholds(&self) -> &[f32] {
        &self.thresholds
    }

    /// Number of bins (thresholds + 1).
    #[inline]
    pub fn n_bins(&self) -> usize {
        self.thresholds.len() + 1
    }

    #[inline]
    pub fn bin(&self, value: f32) -> Bin {
        if value.is_nan() {
            return None;
        }
        // Thresholds are sorted, so the count of `t < value` is a partition point.
        let count = self.thresholds.partition_point(|&t| t < value);
        Some(count as u8)
    }
}

// =============================================================================
// Categorical
// =============================================================================

/// Frequency-ranked binning for a categorical feature.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoricalBinMapper {
    /// Kept categories, most frequent first.
    categories: Vec<f32>,
    /// Whether some training categories were dropped into the overflow bin.
    overflow: bool,
    #[serde(skip)]
    lookup: HashMap<u32, u8>,
}

impl CategoricalBinMapper {
    /// Rank categories by frequency, keeping at most `MAX_BINS`.
    ///
    /// Ties keep first-seen order.
    pub fn fit(values: &[f32]) -> Self {
        let mut order: Vec<f32> = Vec::new();
        let mut counts: HashMap<u32, (usize, usize)> = HashMap::new();
        for &v in values.iter().filter(|v| v.is_finite()) {
            let key = canonical_bits(v);
            let first_seen = order.len();
            let entry = counts.entry(key).or_insert_with(|| (0, first_seen));
            if entry.0 == 0 {
                order.push(v);
            }
            entry.0 += 1;
        }

        let mut ranked: Vec<(f32, usize, usize)> = order
            .iter()
            .map(|&v| {
                let (count, seen) = counts[&canonical_bits(v)];
                (v, count, seen)
            })
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));

        let overflow = ranked.len() > MAX_BINS;
        let categories = ranked.into_iter().take(MAX_BINS).map(|(v, _, _)| v).collect();
        Self::new(categories, overflow)
    }

    /// Build from a ranked category list.
    pub fn new(categories: Vec<f32>, overflow: bool) -> Self {
        let mut mapper = Self {
            categories,
            overflow,
            lookup: HashMap::new(),
        };
        mapper.rebuild_lookup();
        mapper
    }

    /// Restore the lookup table after deserialization.
    pub fn rebuild_lookup(&mut self) {
        self.lookup = self
            .categories
            .iter()
            .enumerate()
            .map(|(i, &v)| (canonical_bits(v), i as u8))
            .collect();
    }

    #[inline]
    pub fn categories(&self) -> &[f32] {
        &self.categories
    }

    /// Number of bins seen in training: the kept categories, plus the
    /// overflow bin when categories were dropped.
    #[inline]
    pub fn n_bins(&self) -> usize {
        self.categories.len() + usize::from(self.overflow)
    }

    /// Bin of a value. Unknown categories map to `categories().len()`.
    #[inline]
    pub fn bin(&self, value: f32) -> Bin {
        if !value.is_finite() {
            return None;
        }
        let bin = self
            .lookup
            .get(&canonical_bits(value))
            .copied()
            .unwrap_or(self.categories.len() as u8);
        Some(bin)
    }
}

/// Bits of `v` with `-0.0` folded into `0.0`.
#[inline]
fn canonical_bits(v: f32) -> u32 {
    if v == 0.0 {
        0.0f32.to_bits()
    } else {
        v.to_bits()
    }
}

// =============================================================================
// Per-feature mapper
// =============================================================================

/// Bin mapper for one feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BinMapper {
    Continuous(ContinuousBinMapper),
    Categorical(CategoricalBinMapper),
}

impl BinMapper {
    pub fn fit(values: &[f32], categorical: bool, max_bins: usize) -> Self {
        if categorical {
            Self::Categorical(CategoricalBinMapper::fit(values))
        } else {
            Self::Continuous(ContinuousBinMapper::fit(values, max_bins))
        }
    }

    #[inline]
    pub fn is_categorical(&self) -> bool {
        matches!(self, Self::Categorical(_))
    }

    #[inline]
    pub fn n_bins(&self) -> usize {
        match self {
            Self::Continuous(m) => m.n_bins(),
            Self::Categorical(m) => m.n_bins(),
        }
    }

    #[inline]
    pub fn bin(&self, value: f32) -> Bin {
        match self {
            Self::Continuous(m) => m.bin(value),
            Self::Categorical(m) => m.bin(value),
        }
    }

    pub(crate) fn rebuild_lookup(&mut self) {
        if let Self::Categorical(m) = self {
            m.rebuild_lookup();
        }
    }
}
