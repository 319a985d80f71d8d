//! Variance split criterion for continuous responses.
//!
//! Compares arm 0 (control) against arm 1. A node's impurity is the
//! estimated variance of the treatment effect minus its squared size:
//!
//! ```text
//! var_t / n_t + var_c / n_c - tau^2 + alpha * |n_t - n_c|
//! ```
//!
//! so splits that separate large effects from small ones lower impurity.
//!
//! Splits must respect `min_samples_leaf` and `min_samples_treatment`, the
//! same limits the KL criterion applies.

use super::{SampleLimits, SplitCriterion, SplitGain};
use crate::repr::NodeSummary;
use crate::training::ForestParams;

/// Statistics per arm: weighted sum, weighted sum of squares, weight.
const N_STATS: usize = 3;

#[derive(Debug, Clone)]
pub struct VarianceNode {
    /// `[arm][sum, sum_sq, weight]`.
    totals: Vec<f64>,
    /// `None` when control or the first treated arm is empty.
    impurity: Option<f64>,
}

/// Variance-of-effect criterion for the regressor.
///
/// Unlike the classic regression uplift split, candidates are also checked
/// against the per-child and per-arm minimum sample weights.
#[derive(Debug, Clone)]
pub struct VarianceCriterion {
    limits: SampleLimits,
    alpha: f64,
}

impl VarianceCriterion {
    pub fn new(params: &ForestParams) -> Self {
        Self {
            limits: SampleLimits {
                min_leaf: params.min_samples_leaf as f64,
                min_arm: params.min_samples_treatment as f64,
            },
            alpha: params.alpha,
        }
    }

    #[inline]
    fn arm(stats: &[f64], arm: usize) -> (f64, f64, f64) {
        let s = &stats[arm * N_STATS..(arm + 1) * N_STATS];
        (s[0], s[1], s[2])
    }

    /// Weight of arms 0 and 1.
    #[inline]
    fn weight(stats: &[f64]) -> f64 {
        Self::arm(stats, 0).2 + Self::arm(stats, 1).2
    }

    fn impurity(&self, stats: &[f64]) -> Option<f64> {
        if stats.len() < 2 * N_STATS {
            return None;
        }
        let (c_sum, c_sq, c_n) = Self::arm(stats, 0);
        let (t_sum, t_sq, t_n) = Self::arm(stats, 1);
        if c_n <= 0.0 || t_n <= 0.0 {
            return None;
        }

        let c_mean = c_sum / c_n;
        let t_mean = t_sum / t_n;
        let c_var = (c_sq / c_n - c_mean * c_mean).max(0.0);
        let t_var = (t_sq / t_n - t_mean * t_mean).max(0.0);
        let tau = t_mean - c_mean;

        Some(t_var / t_n + c_var / c_n - tau * tau + self.alpha * (t_n - c_n).abs())
    }
}

impl SplitCriterion for VarianceCriterion {
    type Node = VarianceNode;

    #[inline]
    fn n_stats(&self) -> usize {
        N_STATS
    }

    #[inline]
    fn accumulate(&self, stats: &mut [f64], response: f32, weight: f32) {
        let (y, w) = (f64::from(response), f64::from(weight));
        stats[0] += w * y;
        stats[1] += w * y * y;
        stats[2] += w;
    }

    fn node(&self, totals: &[f64], _n_arms: usize) -> VarianceNode {
        VarianceNode {
            totals: totals.to_vec(),
            impurity: self.impurity(totals),
        }
    }

    /// Arm means. An arm with no weight inherits the parent's mean for that
    /// arm; at the root it takes the control mean, so its uplift is zero.
    fn summary(&self, node: &VarianceNode, parent: Option<&NodeSummary>) -> NodeSummary {
        let mean = |s: &[f64]| (s[2] > 0.0).then(|| s[0] / s[2]);
        let control = node.totals.get(..N_STATS).and_then(mean).unwrap_or(0.0);
        let (value, weight) = node
            .totals
            .chunks_exact(N_STATS)
            .enumerate()
            .map(|(arm, s)| {
                let value = match mean(s) {
                    Some(m) => m as f32,
                    None => parent
                        .and_then(|p| p.value.get(arm).copied())
                        .unwrap_or(control as f32),
                };
                (value, s[2] as f32)
            })
            .unzip();
        NodeSummary { value, weight }
    }

    fn evaluate(&self, parent: &VarianceNode, left: &[f64], right: &[f64]) -> Option<SplitGain> {
        let parent_impurity = parent.impurity?;

        let left_n: Vec<f64> = left.chunks_exact(N_STATS).map(|s| s[2]).collect();
        let right_n: Vec<f64> = right.chunks_exact(N_STATS).map(|s| s[2]).collect();
        if !self.limits.admits(&left_n, &right_n) {
            return None;
        }

        let left_impurity = self.impurity(left)?;
        let right_impurity = self.impurity(right)?;

        let nl = Self::weight(left);
        let nr = Self::weight(right);
        let n = nl + nr;
        let gain = parent_impurity - left_impurity * nl / n - right_impurity * nr / n;

        gain.is_finite().then_some(SplitGain {
            gain,
            importance: gain,
        })
    }
}
