//! Split criteria for uplift trees.
//!
//! A criterion decides which statistics are accumulated per arm, how a node
//! is summarized, and how good a candidate split is:
//!
//! - [`KlCriterion`]: binary response, maximizes the KL divergence between
//!   treated and control positive rates.
//! - [`VarianceCriterion`]: continuous response, minimizes the variance of
//!   the estimated treatment effect.

mod kl;
mod variance;

pub use kl::{kl_divergence, KlCriterion};
pub use variance::VarianceCriterion;

use crate::repr::NodeSummary;

/// Score of an admissible split.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplitGain {
    /// Value compared across candidates; higher is better.
    pub gain: f64,
    /// Size-weighted gain, summed into feature importance.
    pub importance: f64,
}

/// Interface between the tree grower and a split rule.
///
/// Statistics slices are laid out `[arm][stat]` with `n_stats()` values per arm.
pub trait SplitCriterion: Send + Sync {
    /// Precomputed view of a parent node, reused across candidate splits.
    type Node;

    /// Statistics accumulated per (arm, bin).
    fn n_stats(&self) -> usize;

    /// Add one row to an arm's statistics.
    fn accumulate(&self, stats: &mut [f64], response: f32, weight: f32);

    /// Prepare a node from its total statistics.
    fn node(&self, totals: &[f64], n_arms: usize) -> Self::Node;

    /// Per-arm summary stored on the tree node. `parent` is the summary of
    /// the node it was split from, `None` at the root.
    fn summary(&self, node: &Self::Node, parent: Option<&NodeSummary>) -> NodeSummary;

    /// Score the split of `parent` into `left` and `right`, or `None` if the
    /// split violates a sample constraint.
    fn evaluate(&self, parent: &Self::Node, left: &[f64], right: &[f64]) -> Option<SplitGain>;
}

/// Minimum sample weights a split must leave on each side.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleLimits {
    /// Total weight per child.
    pub min_leaf: f64,
    /// Weight per arm per child.
    pub min_arm: f64,
}

impl SampleLimits {
    /// Whether both children meet the limits. Children must also be non-empty.
    pub fn admits(&self, left_arms: &[f64], right_arms: &[f64]) -> bool {
        let side_ok = |arms: &[f64]| {
            let total: f64 = arms.iter().sum();
            let min_arm = arms.iter().copied().fold(f64::INFINITY, f64::min);
            total > 0.0 && total >= self.min_leaf && min_arm >= self.min_arm
        };
        side_ok(left_arms) && side_ok(right_arms)
    }
}
