//! Uplift forest: an ensemble of uplift trees.

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use super::UpliftTree;
use crate::data::BinnedMatrix;
use crate::utils::Parallelism;

/// Forest of uplift trees sharing one feature list and arm count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpliftForest {
    trees: Vec<UpliftTree>,
    n_arms: usize,
    n_features: usize,
}

impl UpliftForest {
    pub fn new(trees: Vec<UpliftTree>, n_arms: usize, n_features: usize) -> Self {
        Self {
            trees,
            n_arms,
            n_features,
        }
    }

    #[inline]
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Arms seen in training, control included.
    #[inline]
    pub fn n_arms(&self) -> usize {
        self.n_arms
    }

    /// Treated arms, i.e. prediction columns.
    #[inline]
    pub fn n_treatments(&self) -> usize {
        self.n_arms.saturating_sub(1)
    }

    #[inline]
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn trees(&self) -> impl Iterator<Item = &UpliftTree> {
        self.trees.iter()
    }

    /// Average leaf uplift for one row, one value per treated arm.
    pub fn predict_row(&self, features: &BinnedMatrix, row: usize) -> Vec<f32> {
        let mut out = vec![0.0f32; self.n_treatments()];
        if self.trees.is_empty() {
            return out;
        }
        for tree in &self.trees {
            let leaf = tree.leaf(features, row);
            for (o, u) in out.iter_mut().zip(leaf.summary.uplift()) {
                *o += u;
            }
        }
        let scale = 1.0 / self.trees.len() as f32;
        out.iter_mut().for_each(|o| *o *= scale);
        out
    }

    /// Uplift for every row: shape `(n_rows, n_arms - 1)`.
    pub fn predict(&self, features: &BinnedMatrix, parallelism: Parallelism) -> Array2<f32> {
        debug_assert_eq!(features.n_features(), self.n_features);
        let rows = parallelism.maybe_par_map(0..features.n_rows(), |row| {
            self.predict_row(features, row)
        });

        let mut out = Array2::zeros((features.n_rows(), self.n_treatments()));
        for (mut dst, src) in out.rows_mut().into_iter().zip(rows) {
            dst.iter_mut().zip(src).for_each(|(d, s)| *d = s);
        }
        out
    }

    /// Summed split importance per feature across all trees.
    pub fn feature_importance(&self) -> Vec<f64> {
        let mut importance = vec![0.0; self.n_features];
        for tree in &self.trees {
            for split in tree.nodes().iter().filter_map(|n| n.split.as_ref()) {
                if let Some(slot) = importance.get_mut(split.feature as usize) {
                    *slot += f64::from(split.importance);
                }
            }
        }
        importance
    }

    /// Check internal consistency after loading.
    pub fn validate(&self) -> Result<(), String> {
        if self.n_arms < 2 {
            return Err(format!("forest has {} arms, need at least 2", self.n_arms));
        }
        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate(self.n_features)
                .map_err(|e| format!("tree {i}: {e}"))?;
            if let Some(node) = tree.nodes().iter().find(|n| n.summary.n_arms() != self.n_arms) {
                return Err(format!(
                    "tree {i}: node summary has {} arms, expected {}",
                    node.summary.n_arms(),
                    self.n_arms
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repr::{NodeSplit, NodeSummary, SplitCondition, TreeNode};
    use approx::assert_abs_diff_eq;

    fn summary(values: &[f32]) -> NodeSummary {
        NodeSummary {
            value: values.to_vec(),
            weight: vec![1.0; values.len()],
        }
    }

    fn stump(left: &[f32], right: &[f32], importance: f32) -> UpliftTree {
        UpliftTree::new(vec![
            TreeNode {
                depth: 0,
                split: Some(NodeSplit {
                    feature: 0,
                    condition: SplitCondition::Threshold(0),
                    gain: 1.0,
                    importance,
                    left: 1,
                    right: 2,
                }),
                summary: summary(&[0.0, 0.0, 0.0]),
            },
            TreeNode::leaf(1, summary(left)),
            TreeNode::leaf(1, summary(right)),
        ])
    }

    fn features() -> BinnedMatrix {
        BinnedMatrix::from_columns(
            vec![vec![Some(0), Some(1), None]],
            vec![2],
            vec![false],
        )
    }

    #[test]
    fn predictions_average_tree_uplift() {
        let forest = UpliftForest::new(
            vec![
                stump(&[0.1, 0.3, 0.2], &[0.5, 0.4, 0.9], 2.0),
                stump(&[0.2, 0.2, 0.6], &[0.5, 0.6, 0.5], 3.0),
            ],
            3,
            1,
        );
        for par in [Parallelism::Sequential, Parallelism::Parallel] {
            let pred = forest.predict(&features(), par);
            assert_eq!(pred.dim(), (3, 2));
            // left: (0.2 + 0.0) / 2, (0.1 + 0.4) / 2
            assert_abs_diff_eq!(pred[[0, 0]], 0.1, epsilon = 1e-6);
            assert_abs_diff_eq!(pred[[0, 1]], 0.25, epsilon = 1e-6);
            // right: (-0.1 + 0.1) / 2, (0.4 + 0.0) / 2
            assert_abs_diff_eq!(pred[[1, 0]], 0.0, epsilon = 1e-6);
            assert_abs_diff_eq!(pred[[1, 1]], 0.2, epsilon = 1e-6);
            // missing goes right
            assert_eq!(pred.row(2), pred.row(1));
        }
    }

    #[test]
    fn importance_sums_over_trees() {
        let forest = UpliftForest::new(
            vec![
                stump(&[0.0; 3], &[0.0; 3], 2.0),
                stump(&[0.0; 3], &[0.0; 3], 3.0),
            ],
            3,
            1,
        );
        assert_eq!(forest.feature_importance(), vec![5.0]);
    }

    #[test]
    fn validate_checks_arm_count() {
        let forest = UpliftForest::new(vec![stump(&[0.0; 3], &[0.0; 3], 1.0)], 3, 1);
        assert!(forest.validate().is_ok());
        let forest = UpliftForest::new(vec![stump(&[0.0; 3], &[0.0; 3], 1.0)], 2, 1);
        assert!(forest.validate().is_err());
    }

    #[test]
    fn empty_input_gives_empty_output() {
        let forest = UpliftForest::new(vec![stump(&[0.0; 3], &[0.0; 3], 1.0)], 3, 1);
        let empty = BinnedMatrix::from_columns(vec![vec![]], vec![2], vec![false]);
        assert_eq!(forest.predict(&empty, Parallelism::Sequential).dim(), (0, 2));
    }
}
