//! Uplift tree representation.
//!
//! Nodes are stored in a flat vector with the root at index 0. Every node,
//! internal or leaf, keeps a per-arm summary of the training rows that
//! reached it; leaf uplift is read off that summary.

use serde::{Deserialize, Serialize};

use crate::data::{Bin, BinnedMatrix};

/// How a node routes a binned value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "bin", rename_all = "snake_case")]
pub enum SplitCondition {
    /// Continuous: `bin <= threshold` goes left.
    Threshold(u8),
    /// Categorical: `bin == category` goes left.
    Category(u8),
}

impl SplitCondition {
    /// Whether `bin` takes the left branch. Missing values always go right.
    #[inline]
    pub fn goes_left(self, bin: Bin) -> bool {
        match (self, bin) {
            (_, None) => false,
            (Self::Threshold(t), Some(b)) => b <= t,
            (Self::Category(c), Some(b)) => b == c,
        }
    }
}

/// Split stored on an internal node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSplit {
    /// Index into the model's feature list.
    pub feature: u32,
    pub condition: SplitCondition,
    /// Gain used to select the split (normalized when enabled).
    pub gain: f32,
    /// Unnormalized, size-weighted gain used for feature importance.
    pub importance: f32,
    pub left: u32,
    pub right: u32,
}

/// Per-arm summary of the rows in a node.
///
/// `value[t]` is the positive rate (classifier) or the mean response
/// (regressor) of arm `t`; `weight[t]` is the arm's total sample weight.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeSummary {
    pub value: Vec<f32>,
    pub weight: Vec<f32>,
}

impl NodeSummary {
    #[inline]
    pub fn n_arms(&self) -> usize {
        self.value.len()
    }

    /// Uplift of each treated arm over control: `value[t] - value[0]`.
    pub fn uplift(&self) -> impl Iterator<Item = f32> + '_ {
        let control = self.value.first().copied().unwrap_or(0.0);
        self.value.iter().skip(1).map(move |v| v - control)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeNode {
    pub depth: u16,
    /// `None` for leaves.
    pub split: Option<NodeSplit>,
    pub summary: NodeSummary,
}

impl TreeNode {
    pub fn leaf(depth: usize, summary: NodeSummary) -> Self {
        Self {
            depth: depth as u16,
            split: None,
            summary,
        }
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.split.is_none()
    }
}

/// A single uplift tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpliftTree {
    nodes: Vec<TreeNode>,
}

impl UpliftTree {
    pub fn new(nodes: Vec<TreeNode>) -> Self {
        debug_assert!(!nodes.is_empty());
        Self { nodes }
    }

    #[inline]
    pub fn nodes(&self) -> &[TreeNode] {
        &self.nodes
    }

    #[inline]
    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn n_leaves(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    /// Depth of the deepest node (root = 0).
    pub fn depth(&self) -> usize {
        self.nodes.iter().map(|n| n.depth as usize).max().unwrap_or(0)
    }

    /// Leaf reached by `row` of a binned matrix.
    #[inline]
    pub fn leaf(&self, features: &BinnedMatrix, row: usize) -> &TreeNode {
        let mut node = &self.nodes[0];
        while let Some(split) = &node.split {
            let bin = features.get(row, split.feature as usize);
            let next = if split.condition.goes_left(bin) {
                split.left
            } else {
                split.right
            };
            node = &self.nodes[next as usize];
        }
        node
    }

    /// Check internal consistency after loading.
    pub fn validate(&self, n_features: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".into());
        }
        for (i, node) in self.nodes.iter().enumerate() {
            if let Some(split) = &node.split {
                let (l, r) = (split.left as usize, split.right as usize);
                // Children always come after their parent, which rules out cycles.
                if l <= i || r <= i || l >= self.nodes.len() || r >= self.nodes.len() {
                    return Err(format!("node {i} has invalid children {l}, {r}"));
                }
                if split.feature as usize >= n_features {
                    return Err(format!("node {i} splits on unknown feature {}", split.feature));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(values: &[f32]) -> NodeSummary {
        NodeSummary {
            value: values.to_vec(),
            weight: vec![1.0; values.len()],
        }
    }

    /// Root splits feature 0 at bin <= 1; right child splits categorical feature 1 on bin 2.
    fn sample_tree() -> UpliftTree {
        let root = TreeNode {
            depth: 0,
            split: Some(NodeSplit {
                feature: 0,
                condition: SplitCondition::Threshold(1),
                gain: 0.5,
                importance: 10.0,
                left: 1,
                right: 2,
            }),
            summary: summary(&[0.2, 0.3]),
        };
        let right = TreeNode {
            depth: 1,
            split: Some(NodeSplit {
                feature: 1,
                condition: SplitCondition::Category(2),
                gain: 0.1,
                importance: 2.0,
                left: 3,
                right: 4,
            }),
            summary: summary(&[0.2, 0.2]),
        };
        UpliftTree::new(vec![
            root,
            TreeNode::leaf(1, summary(&[0.1, 0.4])),
            right,
            TreeNode::leaf(2, summary(&[0.3, 0.2])),
            TreeNode::leaf(2, summary(&[0.5, 0.5])),
        ])
    }

    #[test]
    fn condition_routing() {
        assert!(SplitCondition::Threshold(3).goes_left(Some(3)));
        assert!(!SplitCondition::Threshold(3).goes_left(Some(4)));
        assert!(!SplitCondition::Threshold(3).goes_left(None));
        assert!(SplitCondition::Category(2).goes_left(Some(2)));
        assert!(!SplitCondition::Category(2).goes_left(Some(1)));
        assert!(!SplitCondition::Category(2).goes_left(None));
    }

    #[test]
    fn summary_uplift() {
        let s = summary(&[0.1, 0.4, 0.05]);
        let uplift: Vec<f32> = s.uplift().collect();
        assert_eq!(uplift.len(), 2);
        approx::assert_abs_diff_eq!(uplift[0], 0.3, epsilon = 1e-6);
        approx::assert_abs_diff_eq!(uplift[1], -0.05, epsilon = 1e-6);
    }

    #[test]
    fn shape_queries() {
        let tree = sample_tree();
        assert_eq!(tree.n_nodes(), 5);
        assert_eq!(tree.n_leaves(), 3);
        assert_eq!(tree.depth(), 2);
        assert!(tree.validate(2).is_ok());
        assert!(tree.validate(1).is_err());
    }

    #[test]
    fn leaf_traversal() {
        let tree = sample_tree();
        let features = BinnedMatrix::from_columns(
            vec![
                vec![Some(0), Some(2), Some(5), None],
                vec![Some(0), Some(2), Some(1), Some(2)],
            ],
            vec![6, 3],
            vec![false, true],
        );
        let leaf_values: Vec<f32> = (0..4)
            .map(|row| tree.leaf(&features, row).summary.value[0])
            .collect();
        // row 0: bin 0 <= 1 -> left leaf
        // row 1: bin 2 > 1 -> right; category 2 -> node 3
        // row 2: right; category 1 -> node 4
        // row 3: missing -> right; category 2 -> node 3
        assert_eq!(leaf_values, vec![0.1, 0.3, 0.5, 0.3]);
    }

    #[test]
    fn validate_rejects_backward_child() {
        let mut tree = sample_tree();
        if let Some(split) = tree.nodes[2].split.as_mut() {
            split.left = 1;
        }
        assert!(tree.validate(2).is_err());
    }
}
