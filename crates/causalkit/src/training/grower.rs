//! Tree grower for uplift trees.
//!
//! Grows one tree depth-wise from a bootstrap sample: per node, sample
//! features, build per-arm histograms, pick the best split by criterion gain,
//! partition rows and queue the children.

use std::collections::VecDeque;

use rand::Rng;

use super::criterion::{SplitCriterion, SplitGain};
use super::histogram::{node_totals, ArmHistogram};
use super::partition::RowPartitioner;
use super::sampling::sample_features;
use crate::data::UpliftDataset;
use crate::repr::{NodeSplit, NodeSummary, SplitCondition, TreeNode, UpliftTree};

/// Node waiting to be expanded.
#[derive(Debug, Clone, Copy)]
struct NodeCandidate {
    /// Partitioner node holding the rows.
    part: usize,
    /// Index into the tree's node vector.
    tree: usize,
    /// Tree index of the node this one was split from.
    parent: Option<usize>,
    depth: usize,
}

/// Best split found for a node.
#[derive(Debug, Clone, Copy)]
struct SplitCandidate {
    feature: usize,
    condition: SplitCondition,
    gain: SplitGain,
}

impl SplitCandidate {
    #[inline]
    fn beats(&self, other: Option<&SplitCandidate>) -> bool {
        other.map_or(true, |o| self.gain.gain > o.gain.gain)
    }
}

/// Grows single uplift trees over a shared dataset.
pub struct TreeGrower<'a, C: SplitCriterion> {
    criterion: &'a C,
    dataset: &'a UpliftDataset,
    max_depth: usize,
    max_features: usize,
}

impl<'a, C: SplitCriterion> TreeGrower<'a, C> {
    pub fn new(
        criterion: &'a C,
        dataset: &'a UpliftDataset,
        max_depth: usize,
        max_features: usize,
    ) -> Self {
        Self {
            criterion,
            dataset,
            max_depth,
            max_features,
        }
    }

    /// Grow a tree on `rows` (dataset row indices, repeats allowed).
    pub fn grow(&self, rows: Vec<u32>, rng: &mut impl Rng) -> UpliftTree {
        let features = self.dataset.features();
        let mut partitioner = RowPartitioner::new(rows);
        let mut nodes = vec![TreeNode::leaf(0, NodeSummary::default())];
        let mut queue = VecDeque::from([NodeCandidate {
            part: 0,
            tree: 0,
            parent: None,
            depth: 0,
        }]);

        while let Some(candidate) = queue.pop_front() {
            let rows = partitioner.rows(candidate.part);
            let totals = node_totals(self.criterion, self.dataset, rows);
            let state = self.criterion.node(&totals, self.dataset.n_arms());
            let summary = {
                let parent = candidate.parent.map(|i| &nodes[i].summary);
                self.criterion.summary(&state, parent)
            };
            nodes[candidate.tree].summary = summary;

            if candidate.depth >= self.max_depth {
                continue;
            }
            let Some(best) = self.find_split(&state, rows, rng) else {
                continue;
            };

            let (left_part, right_part) = partitioner.split(candidate.part, |row| {
                best.condition.goes_left(features.get(row as usize, best.feature))
            });

            let depth = candidate.depth + 1;
            let left = nodes.len();
            let right = left + 1;
            nodes.push(TreeNode::leaf(depth, NodeSummary::default()));
            nodes.push(TreeNode::leaf(depth, NodeSummary::default()));
            nodes[candidate.tree].split = Some(NodeSplit {
                feature: best.feature as u32,
                condition: best.condition,
                gain: best.gain.gain as f32,
                importance: best.gain.importance as f32,
                left: left as u32,
                right: right as u32,
            });

            queue.push_back(NodeCandidate {
                part: left_part,
                tree: left,
                parent: Some(candidate.tree),
                depth,
            });
            queue.push_back(NodeCandidate {
                part: right_part,
                tree: right,
                parent: Some(candidate.tree),
                depth,
            });
        }

        UpliftTree::new(nodes)
    }

    /// Best split across a random subset of features.
    fn find_split(
        &self,
        parent: &C::Node,
        rows: &[u32],
        rng: &mut impl Rng,
    ) -> Option<SplitCandidate> {
        let n_features = self.dataset.features().n_features();
        let mut best: Option<SplitCandidate> = None;
        for feature in sample_features(rng, n_features, self.max_features) {
            if let Some(candidate) = self.find_feature_split(parent, rows, feature) {
                if candidate.beats(best.as_ref()) {
                    best = Some(candidate);
                }
            }
        }
        best
    }

    /// Best split of one feature, if any has positive gain.
    fn find_feature_split(
        &self,
        parent: &C::Node,
        rows: &[u32],
        feature: usize,
    ) -> Option<SplitCandidate> {
        let categorical = self.dataset.features().is_categorical(feature);
        let mut hist = ArmHistogram::build(self.criterion, self.dataset, rows, feature);
        let n_bins = hist.n_slots() - 1;
        let total = hist.total();
        if !categorical {
            hist.cumulate();
        }

        let mut right = vec![0.0; total.len()];
        let mut best: Option<SplitCandidate> = None;
        for pos in 0..n_bins {
            let left = hist.slot(pos);
            for ((r, t), l) in right.iter_mut().zip(&total).zip(left) {
                *r = t - l;
            }
            let Some(gain) = self.criterion.evaluate(parent, left, &right) else {
                continue;
            };
            if gain.gain <= 0.0 {
                continue;
            }

            let bin = pos as u8;
            let candidate = SplitCandidate {
                feature,
                condition: if categorical {
                    SplitCondition::Category(bin)
                } else {
                    SplitCondition::Threshold(bin)
                },
                gain,
            };
            if candidate.beats(best.as_ref()) {
                best = Some(candidate);
            }
        }
        best
    }
}
