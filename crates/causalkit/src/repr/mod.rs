//! Trained model representation.
//!
//! Trees store binned split conditions and per-arm node summaries. They are
//! plain data: training builds them, [`crate::io::native`] persists them and
//! prediction walks them over a [`BinnedMatrix`](crate::data::BinnedMatrix).

mod forest;
mod tree;

pub use forest::UpliftForest;
pub use tree::{NodeSplit, NodeSummary, SplitCondition, TreeNode, UpliftTree};
