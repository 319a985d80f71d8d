//! Row partitioning for tree growth.
//!
//! All sampled rows live in one contiguous buffer. Each tree node owns a
//! range of it; splitting a node reorders its range in place so that
//! left-going rows come first, then hands the two halves to the children.
//!
//! ```text
//! Root owns all sampled rows:
//!   indices: [4, 1, 7, 1, 0, 3]
//!   node 0 -> 0..6
//!
//! After splitting node 0 (rows 1 and 3 go left):
//!   indices: [1, 1, 3, 4, 0, 7]
//!   node 1 -> 0..3, node 2 -> 3..6
//! ```
//!
//! Bootstrap samples repeat rows, so the same row index may appear several
//! times in a range.

use std::ops::Range;

/// Row index ranges per tree node.
#[derive(Debug, Clone)]
pub struct RowPartitioner {
    indices: Vec<u32>,
    ranges: Vec<Range<usize>>,
}

impl RowPartitioner {
    /// Start with every sampled row in the root node (id 0).
    pub fn new(sampled: Vec<u32>) -> Self {
        let n = sampled.len();
        Self {
            indices: sampled,
            ranges: vec![0..n],
        }
    }

    /// Rows owned by `node`.
    #[inline]
    pub fn rows(&self, node: usize) -> &[u32] {
        &self.indices[self.ranges[node].clone()]
    }

    #[inline]
    pub fn n_nodes(&self) -> usize {
        self.ranges.len()
    }

    /// Split `node`, appending a left and a right child.
    ///
    /// Returns `(left_id, right_id)`. Row order inside each child is not
    /// preserved.
    pub fn split(&mut self, node: usize, goes_left: impl Fn(u32) -> bool) -> (usize, usize) {
        let range = self.ranges[node].clone();
        let slice = &mut self.indices[range.clone()];

        let mut left_end = 0;
        for i in 0..slice.len() {
            if goes_left(slice[i]) {
                slice.swap(i, left_end);
                left_end += 1;
            }
        }

        let mid = range.start + left_end;
        let left = self.ranges.len();
        self.ranges.push(range.start..mid);
        self.ranges.push(mid..range.end);
        (left, left + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_keeps_every_row() {
        let mut p = RowPartitioner::new(vec![4, 1, 7, 1, 0, 3]);
        assert_eq!(p.rows(0).len(), 6);

        let (l, r) = p.split(0, |row| row % 2 == 1 && row < 5);
        assert_eq!((l, r), (1, 2));

        let mut left = p.rows(l).to_vec();
        left.sort_unstable();
        assert_eq!(left, vec![1, 1, 3]);

        let mut right = p.rows(r).to_vec();
        right.sort_unstable();
        assert_eq!(right, vec![0, 4, 7]);
        assert_eq!(p.n_nodes(), 3);
    }

    #[test]
    fn nested_splits() {
        let mut p = RowPartitioner::new((0..10).collect());
        let (l, r) = p.split(0, |row| row < 6);
        let (ll, lr) = p.split(l, |row| row < 2);
        assert_eq!(p.rows(ll).len(), 2);
        assert_eq!(p.rows(lr).len(), 4);
        assert_eq!(p.rows(r).len(), 4);
        assert_eq!((ll, lr), (3, 4));
    }

    #[test]
    fn empty_side_is_allowed() {
        let mut p = RowPartitioner::new(vec![0, 1, 2]);
        let (l, r) = p.split(0, |_| false);
        assert!(p.rows(l).is_empty());
        assert_eq!(p.rows(r).len(), 3);
    }
}
