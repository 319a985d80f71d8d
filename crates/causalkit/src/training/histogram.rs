//! Per-arm feature histograms.
//!
//! A histogram holds, for every bin slot and every treatment arm, the
//! statistics a [`SplitCriterion`] accumulates from its rows. The last slot
//! collects rows whose value is missing.
//!
//! Layout is `[slot][arm][stat]` in one flat buffer, so a slot is a contiguous
//! `n_arms * n_stats` slice that criteria read directly.

use super::criterion::SplitCriterion;
use crate::data::UpliftDataset;

#[derive(Debug, Clone)]
pub struct ArmHistogram {
    n_arms: usize,
    n_stats: usize,
    n_slots: usize,
    data: Vec<f64>,
}

impl ArmHistogram {
    /// Accumulate `rows` of `feature`.
    pub fn build<C: SplitCriterion + ?Sized>(
        criterion: &C,
        dataset: &UpliftDataset,
        rows: &[u32],
        feature: usize,
    ) -> Self {
        let n_arms = dataset.n_arms();
        let n_stats = criterion.n_stats();
        let n_bins = dataset.features().n_bins(feature);
        let n_slots = n_bins + 1;
        let stride = n_arms * n_stats;

        let mut data = vec![0.0; n_slots * stride];
        let column = dataset.features().column(feature);
        for &row in rows {
            let row = row as usize;
            // Unseen categories at training time cannot occur, but clamp so a
            // stray bin lands in the last real slot rather than out of bounds.
            let slot = match column[row] {
                Some(b) => (b as usize).min(n_bins.saturating_sub(1)),
                None => n_bins,
            };
            let offset = slot * stride + dataset.arm(row) * n_stats;
            criterion.accumulate(
                &mut data[offset..offset + n_stats],
                dataset.response(row),
                dataset.weight(row),
            );
        }

        Self {
            n_arms,
            n_stats,
            n_slots,
            data,
        }
    }

    #[inline]
    pub fn n_slots(&self) -> usize {
        self.n_slots
    }

    #[inline]
    fn stride(&self) -> usize {
        self.n_arms * self.n_stats
    }

    /// Statistics of one slot, `[arm][stat]`.
    #[inline]
    pub fn slot(&self, slot: usize) -> &[f64] {
        let stride = self.stride();
        &self.data[slot * stride..(slot + 1) * stride]
    }

    /// Replace each slot with the running sum of all slots up to it.
    ///
    /// Afterwards slot `b` holds everything with bin `<= b`, and the last
    /// slot holds the node total.
    pub fn cumulate(&mut self) {
        let stride = self.stride();
        for slot in 1..self.n_slots {
            let (done, rest) = self.data.split_at_mut(slot * stride);
            let prev = &done[(slot - 1) * stride..];
            for (cur, p) in rest[..stride].iter_mut().zip(prev) {
                *cur += p;
            }
        }
    }

    /// Sum over all slots.
    pub fn total(&self) -> Vec<f64> {
        let stride = self.stride();
        let mut total = vec![0.0; stride];
        for chunk in self.data.chunks_exact(stride) {
            for (t, v) in total.iter_mut().zip(chunk) {
                *t += v;
            }
        }
        total
    }
}

/// Statistics of all `rows`, `[arm][stat]`.
pub fn node_totals<C: SplitCriterion + ?Sized>(
    criterion: &C,
    dataset: &UpliftDataset,
    rows: &[u32],
) -> Vec<f64> {
    let n_stats = criterion.n_stats();
    let mut totals = vec![0.0; dataset.n_arms() * n_stats];
    for &row in rows {
        let row = row as usize;
        let offset = dataset.arm(row) * n_stats;
        criterion.accumulate(
            &mut totals[offset..offset + n_stats],
            dataset.response(row),
            dataset.weight(row),
        );
    }
    totals
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::dataset_from_rows;
    use crate::training::criterion::KlCriterion;
    use crate::training::ForestParams;

    #[test]
    fn counts_per_slot_and_arm() {
        // x, t, y
        let ds = dataset_from_rows(&[
            [0.0, 0.0, 1.0],
            [0.0, 1.0, 0.0],
            [1.0, 1.0, 1.0],
            [f32::NAN, 0.0, 0.0],
            [1.0, 1.0, 1.0],
        ]);
        let kl = KlCriterion::new(&ForestParams::default());
        let rows: Vec<u32> = (0..5).collect();
        let hist = ArmHistogram::build(&kl, &ds, &rows, 0);

        // two bins plus the missing slot
        assert_eq!(hist.n_slots(), 3);
        // slot 0: control positive, treated negative
        assert_eq!(hist.slot(0), &[0.0, 1.0, 1.0, 0.0]);
        // slot 1: two treated positives
        assert_eq!(hist.slot(1), &[0.0, 0.0, 0.0, 2.0]);
        // missing: control negative
        assert_eq!(hist.slot(2), &[1.0, 0.0, 0.0, 0.0]);

        assert_eq!(hist.total(), node_totals(&kl, &ds, &rows));
    }

    #[test]
    fn cumulate_prefix_sums() {
        let ds = dataset_from_rows(&[
            [0.0, 0.0, 1.0],
            [1.0, 1.0, 0.0],
            [2.0, 1.0, 1.0],
            [3.0, 0.0, 1.0],
        ]);
        let kl = KlCriterion::new(&ForestParams::default());
        let rows: Vec<u32> = vec![0, 1, 2, 3, 3];
        let mut hist = ArmHistogram::build(&kl, &ds, &rows, 0);
        let total = hist.total();
        hist.cumulate();
        assert_eq!(hist.slot(hist.n_slots() - 1), total.as_slice());
        // repeated bootstrap row counted twice
        assert_eq!(total, vec![0.0, 3.0, 1.0, 1.0]);
    }
}
