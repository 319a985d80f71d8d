//! Row and feature sampling for forest training.
//!
//! # Row Sampling
//!
//! Each tree trains on a bootstrap sample: `max(1, floor(n_rows * subsample))`
//! rows drawn with replacement, or none for an empty dataset.
//!
//! # Feature Sampling
//!
//! Each node considers `min(max_features, n_features)` distinct features,
//! drawn without replacement.
//!
//! # Seeding
//!
//! Tree `i` gets its own generator seeded from `(base_seed, i)`, so a seeded
//! forest is identical no matter how trees are spread over threads.

use rand::seq::index;
use rand::{Rng, RngCore, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

/// Generator used for all training randomness.
pub type TreeRng = Xoshiro256PlusPlus;

/// Generator for the tree at `tree_index`.
#[inline]
pub fn tree_rng(base_seed: u64, tree_index: usize) -> TreeRng {
    let offset = (tree_index as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    Xoshiro256PlusPlus::seed_from_u64(base_seed ^ offset)
}

/// Draw a base seed from system entropy.
pub fn entropy_seed() -> u64 {
    rand::thread_rng().next_u64()
}

/// Bootstrap row sampler.
#[derive(Debug, Clone, Copy)]
pub struct RowSampler {
    n_rows: usize,
    subsample: f64,
}

impl RowSampler {
    pub fn new(n_rows: usize, subsample: f64) -> Self {
        Self { n_rows, subsample }
    }

    /// Rows drawn per tree. At least one when the dataset is non-empty.
    #[inline]
    pub fn sample_size(&self) -> usize {
        let k = (self.n_rows as f64 * self.subsample) as usize;
        if self.n_rows > 0 {
            k.max(1)
        } else {
            0
        }
    }

    /// Draw row indices with replacement.
    pub fn sample(&self, rng: &mut impl Rng) -> Vec<u32> {
        if self.n_rows == 0 {
            return Vec::new();
        }
        let n = self.n_rows as u32;
        (0..self.sample_size()).map(|_| rng.gen_range(0..n)).collect()
    }
}

/// Distinct features for one node, in draw order.
pub fn sample_features(rng: &mut impl Rng, n_features: usize, max_features: usize) -> Vec<usize> {
    let k = max_features.min(n_features);
    index::sample(rng, n_features, k).into_vec()
}
