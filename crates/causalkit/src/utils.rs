//! Thread handling shared by forest training and prediction.

use rayon::prelude::*;

// =============================================================================
// Parallelism
// =============================================================================

/// Whether per-tree work may fan out over rayon.
///
/// The pool is installed once per fit or predict call by [`run_with_threads`];
/// trainers and forests only see this flag.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Parallelism {
    Sequential,
    Parallel,
}

impl Parallelism {
    /// `n_thread` as configured: 1 is sequential, 0 follows the current pool.
    #[inline]
    pub fn from_threads(n_threads: usize) -> Self {
        if n_threads == 1 || (n_threads == 0 && rayon::current_num_threads() == 1) {
            Parallelism::Sequential
        } else {
            Parallelism::Parallel
        }
    }

    #[inline]
    pub fn is_parallel(self) -> bool {
        matches!(self, Parallelism::Parallel)
    }

    /// Map over `iter`, in parallel when allowed. Output order matches input order.
    #[inline]
    pub fn maybe_par_map<T, B, I, F>(self, iter: I, f: F) -> Vec<B>
    where
        T: Send,
        B: Send,
        I: IntoIterator<Item = T> + IntoParallelIterator<Item = T>,
        F: Fn(T) -> B + Sync + Send,
    {
        if self.is_parallel() {
            iter.into_par_iter().map(f).collect()
        } else {
            iter.into_iter().map(f).collect()
        }
    }
}

// =============================================================================
// Scoped pools
// =============================================================================

/// Call `f` inside a pool sized for `n_threads` (0 means every core).
///
/// A single thread runs inline without building a pool.
#[inline]
pub fn run_with_threads<T: Send>(
    n_threads: usize,
    f: impl FnOnce(Parallelism) -> T + Send,
) -> Result<T, rayon::ThreadPoolBuildError> {
    match Parallelism::from_threads(n_threads) {
        Parallelism::Sequential => Ok(f(Parallelism::Sequential)),
        Parallelism::Parallel => {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(n_threads)
                .build()?;
            Ok(pool.install(|| f(Parallelism::Parallel)))
        }
    }
}
