//! Forest trainer.
//!
//! Picks the split criterion from the model kind and grows `n_tree`
//! independent trees, each on its own bootstrap sample and RNG stream.

use super::criterion::{KlCriterion, SplitCriterion, VarianceCriterion};
use super::grower::TreeGrower;
use super::logger::TrainingLogger;
use super::params::ForestParams;
use super::sampling::{tree_rng, RowSampler};
use crate::data::UpliftDataset;
use crate::model::ModelKind;
use crate::repr::UpliftForest;
use crate::utils::Parallelism;

// =============================================================================
// ForestTrainer
// =============================================================================

/// Trains uplift forests.
#[derive(Debug, Clone)]
pub struct ForestTrainer {
    kind: ModelKind,
    params: ForestParams,
    seed: u64,
}

impl ForestTrainer {
    pub fn new(kind: ModelKind, params: ForestParams, seed: u64) -> Self {
        Self { kind, params, seed }
    }

    #[inline]
    pub fn params(&self) -> &ForestParams {
        &self.params
    }

    /// Train a forest. Tree `i` depends only on the seed and `i`.
    pub fn train(
        &self,
        dataset: &UpliftDataset,
        parallelism: Parallelism,
        logger: &TrainingLogger,
    ) -> UpliftForest {
        match self.kind {
            ModelKind::RandomForestClassifier => {
                self.train_with(&KlCriterion::new(&self.params), dataset, parallelism, logger)
            }
            ModelKind::RandomForestRegressor => {
                self.train_with(&VarianceCriterion::new(&self.params), dataset, parallelism, logger)
            }
        }
    }

    fn train_with<C: SplitCriterion>(
        &self,
        criterion: &C,
        dataset: &UpliftDataset,
        parallelism: Parallelism,
        logger: &TrainingLogger,
    ) -> UpliftForest {
        let sampler = RowSampler::new(dataset.n_rows(), self.params.subsample);
        let grower = TreeGrower::new(
            criterion,
            dataset,
            self.params.max_depth,
            self.params.max_features,
        );

        let trees = parallelism.maybe_par_map(0..self.params.n_tree, |i| {
            let mut rng = tree_rng(self.seed, i);
            let rows = sampler.sample(&mut rng);
            let tree = grower.grow(rows, &mut rng);
            logger.log_tree(i, tree.n_nodes(), tree.n_leaves(), tree.depth());
            tree
        });

        UpliftForest::new(trees, dataset.n_arms(), dataset.features().n_features())
    }
}
