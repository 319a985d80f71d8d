//! Uplift random forest model.
//!
//! Wraps binning, training, prediction and persistence behind
//! [`CausalModel`]. The model kind selects the split criterion:
//! [`ModelKind::RandomForestClassifier`] expects a 0/1 response and uses KL
//! divergence, [`ModelKind::RandomForestRegressor`] expects a continuous
//! response and uses the variance criterion.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use causalkit::model::{CausalModel, ModelConfig, ModelKind, RandomForestUpliftModel};
//! use causalkit::data::tabular::read_csv;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let table = read_csv(Path::new("train.csv"))?;
//! let config = ModelConfig::builder()
//!     .features(vec!["age".into(), "visits".into()])
//!     .treatment_columns(vec!["treated".into()])
//!     .response_column("converted")
//!     .seed(42)
//!     .build()
//!     .with_param("n_tree", 50);
//!
//! let mut model = RandomForestUpliftModel::new(ModelKind::RandomForestClassifier, config);
//! model.fit(&table.columns, table.data.view())?;
//! let uplift = model.predict(&table.columns, table.data.view())?;
//! model.save(Path::new("model.ckit"))?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};

use super::{CausalModel, ModelConfig, ModelError, ModelKind};
use crate::data::{BinMapper, ColumnLayout, FeatureBinner, UpliftDataset};
use crate::io::native::{DeserializeError, FormatFlags, FormatHeader, NativeCodec};
use crate::repr::UpliftForest;
use crate::training::sampling::entropy_seed;
use crate::training::{ForestParams, ForestTrainer, TrainingLogger, Verbosity};
use crate::utils::run_with_threads;

/// State produced by `fit` or `load`.
#[derive(Debug, Clone)]
struct FittedForest {
    /// Config the forest was trained with; fixes the feature order.
    config: ModelConfig,
    binner: FeatureBinner,
    forest: UpliftForest,
}

#[derive(Serialize)]
struct PayloadRef<'a> {
    kind: ModelKind,
    config: &'a ModelConfig,
    binner: &'a FeatureBinner,
    forest: &'a UpliftForest,
}

#[derive(Deserialize)]
struct Payload {
    kind: ModelKind,
    config: ModelConfig,
    binner: FeatureBinner,
    forest: UpliftForest,
}

// =============================================================================
// RandomForestUpliftModel
// =============================================================================

/// Uplift random forest.
#[derive(Debug, Clone)]
pub struct RandomForestUpliftModel {
    kind: ModelKind,
    pub config: ModelConfig,
    fitted: Option<FittedForest>,
}

impl RandomForestUpliftModel {
    pub fn new(kind: ModelKind, config: ModelConfig) -> Self {
        Self {
            kind,
            config,
            fitted: None,
        }
    }

    pub fn classifier(config: ModelConfig) -> Self {
        Self::new(ModelKind::RandomForestClassifier, config)
    }

    pub fn regressor(config: ModelConfig) -> Self {
        Self::new(ModelKind::RandomForestRegressor, config)
    }

    pub fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }

    /// The trained forest, if any.
    pub fn forest(&self) -> Option<&UpliftForest> {
        self.fitted.as_ref().map(|f| &f.forest)
    }

    /// Number of treated arms, i.e. prediction columns.
    pub fn n_treatments(&self) -> Option<usize> {
        self.forest().map(UpliftForest::n_treatments)
    }

    /// Summed split importance per trained feature, in feature order.
    pub fn feature_importance(&self) -> Result<Vec<(String, f64)>, ModelError> {
        let fitted = self.fitted.as_ref().ok_or(ModelError::NotFitted)?;
        Ok(fitted
            .config
            .features
            .iter()
            .cloned()
            .zip(fitted.forest.feature_importance())
            .collect())
    }

    /// Load a model and require it to be of `kind`.
    pub fn load_as(path: &Path, kind: ModelKind) -> Result<Self, ModelError> {
        let model = Self::load(path)?;
        if model.kind != kind {
            return Err(ModelError::KindMismatch {
                expected: kind,
                actual: model.kind,
            });
        }
        Ok(model)
    }

    fn from_payload(header: FormatHeader, payload: Payload) -> Result<Self, ModelError> {
        if header.model_kind != payload.kind {
            return Err(ModelError::KindMismatch {
                expected: header.model_kind,
                actual: payload.kind,
            });
        }

        let Payload {
            kind,
            config,
            mut binner,
            forest,
        } = payload;

        forest.validate().map_err(DeserializeError::CorruptPayload)?;
        let n_features = config.features.len();
        if binner.n_features() != n_features || forest.n_features() != n_features {
            return Err(DeserializeError::CorruptPayload(format!(
                "{n_features} features configured, {} binned, {} in forest",
                binner.n_features(),
                forest.n_features()
            ))
            .into());
        }
        if header.num_features as usize != n_features || header.num_arms as usize != forest.n_arms() {
            return Err(DeserializeError::CorruptPayload("header does not match payload".into()).into());
        }
        ForestParams::from_config(&config)?;
        binner.rebuild_lookups();

        Ok(Self {
            kind,
            config: config.clone(),
            fitted: Some(FittedForest {
                config,
                binner,
                forest,
            }),
        })
    }
}

impl CausalModel for RandomForestUpliftModel {
    fn model_kind(&self) -> ModelKind {
        self.kind
    }

    fn config(&self) -> &ModelConfig {
        &self.config
    }

    fn config_mut(&mut self) -> &mut ModelConfig {
        &mut self.config
    }

    fn fit(&mut self, columns: &[String], data: ArrayView2<'_, f32>) -> Result<(), ModelError> {
        let params = ForestParams::from_config(&self.config)?;
        let mut logger = TrainingLogger::new(params.verbosity);

        let unknown = ForestParams::unknown_keys(&self.config.params);
        if !unknown.is_empty() {
            logger.debug(format_args!("ignoring unknown parameters: {}", unknown.join(", ")));
        }
        for name in &self.config.categorical_features {
            if !self.config.features.contains(name) {
                logger.warn(format_args!("categorical column '{name}' is not a feature"));
            }
        }

        let layout = ColumnLayout::for_training(&self.config, columns, data.ncols())?;
        if data.nrows() == 0 {
            return Err(ModelError::EmptyData);
        }
        let binner = FeatureBinner::fit(&self.config, &layout, data, params.n_bin);
        let dataset = UpliftDataset::from_view(self.kind, &binner, &layout, data)?;
        if logger.enabled(Verbosity::Info) {
            let n_bins: usize = binner.mappers().iter().map(BinMapper::n_bins).sum();
            logger.info(format_args!(
                "binned {} features into {n_bins} bins",
                binner.n_features()
            ));
        }

        let seed = self.config.seed.unwrap_or_else(entropy_seed);
        logger.debug(format_args!("base seed {seed}"));
        logger.start_training(
            params.n_tree,
            dataset.n_rows(),
            dataset.features().n_features(),
            dataset.n_arms(),
        );

        let n_thread = params.n_thread;
        let trainer = ForestTrainer::new(self.kind, params, seed);
        let forest = run_with_threads(n_thread, |parallelism| {
            trainer.train(&dataset, parallelism, &logger)
        })?;
        logger.finish_training(forest.n_trees());

        self.fitted = Some(FittedForest {
            config: self.config.clone(),
            binner,
            forest,
        });
        Ok(())
    }

    fn predict(
        &self,
        columns: &[String],
        data: ArrayView2<'_, f32>,
    ) -> Result<Array2<f32>, ModelError> {
        let fitted = self.fitted.as_ref().ok_or(ModelError::NotFitted)?;
        let layout = ColumnLayout::for_prediction(&fitted.config, columns, data.ncols())?;
        let n_thread = ForestParams::n_thread(&self.config.params)?;

        let features = fitted.binner.transform(&layout, data);
        let uplift = run_with_threads(n_thread, |parallelism| {
            fitted.forest.predict(&features, parallelism)
        })?;
        Ok(uplift)
    }

    fn save(&self, path: &Path) -> Result<(), ModelError> {
        let fitted = self.fitted.as_ref().ok_or(ModelError::NotFitted)?;

        let mut flags = FormatFlags::empty();
        if fitted.binner.has_categorical() {
            flags.set(FormatFlags::HAS_CATEGORICAL);
        }
        if fitted.config.has_weight() {
            flags.set(FormatFlags::HAS_WEIGHT);
        }
        let header = FormatHeader::new(
            self.kind,
            fitted.forest.n_features() as u32,
            fitted.forest.n_arms() as u32,
        )
        .with_flags(flags);

        let payload = PayloadRef {
            kind: self.kind,
            config: &fitted.config,
            binner: &fitted.binner,
            forest: &fitted.forest,
        };
        NativeCodec::new().save(path, header, &payload)?;
        Ok(())
    }

    fn load(path: &Path) -> Result<Self, ModelError> {
        let (header, payload) = NativeCodec::new().load::<Payload>(path)?;
        Self::from_payload(header, payload)
    }
}
