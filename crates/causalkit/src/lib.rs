//! causalkit: uplift random forests for causal effect estimation.
//!
//! Models estimate, per record, how much each treatment changes the outcome
//! compared to control. All models implement [`CausalModel`]:
//!
//! - [`BaseModel`] holds a kind and a config; every operation is unimplemented
//! - [`RandomForestUpliftModel`] trains KL-divergence (binary response) or
//!   variance (continuous response) uplift forests
//!
//! # Modules
//!
//! - [`model`]: model interface, configuration, errors
//! - [`data`]: column roles, binning, CSV input
//! - [`training`]: hyperparameters, split criteria, tree growing
//! - [`repr`]: trained trees and forests
//! - [`io`]: native model file format

pub mod data;
pub mod io;
pub mod model;
pub mod repr;
pub mod testing;
pub mod training;
pub mod utils;

pub use model::{
    BaseModel, CausalModel, ModelConfig, ModelError, ModelKind, ParamValue,
    RandomForestUpliftModel,
};
pub use training::{ConfigError, ForestParams, Verbosity};
pub use utils::Parallelism;
