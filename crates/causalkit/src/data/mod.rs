//! Data handling: column roles, binning and tabular input.
//!
//! - [`ColumnLayout`]: where each configured role sits in the input columns
//! - [`BinMapper`], [`FeatureBinner`]: learned feature discretization
//! - [`BinnedMatrix`]: column-major binned features
//! - [`UpliftDataset`]: binned features with treatment, response and weights
//! - [`tabular`]: CSV reading and writing

pub mod binned;
pub mod binning;
mod dataset;
mod layout;
pub mod tabular;

pub use binned::{BinnedMatrix, FeatureBinner};
pub use binning::{Bin, BinMapper, CategoricalBinMapper, ContinuousBinMapper};
pub use dataset::UpliftDataset;
pub use layout::ColumnLayout;
