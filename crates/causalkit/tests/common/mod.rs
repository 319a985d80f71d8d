//! Shared helpers for integration tests.

#![allow(dead_code)]

use causalkit::model::ModelConfig;
use ndarray::Array2;

pub use causalkit::testing::{synthetic_uplift, SyntheticData};

pub fn names(cols: &[&str]) -> Vec<String> {
    cols.iter().map(|s| s.to_string()).collect()
}

/// Config over the synthetic columns with small, fast trees.
pub fn forest_config(response: &str, seed: u64) -> ModelConfig {
    ModelConfig::builder()
        .features(names(&["x0", "x1", "x2"]))
        .treatment_columns(names(&["t"]))
        .response_column(response)
        .seed(seed)
        .build()
        .with_param("n_tree", 20)
        .with_param("max_depth", 3)
        .with_param("min_samples_leaf", 50)
        .with_param("min_samples_treatment", 10)
}

/// Mean of `column` over rows inside and outside the effect segment.
pub fn segment_means(data: &SyntheticData, pred: &Array2<f32>, column: usize) -> (f32, f32) {
    let (mut sum_in, mut n_in, mut sum_out, mut n_out) = (0.0, 0usize, 0.0, 0usize);
    for row in 0..pred.nrows() {
        if data.in_effect_segment(row) {
            sum_in += pred[[row, column]];
            n_in += 1;
        } else {
            sum_out += pred[[row, column]];
            n_out += 1;
        }
    }
    (sum_in / n_in.max(1) as f32, sum_out / n_out.max(1) as f32)
}
