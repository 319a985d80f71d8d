//! Testing utilities shared by unit and integration tests.
//!
//! Helpers here panic on bad input; they are meant for tests and examples.

use ndarray::Array2;
use rand::prelude::*;

use crate::data::{ColumnLayout, FeatureBinner, UpliftDataset};
use crate::model::{ModelConfig, ModelKind};

// =============================================================================
// Small datasets
// =============================================================================

fn single_feature_dataset(kind: ModelKind, rows: &[[f32; 3]]) -> UpliftDataset {
    let config = ModelConfig::builder()
        .features(vec!["x".into()])
        .treatment_columns(vec!["t".into()])
        .response_column("y")
        .build();
    let columns: Vec<String> = ["x", "t", "y"].iter().map(|s| s.to_string()).collect();
    let data = Array2::from_shape_vec((rows.len(), 3), rows.iter().flatten().copied().collect())
        .expect("rows have three values each");

    let layout = ColumnLayout::for_training(&config, &columns, 3).expect("valid layout");
    let binner = FeatureBinner::fit(&config, &layout, data.view(), 30);
    UpliftDataset::from_view(kind, &binner, &layout, data.view()).expect("valid dataset")
}

/// Classifier dataset from `[x, t, y]` rows with one continuous feature `x`.
pub fn dataset_from_rows(rows: &[[f32; 3]]) -> UpliftDataset {
    single_feature_dataset(ModelKind::RandomForestClassifier, rows)
}

/// Regressor dataset from `[x, t, y]` rows with one continuous feature `x`.
pub fn regression_dataset_from_rows(rows: &[[f32; 3]]) -> UpliftDataset {
    single_feature_dataset(ModelKind::RandomForestRegressor, rows)
}

// =============================================================================
// Synthetic uplift data
// =============================================================================

/// Generated table with known treatment effects.
#[derive(Debug, Clone)]
pub struct SyntheticData {
    /// `x0, x1, x2, t, y, y_reg, w`.
    pub columns: Vec<String>,
    pub data: Array2<f32>,
}

impl SyntheticData {
    /// Whether `row` is in the segment where treatment helps (`x0 > 0.5`).
    pub fn in_effect_segment(&self, row: usize) -> bool {
        self.data[[row, 0]] > 0.5
    }
}

/// Uplift data with `n_arms` arms (control included).
///
/// Features are uniform in `[0, 1)`. Arm `a` raises the conversion rate by
/// `0.4 * a / (n_arms - 1)` when `x0 > 0.5` and has no effect otherwise.
/// `y` is the 0/1 conversion, `y_reg` a continuous outcome with the same
/// effect pattern, and `w` a weight in `[0.5, 1.5)`.
pub fn synthetic_uplift(n_rows: usize, n_arms: usize, seed: u64) -> SyntheticData {
    assert!(n_arms >= 2);
    let mut rng = StdRng::seed_from_u64(seed);
    let columns: Vec<String> = ["x0", "x1", "x2", "t", "y", "y_reg", "w"]
        .iter()
        .map(|s| s.to_string())
        .collect();

    let mut data = Array2::zeros((n_rows, columns.len()));
    for mut row in data.rows_mut() {
        let x0: f32 = rng.gen();
        let x1: f32 = rng.gen();
        let x2: f32 = rng.gen();
        let arm = rng.gen_range(0..n_arms);

        let effect = if x0 > 0.5 {
            0.4 * arm as f32 / (n_arms - 1) as f32
        } else {
            0.0
        };
        let p = 0.2 + 0.2 * x1 + effect;
        let y = if rng.gen::<f32>() < p { 1.0 } else { 0.0 };
        let y_reg = 1.0 + x1 + 2.0 * effect + (rng.gen::<f32>() - 0.5) * 0.5;
        let w = 0.5 + rng.gen::<f32>();

        for (dst, v) in row.iter_mut().zip([x0, x1, x2, arm as f32, y, y_reg, w]) {
            *dst = v;
        }
    }

    SyntheticData { columns, data }
}
