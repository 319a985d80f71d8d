//! Typed forest hyperparameters.
//!
//! [`ForestParams`] is read out of the free-form
//! [`ModelConfig::params`](crate::model::ModelConfig::params) map. Missing keys
//! take their defaults; present keys must have the right type and range.

use std::collections::BTreeMap;

use crate::model::{ModelConfig, ParamValue};

use super::Verbosity;

// =============================================================================
// ConfigError
// =============================================================================

/// Errors that can occur during configuration validation.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// A hyperparameter has the wrong type.
    WrongType {
        key: String,
        expected: &'static str,
        found: &'static str,
    },
    /// A hyperparameter is outside its valid range.
    OutOfRange {
        key: &'static str,
        value: String,
        expected: &'static str,
    },
    /// Exactly one treatment column is required for training.
    TreatmentColumns(usize),
    /// No response column configured.
    MissingResponse,
    /// No feature columns configured.
    NoFeatures,
    /// A float hyperparameter is NaN or infinite.
    NonFinite { key: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::WrongType {
                key,
                expected,
                found,
            } => write!(f, "{key} must be {expected}, got {found}"),
            Self::OutOfRange {
                key,
                value,
                expected,
            } => write!(f, "{key} must be {expected}, got {value}"),
            Self::TreatmentColumns(n) => {
                write!(f, "exactly one treatment column is supported, got {n}")
            }
            Self::MissingResponse => write!(f, "response column is not set"),
            Self::NoFeatures => write!(f, "no feature columns configured"),
            Self::NonFinite { key } => write!(f, "{key} must be a finite number"),
        }
    }
}

impl std::error::Error for ConfigError {}

// =============================================================================
// ForestParams
// =============================================================================

/// Hyperparameters for uplift forest training.
#[derive(Debug, Clone, PartialEq)]
pub struct ForestParams {
    /// Maximum number of bins per continuous feature. Default: 30.
    pub n_bin: usize,
    /// Minimum total weight in each child. Default: 100.
    pub min_samples_leaf: usize,
    /// Minimum weight per arm in each child. Default: 10.
    pub min_samples_treatment: usize,
    /// Pseudo-count shrinking child probabilities toward the parent. Default: 10.
    pub n_reg: usize,
    /// Split penalty weight. Default: 0.9.
    ///
    /// For the classifier this balances the treatment/control split terms of
    /// the gain normalization. For the regressor it penalizes arm imbalance.
    pub alpha: f64,
    /// Normalize classifier gain. Default: true.
    pub normalization: bool,
    /// Features sampled per node. Default: 10.
    pub max_features: usize,
    /// Maximum tree depth. Default: 6.
    pub max_depth: usize,
    /// Number of trees. Default: 100.
    pub n_tree: usize,
    /// Bootstrap sample size as a fraction of rows. Default: 1.0.
    pub subsample: f64,
    /// Threads for training and prediction. 0 = all cores. Default: 1.
    pub n_thread: usize,
    /// Logging level. Default: silent.
    pub verbosity: Verbosity,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_bin: 30,
            min_samples_leaf: 100,
            min_samples_treatment: 10,
            n_reg: 10,
            alpha: 0.9,
            normalization: true,
            max_features: 10,
            max_depth: 6,
            n_tree: 100,
            subsample: 1.0,
            n_thread: 1,
            verbosity: Verbosity::Silent,
        }
    }
}

/// Largest bin index representable by a `u8` bin with one slot reserved.
pub const MAX_BINS: usize = 254;

impl ForestParams {
    /// Keys this struct understands.
    pub const KEYS: [&'static str; 12] = [
        "n_bin",
        "min_samples_leaf",
        "min_samples_treatment",
        "n_reg",
        "alpha",
        "normalization",
        "max_features",
        "max_depth",
        "n_tree",
        "subsample",
        "n_thread",
        "verbosity",
    ];

    /// Read and validate hyperparameters from a model config.
    pub fn from_config(config: &ModelConfig) -> Result<Self, ConfigError> {
        Self::from_params(&config.params)
    }

    /// Read and validate hyperparameters from a parameter map.
    ///
    /// Every float in the map must be finite, known key or not.
    pub fn from_params(params: &BTreeMap<String, ParamValue>) -> Result<Self, ConfigError> {
        if let Some((key, _)) = params
            .iter()
            .find(|(_, v)| matches!(v, ParamValue::Float(x) if !x.is_finite()))
        {
            return Err(ConfigError::NonFinite { key: key.clone() });
        }

        let d = Self::default();
        let reader = ParamReader { params };

        let out = Self {
            n_bin: reader.usize("n_bin", d.n_bin)?,
            min_samples_leaf: reader.usize("min_samples_leaf", d.min_samples_leaf)?,
            min_samples_treatment: reader.usize("min_samples_treatment", d.min_samples_treatment)?,
            n_reg: reader.usize("n_reg", d.n_reg)?,
            alpha: reader.f64("alpha", d.alpha)?,
            normalization: reader.bool("normalization", d.normalization)?,
            max_features: reader.usize("max_features", d.max_features)?,
            max_depth: reader.usize("max_depth", d.max_depth)?,
            n_tree: reader.usize("n_tree", d.n_tree)?,
            subsample: reader.f64("subsample", d.subsample)?,
            n_thread: reader.usize("n_thread", d.n_thread)?,
            verbosity: reader.verbosity("verbosity", d.verbosity)?,
        };
        out.validate()?;
        Ok(out)
    }

    /// Only the `n_thread` entry of `params`, for calls that do not train.
    pub fn n_thread(params: &BTreeMap<String, ParamValue>) -> Result<usize, ConfigError> {
        ParamReader { params }.usize("n_thread", Self::default().n_thread)
    }

    /// Keys in `params` that this struct ignores.
    pub fn unknown_keys(params: &BTreeMap<String, ParamValue>) -> Vec<&str> {
        params
            .keys()
            .map(String::as_str)
            .filter(|k| !Self::KEYS.contains(k))
            .collect()
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(2..=MAX_BINS).contains(&self.n_bin) {
            return Err(out_of_range("n_bin", self.n_bin, "in 2..=254"));
        }
        if self.n_tree == 0 {
            return Err(out_of_range("n_tree", self.n_tree, "at least 1"));
        }
        if self.max_features == 0 {
            return Err(out_of_range("max_features", self.max_features, "at least 1"));
        }
        if !(self.subsample > 0.0 && self.subsample <= 1.0) {
            return Err(out_of_range("subsample", self.subsample, "in (0, 1]"));
        }
        if !self.alpha.is_finite() || self.alpha < 0.0 {
            return Err(out_of_range("alpha", self.alpha, "finite and non-negative"));
        }
        Ok(())
    }
}

fn out_of_range(key: &'static str, value: impl ToString, expected: &'static str) -> ConfigError {
    ConfigError::OutOfRange {
        key,
        value: value.to_string(),
        expected,
    }
}

struct ParamReader<'a> {
    params: &'a BTreeMap<String, ParamValue>,
}

impl ParamReader<'_> {
    fn wrong_type(key: &str, expected: &'static str, found: &ParamValue) -> ConfigError {
        ConfigError::WrongType {
            key: key.to_string(),
            expected,
            found: found.type_name(),
        }
    }

    fn usize(&self, key: &'static str, default: usize) -> Result<usize, ConfigError> {
        match self.params.get(key) {
            None => Ok(default),
            Some(v) => {
                let i = v
                    .as_i64()
                    .ok_or_else(|| Self::wrong_type(key, "an integer", v))?;
                usize::try_from(i).map_err(|_| out_of_range(key, i, "non-negative"))
            }
        }
    }

    fn f64(&self, key: &'static str, default: f64) -> Result<f64, ConfigError> {
        match self.params.get(key) {
            None => Ok(default),
            Some(v) => v.as_f64().ok_or_else(|| Self::wrong_type(key, "a number", v)),
        }
    }

    fn bool(&self, key: &'static str, default: bool) -> Result<bool, ConfigError> {
        match self.params.get(key) {
            None => Ok(default),
            Some(v) => v.as_bool().ok_or_else(|| Self::wrong_type(key, "a bool", v)),
        }
    }

    fn verbosity(&self, key: &'static str, default: Verbosity) -> Result<Verbosity, ConfigError> {
        match self.params.get(key) {
            None => Ok(default),
            Some(ParamValue::Int(level)) => Verbosity::from_level(*level)
                .ok_or_else(|| out_of_range(key, level, "in 0..=3")),
            Some(ParamValue::Str(s)) => s
                .parse()
                .map_err(|_| out_of_range(key, s, "silent, warning, info or debug")),
            Some(v) => Err(Self::wrong_type(key, "an integer or string", v)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn params(pairs: &[(&str, ParamValue)]) -> BTreeMap<String, ParamValue> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn empty_params_give_defaults() {
        let p = ForestParams::from_params(&BTreeMap::new()).unwrap();
        assert_eq!(p, ForestParams::default());
        assert_eq!(p.n_bin, 30);
        assert_eq!(p.min_samples_leaf, 100);
        assert_eq!(p.n_tree, 100);
        assert!(p.normalization);
    }

    #[test]
    fn reads_typed_values() {
        let p = ForestParams::from_params(&params(&[
            ("n_tree", ParamValue::Int(7)),
            ("alpha", ParamValue::Int(1)),
            ("subsample", ParamValue::Float(0.5)),
            ("normalization", ParamValue::Bool(false)),
            ("verbosity", ParamValue::Str("debug".into())),
        ]))
        .unwrap();
        assert_eq!(p.n_tree, 7);
        assert_eq!(p.alpha, 1.0);
        assert_eq!(p.subsample, 0.5);
        assert!(!p.normalization);
        assert_eq!(p.verbosity, Verbosity::Debug);
    }

    #[test]
    fn wrong_type_is_rejected() {
        let err = ForestParams::from_params(&params(&[("n_tree", ParamValue::Float(2.5))]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::WrongType { ref key, .. } if key == "n_tree"));

        let err = ForestParams::from_params(&params(&[("normalization", ParamValue::Int(1))]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::WrongType { .. }));
    }

    #[rstest]
    #[case("n_bin", ParamValue::Int(1))]
    #[case("n_bin", ParamValue::Int(255))]
    #[case("n_tree", ParamValue::Int(0))]
    #[case("max_features", ParamValue::Int(0))]
    #[case("subsample", ParamValue::Float(0.0))]
    #[case("subsample", ParamValue::Float(1.5))]
    #[case("alpha", ParamValue::Float(-0.1))]
    #[case("max_depth", ParamValue::Int(-1))]
    #[case("verbosity", ParamValue::Int(9))]
    fn out_of_range_is_rejected(#[case] key: &str, #[case] value: ParamValue) {
        let err = ForestParams::from_params(&params(&[(key, value)])).unwrap_err();
        assert!(matches!(err, ConfigError::OutOfRange { .. }), "{err}");
    }

    #[rstest]
    #[case("alpha", f64::INFINITY)]
    #[case("subsample", f64::NAN)]
    #[case("note", f64::NEG_INFINITY)]
    fn non_finite_floats_are_rejected(#[case] key: &str, #[case] value: f64) {
        let err = ForestParams::from_params(&params(&[(key, ParamValue::Float(value))])).unwrap_err();
        assert_eq!(err, ConfigError::NonFinite { key: key.to_string() });
    }

    #[test]
    fn n_thread_ignores_other_keys() {
        let p = params(&[
            ("n_thread", ParamValue::Int(4)),
            ("n_tree", ParamValue::Int(0)),
            ("alpha", ParamValue::Str("high".into())),
        ]);
        assert!(ForestParams::from_params(&p).is_err());
        assert_eq!(ForestParams::n_thread(&p).unwrap(), 4);
        assert_eq!(ForestParams::n_thread(&BTreeMap::new()).unwrap(), 1);
    }

    #[test]
    fn unknown_keys_are_listed() {
        let p = params(&[
            ("n_tree", ParamValue::Int(3)),
            ("criterion", ParamValue::Str("kl".into())),
        ]);
        assert!(ForestParams::from_params(&p).is_ok());
        assert_eq!(ForestParams::unknown_keys(&p), vec!["criterion"]);
    }
}
