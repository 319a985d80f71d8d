//! Model configuration.
//!
//! [`ModelConfig`] is a plain attribute bag: it names the columns a model
//! reads and carries free-form hyperparameters. Nothing here validates;
//! concrete models interpret and check the values they need (see
//! [`ForestParams`](crate::training::ForestParams)).
//!
//! # Example
//!
//! ```
//! use causalkit::model::{ModelConfig, ParamValue};
//!
//! let config = ModelConfig::builder()
//!     .features(vec!["age".into(), "spend".into()])
//!     .treatment_columns(vec!["treated".into()])
//!     .response_column("converted")
//!     .seed(7)
//!     .build()
//!     .with_param("n_tree", 50)
//!     .with_param("normalization", false);
//!
//! assert_eq!(config.params["n_tree"], ParamValue::Int(50));
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use bon::Builder;
use serde::{Deserialize, Serialize};

// =============================================================================
// ParamValue
// =============================================================================

/// A hyperparameter value.
///
/// Serialized untagged, so JSON `true`, `3`, `0.5` and `"gini"` map to
/// `Bool`, `Int`, `Float` and `Str` respectively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl ParamValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Numeric view; integers widen to float.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Short type name for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "string",
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Str(v) => f.write_str(v),
        }
    }
}

/// Parses the most specific type: bool, then int, then finite float, else
/// string. `inf` and `nan` stay strings.
impl FromStr for ParamValue {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Ok(b) = trimmed.parse::<bool>() {
            return Ok(Self::Bool(b));
        }
        if let Ok(i) = trimmed.parse::<i64>() {
            return Ok(Self::Int(i));
        }
        match trimmed.parse::<f64>() {
            Ok(x) if x.is_finite() => return Ok(Self::Float(x)),
            _ => {}
        }
        Ok(Self::Str(s.to_string()))
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for ParamValue {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

// =============================================================================
// ModelConfig
// =============================================================================

/// Column roles and hyperparameters for a causal model.
///
/// Short keys (`feature`, `cat`, `treatment`, `y`, `weight`) are accepted as
/// aliases when deserializing. Any other key lands in [`params`](Self::params).
#[derive(Debug, Clone, Default, PartialEq, Builder, Serialize, Deserialize)]
#[builder(derive(Clone, Debug))]
#[serde(default)]
pub struct ModelConfig {
    /// Input feature columns, in order. The order must match between fit and predict.
    #[builder(default)]
    #[serde(alias = "feature")]
    pub features: Vec<String>,

    /// Subset of `features` treated as categorical.
    #[builder(default)]
    #[serde(alias = "cat")]
    pub categorical_features: BTreeSet<String>,

    /// Treatment assignment column. Only a single column is supported.
    #[builder(default)]
    #[serde(alias = "treatment")]
    pub treatment_columns: Vec<String>,

    /// Outcome column.
    #[builder(default, into)]
    #[serde(alias = "y")]
    pub response_column: String,

    /// Sample weight column. Empty means uniform weights.
    #[builder(default, into)]
    #[serde(alias = "weight")]
    pub weight_column: String,

    /// Random seed. `None` draws one from system entropy.
    pub seed: Option<u64>,

    /// Extra hyperparameters, interpreted by the concrete model.
    #[builder(default)]
    #[serde(flatten)]
    pub params: BTreeMap<String, ParamValue>,
}

impl ModelConfig {
    /// Set a hyperparameter, builder style.
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.set_param(key, value);
        self
    }

    /// Set a hyperparameter, replacing any previous value.
    pub fn set_param(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) {
        self.params.insert(key.into(), value.into());
    }

    pub fn param(&self, key: &str) -> Option<&ParamValue> {
        self.params.get(key)
    }

    /// The first treatment column, if any.
    pub fn treatment_column(&self) -> Option<&str> {
        self.treatment_columns.first().map(String::as_str)
    }

    /// Whether a non-empty weight column is configured.
    pub fn has_weight(&self) -> bool {
        !self.weight_column.is_empty()
    }

    pub fn is_categorical(&self, feature: &str) -> bool {
        self.categorical_features.contains(feature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn builder_defaults() {
        let config = ModelConfig::builder().build();
        assert!(config.features.is_empty());
        assert!(config.categorical_features.is_empty());
        assert!(config.treatment_columns.is_empty());
        assert_eq!(config.response_column, "");
        assert_eq!(config.weight_column, "");
        assert_eq!(config.seed, None);
        assert!(config.params.is_empty());
        assert_eq!(config, ModelConfig::default());
    }

    #[test]
    fn no_validation_on_construction() {
        // Two treatment columns and a categorical that is not a feature are accepted as-is.
        let config = ModelConfig::builder()
            .treatment_columns(vec!["t1".into(), "t2".into()])
            .categorical_features(BTreeSet::from(["ghost".to_string()]))
            .build();
        assert_eq!(config.treatment_columns.len(), 2);
        assert!(!config.has_weight());
    }

    #[rstest]
    #[case("true", ParamValue::Bool(true))]
    #[case("42", ParamValue::Int(42))]
    #[case("-3", ParamValue::Int(-3))]
    #[case("0.25", ParamValue::Float(0.25))]
    #[case("entropy", ParamValue::Str("entropy".into()))]
    #[case("inf", ParamValue::Str("inf".into()))]
    #[case("NaN", ParamValue::Str("NaN".into()))]
    fn param_value_parse(#[case] input: &str, #[case] expected: ParamValue) {
        assert_eq!(input.parse::<ParamValue>().unwrap(), expected);
    }

    #[test]
    fn int_widens_to_float() {
        assert_eq!(ParamValue::Int(3).as_f64(), Some(3.0));
        assert_eq!(ParamValue::Float(0.5).as_i64(), None);
        assert_eq!(ParamValue::Str("x".into()).as_f64(), None);
    }

    #[test]
    fn json_accepts_short_keys_and_flattens_params() {
        let json = r#"{
            "feature": ["a", "b"],
            "cat": ["b"],
            "treatment": ["t"],
            "y": "y",
            "seed": 11,
            "n_tree": 20,
            "alpha": 0.5,
            "normalization": false
        }"#;
        let config: ModelConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.features, vec!["a", "b"]);
        assert!(config.is_categorical("b"));
        assert_eq!(config.treatment_column(), Some("t"));
        assert_eq!(config.response_column, "y");
        assert_eq!(config.seed, Some(11));
        assert_eq!(config.param("n_tree"), Some(&ParamValue::Int(20)));
        assert_eq!(config.param("alpha"), Some(&ParamValue::Float(0.5)));
        assert_eq!(config.param("normalization"), Some(&ParamValue::Bool(false)));
    }

    #[test]
    fn json_roundtrip() {
        let config = ModelConfig::builder()
            .features(vec!["x".into()])
            .response_column("y")
            .weight_column("w")
            .build()
            .with_param("max_depth", 4)
            .with_param("subsample", 0.8);
        let json = serde_json::to_string(&config).unwrap();
        let back: ModelConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
