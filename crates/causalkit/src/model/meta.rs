//! Model metadata.
//!
//! The closed set of model kinds the library knows about.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Kind of causal model.
///
/// The set is fixed: callers can match exhaustively. Each kind carries a
/// stable numeric tag used by the native file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum ModelKind {
    /// Uplift random forest over a binary response (KL-divergence splits).
    RandomForestClassifier = 1,
    /// Uplift random forest over a continuous response (treatment-variance splits).
    RandomForestRegressor = 2,
}

impl ModelKind {
    /// Every kind, in tag order.
    pub const ALL: [ModelKind; 2] = [Self::RandomForestClassifier, Self::RandomForestRegressor];

    /// Canonical name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RandomForestClassifier => "RandomForestClassifier",
            Self::RandomForestRegressor => "RandomForestRegressor",
        }
    }

    /// Numeric tag.
    #[inline]
    pub fn tag(self) -> u8 {
        self as u8
    }

    /// Convert from a tag, returning None for unknown values.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::RandomForestClassifier),
            2 => Some(Self::RandomForestRegressor),
            _ => None,
        }
    }

    /// Returns true for kinds that model a binary response.
    pub fn is_classifier(self) -> bool {
        matches!(self, Self::RandomForestClassifier)
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown model kind name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown model kind '{0}', expected RandomForestClassifier or RandomForestRegressor")]
pub struct ParseModelKindError(pub String);

impl FromStr for ModelKind {
    type Err = ParseModelKindError;

    /// Accepts the canonical name, snake case, or the short `classifier` /
    /// `regressor` forms, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match normalized.as_str() {
            "randomforestclassifier" | "classifier" => Ok(Self::RandomForestClassifier),
            "randomforestregressor" | "regressor" => Ok(Self::RandomForestRegressor),
            _ => Err(ParseModelKindError(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn exactly_two_distinct_kinds() {
        assert_eq!(ModelKind::ALL.len(), 2);
        assert_ne!(ModelKind::ALL[0], ModelKind::ALL[1]);
        assert_ne!(ModelKind::ALL[0].tag(), ModelKind::ALL[1].tag());
    }

    #[rstest]
    #[case(ModelKind::RandomForestClassifier, 1)]
    #[case(ModelKind::RandomForestRegressor, 2)]
    fn tags_are_stable(#[case] kind: ModelKind, #[case] tag: u8) {
        assert_eq!(kind.tag(), tag);
        assert_eq!(ModelKind::from_u8(tag), Some(kind));
    }

    #[rstest]
    #[case("RandomForestClassifier", ModelKind::RandomForestClassifier)]
    #[case("random_forest_regressor", ModelKind::RandomForestRegressor)]
    #[case("classifier", ModelKind::RandomForestClassifier)]
    #[case("Regressor", ModelKind::RandomForestRegressor)]
    fn parses_names(#[case] name: &str, #[case] expected: ModelKind) {
        assert_eq!(name.parse::<ModelKind>(), Ok(expected));
    }

    #[test]
    fn rejects_unknown_name_and_tag() {
        assert!("GradientBoosting".parse::<ModelKind>().is_err());
        assert_eq!(ModelKind::from_u8(0), None);
        assert_eq!(ModelKind::from_u8(3), None);
    }

    #[test]
    fn display_roundtrips_through_parse() {
        for kind in ModelKind::ALL {
            assert_eq!(kind.to_string().parse::<ModelKind>(), Ok(kind));
        }
    }

    #[test]
    fn serde_uses_variant_name() {
        let json = serde_json::to_string(&ModelKind::RandomForestRegressor).unwrap();
        assert_eq!(json, "\"RandomForestRegressor\"");
    }
}
