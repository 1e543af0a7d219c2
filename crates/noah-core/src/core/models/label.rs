use phf::{Map, phf_map};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Qualitative outcome of a binding assay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BindingLabel {
    #[serde(rename = "Positive-High")]
    PositiveHigh,
    #[serde(rename = "Positive-Intermediate")]
    PositiveIntermediate,
    #[serde(rename = "Positive")]
    Positive,
    #[serde(rename = "Positive-Low")]
    PositiveLow,
    #[serde(rename = "Negative")]
    Negative,
}

static LABELS_BY_NAME: Map<&'static str, BindingLabel> = phf_map! {
    "Positive-High" => BindingLabel::PositiveHigh,
    "Positive-Intermediate" => BindingLabel::PositiveIntermediate,
    "Positive" => BindingLabel::Positive,
    "Positive-Low" => BindingLabel::PositiveLow,
    "Negative" => BindingLabel::Negative,
};

#[derive(Debug, Error, PartialEq, Eq, Clone)]
#[error("Unknown binding label: '{0}'")]
pub struct ParseBindingLabelError(pub String);

impl BindingLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            BindingLabel::PositiveHigh => "Positive-High",
            BindingLabel::PositiveIntermediate => "Positive-Intermediate",
            BindingLabel::Positive => "Positive",
            BindingLabel::PositiveLow => "Positive-Low",
            BindingLabel::Negative => "Negative",
        }
    }

    /// Counted as a positive when building a confusion matrix.
    pub fn is_evaluated_positive(&self) -> bool {
        matches!(
            self,
            BindingLabel::PositiveHigh | BindingLabel::PositiveIntermediate
        )
    }
}

impl FromStr for BindingLabel {
    type Err = ParseBindingLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LABELS_BY_NAME
            .get(s.trim())
            .copied()
            .ok_or_else(|| ParseBindingLabelError(s.to_string()))
    }
}

impl fmt::Display for BindingLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_canonical_names() {
        assert_eq!(
            "Positive-High".parse::<BindingLabel>(),
            Ok(BindingLabel::PositiveHigh)
        );
        assert_eq!(" Negative ".parse::<BindingLabel>(), Ok(BindingLabel::Negative));
        assert!(matches!(
            "positive-high".parse::<BindingLabel>(),
            Err(ParseBindingLabelError(_))
        ));
    }

    #[test]
    fn only_high_and_intermediate_are_evaluated_positives() {
        assert!(BindingLabel::PositiveHigh.is_evaluated_positive());
        assert!(BindingLabel::PositiveIntermediate.is_evaluated_positive());
        assert!(!BindingLabel::Positive.is_evaluated_positive());
        assert!(!BindingLabel::PositiveLow.is_evaluated_positive());
        assert!(!BindingLabel::Negative.is_evaluated_positive());
    }
}
