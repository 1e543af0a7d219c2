use super::config::ConfigError;
use crate::core::environment::fusion::FusionMap;
use crate::core::models::matrix::{Matrix3, add_assign, normalize};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::warn;

/// Added to every background cell before pooling, independent of the training
/// pseudocount.
pub const BACKGROUND_PSEUDOCOUNT: f64 = 1.0;

/// How the residue distribution a binding motif is compared against is estimated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackgroundMode {
    /// Uniform over the alphabet.
    Random,
    /// Every training peptide of every allele and label.
    All,
    /// Negative peptides of every allele.
    #[default]
    Negative,
    /// Each allele's own negative peptides.
    Unique,
    /// Each allele's negative peptides pooled with those of every allele fused into it.
    Fused,
}

impl BackgroundMode {
    pub const ALL: [BackgroundMode; 5] = [
        BackgroundMode::Random,
        BackgroundMode::All,
        BackgroundMode::Negative,
        BackgroundMode::Unique,
        BackgroundMode::Fused,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BackgroundMode::Random => "random",
            BackgroundMode::All => "all",
            BackgroundMode::Negative => "negative",
            BackgroundMode::Unique => "unique",
            BackgroundMode::Fused => "fused",
        }
    }

    /// Whether the mode reads peptides of every label rather than negatives only.
    pub fn uses_all_labels(&self) -> bool {
        matches!(self, BackgroundMode::All)
    }

    /// Parses `name`, warning and falling back to the default mode when it is not a
    /// known mode.
    pub fn parse_or_default(name: &str) -> Self {
        name.parse().unwrap_or_else(|_| {
            let fallback = Self::default();
            warn!(
                "Unknown background mode '{}', using '{}' instead.",
                name, fallback
            );
            fallback
        })
    }
}

impl FromStr for BackgroundMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|mode| mode.as_str() == name)
            .ok_or_else(|| ConfigError::UnknownBackgroundMode(s.to_string()))
    }
}

impl fmt::Display for BackgroundMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A normalized residue distribution, shared by every allele or specific to each.
#[derive(Debug, Clone, PartialEq)]
pub enum Background {
    Global(Vec<f64>),
    PerAllele(Vec<Vec<f64>>),
}

impl Background {
    #[inline]
    pub fn row(&self, allele: usize) -> &[f64] {
        match self {
            Background::Global(row) => row,
            Background::PerAllele(rows) => &rows[allele],
        }
    }
}

/// Estimates the background for `mode` from the `(position, allele, residue)` counts of
/// the peptides the mode reads. Every returned row sums to 1.
pub fn compute_background(
    mode: BackgroundMode,
    counts: &Matrix3,
    fusion: &FusionMap,
) -> Background {
    let (_, _, residues) = counts.shape();
    match mode {
        BackgroundMode::Random => Background::Global(vec![1.0 / residues as f64; residues]),
        BackgroundMode::All | BackgroundMode::Negative => {
            let mut row = counts.pooled_globally(BACKGROUND_PSEUDOCOUNT);
            normalize(&mut row);
            Background::Global(row)
        }
        BackgroundMode::Unique => {
            let mut rows = counts.pooled_over_positions(BACKGROUND_PSEUDOCOUNT);
            rows.iter_mut().for_each(|row| normalize(row));
            Background::PerAllele(rows)
        }
        BackgroundMode::Fused => {
            let unique = counts.pooled_over_positions(BACKGROUND_PSEUDOCOUNT);
            let rows = unique
                .iter()
                .enumerate()
                .map(|(allele, own)| {
                    let mut row = own.clone();
                    for neighbor in fusion.neighbors(allele) {
                        add_assign(&mut row, &unique[neighbor]);
                    }
                    normalize(&mut row);
                    row
                })
                .collect();
            Background::PerAllele(rows)
        }
    }
}
