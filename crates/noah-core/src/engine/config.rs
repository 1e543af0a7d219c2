use super::background::BackgroundMode;
use crate::core::environment::similarity::SimilarityMatrix;
use crate::core::io::similarity::load_similarity_matrix;
use crate::core::io::{LoadError, path_string, read_to_string};
use serde::Deserialize;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
    #[error("Invalid value for '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },
    #[error("Unknown similarity metric '{0}'")]
    UnknownSimilarityMetric(String),
    #[error("Unknown background mode '{0}'")]
    UnknownBackgroundMode(String),
}

/// Named substitution tables. Distance-like tables are sign-flipped on load so that a
/// higher value always means more similar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SimilarityMetric {
    Blosum62,
    Pam250,
    Granthams,
    Sneath,
}

impl SimilarityMetric {
    pub const ALL: [SimilarityMetric; 4] = [
        SimilarityMetric::Blosum62,
        SimilarityMetric::Pam250,
        SimilarityMetric::Granthams,
        SimilarityMetric::Sneath,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SimilarityMetric::Blosum62 => "blosum62",
            SimilarityMetric::Pam250 => "pam250",
            SimilarityMetric::Granthams => "granthams",
            SimilarityMetric::Sneath => "sneath",
        }
    }

    pub fn is_inverted(&self) -> bool {
        matches!(self, SimilarityMetric::Granthams | SimilarityMetric::Sneath)
    }

    pub fn file_name(&self) -> &'static str {
        match self {
            SimilarityMetric::Blosum62 => "blosum62.csv",
            SimilarityMetric::Pam250 => "pam250.csv",
            SimilarityMetric::Granthams => "granthams_distance.csv",
            SimilarityMetric::Sneath => "sneath_index.csv",
        }
    }

    /// Loads this metric's table from `dir`, applying its inversion flag.
    pub fn load(&self, dir: &Path) -> Result<SimilarityMatrix, LoadError> {
        load_similarity_matrix(&dir.join(self.file_name()), self.is_inverted())
    }
}

impl FromStr for SimilarityMetric {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|metric| metric.as_str() == name)
            .ok_or_else(|| ConfigError::UnknownSimilarityMetric(s.to_string()))
    }
}

impl fmt::Display for SimilarityMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RefinementConfig {
    /// Score at or below which a test peptide is predicted to bind.
    pub mcc_threshold: f64,
    /// Largest MCC drop still accepted for a candidate as similar as the allele itself.
    pub acceptance_margin: f64,
    /// How close a candidate's similarity must be to the self-similarity to count as tied.
    pub tie_epsilon: f64,
}

impl Default for RefinementConfig {
    fn default() -> Self {
        Self {
            mcc_threshold: -1.0,
            acceptance_margin: 0.1,
            tie_epsilon: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrainingConfig {
    pub motif_length: usize,
    pub pseudocount: f64,
    pub background: BackgroundMode,
    /// `None` skips refinement and keeps every allele in its own group.
    pub refinement: Option<RefinementConfig>,
    pub workers: usize,
}

#[derive(Default)]
pub struct TrainingConfigBuilder {
    motif_length: Option<usize>,
    pseudocount: Option<f64>,
    background: Option<BackgroundMode>,
    refinement: Option<Option<RefinementConfig>>,
    workers: Option<usize>,
}

impl TrainingConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn motif_length(mut self, length: usize) -> Self {
        self.motif_length = Some(length);
        self
    }
    pub fn pseudocount(mut self, pseudocount: f64) -> Self {
        self.pseudocount = Some(pseudocount);
        self
    }
    pub fn background(mut self, mode: BackgroundMode) -> Self {
        self.background = Some(mode);
        self
    }
    pub fn refinement(mut self, refinement: Option<RefinementConfig>) -> Self {
        self.refinement = Some(refinement);
        self
    }
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers);
        self
    }

    pub fn build(self) -> Result<TrainingConfig, ConfigError> {
        let motif_length = self
            .motif_length
            .ok_or(ConfigError::MissingParameter("motif_length"))?;
        if motif_length == 0 {
            return Err(ConfigError::InvalidParameter {
                name: "motif_length",
                reason: "must be at least 1".to_string(),
            });
        }
        let pseudocount = self.pseudocount.unwrap_or(1.0);
        if !(pseudocount.is_finite() && pseudocount > 0.0) {
            return Err(ConfigError::InvalidParameter {
                name: "pseudocount",
                reason: format!("must be a positive number, got {}", pseudocount),
            });
        }
        let workers = self.workers.unwrap_or(1);
        if workers == 0 {
            return Err(ConfigError::InvalidParameter {
                name: "workers",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(TrainingConfig {
            motif_length,
            pseudocount,
            background: self.background.unwrap_or(BackgroundMode::Fused),
            refinement: self
                .refinement
                .unwrap_or_else(|| Some(RefinementConfig::default())),
            workers,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredictionConfig {
    pub workers: usize,
}

impl Default for PredictionConfig {
    fn default() -> Self {
        Self { workers: 1 }
    }
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PartialRefinementConfig {
    enabled: Option<bool>,
    mcc_threshold: Option<f64>,
    acceptance_margin: Option<f64>,
    tie_epsilon: Option<f64>,
}

impl PartialRefinementConfig {
    fn resolve(self) -> Option<RefinementConfig> {
        if self.enabled == Some(false) {
            return None;
        }
        let defaults = RefinementConfig::default();
        Some(RefinementConfig {
            mcc_threshold: self.mcc_threshold.unwrap_or(defaults.mcc_threshold),
            acceptance_margin: self.acceptance_margin.unwrap_or(defaults.acceptance_margin),
            tie_epsilon: self.tie_epsilon.unwrap_or(defaults.tie_epsilon),
        })
    }
}

/// Training settings as read from a TOML file; every key is optional.
///
/// ```toml
/// motif-length = 9
/// background = "fused"
/// workers = 4
///
/// [refinement]
/// acceptance-margin = 0.1
/// ```
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct PartialTrainingConfig {
    motif_length: Option<usize>,
    pseudocount: Option<f64>,
    background: Option<String>,
    workers: Option<usize>,
    refinement: Option<PartialRefinementConfig>,
}

impl PartialTrainingConfig {
    pub fn from_file(path: &Path) -> Result<Self, LoadError> {
        debug!("Loading training configuration from file: {:?}", path);
        let content = read_to_string(path)?;
        toml::from_str(&content).map_err(|source| LoadError::Toml {
            path: path_string(path),
            source,
        })
    }

    /// Applies the file's values on top of `builder`. An unrecognized background mode
    /// falls back to the default mode with a warning.
    pub fn merge_into(self, mut builder: TrainingConfigBuilder) -> TrainingConfigBuilder {
        if let Some(length) = self.motif_length {
            builder = builder.motif_length(length);
        }
        if let Some(pseudocount) = self.pseudocount {
            builder = builder.pseudocount(pseudocount);
        }
        if let Some(mode) = self.background.as_deref() {
            builder = builder.background(BackgroundMode::parse_or_default(mode));
        }
        if let Some(workers) = self.workers {
            builder = builder.workers(workers);
        }
        if let Some(refinement) = self.refinement {
            builder = builder.refinement(refinement.resolve());
        }
        builder
    }
}
