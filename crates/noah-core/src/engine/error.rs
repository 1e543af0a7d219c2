use super::config::ConfigError;
use crate::core::io::LoadError;
use crate::core::models::params::ModelParamsError;
use crate::core::scoring::ScoringError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Initialization failed: {0}")]
    Initialization(String),

    #[error("Invalid model parameters: {source}")]
    Params {
        #[from]
        source: ModelParamsError,
    },

    #[error("Configuration error: {source}")]
    Config {
        #[from]
        source: ConfigError,
    },

    #[error("Failed to load input data: {source}")]
    Load {
        #[from]
        source: LoadError,
    },

    #[error("Scoring failed: {source}")]
    Scoring {
        #[from]
        source: ScoringError,
    },

    #[error("Failed to create a worker pool with {workers} threads: {reason}")]
    WorkerPool { workers: usize, reason: String },

    #[error("Refinement of allele '{allele}' failed: {reason}")]
    RefinementFailed { allele: String, reason: String },
}
