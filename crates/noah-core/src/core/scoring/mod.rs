use thiserror::Error;

pub mod metrics;
pub mod scorer;
pub mod window;

pub use scorer::{ScoreTable, Scorer};

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ScoringError {
    #[error(
        "No sequence was loaded for allele '{0}'; load its aligned sequence before a de-novo prediction"
    )]
    MissingSequence(String),
    #[error("Allele '{0}' is neither part of the model nor prepared for de-novo scoring")]
    UnpreparedAllele(String),
    #[error("No alleles were provided")]
    NoAlleles,
}
