use super::alleles::AlleleIndex;
use super::alphabet::Alphabet;
use crate::core::environment::extractor::EnvironmentTable;
use crate::core::environment::fusion::FusionMap;
use crate::core::environment::keys::KeyPositions;
use crate::core::environment::similarity::{EnvironmentComparer, RankingContext, SimilarityMatrix};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ModelParamsError {
    #[error("No binding environment for allele '{0}'")]
    MissingEnvironment(String),
    #[error("The model must cover at least one allele")]
    NoAlleles,
    #[error("The motif must have at least one position")]
    EmptyMotif,
}

/// The read-only description of a binding model shared by the builder and every scorer
/// built from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelParams {
    pub alphabet: Alphabet,
    pub alleles: AlleleIndex,
    pub key_positions: KeyPositions,
    pub similarity: SimilarityMatrix,
    pub environments: EnvironmentTable,
}

impl ModelParams {
    pub fn new(
        alphabet: Alphabet,
        alleles: AlleleIndex,
        key_positions: KeyPositions,
        similarity: SimilarityMatrix,
        environments: EnvironmentTable,
    ) -> Result<Self, ModelParamsError> {
        if alleles.is_empty() {
            return Err(ModelParamsError::NoAlleles);
        }
        if key_positions.motif_length() == 0 {
            return Err(ModelParamsError::EmptyMotif);
        }
        if let Some((_, missing)) = alleles.iter().find(|(_, a)| !environments.contains(a)) {
            return Err(ModelParamsError::MissingEnvironment(missing.to_string()));
        }
        Ok(Self {
            alphabet,
            alleles,
            key_positions,
            similarity,
            environments,
        })
    }

    #[inline]
    pub fn motif_length(&self) -> usize {
        self.key_positions.motif_length()
    }

    pub fn comparer(&self) -> EnvironmentComparer<'_> {
        EnvironmentComparer::new(&self.key_positions, &self.similarity)
    }

    pub fn ranking_context<'a>(&'a self, fusion: &'a FusionMap) -> RankingContext<'a> {
        RankingContext {
            alleles: &self.alleles,
            envs: &self.environments,
            fusion,
        }
    }
}
