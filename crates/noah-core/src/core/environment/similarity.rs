use super::extractor::EnvironmentTable;
use super::fusion::FusionMap;
use super::keys::KeyPositions;
use crate::core::diagnostics::{BatchReport, Diagnostic};
use crate::core::models::alleles::AlleleIndex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum SimilarityMatrixError {
    #[error("Similarity matrix has {symbols} symbols but {rows} rows")]
    RowCount { symbols: usize, rows: usize },
    #[error("Row for '{symbol}' has {found} values, expected {expected}")]
    RowLength {
        symbol: char,
        found: usize,
        expected: usize,
    },
    #[error("Duplicate symbol '{0}' in similarity matrix")]
    DuplicateSymbol(char),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct DenseSimilarity {
    symbols: Vec<char>,
    values: Vec<Vec<f64>>,
}

/// Residue x residue substitution scores; higher means more similar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "DenseSimilarity", into = "DenseSimilarity")]
pub struct SimilarityMatrix {
    symbols: Vec<char>,
    values: Vec<Vec<f64>>,
    index: HashMap<char, usize>,
}

impl SimilarityMatrix {
    /// `values[i][j]` is the score of the pair `(symbols[i], symbols[j])`.
    pub fn new(symbols: Vec<char>, values: Vec<Vec<f64>>) -> Result<Self, SimilarityMatrixError> {
        if values.len() != symbols.len() {
            return Err(SimilarityMatrixError::RowCount {
                symbols: symbols.len(),
                rows: values.len(),
            });
        }
        let mut index = HashMap::with_capacity(symbols.len());
        for (i, (&symbol, row)) in symbols.iter().zip(&values).enumerate() {
            if row.len() != symbols.len() {
                return Err(SimilarityMatrixError::RowLength {
                    symbol,
                    found: row.len(),
                    expected: symbols.len(),
                });
            }
            if index.insert(symbol, i).is_some() {
                return Err(SimilarityMatrixError::DuplicateSymbol(symbol));
            }
        }
        Ok(Self {
            symbols,
            values,
            index,
        })
    }

    /// 1 on the diagonal, 0 elsewhere.
    pub fn identity(symbols: &[char]) -> Self {
        let n = symbols.len();
        let values = (0..n)
            .map(|i| (0..n).map(|j| if i == j { 1.0 } else { 0.0 }).collect())
            .collect();
        Self {
            symbols: symbols.to_vec(),
            values,
            index: symbols.iter().enumerate().map(|(i, &c)| (c, i)).collect(),
        }
    }

    /// Sign-flips every score, turning a distance into a similarity.
    pub fn inverted(mut self) -> Self {
        self.values
            .iter_mut()
            .flat_map(|row| row.iter_mut())
            .for_each(|v| *v = -*v);
        self
    }

    #[inline]
    pub fn value(&self, a: char, b: char) -> Option<f64> {
        let i = *self.index.get(&a)?;
        let j = *self.index.get(&b)?;
        Some(self.values[i][j])
    }

    pub fn symbols(&self) -> &[char] {
        &self.symbols
    }
}

impl TryFrom<DenseSimilarity> for SimilarityMatrix {
    type Error = SimilarityMatrixError;

    fn try_from(dense: DenseSimilarity) -> Result<Self, Self::Error> {
        Self::new(dense.symbols, dense.values)
    }
}

impl From<SimilarityMatrix> for DenseSimilarity {
    fn from(matrix: SimilarityMatrix) -> Self {
        Self {
            symbols: matrix.symbols,
            values: matrix.values,
        }
    }
}

/// A known allele and its environment similarity to the allele being ranked.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub allele: usize,
    pub similarity: f64,
}

/// Per motif position, candidates sorted from most to least similar.
pub type Ranking = Vec<Vec<Candidate>>;

/// Weighted residue-by-residue comparison of binding environments.
#[derive(Clone, Copy)]
pub struct EnvironmentComparer<'a> {
    keys: &'a KeyPositions,
    matrix: &'a SimilarityMatrix,
}

impl<'a> EnvironmentComparer<'a> {
    pub fn new(keys: &'a KeyPositions, matrix: &'a SimilarityMatrix) -> Self {
        Self { keys, matrix }
    }

    /// Sum over key columns of `similarity(a_i, b_i) * weight_i`. Pairs missing from the
    /// similarity matrix contribute 0 and are reported.
    pub fn compare_envs(
        &self,
        env_a: &str,
        env_b: &str,
        position: usize,
        report: &mut BatchReport,
    ) -> f64 {
        env_a
            .chars()
            .zip(env_b.chars())
            .zip(self.keys.columns(position))
            .map(|((a, b), key)| match self.matrix.value(a, b) {
                Some(v) => v * key.weight,
                None => {
                    report.push(Diagnostic::UnknownResiduePair { left: a, right: b });
                    0.0
                }
            })
            .sum()
    }

    /// Similarity of two known alleles' own environments at `position`.
    pub fn compare(
        &self,
        envs: &EnvironmentTable,
        allele_a: &str,
        allele_b: &str,
        position: usize,
        report: &mut BatchReport,
    ) -> f64 {
        match (envs.get(allele_a, position), envs.get(allele_b, position)) {
            (Some(a), Some(b)) => self.compare_envs(a, b, position, report),
            _ => 0.0,
        }
    }

    /// Mean similarity of `env` to every environment pooled into `allele`'s group at
    /// `position`.
    pub fn compare_global(
        &self,
        env: &str,
        allele: usize,
        position: usize,
        context: RankingContext<'_>,
        report: &mut BatchReport,
    ) -> f64 {
        let group = context.fusion.group(position, allele);
        let total: f64 = group
            .iter()
            .map(|&member| {
                context
                    .envs
                    .get(context.alleles.name(member), position)
                    .map_or(0.0, |other| self.compare_envs(env, other, position, report))
            })
            .sum();
        total / group.len() as f64
    }

    /// Ranks every known allele other than `target` by similarity of its own environment
    /// to `target`'s, one list per motif position.
    pub fn rank_known(
        &self,
        target: usize,
        context: RankingContext<'_>,
        report: &mut BatchReport,
    ) -> Ranking {
        let name = context.alleles.name(target);
        (0..self.keys.motif_length())
            .map(|position| {
                let candidates = context
                    .alleles
                    .iter()
                    .filter(|&(i, _)| i != target)
                    .map(|(i, other)| Candidate {
                        allele: i,
                        similarity: self.compare(context.envs, name, other, position, report),
                    })
                    .collect();
                sort_candidates(candidates, context.alleles)
            })
            .collect()
    }

    /// Ranks every known allele by the global similarity of its fusion group to the
    /// given per-position environments.
    pub fn rank_global(
        &self,
        envs: &[String],
        context: RankingContext<'_>,
        report: &mut BatchReport,
    ) -> Ranking {
        envs.iter()
            .enumerate()
            .map(|(position, env)| {
                let candidates = context
                    .alleles
                    .iter()
                    .map(|(i, _)| Candidate {
                        allele: i,
                        similarity: self.compare_global(env, i, position, context, report),
                    })
                    .collect();
                sort_candidates(candidates, context.alleles)
            })
            .collect()
    }
}

/// The allele-level state a ranking reads.
#[derive(Clone, Copy)]
pub struct RankingContext<'a> {
    pub alleles: &'a AlleleIndex,
    pub envs: &'a EnvironmentTable,
    pub fusion: &'a FusionMap,
}

/// Descending by similarity, then descending by allele identifier.
fn sort_candidates(mut candidates: Vec<Candidate>, alleles: &AlleleIndex) -> Vec<Candidate> {
    candidates.sort_by(|a, b| match b.similarity.total_cmp(&a.similarity) {
        Ordering::Equal => alleles.name(b.allele).cmp(alleles.name(a.allele)),
        other => other,
    });
    candidates
}
