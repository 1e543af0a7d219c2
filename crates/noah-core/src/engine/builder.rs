use super::background::{Background, BackgroundMode, compute_background};
use super::config::{RefinementConfig, TrainingConfig};
use super::context::RefinementContext;
use super::error::EngineError;
use super::pool::WorkerPool;
use super::progress::ProgressReporter;
use super::tasks::refinement;
use crate::core::diagnostics::{BatchReport, Diagnostic};
use crate::core::environment::fusion::FusionMap;
use crate::core::models::dataset::{TestData, TrainingData};
use crate::core::models::label::BindingLabel;
use crate::core::models::matrix::{Matrix3, add_assign, normalize};
use crate::core::models::params::ModelParams;
use crate::core::scoring::Scorer;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Tallies, at `(position, allele, residue)`, every residue of every peptide in `pairs`.
///
/// Pairs naming an allele outside the model, residues outside the alphabet and the
/// residues of a peptide beyond the motif length are skipped and reported.
pub fn count<'a, I>(params: &ModelParams, pairs: I, matrix: &mut Matrix3, report: &mut BatchReport)
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let motif_length = params.motif_length();
    for (allele, peptide) in pairs {
        let Some(a) = params.alleles.index_of(allele) else {
            report.push(Diagnostic::MissingAlleleData {
                allele: allele.to_string(),
            });
            continue;
        };
        for (position, residue) in peptide.chars().enumerate() {
            if position >= motif_length {
                report.push(Diagnostic::LengthMismatch {
                    allele: allele.to_string(),
                    peptide: peptide.to_string(),
                    expected: motif_length,
                });
                break;
            }
            match params.alphabet.index_of(residue) {
                Some(r) => matrix.increment(position, a, r),
                None => report.push(Diagnostic::UnrecognizedResidue {
                    allele: allele.to_string(),
                    peptide: peptide.to_string(),
                    position,
                    residue,
                }),
            }
        }
    }
}

/// Elementwise `-log2(frequency / background)`. Lower values mark residues enriched
/// among binders.
pub fn compute_likelihood(frequencies: &Matrix3, background: &Background) -> Matrix3 {
    let (positions, alleles, residues) = frequencies.shape();
    let mut likelihood = Matrix3::zeros(positions, alleles, residues);
    for position in 0..positions {
        for allele in 0..alleles {
            let bg = background.row(allele);
            let freq = frequencies.row(position, allele);
            for ((out, &f), &b) in likelihood
                .row_mut(position, allele)
                .iter_mut()
                .zip(freq)
                .zip(bg)
            {
                *out = -(f / b).log2();
            }
        }
    }
    likelihood
}

/// Mutable training state: the raw counts and the live fusion map a [`Scorer`] is built
/// from.
///
/// Counting happens once in [`ModelBuilder::initialize`]. Every build afterwards reads
/// the counts without changing them, so any number of candidate models can be built from
/// the same builder, including concurrently.
#[derive(Debug, Clone)]
pub struct ModelBuilder {
    params: Arc<ModelParams>,
    pseudocount: f64,
    background: BackgroundMode,
    signal: Matrix3,
    negatives: Matrix3,
    everything: Matrix3,
    fusion: FusionMap,
}

impl ModelBuilder {
    pub fn new(params: Arc<ModelParams>, pseudocount: f64, background: BackgroundMode) -> Self {
        let shape = (
            params.motif_length(),
            params.alleles.len(),
            params.alphabet.len(),
        );
        let zeros = || Matrix3::zeros(shape.0, shape.1, shape.2);
        Self {
            fusion: FusionMap::singletons(shape.0, shape.1),
            signal: zeros(),
            negatives: zeros(),
            everything: zeros(),
            params,
            pseudocount,
            background,
        }
    }

    pub fn from_config(params: Arc<ModelParams>, config: &TrainingConfig) -> Self {
        Self::new(params, config.pseudocount, config.background)
    }

    pub fn params(&self) -> &ModelParams {
        &self.params
    }

    pub fn fusion(&self) -> &FusionMap {
        &self.fusion
    }

    pub fn background_mode(&self) -> BackgroundMode {
        self.background
    }

    pub fn set_background_mode(&mut self, mode: BackgroundMode) {
        self.background = mode;
    }

    /// Counts Positive-High peptides as signal, Negative peptides as background and every
    /// peptide toward the all-labels background.
    #[instrument(skip_all, name = "model_initialization")]
    pub fn initialize(&mut self, data: &TrainingData, report: &mut BatchReport) {
        count(
            &self.params,
            data.pairs(BindingLabel::PositiveHigh),
            &mut self.signal,
            report,
        );
        count(
            &self.params,
            data.pairs(BindingLabel::Negative),
            &mut self.negatives,
            report,
        );
        count(&self.params, data.all_pairs(), &mut self.everything, report);
        info!(
            alleles = self.params.alleles.len(),
            motif_length = self.params.motif_length(),
            "Training counts initialized."
        );
    }

    /// Per position and allele, the pseudocount-smoothed signal counts pooled over the
    /// allele's fusion group, normalized to sum to 1.
    pub fn compute_frequencies(&self, fusion: &FusionMap) -> Matrix3 {
        let (positions, alleles, residues) = self.signal.shape();
        let mut frequencies = Matrix3::zeros(positions, alleles, residues);
        for position in 0..positions {
            for allele in 0..alleles {
                let row = frequencies.row_mut(position, allele);
                for &member in fusion.group(position, allele) {
                    add_assign(row, self.signal.row(position, member));
                    row.iter_mut().for_each(|v| *v += self.pseudocount);
                }
                normalize(row);
            }
        }
        frequencies
    }

    pub fn compute_background(&self, fusion: &FusionMap) -> Background {
        let counts = if self.background.uses_all_labels() {
            &self.everything
        } else {
            &self.negatives
        };
        compute_background(self.background, counts, fusion)
    }

    /// Builds a scorer from the live fusion map.
    pub fn build(&self) -> Scorer {
        self.build_with(&self.fusion)
    }

    /// Builds a scorer from the current counts and `fusion` in place of the live map.
    pub fn build_with(&self, fusion: &FusionMap) -> Scorer {
        let frequencies = self.compute_frequencies(fusion);
        let background = self.compute_background(fusion);
        let likelihood = compute_likelihood(&frequencies, &background);
        Scorer::new(self.params.clone(), fusion.clone(), likelihood)
    }

    /// Adds `members` to `allele`'s group at `position`. Existing members are kept.
    pub(crate) fn extend_fusion(&mut self, position: usize, allele: usize, members: &[usize]) {
        for &member in members {
            self.fusion.append(position, allele, member);
        }
    }

    /// Grows the fusion map against held-out `test_data`, then builds the final scorer.
    pub fn refine(
        &mut self,
        test_data: &TestData,
        config: &RefinementConfig,
        workers: usize,
        reporter: &ProgressReporter,
        report: &mut BatchReport,
    ) -> Result<Scorer, EngineError> {
        let pool = WorkerPool::new(workers)?;
        let context = RefinementContext::new(self, test_data, config, reporter);
        let rankings = refinement::rank_candidates(&context, report);
        let outcome = refinement::run(&context, &rankings, &pool)?;

        let before = self.fusion.fused_count();
        for fusions in &outcome.accepted {
            for (position, members) in fusions.positions.iter().enumerate() {
                self.extend_fusion(position, fusions.allele, members);
            }
        }
        report.merge(outcome.report);
        debug!(
            added = self.fusion.fused_count() - before,
            "Merged accepted fusions."
        );
        Ok(self.build())
    }
}
