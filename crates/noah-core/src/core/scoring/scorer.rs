use super::ScoringError;
use super::metrics::{ConfusionMatrix, round3};
use super::window::sliding_variants;
use crate::core::diagnostics::{BatchReport, Diagnostic};
use crate::core::environment::extractor::extract_allele;
use crate::core::environment::fusion::FusionMap;
use crate::core::models::dataset::TestData;
use crate::core::models::label::BindingLabel;
use crate::core::models::matrix::{Matrix3, add_assign};
use crate::core::models::params::ModelParams;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

/// allele -> peptide -> score
pub type ScoreTable = BTreeMap<String, BTreeMap<String, f64>>;

/// Position x residue likelihoods interpolated for an allele the model never saw.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    rows: Vec<Vec<f64>>,
}

impl Profile {
    pub fn row(&self, position: usize) -> &[f64] {
        &self.rows[position]
    }
}

/// Per-session state for de-novo scoring; never persisted with the model.
#[derive(Debug, Clone, Default)]
struct DeNovoSession {
    sequences: BTreeMap<String, Vec<String>>,
    profiles: BTreeMap<String, Profile>,
}

#[derive(Clone, Copy)]
enum Target<'a> {
    Known(usize),
    DeNovo(&'a Profile),
}

/// A trained binding model. Scores are sums of per-position log-likelihoods where lower
/// means stronger predicted binding.
///
/// The likelihood matrix and fusion map are fixed at construction. The only state that
/// changes afterwards is the de-novo session: loaded sequences for unseen alleles and the
/// profiles derived from them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scorer {
    params: Arc<ModelParams>,
    fusion: FusionMap,
    likelihood: Matrix3,
    #[serde(skip)]
    session: DeNovoSession,
}

impl Scorer {
    pub(crate) fn new(params: Arc<ModelParams>, fusion: FusionMap, likelihood: Matrix3) -> Self {
        Self {
            params,
            fusion,
            likelihood,
            session: DeNovoSession::default(),
        }
    }

    pub fn params(&self) -> &ModelParams {
        &self.params
    }

    pub fn fusion(&self) -> &FusionMap {
        &self.fusion
    }

    pub fn likelihood(&self) -> &Matrix3 {
        &self.likelihood
    }

    #[inline]
    pub fn motif_length(&self) -> usize {
        self.params.motif_length()
    }

    pub fn de_novo_profile(&self, allele: &str) -> Option<&Profile> {
        self.session.profiles.get(allele)
    }

    /// Whether `allele` can be scored without further preparation.
    pub fn is_ready(&self, allele: &str) -> bool {
        self.params.alleles.contains(allele) || self.session.profiles.contains_key(allele)
    }

    fn target(&self, allele: &str) -> Result<Target<'_>, ScoringError> {
        if let Some(index) = self.params.alleles.index_of(allele) {
            Ok(Target::Known(index))
        } else if let Some(profile) = self.session.profiles.get(allele) {
            Ok(Target::DeNovo(profile))
        } else {
            Err(ScoringError::UnpreparedAllele(allele.to_string()))
        }
    }

    #[inline]
    fn row<'s>(&'s self, target: Target<'s>, position: usize) -> &'s [f64] {
        match target {
            Target::Known(allele) => self
                .likelihood
                .row(position, self.fusion.representative(position, allele)),
            Target::DeNovo(profile) => profile.row(position),
        }
    }

    fn sum_likelihood(
        &self,
        peptide: &str,
        allele: &str,
        target: Target<'_>,
        mut report: Option<&mut BatchReport>,
    ) -> f64 {
        let mut score = 0.0;
        for (position, residue) in peptide.chars().take(self.motif_length()).enumerate() {
            match self.params.alphabet.index_of(residue) {
                Some(r) => score += self.row(target, position)[r],
                None => {
                    if let Some(report) = report.as_deref_mut() {
                        report.push(Diagnostic::UnrecognizedResidue {
                            allele: allele.to_string(),
                            peptide: peptide.to_string(),
                            position,
                            residue,
                        });
                    }
                }
            }
        }
        score
    }

    /// Lowest unrounded score over the sliding-window variants.
    fn best_variant(&self, peptide: &str, allele: &str, target: Target<'_>) -> f64 {
        sliding_variants(peptide, self.motif_length())
            .iter()
            .map(|variant| self.sum_likelihood(variant, allele, target, None))
            .fold(f64::INFINITY, f64::min)
    }

    /// Reports residues of `peptide` outside the alphabet. Positions index the peptide as
    /// given, before any sliding-window padding or deletion.
    fn report_unrecognized(&self, peptide: &str, allele: &str, report: &mut BatchReport) {
        for (position, residue) in peptide.chars().enumerate() {
            if !self.params.alphabet.contains(residue) {
                report.push(Diagnostic::UnrecognizedResidue {
                    allele: allele.to_string(),
                    peptide: peptide.to_string(),
                    position,
                    residue,
                });
            }
        }
    }

    fn unrounded_score(
        &self,
        peptide: &str,
        allele: &str,
        target: Target<'_>,
        report: &mut BatchReport,
    ) -> f64 {
        if peptide.chars().count() == self.motif_length() {
            self.sum_likelihood(peptide, allele, target, Some(report))
        } else {
            self.report_unrecognized(peptide, allele, report);
            self.best_variant(peptide, allele, target)
        }
    }

    /// Scores `peptide` for a known or already prepared allele, rounded to 3 decimals.
    ///
    /// Motif-length peptides are summed directly; any other length goes through the
    /// sliding window. Residues outside the alphabet contribute 0 and are reported.
    pub fn score(
        &self,
        peptide: &str,
        allele: &str,
        report: &mut BatchReport,
    ) -> Result<f64, ScoringError> {
        let target = self.target(allele)?;
        Ok(round3(self.unrounded_score(peptide, allele, target, report)))
    }

    /// Scores `peptide` against every requested allele.
    ///
    /// A request naming a known allele scores that allele; otherwise every known allele
    /// containing the request as a substring is scored; otherwise the request is scored
    /// de novo, which requires its sequence to have been loaded.
    pub fn score_peptide(
        &mut self,
        peptide: &str,
        alleles: &[&str],
        report: &mut BatchReport,
    ) -> Result<ScoreTable, ScoringError> {
        let resolved = self.resolve_alleles(alleles, report)?;
        let mut table = ScoreTable::new();
        for allele in resolved {
            let score = self.score(peptide, &allele, report)?;
            table
                .entry(allele)
                .or_default()
                .insert(peptide.to_string(), score);
        }
        Ok(table)
    }

    /// Expands allele requests into scoreable alleles, building de-novo profiles as
    /// needed. The result keeps request order without duplicates.
    pub fn resolve_alleles(
        &mut self,
        requests: &[&str],
        report: &mut BatchReport,
    ) -> Result<Vec<String>, ScoringError> {
        if requests.is_empty() {
            return Err(ScoringError::NoAlleles);
        }
        let mut resolved: Vec<String> = Vec::new();
        let push = |allele: &str, resolved: &mut Vec<String>| {
            if !resolved.iter().any(|a| a == allele) {
                resolved.push(allele.to_string());
            }
        };
        for &request in requests {
            if self.is_ready(request) {
                push(request, &mut resolved);
                continue;
            }
            let matches: Vec<String> = self
                .params
                .alleles
                .matching(request)
                .into_iter()
                .map(str::to_string)
                .collect();
            if matches.is_empty() {
                info!(allele = request, "Allele not known, making a de-novo prediction.");
                self.prepare_de_novo(request, report)?;
                push(request, &mut resolved);
            } else {
                debug!(request, matches = matches.len(), "Expanded allele request.");
                for allele in &matches {
                    push(allele, &mut resolved);
                }
            }
        }
        Ok(resolved)
    }

    /// Registers aligned sequences of alleles that may be scored de novo. Sequences too
    /// short for the key columns are reported and skipped.
    pub fn load_sequences<'a, I>(&mut self, alignment: I, report: &mut BatchReport)
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        for (allele, sequence) in alignment {
            if let Some(envs) = extract_allele(&self.params.key_positions, allele, sequence, report)
            {
                self.session.sequences.insert(allele.to_string(), envs);
            }
        }
    }

    /// Builds and caches the de-novo profile of an unseen allele.
    ///
    /// At each position, known alleles are ranked by the mean similarity of their fusion
    /// group's environments to the unseen allele's environment. The likelihood rows of the
    /// group representatives of all alleles tied for the best similarity are averaged.
    pub fn prepare_de_novo(
        &mut self,
        allele: &str,
        report: &mut BatchReport,
    ) -> Result<(), ScoringError> {
        if self.session.profiles.contains_key(allele) {
            return Ok(());
        }
        let envs = self
            .session
            .sequences
            .get(allele)
            .ok_or_else(|| ScoringError::MissingSequence(allele.to_string()))?;

        let ranking = self.params.comparer().rank_global(
            envs,
            self.params.ranking_context(&self.fusion),
            report,
        );

        let residues = self.params.alphabet.len();
        let mut rows = Vec::with_capacity(ranking.len());
        for (position, candidates) in ranking.iter().enumerate() {
            let mut row = vec![0.0; residues];
            let Some(best) = candidates.first().map(|c| c.similarity) else {
                rows.push(row);
                continue;
            };
            let tied: Vec<usize> = candidates
                .iter()
                .take_while(|c| c.similarity == best)
                .map(|c| c.allele)
                .collect();
            for &known in &tied {
                let representative = self.fusion.representative(position, known);
                add_assign(&mut row, self.likelihood.row(position, representative));
            }
            let count = tied.len() as f64;
            row.iter_mut().for_each(|v| *v /= count);
            rows.push(row);
        }

        report.push(Diagnostic::DeNovoProfile {
            allele: allele.to_string(),
        });
        self.session
            .profiles
            .insert(allele.to_string(), Profile { rows });
        Ok(())
    }

    /// Confusion counts over held-out peptides of the selected alleles (all known alleles
    /// when `alleles` is `None`). Positive-High and Positive-Intermediate are positives,
    /// Negative is negative, other labels are ignored. Scores are not rounded.
    pub fn confusion_matrix(
        &self,
        threshold: f64,
        test_data: &TestData,
        alleles: Option<&[&str]>,
        report: &mut BatchReport,
    ) -> ConfusionMatrix {
        let mut matrix = ConfusionMatrix::default();
        for (allele, by_label) in test_data.iter() {
            if alleles.is_some_and(|selected| !selected.contains(&allele)) {
                continue;
            }
            let Ok(target) = self.target(allele) else {
                continue;
            };
            for (label, peptides) in by_label {
                let is_positive = match label {
                    BindingLabel::PositiveHigh | BindingLabel::PositiveIntermediate => true,
                    BindingLabel::Negative => false,
                    BindingLabel::Positive | BindingLabel::PositiveLow => continue,
                };
                for peptide in peptides {
                    let score = self.unrounded_score(peptide, allele, target, report);
                    matrix.record(score, threshold, is_positive);
                }
            }
        }
        matrix
    }

    /// Matthews correlation coefficient of the model's predictions at `threshold`,
    /// rounded to 3 decimals. See [`ConfusionMatrix::mcc`] for the degenerate case.
    pub fn score_mcc(
        &self,
        threshold: f64,
        test_data: &TestData,
        alleles: Option<&[&str]>,
        report: &mut BatchReport,
    ) -> f64 {
        round3(
            self.confusion_matrix(threshold, test_data, alleles, report)
                .mcc(),
        )
    }

    /// The likelihood table an allele is scored with: one residue -> likelihood map per
    /// motif position.
    pub fn motif(&self, allele: &str) -> Option<Vec<BTreeMap<char, f64>>> {
        let target = self.target(allele).ok()?;
        Some(
            (0..self.motif_length())
                .map(|position| {
                    self.params
                        .alphabet
                        .symbols()
                        .iter()
                        .copied()
                        .zip(self.row(target, position).iter().copied())
                        .collect()
                })
                .collect(),
        )
    }
}
