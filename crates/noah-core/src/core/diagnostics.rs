use std::collections::BTreeSet;
use std::fmt;
use tracing::warn;

/// A recoverable, per-item problem. The affected item is skipped or defaulted and
/// processing continues.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Diagnostic {
    /// Data was supplied for an allele that is not part of the model.
    MissingAlleleData { allele: String },
    /// A peptide symbol outside the alphabet; that position contributed nothing.
    UnrecognizedResidue {
        allele: String,
        peptide: String,
        position: usize,
        residue: char,
    },
    /// A training peptide longer than the motif; the surplus positions were not counted.
    LengthMismatch {
        allele: String,
        peptide: String,
        expected: usize,
    },
    /// A key alignment column beyond the end of an allele's sequence.
    ColumnOutOfRange {
        allele: String,
        column: usize,
        sequence_length: usize,
    },
    /// A residue pair absent from the similarity matrix; it scored 0.
    UnknownResiduePair { left: char, right: char },
    /// Scores for this allele were interpolated from its nearest known neighbors.
    DeNovoProfile { allele: String },
}

impl Diagnostic {
    /// The allele the diagnostic refers to, when there is one.
    pub fn allele(&self) -> Option<&str> {
        match self {
            Diagnostic::MissingAlleleData { allele }
            | Diagnostic::UnrecognizedResidue { allele, .. }
            | Diagnostic::LengthMismatch { allele, .. }
            | Diagnostic::ColumnOutOfRange { allele, .. }
            | Diagnostic::DeNovoProfile { allele } => Some(allele),
            Diagnostic::UnknownResiduePair { .. } => None,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::MissingAlleleData { allele } => {
                write!(f, "no model data for allele '{}'", allele)
            }
            Diagnostic::UnrecognizedResidue {
                allele,
                peptide,
                position,
                residue,
            } => write!(
                f,
                "'{}' is not a valid residue, skipping position {} of peptide {} (allele '{}')",
                residue, position, peptide, allele
            ),
            Diagnostic::LengthMismatch {
                allele,
                peptide,
                expected,
            } => write!(
                f,
                "peptide {} for allele '{}' is longer than the motif length {}",
                peptide, allele, expected
            ),
            Diagnostic::ColumnOutOfRange {
                allele,
                column,
                sequence_length,
            } => write!(
                f,
                "alignment column {} is out of range for allele '{}' (sequence length {})",
                column, allele, sequence_length
            ),
            Diagnostic::UnknownResiduePair { left, right } => {
                write!(f, "unknown residue pair ({}, {}) scored as 0", left, right)
            }
            Diagnostic::DeNovoProfile { allele } => {
                write!(f, "allele '{}' scored with a de-novo profile", allele)
            }
        }
    }
}

/// Collects the diagnostics raised while processing a batch, reported separately
/// from the batch's results.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    diagnostics: BTreeSet<Diagnostic>,
}

impl BatchReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a diagnostic. Each distinct diagnostic is logged once, the first time it
    /// is seen.
    pub fn push(&mut self, diagnostic: Diagnostic) {
        if !self.diagnostics.contains(&diagnostic) {
            warn!("{}", diagnostic);
            self.diagnostics.insert(diagnostic);
        }
    }

    pub fn merge(&mut self, other: BatchReport) {
        for diagnostic in other.diagnostics {
            self.push(diagnostic);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter()
    }

    pub fn contains(&self, diagnostic: &Diagnostic) -> bool {
        self.diagnostics.contains(diagnostic)
    }

    /// Alleles with at least one diagnostic attached.
    pub fn flagged_alleles(&self) -> BTreeSet<&str> {
        self.diagnostics.iter().filter_map(Diagnostic::allele).collect()
    }

    /// `(allele, peptide)` items whose score skipped at least one residue.
    pub fn flagged_peptides(&self) -> BTreeSet<(&str, &str)> {
        self.diagnostics
            .iter()
            .filter_map(|d| match d {
                Diagnostic::UnrecognizedResidue {
                    allele, peptide, ..
                } => Some((allele.as_str(), peptide.as_str())),
                _ => None,
            })
            .collect()
    }
}
