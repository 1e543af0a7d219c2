use super::alphabet::Alphabet;
use super::label::BindingLabel;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{debug, info};

pub const DEFAULT_MIN_SIGNAL: usize = 50;
pub const DEFAULT_MIN_BACKGROUND: usize = 10;

pub type PeptideSet = BTreeSet<String>;

/// One observation: a peptide tested against an allele, optionally with its outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeptideRecord {
    pub peptide: String,
    pub allele: String,
    pub label: Option<BindingLabel>,
}

impl PeptideRecord {
    pub fn new(peptide: impl Into<String>, allele: impl Into<String>) -> Self {
        Self {
            peptide: peptide.into(),
            allele: allele.into(),
            label: None,
        }
    }

    pub fn labeled(
        peptide: impl Into<String>,
        allele: impl Into<String>,
        label: BindingLabel,
    ) -> Self {
        Self {
            peptide: peptide.into(),
            allele: allele.into(),
            label: Some(label),
        }
    }
}

/// Training view: label -> allele -> peptides.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrainingData {
    by_label: BTreeMap<BindingLabel, BTreeMap<String, PeptideSet>>,
}

impl TrainingData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, label: BindingLabel, allele: &str, peptide: &str) {
        self.by_label
            .entry(label)
            .or_default()
            .entry(allele.to_string())
            .or_default()
            .insert(peptide.to_string());
    }

    pub fn with(mut self, label: BindingLabel, allele: &str, peptides: &[&str]) -> Self {
        for peptide in peptides {
            self.insert(label, allele, peptide);
        }
        self
    }

    pub fn label(&self, label: BindingLabel) -> Option<&BTreeMap<String, PeptideSet>> {
        self.by_label.get(&label)
    }

    /// Every `(allele, peptide)` pair carrying `label`.
    pub fn pairs(&self, label: BindingLabel) -> impl Iterator<Item = (&str, &str)> {
        self.by_label
            .get(&label)
            .into_iter()
            .flat_map(|by_allele| by_allele.iter())
            .flat_map(|(allele, peptides)| {
                peptides.iter().map(move |p| (allele.as_str(), p.as_str()))
            })
    }

    /// Every `(allele, peptide)` pair regardless of label.
    pub fn all_pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.by_label.keys().flat_map(move |label| self.pairs(*label))
    }

    pub fn count(&self, label: BindingLabel, allele: &str) -> usize {
        self.by_label
            .get(&label)
            .and_then(|by_allele| by_allele.get(allele))
            .map_or(0, BTreeSet::len)
    }

    fn remove(&mut self, label: BindingLabel, allele: &str, peptide: &str) {
        if let Some(peptides) = self
            .by_label
            .get_mut(&label)
            .and_then(|by_allele| by_allele.get_mut(allele))
        {
            peptides.remove(peptide);
        }
    }
}

/// Held-out view: allele -> label -> peptides.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestData {
    by_allele: BTreeMap<String, BTreeMap<BindingLabel, PeptideSet>>,
}

impl TestData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, allele: &str, label: BindingLabel, peptide: &str) {
        self.by_allele
            .entry(allele.to_string())
            .or_default()
            .entry(label)
            .or_default()
            .insert(peptide.to_string());
    }

    pub fn with(mut self, allele: &str, label: BindingLabel, peptides: &[&str]) -> Self {
        for peptide in peptides {
            self.insert(allele, label, peptide);
        }
        self
    }

    pub fn allele(&self, allele: &str) -> Option<&BTreeMap<BindingLabel, PeptideSet>> {
        self.by_allele.get(allele)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &BTreeMap<BindingLabel, PeptideSet>)> {
        self.by_allele.iter().map(|(a, labels)| (a.as_str(), labels))
    }

    fn remove(&mut self, allele: &str, label: BindingLabel, peptide: &str) {
        if let Some(peptides) = self
            .by_allele
            .get_mut(allele)
            .and_then(|labels| labels.get_mut(&label))
        {
            peptides.remove(peptide);
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CuratedDataset {
    pub training: TrainingData,
    pub test: TestData,
    /// Alleles with enough signal and background data, sorted.
    pub alleles: Vec<String>,
}

/// Filters raw observations down to the data a model can be trained on.
pub struct DatasetCurator<'a> {
    alphabet: &'a Alphabet,
    motif_length: usize,
    min_signal: usize,
    min_background: usize,
}

impl<'a> DatasetCurator<'a> {
    pub fn new(alphabet: &'a Alphabet, motif_length: usize) -> Self {
        Self {
            alphabet,
            motif_length,
            min_signal: DEFAULT_MIN_SIGNAL,
            min_background: DEFAULT_MIN_BACKGROUND,
        }
    }

    pub fn min_signal(mut self, count: usize) -> Self {
        self.min_signal = count;
        self
    }

    pub fn min_background(mut self, count: usize) -> Self {
        self.min_background = count;
        self
    }

    /// Keeps labeled records of aligned alleles whose peptide has the motif length and
    /// only alphabet symbols, removes peptides reported under conflicting labels, and
    /// selects the alleles meeting both data minimums.
    pub fn curate<'r, I>(&self, records: I, alignment: &HashMap<String, String>) -> CuratedDataset
    where
        I: IntoIterator<Item = &'r PeptideRecord>,
    {
        let mut training = TrainingData::new();
        let mut test = TestData::new();
        let mut seen: BTreeMap<(&str, &str), BTreeSet<BindingLabel>> = BTreeMap::new();
        let mut rejected = 0usize;

        for record in records {
            let Some(label) = record.label else {
                rejected += 1;
                continue;
            };
            if record.peptide.is_empty()
                || !alignment.contains_key(&record.allele)
                || record.peptide.chars().count() != self.motif_length
                || !self.alphabet.accepts(&record.peptide)
            {
                rejected += 1;
                continue;
            }
            seen.entry((record.allele.as_str(), record.peptide.as_str()))
                .or_default()
                .insert(label);
            training.insert(label, &record.allele, &record.peptide);
            test.insert(&record.allele, label, &record.peptide);
        }
        debug!(rejected, "Discarded records failing the alignment, length or alphabet checks.");

        let mut conflicts = 0usize;
        for ((allele, peptide), labels) in &seen {
            if labels.len() > 1 {
                conflicts += 1;
                for &label in labels {
                    training.remove(label, allele, peptide);
                    test.remove(allele, label, peptide);
                }
            }
        }
        debug!(conflicts, "Removed peptides with conflicting labels.");

        let mut alleles: Vec<String> = alignment
            .keys()
            .filter(|allele| {
                training.count(BindingLabel::PositiveHigh, allele) >= self.min_signal
                    && training.count(BindingLabel::Negative, allele) >= self.min_background
            })
            .cloned()
            .collect();
        alleles.sort();

        info!(
            alleles = alleles.len(),
            min_signal = self.min_signal,
            min_background = self.min_background,
            "Dataset curation complete."
        );
        CuratedDataset {
            training,
            test,
            alleles,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alignment(alleles: &[&str]) -> HashMap<String, String> {
        alleles
            .iter()
            .map(|a| (a.to_string(), "ACDE".to_string()))
            .collect()
    }

    #[test]
    fn training_pairs_iterate_one_label() {
        let data = TrainingData::new()
            .with(BindingLabel::PositiveHigh, "X", &["AA", "AC"])
            .with(BindingLabel::Negative, "X", &["CC"]);
        let pairs: Vec<_> = data.pairs(BindingLabel::PositiveHigh).collect();
        assert_eq!(pairs, vec![("X", "AA"), ("X", "AC")]);
        assert_eq!(data.all_pairs().count(), 3);
        assert_eq!(data.count(BindingLabel::Negative, "X"), 1);
        assert_eq!(data.count(BindingLabel::Negative, "Y"), 0);
    }

    #[test]
    fn curate_filters_invalid_records() {
        let alphabet = Alphabet::new(&['A', 'C']).unwrap();
        let records = vec![
            PeptideRecord::labeled("AA", "X", BindingLabel::PositiveHigh),
            PeptideRecord::labeled("AAA", "X", BindingLabel::PositiveHigh),
            PeptideRecord::labeled("AZ", "X", BindingLabel::PositiveHigh),
            PeptideRecord::labeled("AC", "Unaligned", BindingLabel::PositiveHigh),
            PeptideRecord::new("CC", "X"),
            PeptideRecord::labeled("CC", "X", BindingLabel::Negative),
        ];
        let curated = DatasetCurator::new(&alphabet, 2)
            .min_signal(1)
            .min_background(1)
            .curate(&records, &alignment(&["X"]));

        assert_eq!(curated.alleles, vec!["X".to_string()]);
        let signal: Vec<_> = curated.training.pairs(BindingLabel::PositiveHigh).collect();
        assert_eq!(signal, vec![("X", "AA")]);
        assert!(
            curated.test.allele("X").unwrap()[&BindingLabel::Negative].contains("CC")
        );
    }

    #[test]
    fn curate_removes_conflicting_labels_from_both_views() {
        let alphabet = Alphabet::new(&['A', 'C']).unwrap();
        let records = vec![
            PeptideRecord::labeled("AA", "X", BindingLabel::PositiveHigh),
            PeptideRecord::labeled("AA", "X", BindingLabel::Negative),
            PeptideRecord::labeled("AC", "X", BindingLabel::PositiveHigh),
            PeptideRecord::labeled("AC", "X", BindingLabel::PositiveHigh),
            PeptideRecord::labeled("CC", "X", BindingLabel::Negative),
        ];
        let curated = DatasetCurator::new(&alphabet, 2)
            .min_signal(1)
            .min_background(1)
            .curate(&records, &alignment(&["X"]));

        assert_eq!(curated.training.count(BindingLabel::PositiveHigh, "X"), 1);
        assert_eq!(curated.training.count(BindingLabel::Negative, "X"), 1);
        let test = curated.test.allele("X").unwrap();
        assert!(!test[&BindingLabel::PositiveHigh].contains("AA"));
        assert!(!test[&BindingLabel::Negative].contains("AA"));
    }

    #[test]
    fn curate_applies_data_minimums() {
        let alphabet = Alphabet::new(&['A', 'C']).unwrap();
        let records = vec![
            PeptideRecord::labeled("AA", "X", BindingLabel::PositiveHigh),
            PeptideRecord::labeled("AC", "X", BindingLabel::PositiveHigh),
            PeptideRecord::labeled("CC", "X", BindingLabel::Negative),
            PeptideRecord::labeled("AA", "Y", BindingLabel::PositiveHigh),
            PeptideRecord::labeled("CC", "Y", BindingLabel::Negative),
        ];
        let curated = DatasetCurator::new(&alphabet, 2)
            .min_signal(2)
            .min_background(1)
            .curate(&records, &alignment(&["X", "Y"]));
        assert_eq!(curated.alleles, vec!["X".to_string()]);
    }
}
