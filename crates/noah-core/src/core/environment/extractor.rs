use super::keys::KeyPositions;
use crate::core::diagnostics::{BatchReport, Diagnostic};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per allele, the environment string of every motif position.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentTable {
    environments: BTreeMap<String, Vec<String>>,
}

impl EnvironmentTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Extracts the environments of every allele in `alignment`. Alleles whose sequence is
    /// too short for a key column are reported and left out.
    pub fn extract<'a, I>(keys: &KeyPositions, alignment: I, report: &mut BatchReport) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut table = Self::new();
        for (allele, sequence) in alignment {
            if let Some(envs) = extract_allele(keys, allele, sequence, report) {
                table.environments.insert(allele.to_string(), envs);
            }
        }
        table
    }

    pub fn insert(&mut self, allele: &str, environments: Vec<String>) {
        self.environments.insert(allele.to_string(), environments);
    }

    pub fn get(&self, allele: &str, position: usize) -> Option<&str> {
        self.environments
            .get(allele)
            .and_then(|envs| envs.get(position))
            .map(String::as_str)
    }

    pub fn environments(&self, allele: &str) -> Option<&[String]> {
        self.environments.get(allele).map(Vec::as_slice)
    }

    pub fn contains(&self, allele: &str) -> bool {
        self.environments.contains_key(allele)
    }

    pub fn alleles(&self) -> impl Iterator<Item = &str> {
        self.environments.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.environments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.environments.is_empty()
    }
}

/// Concatenates, for each motif position, the residues at that position's key columns.
pub fn extract_allele(
    keys: &KeyPositions,
    allele: &str,
    sequence: &str,
    report: &mut BatchReport,
) -> Option<Vec<String>> {
    let residues: Vec<char> = sequence.chars().collect();
    let mut envs = Vec::with_capacity(keys.motif_length());
    for position in 0..keys.motif_length() {
        let mut env = String::with_capacity(keys.columns(position).len());
        for key in keys.columns(position) {
            match residues.get(key.column) {
                Some(&residue) => env.push(residue),
                None => {
                    report.push(Diagnostic::ColumnOutOfRange {
                        allele: allele.to_string(),
                        column: key.column,
                        sequence_length: residues.len(),
                    });
                    return None;
                }
            }
        }
        envs.push(env);
    }
    Some(envs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys() -> KeyPositions {
        KeyPositions::uniform(vec![vec![0, 2], vec![3, 1, 4]]).unwrap()
    }

    #[test]
    fn environments_follow_key_column_order() {
        let mut report = BatchReport::new();
        let envs = extract_allele(&keys(), "X", "ABCDE", &mut report).unwrap();
        assert_eq!(envs, vec!["AC".to_string(), "DBE".to_string()]);
        assert!(report.is_empty());
    }

    #[test]
    fn short_sequences_are_reported_and_excluded() {
        let mut report = BatchReport::new();
        let alignment = [("X", "ABCDE"), ("Short", "ABC")];
        let table = EnvironmentTable::extract(&keys(), alignment, &mut report);

        assert_eq!(table.len(), 1);
        assert_eq!(table.get("X", 1), Some("DBE"));
        assert!(!table.contains("Short"));
        assert!(report.contains(&Diagnostic::ColumnOutOfRange {
            allele: "Short".to_string(),
            column: 3,
            sequence_length: 3,
        }));
    }
}
