use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum KeyPositionError {
    #[error("Key positions cover {columns} motif positions but weights cover {weights}")]
    LengthMismatch { columns: usize, weights: usize },
    #[error("Motif position {position} has no key alignment columns")]
    EmptyPosition { position: usize },
    #[error("Negative evidence count {count} for column {column} at motif position {position}")]
    NegativeEvidence {
        position: usize,
        column: usize,
        count: f64,
    },
}

/// A structurally relevant alignment column and its normalized similarity weight.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KeyColumn {
    pub column: usize,
    pub weight: f64,
}

/// Per motif position, the ordered alignment columns that define its binding environment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyPositions {
    positions: Vec<Vec<KeyColumn>>,
}

impl KeyPositions {
    /// `columns[p]` lists the alignment columns of motif position `p` in environment order;
    /// `evidence[p]` maps each column to its crystallographic evidence count. Weights are
    /// normalized per position to sum to 1; a column without evidence weighs 0 and a
    /// position without any evidence falls back to uniform weights.
    pub fn new(
        columns: Vec<Vec<usize>>,
        evidence: &[HashMap<usize, f64>],
    ) -> Result<Self, KeyPositionError> {
        if columns.len() != evidence.len() {
            return Err(KeyPositionError::LengthMismatch {
                columns: columns.len(),
                weights: evidence.len(),
            });
        }

        let mut positions = Vec::with_capacity(columns.len());
        for (position, (cols, counts)) in columns.into_iter().zip(evidence).enumerate() {
            if cols.is_empty() {
                return Err(KeyPositionError::EmptyPosition { position });
            }
            let raw: Vec<f64> = cols
                .iter()
                .map(|c| counts.get(c).copied().unwrap_or(0.0))
                .collect();
            if let Some((&column, &count)) = cols.iter().zip(&raw).find(|(_, w)| **w < 0.0) {
                return Err(KeyPositionError::NegativeEvidence {
                    position,
                    column,
                    count,
                });
            }
            let total: f64 = raw.iter().sum();
            let uniform = 1.0 / cols.len() as f64;
            positions.push(
                cols.into_iter()
                    .zip(raw)
                    .map(|(column, w)| KeyColumn {
                        column,
                        weight: if total > 0.0 { w / total } else { uniform },
                    })
                    .collect(),
            );
        }
        Ok(Self { positions })
    }

    /// Every column weighted equally.
    pub fn uniform(columns: Vec<Vec<usize>>) -> Result<Self, KeyPositionError> {
        let evidence: Vec<HashMap<usize, f64>> = columns
            .iter()
            .map(|cols| cols.iter().map(|&c| (c, 1.0)).collect())
            .collect();
        Self::new(columns, &evidence)
    }

    pub fn motif_length(&self) -> usize {
        self.positions.len()
    }

    pub fn columns(&self, position: usize) -> &[KeyColumn] {
        &self.positions[position]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weights_are_normalized_per_position() {
        let evidence = vec![
            HashMap::from([(10, 3.0), (20, 1.0)]),
            HashMap::from([(5, 7.0)]),
        ];
        let keys = KeyPositions::new(vec![vec![10, 20], vec![5]], &evidence).unwrap();
        assert_eq!(keys.motif_length(), 2);
        let p0 = keys.columns(0);
        assert_eq!(p0[0].column, 10);
        assert!((p0[0].weight - 0.75).abs() < 1e-12);
        assert!((p0[1].weight - 0.25).abs() < 1e-12);
        assert_eq!(keys.columns(1)[0].weight, 1.0);
    }

    #[test]
    fn missing_evidence_weighs_zero_and_all_missing_is_uniform() {
        let evidence = vec![HashMap::from([(1, 2.0)]), HashMap::new()];
        let keys = KeyPositions::new(vec![vec![1, 2], vec![3, 4]], &evidence).unwrap();
        assert_eq!(keys.columns(0)[1].weight, 0.0);
        assert_eq!(keys.columns(1)[0].weight, 0.5);
        assert_eq!(keys.columns(1)[1].weight, 0.5);
    }

    #[test]
    fn invalid_tables_are_rejected() {
        assert!(matches!(
            KeyPositions::new(vec![vec![1]], &[]),
            Err(KeyPositionError::LengthMismatch { .. })
        ));
        assert!(matches!(
            KeyPositions::new(vec![vec![]], &[HashMap::new()]),
            Err(KeyPositionError::EmptyPosition { position: 0 })
        ));
        assert!(matches!(
            KeyPositions::new(vec![vec![1]], &[HashMap::from([(1, -1.0)])]),
            Err(KeyPositionError::NegativeEvidence { column: 1, .. })
        ));
    }
}
