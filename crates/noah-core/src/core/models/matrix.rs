use serde::{Deserialize, Serialize};

/// Dense `(motif position, allele, residue)` array of `f64`, stored row-major so that
/// each `(position, allele)` pair owns one contiguous residue row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Matrix3 {
    positions: usize,
    alleles: usize,
    residues: usize,
    data: Vec<f64>,
}

impl Matrix3 {
    pub fn zeros(positions: usize, alleles: usize, residues: usize) -> Self {
        Self::filled(positions, alleles, residues, 0.0)
    }

    pub fn filled(positions: usize, alleles: usize, residues: usize, value: f64) -> Self {
        Self {
            positions,
            alleles,
            residues,
            data: vec![value; positions * alleles * residues],
        }
    }

    #[inline]
    pub fn shape(&self) -> (usize, usize, usize) {
        (self.positions, self.alleles, self.residues)
    }

    #[inline]
    fn offset(&self, position: usize, allele: usize) -> usize {
        debug_assert!(position < self.positions && allele < self.alleles);
        (position * self.alleles + allele) * self.residues
    }

    #[inline]
    pub fn get(&self, position: usize, allele: usize, residue: usize) -> f64 {
        self.data[self.offset(position, allele) + residue]
    }

    #[inline]
    pub fn increment(&mut self, position: usize, allele: usize, residue: usize) {
        let offset = self.offset(position, allele);
        self.data[offset + residue] += 1.0;
    }

    #[inline]
    pub fn row(&self, position: usize, allele: usize) -> &[f64] {
        let start = self.offset(position, allele);
        &self.data[start..start + self.residues]
    }

    #[inline]
    pub fn row_mut(&mut self, position: usize, allele: usize) -> &mut [f64] {
        let start = self.offset(position, allele);
        &mut self.data[start..start + self.residues]
    }

    /// Sum over positions of `(count + pseudocount)`, one row per allele.
    pub fn pooled_over_positions(&self, pseudocount: f64) -> Vec<Vec<f64>> {
        let mut pooled = vec![vec![0.0; self.residues]; self.alleles];
        for position in 0..self.positions {
            for (allele, acc) in pooled.iter_mut().enumerate() {
                add_assign(acc, self.row(position, allele));
                acc.iter_mut().for_each(|v| *v += pseudocount);
            }
        }
        pooled
    }

    /// Sum over positions and alleles of `(count + pseudocount)`.
    pub fn pooled_globally(&self, pseudocount: f64) -> Vec<f64> {
        let mut pooled = vec![0.0; self.residues];
        for per_allele in self.pooled_over_positions(pseudocount) {
            add_assign(&mut pooled, &per_allele);
        }
        pooled
    }
}

#[inline]
pub fn add_assign(acc: &mut [f64], other: &[f64]) {
    acc.iter_mut().zip(other).for_each(|(a, b)| *a += *b);
}

/// Divides every entry by the row total. A row whose total is not positive is left
/// untouched.
pub fn normalize(row: &mut [f64]) {
    let total: f64 = row.iter().sum();
    if total > 0.0 {
        row.iter_mut().for_each(|v| *v /= total);
    }
}
