use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Per motif position, the alleles whose counts are pooled when estimating each
/// allele's distribution. Every allele is the first member of its own group, and
/// groups only ever grow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FusionMap {
    groups: Vec<Vec<Vec<usize>>>,
}

impl FusionMap {
    /// Every allele pools only its own data.
    pub fn singletons(motif_length: usize, alleles: usize) -> Self {
        Self {
            groups: (0..motif_length)
                .map(|_| (0..alleles).map(|a| vec![a]).collect())
                .collect(),
        }
    }

    pub fn motif_length(&self) -> usize {
        self.groups.len()
    }

    #[inline]
    pub fn group(&self, position: usize, allele: usize) -> &[usize] {
        &self.groups[position][allele]
    }

    /// The allele whose likelihood row scores `allele` at `position`.
    #[inline]
    pub fn representative(&self, position: usize, allele: usize) -> usize {
        self.groups[position][allele][0]
    }

    pub fn contains(&self, position: usize, allele: usize, member: usize) -> bool {
        self.groups[position][allele].contains(&member)
    }

    /// Appends `member` to the group unless it is already present. Returns whether the
    /// group changed.
    pub fn append(&mut self, position: usize, allele: usize, member: usize) -> bool {
        let group = &mut self.groups[position][allele];
        if group.contains(&member) {
            false
        } else {
            group.push(member);
            true
        }
    }

    /// Other alleles pooled into `allele` at any position.
    pub fn neighbors(&self, allele: usize) -> BTreeSet<usize> {
        self.groups
            .iter()
            .flat_map(|per_allele| per_allele[allele].iter().copied())
            .filter(|&member| member != allele)
            .collect()
    }

    /// Number of non-self members across every group.
    pub fn fused_count(&self) -> usize {
        self.groups
            .iter()
            .flat_map(|per_allele| per_allele.iter())
            .map(|group| group.len() - 1)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn singletons_contain_only_self() {
        let map = FusionMap::singletons(2, 3);
        for position in 0..2 {
            for allele in 0..3 {
                assert_eq!(map.group(position, allele), &[allele]);
                assert_eq!(map.representative(position, allele), allele);
            }
        }
        assert_eq!(map.fused_count(), 0);
    }

    #[test]
    fn append_keeps_order_and_skips_existing_members() {
        let mut map = FusionMap::singletons(1, 3);
        assert!(map.append(0, 0, 2));
        assert!(map.append(0, 0, 1));
        assert!(!map.append(0, 0, 2));
        assert!(!map.append(0, 0, 0));
        assert_eq!(map.group(0, 0), &[0, 2, 1]);
        assert_eq!(map.representative(0, 0), 0);
    }

    #[test]
    fn neighbors_collects_members_across_positions() {
        let mut map = FusionMap::singletons(2, 4);
        map.append(0, 1, 2);
        map.append(1, 1, 3);
        map.append(1, 1, 2);
        map.append(0, 2, 1);
        assert_eq!(map.neighbors(1), BTreeSet::from([2, 3]));
        assert_eq!(map.neighbors(0), BTreeSet::new());
        assert_eq!(map.fused_count(), 4);
    }
}
