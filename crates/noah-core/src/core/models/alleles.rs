use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
#[error("Duplicate allele identifier '{0}'")]
pub struct DuplicateAlleleError(pub String);

/// Dense indexing of the allele identifiers a model covers. An allele's index is its
/// row in every model matrix.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct AlleleIndex {
    names: Vec<String>,
    index: HashMap<String, usize>,
}

impl AlleleIndex {
    pub fn new<I, S>(names: I) -> Result<Self, DuplicateAlleleError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut result = Self::default();
        for name in names {
            let name = name.into();
            if result.index.contains_key(&name) {
                return Err(DuplicateAlleleError(name));
            }
            result.index.insert(name.clone(), result.names.len());
            result.names.push(name);
        }
        Ok(result)
    }

    #[inline]
    pub fn index_of(&self, allele: &str) -> Option<usize> {
        self.index.get(allele).copied()
    }

    #[inline]
    pub fn name(&self, index: usize) -> &str {
        &self.names[index]
    }

    pub fn contains(&self, allele: &str) -> bool {
        self.index.contains_key(allele)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &str)> {
        self.names.iter().enumerate().map(|(i, n)| (i, n.as_str()))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Known alleles whose identifier contains `query`, in index order.
    pub fn matching(&self, query: &str) -> Vec<&str> {
        self.names
            .iter()
            .filter(|name| name.contains(query))
            .map(String::as_str)
            .collect()
    }
}

impl TryFrom<Vec<String>> for AlleleIndex {
    type Error = DuplicateAlleleError;

    fn try_from(names: Vec<String>) -> Result<Self, Self::Error> {
        Self::new(names)
    }
}

impl From<AlleleIndex> for Vec<String> {
    fn from(index: AlleleIndex) -> Self {
        index.names
    }
}
