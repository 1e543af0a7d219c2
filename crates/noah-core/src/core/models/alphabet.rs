use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// The twenty standard amino acids in the order used for matrix columns.
pub const AMINO_ACIDS: [char; 20] = [
    'A', 'C', 'E', 'D', 'G', 'F', 'I', 'H', 'K', 'M', 'L', 'N', 'Q', 'P', 'S', 'R', 'T', 'W',
    'V', 'Y',
];

/// Symbol padded into peptides shorter than the motif. No alphabet may contain it, so a
/// padded position contributes nothing to a score.
pub const PLACEHOLDER: char = 'X';

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum AlphabetError {
    #[error("Alphabet must contain at least one symbol")]
    Empty,
    #[error("Duplicate symbol '{0}' in alphabet")]
    DuplicateSymbol(char),
    #[error("Placeholder symbol '{0}' cannot be part of an alphabet")]
    ReservedSymbol(char),
}

/// Ordered set of valid residue symbols. A symbol's position is its dense index, the
/// last dimension of every model matrix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<char>", into = "Vec<char>")]
pub struct Alphabet {
    symbols: Vec<char>,
    index: HashMap<char, usize>,
}

impl Alphabet {
    pub fn new(symbols: &[char]) -> Result<Self, AlphabetError> {
        if symbols.is_empty() {
            return Err(AlphabetError::Empty);
        }
        let mut index = HashMap::with_capacity(symbols.len());
        for (i, &symbol) in symbols.iter().enumerate() {
            if symbol == PLACEHOLDER {
                return Err(AlphabetError::ReservedSymbol(symbol));
            }
            if index.insert(symbol, i).is_some() {
                return Err(AlphabetError::DuplicateSymbol(symbol));
            }
        }
        Ok(Self {
            symbols: symbols.to_vec(),
            index,
        })
    }

    pub fn amino_acids() -> Self {
        let index = AMINO_ACIDS.iter().enumerate().map(|(i, &c)| (c, i)).collect();
        Self {
            symbols: AMINO_ACIDS.to_vec(),
            index,
        }
    }

    #[inline]
    pub fn index_of(&self, symbol: char) -> Option<usize> {
        self.index.get(&symbol).copied()
    }

    #[inline]
    pub fn contains(&self, symbol: char) -> bool {
        self.index.contains_key(&symbol)
    }

    /// Whether every symbol of `sequence` belongs to the alphabet.
    pub fn accepts(&self, sequence: &str) -> bool {
        sequence.chars().all(|c| self.contains(c))
    }

    pub fn symbols(&self) -> &[char] {
        &self.symbols
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

impl Default for Alphabet {
    fn default() -> Self {
        Self::amino_acids()
    }
}

impl TryFrom<Vec<char>> for Alphabet {
    type Error = AlphabetError;

    fn try_from(symbols: Vec<char>) -> Result<Self, Self::Error> {
        Self::new(&symbols)
    }
}

impl From<Alphabet> for Vec<char> {
    fn from(alphabet: Alphabet) -> Self {
        alphabet.symbols
    }
}
