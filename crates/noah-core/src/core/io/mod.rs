//! Loaders for the externally supplied tables a model is built from.

use std::path::Path;
use thiserror::Error;

pub mod key_positions;
pub mod peptides;
pub mod similarity;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("CSV parsing error for '{path}': {source}")]
    Csv { path: String, source: csv::Error },
    #[error("TOML parsing error for '{path}': {source}")]
    Toml {
        path: String,
        source: toml::de::Error,
    },
    #[error("Parse error in '{path}' at line {line}: {message}")]
    Parse {
        path: String,
        line: usize,
        message: String,
    },
    #[error("Invalid contents in '{path}': {message}")]
    Invalid { path: String, message: String },
}

pub(crate) fn path_string(path: &Path) -> String {
    path.to_string_lossy().to_string()
}

pub(crate) fn read_to_string(path: &Path) -> Result<String, LoadError> {
    std::fs::read_to_string(path).map_err(|e| LoadError::Io {
        path: path_string(path),
        source: e,
    })
}
