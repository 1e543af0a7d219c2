use super::{LoadError, path_string};
use crate::core::models::dataset::PeptideRecord;
use crate::core::models::label::BindingLabel;
use std::path::Path;
use tracing::debug;

/// Reads `peptide<d>allele[<d>label]` records. A first line whose first field is
/// `peptide` is treated as a header.
pub fn load_peptide_records(path: &Path, delimiter: u8) -> Result<Vec<PeptideRecord>, LoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .delimiter(delimiter)
        .from_path(path)
        .map_err(|e| LoadError::Csv {
            path: path_string(path),
            source: e,
        })?;

    let mut records = Vec::new();
    for (i, result) in reader.records().enumerate() {
        let line = i + 1;
        let row = result.map_err(|e| LoadError::Csv {
            path: path_string(path),
            source: e,
        })?;
        if line == 1 && row.get(0).is_some_and(|f| f.eq_ignore_ascii_case("peptide")) {
            continue;
        }
        let (Some(peptide), Some(allele)) = (row.get(0), row.get(1)) else {
            return Err(LoadError::Parse {
                path: path_string(path),
                line,
                message: "expected at least a peptide and an allele".to_string(),
            });
        };
        let label = match row.get(2).filter(|f| !f.is_empty()) {
            Some(field) => Some(field.parse::<BindingLabel>().map_err(|e| LoadError::Parse {
                path: path_string(path),
                line,
                message: e.to_string(),
            })?),
            None => None,
        };
        records.push(PeptideRecord {
            peptide: peptide.to_string(),
            allele: allele.to_string(),
            label,
        });
    }
    debug!(path = %path.display(), records = records.len(), "Loaded peptide records.");
    Ok(records)
}
