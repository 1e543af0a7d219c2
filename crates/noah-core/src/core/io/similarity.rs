use super::{LoadError, path_string};
use crate::core::environment::similarity::SimilarityMatrix;
use std::path::Path;
use tracing::debug;

/// Reads a square CSV matrix: a header of residue symbols (first cell ignored), then one
/// row per residue starting with its symbol. `invert` negates every value, for matrices
/// that measure distance instead of similarity.
///
/// The score of the pair `(a, b)` is read from column `a` of row `b`.
pub fn load_similarity_matrix(path: &Path, invert: bool) -> Result<SimilarityMatrix, LoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| LoadError::Csv {
            path: path_string(path),
            source: e,
        })?;

    let headers = reader.headers().map_err(|e| LoadError::Csv {
        path: path_string(path),
        source: e,
    })?;
    let columns: Vec<char> = headers
        .iter()
        .skip(1)
        .map(|h| parse_symbol(h, path, 1))
        .collect::<Result<_, _>>()?;

    let mut rows: Vec<(char, Vec<f64>)> = Vec::with_capacity(columns.len());
    for (i, record) in reader.records().enumerate() {
        let line = i + 2;
        let record = record.map_err(|e| LoadError::Csv {
            path: path_string(path),
            source: e,
        })?;
        let mut fields = record.iter();
        let symbol = parse_symbol(fields.next().unwrap_or_default(), path, line)?;
        let values = fields
            .map(|field| {
                field.parse::<f64>().map_err(|e| LoadError::Parse {
                    path: path_string(path),
                    line,
                    message: format!("'{}' is not a number: {}", field, e),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        rows.push((symbol, values));
    }

    // values[i][j] = score(columns[i], columns[j]) = cell at column i, row j
    let n = columns.len();
    let mut values = vec![vec![0.0; n]; n];
    for (row_symbol, row) in &rows {
        let j = columns
            .iter()
            .position(|c| c == row_symbol)
            .ok_or_else(|| LoadError::Invalid {
                path: path_string(path),
                message: format!("row symbol '{}' is not a column", row_symbol),
            })?;
        if row.len() != n {
            return Err(LoadError::Invalid {
                path: path_string(path),
                message: format!("row '{}' has {} values, expected {}", row_symbol, row.len(), n),
            });
        }
        for (i, &v) in row.iter().enumerate() {
            values[i][j] = v;
        }
    }
    if rows.len() != n {
        return Err(LoadError::Invalid {
            path: path_string(path),
            message: format!("{} rows for {} columns", rows.len(), n),
        });
    }

    let matrix = SimilarityMatrix::new(columns, values).map_err(|e| LoadError::Invalid {
        path: path_string(path),
        message: e.to_string(),
    })?;
    debug!(path = %path.display(), symbols = n, invert, "Loaded similarity matrix.");
    Ok(if invert { matrix.inverted() } else { matrix })
}

fn parse_symbol(field: &str, path: &Path, line: usize) -> Result<char, LoadError> {
    let mut chars = field.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => Err(LoadError::Parse {
            path: path_string(path),
            line,
            message: format!("'{}' is not a single residue symbol", field),
        }),
    }
}
