use super::{LoadError, path_string, read_to_string};
use crate::core::environment::keys::KeyPositions;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::debug;

/// Reads whitespace-separated `motif_position alignment_column crystal_count` lines.
/// Entries whose crystal count is below `min_crystal_count` are dropped; the rest become
/// key columns (in file order) weighted by their count.
pub fn load_key_positions(path: &Path, min_crystal_count: u32) -> Result<KeyPositions, LoadError> {
    let content = read_to_string(path)?;
    let mut columns: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    let mut evidence: BTreeMap<usize, HashMap<usize, f64>> = BTreeMap::new();

    for (i, raw) in content.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        let [position, column, count] = fields[..] else {
            return Err(LoadError::Parse {
                path: path_string(path),
                line: i + 1,
                message: format!("expected 3 fields, found {}", fields.len()),
            });
        };
        let parse = |field: &str| {
            field.parse::<usize>().map_err(|e| LoadError::Parse {
                path: path_string(path),
                line: i + 1,
                message: format!("'{}' is not a non-negative integer: {}", field, e),
            })
        };
        let (position, column, count) = (parse(position)?, parse(column)?, parse(count)?);
        if count < min_crystal_count as usize {
            continue;
        }
        columns.entry(position).or_default().push(column);
        evidence
            .entry(position)
            .or_default()
            .entry(column)
            .or_insert(count as f64);
    }

    let motif_length = columns.keys().next_back().map_or(0, |&p| p + 1);
    if let Some(missing) = (0..motif_length).find(|p| !columns.contains_key(p)) {
        return Err(LoadError::Invalid {
            path: path_string(path),
            message: format!("motif position {} has no key columns", missing),
        });
    }

    let evidence: Vec<HashMap<usize, f64>> = evidence.into_values().collect();
    let keys = KeyPositions::new(columns.into_values().collect(), &evidence).map_err(|e| {
        LoadError::Invalid {
            path: path_string(path),
            message: e.to_string(),
        }
    })?;
    debug!(path = %path.display(), motif_length, "Loaded key positions.");
    Ok(keys)
}
