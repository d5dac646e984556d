use crate::constants::PLACEHOLDER_PREFIX;
use crate::error::{Result, ScrubError};
use crate::table::Table;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;
use tracing::info;

/// One original -> placeholder header pair. Field names double as the
/// mapping file's header row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenamePair {
    pub original_name: String,
    pub new_name: String,
}

/// The full header mapping for one table, in column order.
#[derive(Debug, Clone, Serialize)]
pub struct RenameMapping {
    pub pairs: Vec<RenamePair>,
}

impl RenameMapping {
    pub fn original_for(&self, new_name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|p| p.new_name == new_name)
            .map(|p| p.original_name.as_str())
    }
}

/// Replaces the table's headers with positional placeholders "F0".."F(n-1)"
/// and writes the original -> placeholder mapping CSV.
pub fn rename_columns(table: &mut Table, mapping_path: &Path) -> Result<RenameMapping> {
    let pairs: Vec<RenamePair> = table
        .headers()
        .into_iter()
        .enumerate()
        .map(|(i, original_name)| RenamePair {
            original_name,
            new_name: format!("{PLACEHOLDER_PREFIX}{i}"),
        })
        .collect();

    let file =
        File::create(mapping_path).map_err(|e| ScrubError::file_access(mapping_path, e))?;
    let mut writer = csv::Writer::from_writer(file);
    for pair in &pairs {
        writer.serialize(pair)?;
    }
    writer.flush()?;

    table.set_headers(pairs.iter().map(|p| p.new_name.clone()).collect());

    info!(
        "Column mapping saved to: {} ({} columns)",
        mapping_path.display(),
        pairs.len()
    );
    println!("Column mapping saved to: {}", mapping_path.display());
    println!("Columns renamed to: {:?}", table.headers());

    Ok(RenameMapping { pairs })
}
