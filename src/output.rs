use crate::error::{Result, ScrubError};
use crate::table::{Table, Value};
use std::fs::File;
use std::path::Path;
use tracing::info;

/// Serializes the table to a comma-separated UTF-8 file: one header record,
/// one record per row, no index column. Missing cells become empty fields.
pub fn write_csv(table: &Table, path: &Path) -> Result<()> {
    let file = File::create(path).map_err(|e| ScrubError::file_access(path, e))?;
    let mut writer = csv::Writer::from_writer(file);

    writer.write_record(table.headers())?;
    for i in 0..table.row_count() {
        writer.write_record(table.row(i).iter().map(Value::render))?;
    }
    writer.flush()?;

    info!("Data saved to: {}", path.display());
    println!("Data saved to: {}", path.display());
    Ok(())
}
