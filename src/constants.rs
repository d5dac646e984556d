/// Fixed file names and pipeline defaults.
/// The tool intentionally takes no command-line arguments; every run reads
/// and writes the same well-known paths.

/// Workbook the pipeline reads.
pub const INPUT_FILE: &str = "source.xlsx";

/// Zero-based index of the sheet to load.
pub const SHEET_INDEX: usize = 0;

/// Cleaned, encoded table destination.
pub const OUTPUT_FILE: &str = "data.csv";

/// Side file recording original -> placeholder header pairs.
pub const MAPPING_FILE: &str = "column_mapping.csv";

/// Prefix for positional placeholder headers ("F0", "F1", ...).
pub const PLACEHOLDER_PREFIX: &str = "F";

/// Fill value for textual columns with no non-missing values.
pub const MISSING_LABEL: &str = "Unknown";
