use crate::cleaning::{self, CleaningSummary, MissingValuePolicy};
use crate::constants;
use crate::encode::{self, EncodedColumn};
use crate::error::Result;
use crate::output;
use crate::rename::{self, RenameMapping};
use crate::workbook::{self, SheetSelector};
use serde::Serialize;
use std::path::Path;
use tracing::{info, instrument};

/// The pipeline's recognized options: the two observed variants of the
/// original job, folded into one configurable run.
#[derive(Debug, Clone, Copy, Default)]
pub struct PipelineOptions {
    pub missing_values: MissingValuePolicy,
    pub rename_columns: bool,
}

/// Result of a complete pipeline run.
#[derive(Debug, Serialize)]
pub struct PipelineRunSummary {
    pub cleaning: CleaningSummary,
    pub encoded_columns: Vec<EncodedColumn>,
    pub rename_mapping: Option<RenameMapping>,
    pub output_file: String,
    pub mapping_file: Option<String>,
}

pub struct Pipeline;

impl Pipeline {
    /// Run against the fixed well-known paths from [`constants`].
    pub fn run(options: &PipelineOptions) -> Result<PipelineRunSummary> {
        Self::run_with_paths(
            Path::new(constants::INPUT_FILE),
            &SheetSelector::Index(constants::SHEET_INDEX),
            Path::new(constants::OUTPUT_FILE),
            Path::new(constants::MAPPING_FILE),
            options,
        )
    }

    /// Fixed stage order: load, clean, optional rename, encode, write.
    /// Any stage failure aborts the run; no retries, no partial-output
    /// guarantees.
    #[instrument(skip_all, fields(input = %input.display()))]
    pub fn run_with_paths(
        input: &Path,
        sheet: &SheetSelector,
        output_path: &Path,
        mapping_path: &Path,
        options: &PipelineOptions,
    ) -> Result<PipelineRunSummary> {
        info!("🚀 Starting cleaning pipeline for {}", input.display());
        println!("🚀 Starting cleaning pipeline for {}", input.display());

        let mut table = workbook::load_sheet(input, sheet)?;
        let cleaning = cleaning::clean_table(&mut table, options.missing_values)?;

        let rename_mapping = if options.rename_columns {
            Some(rename::rename_columns(&mut table, mapping_path)?)
        } else {
            None
        };

        let encoded_columns = encode::encode_table(&mut table);
        output::write_csv(&table, output_path)?;

        info!(
            "✅ Pipeline finished: {} rows, {} columns, {} encoded",
            table.row_count(),
            table.column_count(),
            encoded_columns.len()
        );

        Ok(PipelineRunSummary {
            cleaning,
            encoded_columns,
            mapping_file: rename_mapping
                .is_some()
                .then(|| mapping_path.display().to_string()),
            rename_mapping,
            output_file: output_path.display().to_string(),
        })
    }
}
