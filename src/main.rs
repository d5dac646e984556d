use tracing::{error, info};

use sheet_scrubber::cleaning::MissingValuePolicy;
use sheet_scrubber::logging;
use sheet_scrubber::pipeline::{Pipeline, PipelineOptions};

fn main() {
    // Initialize logging
    logging::init_logging();

    // Fixed configuration; the tool takes no command-line arguments.
    let options = PipelineOptions {
        missing_values: MissingValuePolicy::Impute,
        rename_columns: true,
    };

    match Pipeline::run(&options) {
        Ok(summary) => {
            info!("Pipeline finished");
            println!("\n📊 Pipeline results:");
            println!("   Rows in: {}", summary.cleaning.rows_in);
            println!(
                "   Duplicates removed: {}",
                summary.cleaning.duplicate_rows_removed
            );
            println!("   Rows out: {}", summary.cleaning.rows_out);
            println!("   Encoded columns: {}", summary.encoded_columns.len());
            println!("   Output file: {}", summary.output_file);
            if let Some(mapping) = &summary.mapping_file {
                println!("   Mapping file: {mapping}");
            }
        }
        Err(e) => {
            error!("Pipeline failed: {}", e);
            eprintln!("❌ Pipeline failed: {e}");
            std::process::exit(1);
        }
    }
}
