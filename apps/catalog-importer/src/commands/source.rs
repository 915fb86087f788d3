//! Print the records produced by each configured source

use std::path::PathBuf;

use catalog_source::{load_records, DEFAULT_SAMPLE_LENGTH};
use clap::Args;

use crate::config::load_config;
use crate::error::{CliError, CliResult};

/// Load every source and print its parsed records
#[derive(Args, Debug)]
pub struct SourceArgs {
    /// Config file in YAML or JSON
    #[arg(long)]
    pub config: PathBuf,

    /// Characters of unparseable content to include in warnings
    #[arg(long, default_value_t = DEFAULT_SAMPLE_LENGTH)]
    pub sample_length: usize,
}

/// Execute the source command
pub async fn execute(args: SourceArgs) -> CliResult<()> {
    let config = load_config(&args.config)?;

    for pipeline in &config.pipelines {
        let type_names: Vec<&str> = pipeline
            .outputs
            .iter()
            .map(|output| output.type_name.as_str())
            .collect();
        println!("\n↻ Processing pipeline... ({})", type_names.join(", "));

        for source in &pipeline.sources {
            let label = source.backend()?.describe();
            let records = load_records(std::slice::from_ref(source), args.sample_length)
                .await
                .map_err(|e| {
                    CliError::Source(format!("loading entries from source {label}: {e}"))
                })?;
            println!("\n  ✔ {label} (found {} entries)", records.len());

            for record in &records {
                println!("{}", serde_json::to_string_pretty(&record.to_value())?);
            }
        }
    }

    Ok(())
}
