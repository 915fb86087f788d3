//! Validate an importer config file

use std::path::PathBuf;

use clap::Args;

use crate::config::load_config;
use crate::error::CliResult;

/// Validate importer configuration
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Config file in YAML or JSON
    #[arg(long)]
    pub config: PathBuf,
}

/// Execute the validate command
pub async fn execute(args: ValidateArgs) -> CliResult<()> {
    let config = load_config(&args.config)?;

    let (pipelines, sources, outputs) = config.counts();
    println!("✔ Config is valid ({pipelines} pipelines, {sources} sources, {outputs} outputs)");
    for desired in config.all_output_types() {
        let kind = if desired.is_enum() { " (enum)" } else { "" };
        println!("  {}{kind}", desired.type_name);
    }

    println!("\n{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}
