//! Generate a config for a one-off import of local files

use std::collections::{BTreeMap, BTreeSet};

use catalog_core::{SourceRecord, Value};
use catalog_output::{AttributeConfig, OutputConfig, OutputSource};
use catalog_reconcile::options::DEFAULT_PAGE_SIZE;
use catalog_source::{load_records, LocalSource, SourceConfig, DEFAULT_SAMPLE_LENGTH};
use clap::Args;
use tracing::{info, warn};

use crate::commands::sync::{sync_config, SyncArgs};
use crate::config::{validate_config, ImporterConfig, PipelineConfig};
use crate::error::{CliError, CliResult};

/// Sync id of configs generated by `import`.
pub const IMPORT_SYNC_ID: &str = "one-time-import";

/// Build an importer config from local files, optionally syncing it
#[derive(Args, Debug, Clone)]
pub struct ImportArgs {
    /// Files to read entries from, as glob patterns
    #[arg(long = "local-file", required = true)]
    pub local_files: Vec<String>,

    /// Name of the catalog type, e.g. Devices
    #[arg(long)]
    pub name: String,

    /// Description of the catalog type
    #[arg(long)]
    pub description: String,

    /// Type name of the catalog type, e.g. Custom["Devices"]
    #[arg(long)]
    pub type_name: String,

    /// Expression for each entry's external id, e.g. record.id
    #[arg(long)]
    pub source_external_id: String,

    /// Expression for each entry's name, e.g. record.name
    #[arg(long)]
    pub source_name: String,

    /// Sync the generated config
    #[arg(long)]
    pub run_sync: bool,

    /// With --run-sync, only print the changes
    #[arg(long, requires = "run_sync")]
    pub run_sync_dry_run: bool,

    /// API key for the catalog API
    #[arg(long, env = "CATALOG_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Base URL of the catalog API
    #[arg(long, env = "CATALOG_API_ENDPOINT")]
    pub api_endpoint: Option<String>,

    /// Characters of unparseable content to include in warnings
    #[arg(long, default_value_t = DEFAULT_SAMPLE_LENGTH)]
    pub sample_length: usize,
}

impl ImportArgs {
    fn sync_args(&self) -> SyncArgs {
        SyncArgs {
            api_key: self.api_key.clone(),
            api_endpoint: self.api_endpoint.clone(),
            dry_run: self.run_sync_dry_run,
            allow_delete_all: true,
            sample_length: self.sample_length,
            page_size: DEFAULT_PAGE_SIZE,
            ..Default::default()
        }
    }
}

/// Execute the import command
pub async fn execute(args: ImportArgs) -> CliResult<()> {
    let source = SourceConfig {
        local: Some(LocalSource::new(args.local_files.clone())),
        ..Default::default()
    };

    info!(files = ?args.local_files, "Loading entries from files");
    let records = load_records(std::slice::from_ref(&source), args.sample_length)
        .await
        .map_err(|e| CliError::Source(format!("reading source files: {e}")))?;

    let config = import_config(&args, source, &records);
    validate_config(&config)?;

    let rendered = serde_yaml::to_string(&config)
        .map_err(|e| CliError::Config(format!("serializing config: {e}")))?;
    println!("⊕ Pipeline that will import these files:\n");
    println!("{rendered}");

    if args.run_sync {
        sync_config(&config, &args.sync_args()).await?;
    }

    Ok(())
}

/// A single-pipeline config importing `records` into one catalog type.
#[must_use]
pub fn import_config(
    args: &ImportArgs,
    source: SourceConfig,
    records: &[SourceRecord],
) -> ImporterConfig {
    let output = OutputConfig {
        name: args.name.clone(),
        description: args.description.clone(),
        type_name: args.type_name.clone(),
        ranked: false,
        use_name_as_identifier: false,
        categories: Vec::new(),
        source: OutputSource {
            filter: None,
            name: args.source_name.clone(),
            external_id: args.source_external_id.clone(),
            rank: None,
            aliases: Vec::new(),
        },
        attributes: infer_attributes(records),
    };

    ImporterConfig {
        sync_id: IMPORT_SYNC_ID.to_string(),
        pipelines: vec![PipelineConfig {
            sources: vec![source],
            outputs: vec![output],
        }],
    }
}

/// One `String` attribute per distinct field across `records`, an array when
/// the first value seen for it is a list.
///
/// Fields that cannot be quoted into `record["<id>"]` are skipped.
#[must_use]
pub fn infer_attributes(records: &[SourceRecord]) -> Vec<AttributeConfig> {
    let mut attributes: BTreeMap<&str, AttributeConfig> = BTreeMap::new();
    let mut skipped = BTreeSet::new();

    for record in records {
        for (key, value) in &record.fields {
            if attributes.contains_key(key.as_str()) || skipped.contains(key.as_str()) {
                continue;
            }
            if key.is_empty() || key.contains(['"', '\\']) {
                warn!(field = %key, origin = %record.origin, "Skipping field unusable as an attribute id");
                skipped.insert(key.as_str());
                continue;
            }

            attributes.insert(
                key.as_str(),
                AttributeConfig {
                    id: key.clone(),
                    name: key.clone(),
                    type_name: Some("String".to_string()),
                    array: matches!(value, Value::List(_)),
                    source: None,
                    enum_config: None,
                    backlink_attribute: None,
                    path: None,
                    schema_only: false,
                },
            );
        }
    }

    attributes.into_values().collect()
}
