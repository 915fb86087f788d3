//! Sync the catalog with the configured sources

use std::path::PathBuf;
use std::sync::Arc;

use catalog_client::{CatalogClient, ClientConfig};
use catalog_expr::Sandbox;
use catalog_reconcile::options::DEFAULT_PAGE_SIZE;
use catalog_reconcile::ReconcileOptions;
use catalog_source::DEFAULT_SAMPLE_LENGTH;
use clap::Args;
use tracing::info;

use crate::config::{load_config, ImporterConfig};
use crate::commands::client_config;
use crate::error::{CliError, CliResult};
use crate::pipeline::{sync_pipeline, PipelineOptions};
use crate::types::{sync_types, TypeSyncOptions};

/// Sync catalog types and entries from the configured sources
#[derive(Args, Debug, Clone, Default)]
pub struct SyncArgs {
    /// Config file in YAML or JSON
    #[arg(long)]
    pub config: PathBuf,

    /// API key for the catalog API
    #[arg(long, env = "CATALOG_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Base URL of the catalog API
    #[arg(long, env = "CATALOG_API_ENDPOINT")]
    pub api_endpoint: Option<String>,

    /// URL of the repository the catalog is managed from
    #[arg(long, env = "SOURCE_REPO_URL")]
    pub source_repo_url: Option<String>,

    /// Restrict the sync to these outputs (e.g. Custom["Service"])
    #[arg(long = "target")]
    pub targets: Vec<String>,

    /// Characters of unparseable content to include in warnings
    #[arg(long, default_value_t = DEFAULT_SAMPLE_LENGTH)]
    pub sample_length: usize,

    /// Print the changes that would be made without making them
    #[arg(long)]
    pub dry_run: bool,

    /// Remove catalog types owned by this config that it no longer defines
    #[arg(long)]
    pub prune_types: bool,

    /// Keep entries that are no longer produced by the sources
    #[arg(long)]
    pub no_prune: bool,

    /// Allow an output with zero entries to delete every entry of its type
    #[arg(long)]
    pub allow_delete_all: bool,

    /// Page size when listing catalog entries
    #[arg(
        long,
        alias = "catalog-entries-api-page-size",
        env = "CATALOG_ENTRIES_API_PAGE_SIZE",
        default_value_t = DEFAULT_PAGE_SIZE
    )]
    pub page_size: usize,

    /// Disable progress bars
    #[arg(long)]
    pub no_progress: bool,
}

impl SyncArgs {
    fn check_flags(&self) -> CliResult<()> {
        if self.prune_types && self.dry_run {
            return Err(CliError::Validation(
                "cannot use --dry-run with --prune-types".to_string(),
            ));
        }
        if self.prune_types && !self.targets.is_empty() {
            return Err(CliError::Validation(
                "cannot use --target with --prune-types".to_string(),
            ));
        }
        Ok(())
    }

    fn client_config(&self) -> CliResult<ClientConfig> {
        let config = client_config(self.api_key.as_deref(), self.api_endpoint.as_deref())?;
        Ok(config.with_read_only(self.dry_run))
    }

    fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            sample_length: self.sample_length,
            dry_run: self.dry_run,
            no_progress: self.no_progress,
            allow_delete_all: self.allow_delete_all,
            reconcile: ReconcileOptions::default()
                .with_prune(!self.no_prune)
                .with_page_size(self.page_size),
        }
    }
}

/// Execute the sync command
pub async fn execute(args: SyncArgs) -> CliResult<()> {
    args.check_flags()?;

    let mut config = load_config(&args.config)?;
    if !args.targets.is_empty() {
        println!("⊕ Filtering config to targets ({})", args.targets.join(", "));
        config = config.filter(&args.targets);
    }

    sync_config(&config, &args).await
}

/// Sync an already loaded and validated config.
pub async fn sync_config(config: &ImporterConfig, args: &SyncArgs) -> CliResult<()> {
    let (pipelines, sources, outputs) = config.counts();
    println!("✔ Loaded config ({pipelines} pipelines, {sources} sources, {outputs} outputs)");

    let client_config = args.client_config()?;
    if args.dry_run {
        println!("⛨ --dry-run is set, building a read-only client");
    }
    let client = Arc::new(CatalogClient::new(client_config)?);

    run(&client, config, args).await
}

async fn run(client: &Arc<CatalogClient>, config: &ImporterConfig, args: &SyncArgs) -> CliResult<()> {
    let type_options = TypeSyncOptions {
        sync_id: config.sync_id.clone(),
        source_repo_url: args.source_repo_url.clone(),
        dry_run: args.dry_run,
        prune_types: args.prune_types,
    };
    let types = sync_types(client, &config.all_output_types(), &type_options).await?;
    info!(types = types.len(), "Catalog types in sync");

    let sandbox = Sandbox::new();
    let options = args.pipeline_options();
    for pipeline in &config.pipelines {
        sync_pipeline(client, &sandbox, pipeline, &types, &options).await?;
    }

    println!("\n✔ Sync complete");
    Ok(())
}
