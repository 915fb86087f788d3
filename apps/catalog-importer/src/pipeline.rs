//! Syncing the entries of one pipeline.

use std::sync::Arc;

use catalog_client::CatalogClient;
use catalog_core::{DesiredEntry, SourceRecord};
use catalog_expr::Sandbox;
use catalog_output::{build_entries, build_enum_entries, desired_types, DesiredType, OutputConfig};
use catalog_reconcile::{
    reconcile_entries, EntriesClient, ReconcileOptions, ReconcileSummary, ReconcileTarget,
};
use catalog_source::load_records;
use tracing::info;

use crate::config::PipelineConfig;
use crate::dry_run::DryRunEntriesClient;
use crate::error::{CliError, CliResult};
use crate::progress::ConsoleProgress;
use crate::types::SyncedTypes;

/// Options for [`sync_pipeline`].
#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    /// Characters of unparseable source content to log.
    pub sample_length: usize,
    pub dry_run: bool,
    pub no_progress: bool,
    /// Permit an output with zero entries, deleting everything it owns.
    pub allow_delete_all: bool,
    pub reconcile: ReconcileOptions,
}

impl PipelineOptions {
    fn show_progress(&self) -> bool {
        !self.dry_run && !self.no_progress
    }
}

/// Load a pipeline's sources and reconcile each of its outputs, base type
/// first and then its enum types.
pub async fn sync_pipeline(
    client: &Arc<CatalogClient>,
    sandbox: &Sandbox,
    pipeline: &PipelineConfig,
    types: &SyncedTypes,
    options: &PipelineOptions,
) -> CliResult<()> {
    let type_names: Vec<&str> = pipeline
        .outputs
        .iter()
        .map(|output| output.type_name.as_str())
        .collect();
    println!("\n↻ Syncing pipeline... ({})", type_names.join(", "));

    let records = load_sources(pipeline, options.sample_length).await?;

    println!("\n  ↻ Syncing entries...");
    for (idx, output) in pipeline.outputs.iter().enumerate() {
        sync_output(client, sandbox, idx, output, &records, types, options).await?;
    }

    Ok(())
}

async fn load_sources(
    pipeline: &PipelineConfig,
    sample_length: usize,
) -> CliResult<Vec<SourceRecord>> {
    println!("\n  ↻ Loading data from sources...");

    let mut records = Vec::new();
    for source in &pipeline.sources {
        let label = source.backend()?.describe();
        let loaded = load_records(std::slice::from_ref(source), sample_length)
            .await
            .map_err(|e| CliError::Source(format!("loading entries from source {label}: {e}")))?;
        println!("    ✔ {label} (found {} entries)", loaded.len());
        records.extend(loaded);
    }

    Ok(records)
}

async fn sync_output(
    client: &Arc<CatalogClient>,
    sandbox: &Sandbox,
    idx: usize,
    output: &OutputConfig,
    records: &[SourceRecord],
    types: &SyncedTypes,
    options: &PipelineOptions,
) -> CliResult<()> {
    println!("\n    ↻ {}", output.type_name);
    let context = format!("outputs (type_name = '{}')", output.type_name);

    let entries = build_entries(sandbox, output, records).map_err(|e| {
        CliError::Build(format!("outputs.{idx} (type_name='{}'): {e}", output.type_name))
    })?;
    println!("      ✔ Building entries... (found {} entries matching filters)", entries.len());

    check_delete_all(output, &entries, options.allow_delete_all)?;

    // Shared by the base type and its enum types.
    let entries_client = entries_client(client, options.dry_run);

    let target = ReconcileTarget {
        catalog_type_id: types.id(&output.type_name)?.to_string(),
        type_name: output.type_name.clone(),
        writable_attribute_ids: output.writable_attribute_ids(),
    };
    let summary = reconcile(entries_client.clone(), &target, &entries, options)
        .await
        .map_err(|e| CliError::sync(format!("{context}: reconciling catalog entries"), &e))?;
    log_summary(&output.type_name, &summary);

    for enum_type in desired_types(output).iter().filter(|t| t.is_enum()) {
        println!("\n    ↻ {} (enum)", enum_type.type_name);
        let enum_entries = build_enum_entries(enum_type, &entries);

        let summary = reconcile(
            entries_client.clone(),
            &enum_target(enum_type, types)?,
            &enum_entries,
            options,
        )
        .await
        .map_err(|e| {
            CliError::sync(
                format!(
                    "{context}: enum for attribute (id = '{}'): {}: reconciling catalog entries",
                    enum_type.source_attribute.as_deref().unwrap_or_default(),
                    enum_type.type_name
                ),
                &e,
            )
        })?;
        log_summary(&enum_type.type_name, &summary);
    }

    Ok(())
}

/// Refuse to sync an output with no entries unless explicitly allowed, since
/// it would delete every entry of the type.
pub fn check_delete_all(
    output: &OutputConfig,
    entries: &[DesiredEntry],
    allow_delete_all: bool,
) -> CliResult<()> {
    if entries.is_empty() && !allow_delete_all {
        return Err(CliError::Config(format!(
            "outputs (type_name = '{}'): found 0 matching entries and would delete everything but --allow-delete-all not set",
            output.type_name
        )));
    }
    Ok(())
}

fn entries_client(client: &Arc<CatalogClient>, dry_run: bool) -> Arc<dyn EntriesClient> {
    let live: Arc<dyn EntriesClient> = client.clone();
    if dry_run {
        Arc::new(DryRunEntriesClient::new(live))
    } else {
        live
    }
}

fn enum_target(enum_type: &DesiredType, types: &SyncedTypes) -> CliResult<ReconcileTarget> {
    Ok(ReconcileTarget {
        catalog_type_id: types.id(&enum_type.type_name)?.to_string(),
        type_name: enum_type.type_name.clone(),
        writable_attribute_ids: enum_type.writable_attribute_ids(),
    })
}

async fn reconcile(
    entries_client: Arc<dyn EntriesClient>,
    target: &ReconcileTarget,
    desired: &[DesiredEntry],
    options: &PipelineOptions,
) -> catalog_reconcile::ReconcileResult<ReconcileSummary> {
    let progress = ConsoleProgress::new(options.show_progress());
    let summary =
        reconcile_entries(entries_client, target, desired, &progress, &options.reconcile).await;
    progress.finish();
    summary
}

fn log_summary(type_name: &str, summary: &ReconcileSummary) {
    info!(
        type_name,
        observed = summary.observed,
        deleted = summary.deleted,
        created = summary.created,
        updated = summary.updated,
        unchanged = summary.unchanged,
        "Reconciled catalog entries"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output() -> OutputConfig {
        serde_yaml::from_str(
            r#"
name: Service
description: Services
type_name: Custom["Service"]
source:
  name: record.name
  external_id: record.id
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_zero_entries_requires_allow_delete_all() {
        let err = check_delete_all(&output(), &[], false).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Configuration error: outputs (type_name = 'Custom[\"Service\"]'): found 0 matching entries and would delete everything but --allow-delete-all not set"
        );

        assert!(check_delete_all(&output(), &[], true).is_ok());
        assert!(check_delete_all(&output(), &[DesiredEntry::new("a", "A")], false).is_ok());
    }

    #[test]
    fn test_progress_hidden_for_dry_run() {
        let options = PipelineOptions {
            dry_run: true,
            ..Default::default()
        };
        assert!(!options.show_progress());

        let options = PipelineOptions {
            no_progress: true,
            ..Default::default()
        };
        assert!(!options.show_progress());
        assert!(PipelineOptions::default().show_progress());
    }
}
