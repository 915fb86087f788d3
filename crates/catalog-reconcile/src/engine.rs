//! Reconciliation of one catalog type.

use std::sync::Arc;

use catalog_core::{DesiredEntry, ObservedEntry};
use tracing::{debug, info};

use crate::client::{CreateEntry, EntriesClient, PartialEntry};
use crate::error::{Phase, ReconcileError, ReconcileResult};
use crate::options::ReconcileOptions;
use crate::plan::plan;
use crate::pool::run_bounded;
use crate::progress::ProgressSink;

/// The remote catalog type being reconciled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileTarget {
    pub catalog_type_id: String,
    /// Type name, used in logs and errors.
    pub type_name: String,
    /// Attributes the importer owns. Others are never compared or written.
    pub writable_attribute_ids: Vec<String>,
}

/// Counts of what a reconciliation did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    pub observed: usize,
    pub deleted: usize,
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
}

/// Converge the entries of `target` to `desired`.
///
/// Phases run strictly in order: fetch, delete, create, update. A failure
/// stops the run; earlier phases are not rolled back.
pub async fn reconcile_entries(
    client: Arc<dyn EntriesClient>,
    target: &ReconcileTarget,
    desired: &[DesiredEntry],
    progress: &dyn ProgressSink,
    options: &ReconcileOptions,
) -> ReconcileResult<ReconcileSummary> {
    let observed = fetch_all(client.as_ref(), target, options.page_size).await?;
    info!(
        type_name = %target.type_name,
        observed = observed.len(),
        desired = desired.len(),
        "Fetched catalog entries"
    );

    let plan = plan(
        &observed,
        desired,
        &target.writable_attribute_ids,
        options.prune,
    );
    let mut summary = ReconcileSummary {
        observed: observed.len(),
        unchanged: plan.unchanged,
        ..ReconcileSummary::default()
    };

    progress.on_delete_start(plan.to_delete.len());
    if !plan.to_delete.is_empty() {
        info!(type_name = %target.type_name, count = plan.to_delete.len(), "Deleting catalog entries");
        summary.deleted = run_bounded(
            Phase::Delete,
            plan.to_delete,
            options.concurrency,
            || progress.on_delete_progress(),
            |entry: ObservedEntry| {
                let client = Arc::clone(&client);
                async move {
                    debug!(entry = %entry.describe(), "Deleting entry");
                    client
                        .delete(&entry)
                        .await
                        .map_err(|source| ReconcileError::Delete {
                            entry: entry.describe(),
                            external_id: entry.external_id.clone(),
                            source,
                        })
                }
            },
        )
        .await?;
    }

    progress.on_create_start(plan.to_create.len());
    if !plan.to_create.is_empty() {
        info!(type_name = %target.type_name, count = plan.to_create.len(), "Creating catalog entries");
        let payloads: Vec<CreateEntry> = plan
            .to_create
            .iter()
            .map(|entry| {
                CreateEntry::from_desired(
                    &target.catalog_type_id,
                    entry,
                    &target.writable_attribute_ids,
                )
            })
            .collect();
        summary.created = run_bounded(
            Phase::Create,
            payloads,
            options.concurrency,
            || progress.on_create_progress(),
            |payload: CreateEntry| {
                let client = Arc::clone(&client);
                async move {
                    let external_id = payload.external_id.clone();
                    debug!(external_id = %external_id, "Creating entry");
                    client
                        .create(payload)
                        .await
                        .map(|_| ())
                        .map_err(|source| ReconcileError::Create {
                            external_id,
                            source,
                        })
                }
            },
        )
        .await?;
    }

    progress.on_update_start(plan.to_update.len());
    if !plan.to_update.is_empty() {
        info!(type_name = %target.type_name, count = plan.to_update.len(), "Updating catalog entries");
        for (index, batch) in plan.to_update.chunks(options.update_batch_size).enumerate() {
            let entries: Vec<PartialEntry> = batch
                .iter()
                .map(|update| {
                    PartialEntry::from_desired(
                        &update.entry_id,
                        &update.desired,
                        &target.writable_attribute_ids,
                    )
                })
                .collect();
            let first_external_id = batch
                .first()
                .map(|update| update.desired.external_id.clone())
                .unwrap_or_default();

            debug!(batch = index + 1, size = batch.len(), "Sending bulk update");
            client
                .bulk_update(
                    &target.catalog_type_id,
                    entries,
                    &target.writable_attribute_ids,
                )
                .await
                .map_err(|source| ReconcileError::BulkUpdate {
                    batch: index + 1,
                    size: batch.len(),
                    first_external_id,
                    source,
                })?;

            for _ in batch {
                progress.on_update_progress();
            }
            summary.updated += batch.len();
        }
    }

    info!(
        type_name = %target.type_name,
        deleted = summary.deleted,
        created = summary.created,
        updated = summary.updated,
        unchanged = summary.unchanged,
        "Reconciled catalog entries"
    );
    Ok(summary)
}

/// List every entry of the target type, following `after` cursors until an
/// empty page.
async fn fetch_all(
    client: &dyn EntriesClient,
    target: &ReconcileTarget,
    page_size: usize,
) -> ReconcileResult<Vec<ObservedEntry>> {
    let mut entries = Vec::new();
    let mut after: Option<String> = None;

    loop {
        let page = client
            .fetch_page(&target.catalog_type_id, page_size, after.as_deref())
            .await
            .map_err(|source| ReconcileError::Fetch {
                type_name: target.type_name.clone(),
                source,
            })?;

        let Some(last) = page.last() else {
            break;
        };
        after = Some(last.id.clone());
        debug!(type_name = %target.type_name, page = page.len(), "Fetched page");
        entries.extend(page);
    }

    Ok(entries)
}
