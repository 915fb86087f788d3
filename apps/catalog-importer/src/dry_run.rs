//! Entries client that reports mutations instead of performing them.

use std::collections::HashMap;
use std::io::Write;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use catalog_core::{AttributeBinding, ObservedEntry};
use catalog_reconcile::{BoxError, CreateEntry, EntriesClient, PartialEntry};
use tracing::debug;
use uuid::Uuid;

/// Id prefix of catalog types and entries simulated during a dry run.
pub const DRY_RUN_PREFIX: &str = "DRY-RUN-";

/// Whether `id` belongs to something simulated during a dry run.
#[must_use]
pub fn is_dry_run_id(id: &str) -> bool {
    id.starts_with(DRY_RUN_PREFIX)
}

/// One field that an update would change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldChange {
    pub field: String,
    pub old: String,
    pub new: String,
}

/// Reads from the live API but prints deletes, creates and updates.
///
/// Entries of simulated types (ids starting with [`DRY_RUN_PREFIX`]) are
/// reported as empty, since the type does not exist remotely.
pub struct DryRunEntriesClient {
    inner: Arc<dyn EntriesClient>,
    fetched: Mutex<HashMap<String, ObservedEntry>>,
    out: Mutex<Box<dyn Write + Send>>,
    color: bool,
}

impl DryRunEntriesClient {
    pub fn new(inner: Arc<dyn EntriesClient>) -> Self {
        Self {
            inner,
            fetched: Mutex::new(HashMap::new()),
            out: Mutex::new(Box::new(std::io::stdout())),
            color: std::env::var("NO_COLOR").is_err(),
        }
    }

    /// Write the report to `out` without colors.
    #[must_use]
    pub fn with_writer(mut self, out: Box<dyn Write + Send>) -> Self {
        self.out = Mutex::new(out);
        self.color = false;
        self
    }

    fn emit(&self, color: &str, lines: &[String]) {
        let Ok(mut out) = self.out.lock() else {
            return;
        };
        for (idx, line) in lines.iter().enumerate() {
            let result = if self.color && idx == 0 {
                writeln!(out, "{color}{line}\x1b[0m")
            } else {
                writeln!(out, "{line}")
            };
            if result.is_err() {
                return;
            }
        }
    }
}

#[async_trait]
impl EntriesClient for DryRunEntriesClient {
    async fn fetch_page(
        &self,
        catalog_type_id: &str,
        page_size: usize,
        after: Option<&str>,
    ) -> Result<Vec<ObservedEntry>, BoxError> {
        if is_dry_run_id(catalog_type_id) {
            debug!(catalog_type_id, "Type is simulated, reporting no entries");
            return Ok(Vec::new());
        }

        let page = self
            .inner
            .fetch_page(catalog_type_id, page_size, after)
            .await?;
        if let Ok(mut fetched) = self.fetched.lock() {
            for entry in &page {
                fetched.insert(entry.id.clone(), entry.clone());
            }
        }
        Ok(page)
    }

    async fn create(&self, payload: CreateEntry) -> Result<ObservedEntry, BoxError> {
        let mut lines = vec![format!(
            "      + CREATE: external_id={} name={:?}",
            payload.external_id, payload.name
        )];
        if let Some(rank) = payload.rank {
            lines.push(format!("          rank: {rank}"));
        }
        if !payload.aliases.is_empty() {
            lines.push(format!("          aliases: {:?}", payload.aliases));
        }
        for (id, binding) in &payload.attribute_values {
            lines.push(format!("          {id}: {}", binding_display(Some(binding))));
        }
        self.emit("\x1b[32m", &lines);

        let mut entry = ObservedEntry::new(
            format!("{DRY_RUN_PREFIX}{}", Uuid::new_v4()),
            Some(payload.external_id.as_str()),
            payload.name,
        );
        entry.rank = payload.rank;
        entry.aliases = payload.aliases;
        entry.attribute_values = payload.attribute_values;
        Ok(entry)
    }

    async fn delete(&self, entry: &ObservedEntry) -> Result<(), BoxError> {
        self.emit(
            "\x1b[31m",
            &[format!(
                "      - DELETE: {} name={:?}",
                entry.describe(),
                entry.name
            )],
        );
        Ok(())
    }

    async fn bulk_update(
        &self,
        _catalog_type_id: &str,
        entries: Vec<PartialEntry>,
        update_attributes: &[String],
    ) -> Result<(), BoxError> {
        for update in &entries {
            let existing = self
                .fetched
                .lock()
                .ok()
                .and_then(|fetched| fetched.get(&update.entry_id).cloned());

            let mut lines = vec![format!(
                "      ~ UPDATE: entry_id={} external_id={}",
                update.entry_id, update.external_id
            )];
            match existing {
                Some(existing) => {
                    for change in entry_changes(&existing, update, update_attributes) {
                        lines.push(format!(
                            "          {}: {:?} -> {:?}",
                            change.field, change.old, change.new
                        ));
                    }
                }
                None => lines.push("          could not find entry for diff".to_string()),
            }
            self.emit("\x1b[33m", &lines);
        }
        Ok(())
    }
}

/// Fields of `existing` that `update` would change. Only attributes in
/// `update_attributes` are compared; a missing binding reads as empty.
#[must_use]
pub fn entry_changes(
    existing: &ObservedEntry,
    update: &PartialEntry,
    update_attributes: &[String],
) -> Vec<FieldChange> {
    let mut changes = Vec::new();
    let mut push = |field: &str, old: String, new: String| {
        if old != new {
            changes.push(FieldChange {
                field: field.to_string(),
                old,
                new,
            });
        }
    };

    push("name", existing.name.clone(), update.name.clone());
    push(
        "external_id",
        existing.external_id.clone().unwrap_or_default(),
        update.external_id.clone(),
    );
    push(
        "rank",
        existing.rank.unwrap_or(0).to_string(),
        update.rank.unwrap_or(0).to_string(),
    );
    push(
        "aliases",
        existing.aliases.join(", "),
        update.aliases.join(", "),
    );
    for id in update_attributes {
        push(
            id,
            binding_display(existing.attribute_values.get(id)),
            binding_display(update.attribute_values.get(id)),
        );
    }

    changes
}

fn binding_display(binding: Option<&AttributeBinding>) -> String {
    match binding {
        Some(AttributeBinding::Single(value)) => value.clone(),
        Some(AttributeBinding::List(values)) if !values.is_empty() => {
            format!("[{}]", values.join(", "))
        }
        _ => String::new(),
    }
}
