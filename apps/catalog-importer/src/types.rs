//! Catalog type sync.
//!
//! Runs before any entries are reconciled: prunes types this importer no
//! longer defines, creates missing ones, then brings every type's metadata
//! and schema in line with the config.

use std::collections::{BTreeMap, HashMap, HashSet};

use catalog_client::{
    CatalogClient, CatalogType, CatalogTypeAttribute, CatalogTypeSchema, CreateTypePayload,
    PathItem, UpdateSchemaPayload, UpdateTypePayload,
};
use catalog_output::{DesiredType, TypeAttribute};
use chrono::{DateTime, SecondsFormat, Utc};
use tracing::{debug, info, warn};

use crate::dry_run::DRY_RUN_PREFIX;
use crate::error::{CliError, CliResult};

pub const ANNOTATION_SYNC_ID: &str = "catalog-importer/sync-id";
pub const ANNOTATION_LAST_SYNC_AT: &str = "catalog-importer/last-sync-at";
pub const ANNOTATION_VERSION: &str = "catalog-importer/version";

/// How a remote type relates to this importer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    /// Annotated with our sync id.
    Managed,
    /// Editable, unannotated and not managed from a repository. The importer
    /// may adopt it.
    Unmanaged,
    /// Owned by another importer or integration.
    Ignored,
}

#[must_use]
pub fn classify(catalog_type: &CatalogType, sync_id: &str) -> Ownership {
    match catalog_type.annotations.get(ANNOTATION_SYNC_ID) {
        Some(owner) if owner == sync_id => Ownership::Managed,
        Some(_) => Ownership::Ignored,
        None if catalog_type.is_editable && catalog_type.source_repo_url.is_none() => {
            Ownership::Unmanaged
        }
        None => Ownership::Ignored,
    }
}

/// Annotations written on every type the importer creates or updates.
#[must_use]
pub fn annotations(sync_id: &str, now: DateTime<Utc>) -> BTreeMap<String, String> {
    BTreeMap::from([
        (ANNOTATION_SYNC_ID.to_string(), sync_id.to_string()),
        (
            ANNOTATION_LAST_SYNC_AT.to_string(),
            now.to_rfc3339_opts(SecondsFormat::Secs, true),
        ),
        (
            ANNOTATION_VERSION.to_string(),
            env!("CARGO_PKG_VERSION").to_string(),
        ),
    ])
}

/// Options for [`sync_types`].
#[derive(Debug, Clone, Default)]
pub struct TypeSyncOptions {
    pub sync_id: String,
    pub source_repo_url: Option<String>,
    /// Print what would change instead of changing it.
    pub dry_run: bool,
    /// Delete managed types that are no longer configured.
    pub prune_types: bool,
}

/// Remote types by type name, after sync.
#[derive(Debug, Default)]
pub struct SyncedTypes {
    by_type_name: HashMap<String, CatalogType>,
}

impl SyncedTypes {
    pub fn get(&self, type_name: &str) -> Option<&CatalogType> {
        self.by_type_name.get(type_name)
    }

    /// Id of the remote type for `type_name`.
    pub fn id(&self, type_name: &str) -> CliResult<&str> {
        self.get(type_name)
            .map(|catalog_type| catalog_type.id.as_str())
            .ok_or_else(|| missing_type(type_name))
    }

    pub fn len(&self) -> usize {
        self.by_type_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_type_name.is_empty()
    }
}

/// Make the remote types match `desired`.
pub async fn sync_types(
    client: &CatalogClient,
    desired: &[DesiredType],
    options: &TypeSyncOptions,
) -> CliResult<SyncedTypes> {
    let remote = client
        .list_types()
        .await
        .map_err(|e| CliError::api("listing catalog types", e))?;
    println!("✔ Connected to catalog API ({})", client.base_url());

    let mut managed = Vec::new();
    let mut unmanaged = Vec::new();
    for catalog_type in &remote {
        match classify(catalog_type, &options.sync_id) {
            Ownership::Managed => managed.push(catalog_type.clone()),
            Ownership::Unmanaged => {
                debug!(
                    catalog_type_id = %catalog_type.id,
                    type_name = %catalog_type.type_name,
                    "Catalog type is editable and unmanaged"
                );
                unmanaged.push(catalog_type.clone());
            }
            Ownership::Ignored => debug!(
                catalog_type_id = %catalog_type.id,
                type_name = %catalog_type.type_name,
                "Ignoring catalog type managed elsewhere"
            ),
        }
    }
    info!(
        total = remote.len(),
        managed = managed.len(),
        sync_id = %options.sync_id,
        "Found managed catalog types"
    );
    println!(
        "✔ Found {} catalog types, with {} that match our sync ID ({})",
        remote.len(),
        managed.len(),
        options.sync_id
    );

    if options.prune_types {
        managed = prune_types(client, managed, desired, options.dry_run).await?;
    }

    println!("\n↻ Creating catalog types that don't yet exist...");
    let mut synced = SyncedTypes::default();
    for catalog_type in unmanaged.into_iter().chain(managed) {
        if desired.iter().any(|d| d.type_name == catalog_type.type_name) {
            synced
                .by_type_name
                .insert(catalog_type.type_name.clone(), catalog_type);
        }
    }
    for desired_type in desired {
        if synced.get(&desired_type.type_name).is_some() {
            debug!(type_name = %desired_type.type_name, "Catalog type already exists");
            continue;
        }

        let created = if options.dry_run {
            info!(type_name = %desired_type.type_name, "Simulating catalog type create");
            simulated_type(desired_type, options)
        } else {
            info!(type_name = %desired_type.type_name, "Creating catalog type");
            client
                .create_type(&create_payload(desired_type, options, Utc::now()))
                .await
                .map_err(|e| {
                    CliError::api(
                        format!("creating catalog type with name {}", desired_type.type_name),
                        e,
                    )
                })?
        };
        println!("  ✔ {} (id={})", desired_type.type_name, created.id);
        synced
            .by_type_name
            .insert(desired_type.type_name.clone(), created);
    }

    println!("\n↻ Syncing catalog type schemas...");
    if options.dry_run {
        for desired_type in desired {
            let current = synced
                .get(&desired_type.type_name)
                .ok_or_else(|| missing_type(&desired_type.type_name))?;
            println!("  ✔ {} (id={})", desired_type.type_name, current.id);
            for line in type_changes(current, desired_type) {
                println!("      {line}");
            }
        }
        return Ok(synced);
    }

    let mut versions = HashMap::new();
    for desired_type in desired {
        let current = synced
            .get(&desired_type.type_name)
            .ok_or_else(|| missing_type(&desired_type.type_name))?;
        let version = update_type(client, current, desired_type, options).await?;
        versions.insert(desired_type.type_name.clone(), version);
    }

    println!("\n↻ Syncing derived attributes...");
    for desired_type in desired {
        let current = synced
            .get(&desired_type.type_name)
            .ok_or_else(|| missing_type(&desired_type.type_name))?;
        if !has_new_derived(desired_type, current) {
            continue;
        }

        let version = versions
            .get(&desired_type.type_name)
            .copied()
            .unwrap_or(current.schema.version);
        info!(
            catalog_type_id = %current.id,
            version,
            "Updating catalog type schema with derived attributes"
        );
        let updated = client
            .update_type_schema(
                &current.id,
                &UpdateSchemaPayload {
                    version,
                    attributes: schema_attributes(desired_type, current, true),
                },
            )
            .await
            .map_err(|e| {
                CliError::api(
                    format!("updating derived attributes of {}", desired_type.type_name),
                    e,
                )
            })?;
        println!("  ✔ {} (id={})", desired_type.type_name, updated.id);
    }

    Ok(synced)
}

/// Delete managed types no longer in `desired`, returning the survivors.
async fn prune_types(
    client: &CatalogClient,
    managed: Vec<CatalogType>,
    desired: &[DesiredType],
    dry_run: bool,
) -> CliResult<Vec<CatalogType>> {
    println!("\n↻ Prune enabled (--prune-types), removing types that are no longer in config...");

    let wanted: HashSet<&str> = desired.iter().map(|d| d.type_name.as_str()).collect();
    let (keep, remove): (Vec<_>, Vec<_>) = managed
        .into_iter()
        .partition(|catalog_type| wanted.contains(catalog_type.type_name.as_str()));

    if remove.is_empty() {
        println!("  ✔ Nothing to remove!");
    }
    for catalog_type in remove {
        warn!(
            catalog_type_id = %catalog_type.id,
            type_name = %catalog_type.type_name,
            "Removing catalog type no longer in config"
        );
        if !dry_run {
            client.delete_type(&catalog_type.id).await.map_err(|e| {
                CliError::api(
                    format!("removing catalog type {}", catalog_type.type_name),
                    e,
                )
            })?;
        }
        println!("  ⌫ {}", catalog_type.type_name);
    }

    Ok(keep)
}

/// Update type metadata, then its schema without new derived attributes.
/// Returns the resulting schema version.
async fn update_type(
    client: &CatalogClient,
    current: &CatalogType,
    desired: &DesiredType,
    options: &TypeSyncOptions,
) -> CliResult<i64> {
    info!(catalog_type_id = %current.id, type_name = %desired.type_name, "Updating catalog type");
    let updated = client
        .update_type(&current.id, &update_payload(desired, options, Utc::now()))
        .await
        .map_err(|e| {
            CliError::api(
                format!("updating catalog type with name {}", desired.type_name),
                e,
            )
        })?;

    let attributes = schema_attributes(desired, current, false);
    debug!(
        catalog_type_id = %current.id,
        version = updated.schema.version,
        attributes = attributes.len(),
        "Updating catalog type schema"
    );
    let updated = client
        .update_type_schema(
            &current.id,
            &UpdateSchemaPayload {
                version: updated.schema.version,
                attributes,
            },
        )
        .await
        .map_err(|e| {
            CliError::api(
                format!("updating catalog type schema of {}", desired.type_name),
                e,
            )
        })?;

    println!("  ✔ {} (id={})", desired.type_name, current.id);
    Ok(updated.schema.version)
}

fn missing_type(type_name: &str) -> CliError {
    CliError::Config(format!("could not find catalog type for '{type_name}'"))
}

fn create_payload(
    desired: &DesiredType,
    options: &TypeSyncOptions,
    now: DateTime<Utc>,
) -> CreateTypePayload {
    CreateTypePayload {
        name: desired.name.clone(),
        description: desired.description.clone(),
        type_name: desired.type_name.clone(),
        ranked: desired.ranked,
        use_name_as_identifier: desired.use_name_as_identifier,
        categories: desired.categories.clone(),
        annotations: annotations(&options.sync_id, now),
        source_repo_url: options.source_repo_url.clone(),
    }
}

fn update_payload(
    desired: &DesiredType,
    options: &TypeSyncOptions,
    now: DateTime<Utc>,
) -> UpdateTypePayload {
    UpdateTypePayload {
        name: desired.name.clone(),
        description: desired.description.clone(),
        ranked: desired.ranked,
        use_name_as_identifier: desired.use_name_as_identifier,
        categories: desired.categories.clone(),
        annotations: annotations(&options.sync_id, now),
        source_repo_url: options.source_repo_url.clone(),
    }
}

/// Stand-in for a type a dry run would have created.
fn simulated_type(desired: &DesiredType, options: &TypeSyncOptions) -> CatalogType {
    CatalogType {
        id: format!("{DRY_RUN_PREFIX}{}", desired.type_name),
        name: desired.name.clone(),
        description: desired.description.clone(),
        type_name: desired.type_name.clone(),
        ranked: desired.ranked,
        is_editable: true,
        use_name_as_identifier: desired.use_name_as_identifier,
        categories: desired.categories.clone(),
        annotations: annotations(&options.sync_id, Utc::now()),
        source_repo_url: options.source_repo_url.clone(),
        schema: CatalogTypeSchema::default(),
    }
}

fn schema_attribute(attr: &TypeAttribute) -> CatalogTypeAttribute {
    CatalogTypeAttribute {
        id: attr.id.clone(),
        name: attr.name.clone(),
        type_name: attr.type_name.clone(),
        array: attr.array,
        mode: attr.mode.into(),
        backlink_attribute: attr.backlink_attribute.clone(),
        path: attr.path.as_ref().map(|path| {
            path.iter()
                .map(|id| PathItem {
                    attribute_id: id.clone(),
                    attribute_name: None,
                })
                .collect()
        }),
    }
}

/// Schema attributes to send for `desired`.
///
/// Derived attributes can reference types or attributes created in the same
/// run, so unless `include_new_derived` is set, derived attributes missing
/// from the current schema are held back.
#[must_use]
pub fn schema_attributes(
    desired: &DesiredType,
    current: &CatalogType,
    include_new_derived: bool,
) -> Vec<CatalogTypeAttribute> {
    desired
        .attributes
        .iter()
        .filter(|attr| {
            include_new_derived
                || !attr.mode.is_derived()
                || current.schema.has_attribute(&attr.id)
        })
        .map(schema_attribute)
        .collect()
}

/// Whether `desired` adds a derived attribute to the current schema.
#[must_use]
pub fn has_new_derived(desired: &DesiredType, current: &CatalogType) -> bool {
    desired
        .attributes
        .iter()
        .any(|attr| attr.mode.is_derived() && !current.schema.has_attribute(&attr.id))
}

/// Human readable differences between a remote type and its desired state.
#[must_use]
pub fn type_changes(current: &CatalogType, desired: &DesiredType) -> Vec<String> {
    let mut changes = Vec::new();
    if current.name != desired.name {
        changes.push(format!("name: {:?} -> {:?}", current.name, desired.name));
    }
    if current.description != desired.description {
        changes.push(format!(
            "description: {:?} -> {:?}",
            current.description, desired.description
        ));
    }
    if current.ranked != desired.ranked {
        changes.push(format!("ranked: {} -> {}", current.ranked, desired.ranked));
    }
    if current.use_name_as_identifier != desired.use_name_as_identifier {
        changes.push(format!(
            "use_name_as_identifier: {} -> {}",
            current.use_name_as_identifier, desired.use_name_as_identifier
        ));
    }
    if current.categories != desired.categories {
        changes.push(format!(
            "categories: {:?} -> {:?}",
            current.categories, desired.categories
        ));
    }

    // Path names are only present on responses, so they never count as a
    // difference.
    let existing: HashMap<&str, CatalogTypeAttribute> = current
        .schema
        .attributes
        .iter()
        .map(|attr| {
            let mut stripped = attr.clone();
            if let Some(path) = stripped.path.as_mut() {
                for item in path {
                    item.attribute_name = None;
                }
            }
            (attr.id.as_str(), stripped)
        })
        .collect();

    for attr in &desired.attributes {
        let wanted = schema_attribute(attr);
        match existing.get(attr.id.as_str()) {
            None => changes.push(format!("+ attribute {} ({})", attr.id, attr.type_name)),
            Some(found) if *found != wanted => {
                changes.push(format!("~ attribute {} ({})", attr.id, attr.type_name));
            }
            Some(_) => {}
        }
    }
    for attr in &current.schema.attributes {
        if !desired.attributes.iter().any(|d| d.id == attr.id) {
            changes.push(format!("- attribute {}", attr.id));
        }
    }

    changes
}
