//! Wire models of the catalog API.

use std::collections::BTreeMap;

use catalog_core::{AttributeBinding, AttributeMode, ObservedEntry};
use serde::{Deserialize, Serialize};

// ── Bindings ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindingValue {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub literal: Option<String>,
}

impl BindingValue {
    fn literal(value: &str) -> Self {
        Self {
            literal: Some(value.to_string()),
        }
    }
}

/// An attribute value as the API represents it: either a single value or
/// an array of values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiBinding {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<BindingValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub array_value: Option<Vec<BindingValue>>,
}

impl From<&AttributeBinding> for ApiBinding {
    fn from(binding: &AttributeBinding) -> Self {
        match binding {
            AttributeBinding::Single(value) => ApiBinding {
                value: Some(BindingValue::literal(value)),
                array_value: None,
            },
            AttributeBinding::List(values) => ApiBinding {
                value: None,
                array_value: Some(values.iter().map(|v| BindingValue::literal(v)).collect()),
            },
        }
    }
}

impl From<ApiBinding> for AttributeBinding {
    /// Values without a literal are dropped; a binding with neither a value
    /// nor an array becomes an empty list.
    fn from(binding: ApiBinding) -> Self {
        if let Some(literal) = binding.value.and_then(|v| v.literal) {
            return AttributeBinding::Single(literal);
        }
        AttributeBinding::List(
            binding
                .array_value
                .unwrap_or_default()
                .into_iter()
                .filter_map(|v| v.literal)
                .collect(),
        )
    }
}

pub(crate) fn to_api_bindings(
    values: &BTreeMap<String, AttributeBinding>,
) -> BTreeMap<String, ApiBinding> {
    values
        .iter()
        .map(|(id, binding)| (id.clone(), ApiBinding::from(binding)))
        .collect()
}

// ── Entries ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: String,
    #[serde(default)]
    pub catalog_type_id: String,
    #[serde(default)]
    pub external_id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub rank: i32,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub attribute_values: BTreeMap<String, ApiBinding>,
}

impl From<CatalogEntry> for ObservedEntry {
    fn from(entry: CatalogEntry) -> Self {
        ObservedEntry {
            id: entry.id,
            external_id: entry.external_id.filter(|id| !id.is_empty()),
            name: entry.name,
            rank: Some(entry.rank),
            aliases: entry.aliases,
            attribute_values: entry
                .attribute_values
                .into_iter()
                .map(|(id, binding)| (id, binding.into()))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct PaginationMeta {
    #[serde(default)]
    pub after: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ListEntriesResponse {
    #[serde(default)]
    pub catalog_entries: Vec<CatalogEntry>,
    #[serde(default)]
    pub pagination_meta: PaginationMeta,
}

#[derive(Debug, Deserialize)]
pub(crate) struct EntryResponse {
    pub catalog_entry: CatalogEntry,
}

#[derive(Debug, Serialize)]
pub(crate) struct CreateEntryPayload {
    pub catalog_type_id: String,
    pub name: String,
    pub external_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rank: Option<i32>,
    pub aliases: Vec<String>,
    pub attribute_values: BTreeMap<String, ApiBinding>,
}

#[derive(Debug, Serialize)]
pub(crate) struct PartialEntryPayload {
    pub entry_id: String,
    pub name: String,
    pub external_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rank: Option<i32>,
    pub aliases: Vec<String>,
    pub attribute_values: BTreeMap<String, ApiBinding>,
}

#[derive(Debug, Serialize)]
pub(crate) struct BulkUpdatePayload {
    pub catalog_type_id: String,
    pub entries: Vec<PartialEntryPayload>,
    pub update_attributes: Vec<String>,
}

// ── Types ─────────────────────────────────────────────────────────────

/// How the API treats an attribute's values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiAttributeMode {
    #[default]
    #[serde(rename = "")]
    Unset,
    Api,
    Dashboard,
    Backlink,
    Path,
    #[serde(other)]
    Other,
}

impl From<AttributeMode> for ApiAttributeMode {
    fn from(mode: AttributeMode) -> Self {
        match mode {
            AttributeMode::ApiWritable => ApiAttributeMode::Api,
            AttributeMode::SchemaOnly => ApiAttributeMode::Dashboard,
            AttributeMode::DerivedBacklink => ApiAttributeMode::Backlink,
            AttributeMode::DerivedPath => ApiAttributeMode::Path,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathItem {
    pub attribute_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogTypeAttribute {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub array: bool,
    #[serde(default)]
    pub mode: ApiAttributeMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backlink_attribute: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<Vec<PathItem>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogTypeSchema {
    #[serde(default)]
    pub version: i64,
    #[serde(default)]
    pub attributes: Vec<CatalogTypeAttribute>,
}

impl CatalogTypeSchema {
    #[must_use]
    pub fn has_attribute(&self, id: &str) -> bool {
        self.attributes.iter().any(|attr| attr.id == id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogType {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub type_name: String,
    #[serde(default)]
    pub ranked: bool,
    #[serde(default)]
    pub is_editable: bool,
    #[serde(default)]
    pub use_name_as_identifier: bool,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
    #[serde(default)]
    pub source_repo_url: Option<String>,
    #[serde(default)]
    pub schema: CatalogTypeSchema,
}

/// Broad kind of a catalog resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceCategory {
    Primitive,
    Custom,
    External,
    #[serde(other)]
    Other,
}

impl std::fmt::Display for ResourceCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ResourceCategory::Primitive => "primitive",
            ResourceCategory::Custom => "custom",
            ResourceCategory::External => "external",
            ResourceCategory::Other => "other",
        })
    }
}

/// A type that attributes can reference, such as `String` or `Custom["Team"]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogResource {
    pub label: String,
    #[serde(rename = "type")]
    pub type_name: String,
    pub category: ResourceCategory,
    #[serde(default)]
    pub description: String,
    /// How values of this type are written.
    #[serde(default)]
    pub value_docstring: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ListResourcesResponse {
    pub resources: Vec<CatalogResource>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ListTypesResponse {
    pub catalog_types: Vec<CatalogType>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TypeResponse {
    pub catalog_type: CatalogType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateTypePayload {
    pub name: String,
    pub description: String,
    pub type_name: String,
    pub ranked: bool,
    pub use_name_as_identifier: bool,
    pub categories: Vec<String>,
    pub annotations: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_repo_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateTypePayload {
    pub name: String,
    pub description: String,
    pub ranked: bool,
    pub use_name_as_identifier: bool,
    pub categories: Vec<String>,
    pub annotations: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_repo_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateSchemaPayload {
    pub version: i64,
    pub attributes: Vec<CatalogTypeAttribute>,
}
