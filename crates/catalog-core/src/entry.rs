//! Desired and observed catalog entries.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The value bound to one attribute of an entry.
///
/// Either a single literal or an ordered list of literals, never both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeBinding {
    Single(String),
    List(Vec<String>),
}

impl AttributeBinding {
    /// An empty list binding, which the remote catalog treats as "unset".
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, AttributeBinding::List(values) if values.is_empty())
    }

    /// All literals of this binding in order.
    #[must_use]
    pub fn literals(&self) -> Vec<&str> {
        match self {
            AttributeBinding::Single(value) => vec![value.as_str()],
            AttributeBinding::List(values) => values.iter().map(String::as_str).collect(),
        }
    }
}

/// Who owns the value of an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeMode {
    /// Set by this importer.
    #[default]
    ApiWritable,
    /// Computed server-side from another type's attribute.
    DerivedBacklink,
    /// Computed server-side by walking a path of attributes.
    DerivedPath,
    /// Declared in the schema, values managed from the dashboard.
    SchemaOnly,
}

impl AttributeMode {
    /// Whether entry updates may write this attribute.
    #[must_use]
    pub fn is_api_writable(self) -> bool {
        matches!(self, AttributeMode::ApiWritable)
    }

    /// Whether the value is computed by the remote catalog.
    #[must_use]
    pub fn is_derived(self) -> bool {
        matches!(self, AttributeMode::DerivedBacklink | AttributeMode::DerivedPath)
    }
}

/// Target state for one catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DesiredEntry {
    pub external_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank: Option<i32>,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub attribute_values: BTreeMap<String, AttributeBinding>,
}

impl DesiredEntry {
    pub fn new(external_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            external_id: external_id.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_rank(mut self, rank: i32) -> Self {
        self.rank = Some(rank);
        self
    }

    #[must_use]
    pub fn with_aliases(mut self, aliases: Vec<String>) -> Self {
        self.aliases = aliases;
        self
    }

    #[must_use]
    pub fn with_attribute(mut self, id: impl Into<String>, binding: AttributeBinding) -> Self {
        self.attribute_values.insert(id.into(), binding);
        self
    }
}

/// Current state of one catalog entry as reported by the remote catalog.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ObservedEntry {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank: Option<i32>,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub attribute_values: BTreeMap<String, AttributeBinding>,
}

impl ObservedEntry {
    pub fn new(id: impl Into<String>, external_id: Option<&str>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            external_id: external_id.map(str::to_string),
            name: name.into(),
            ..Default::default()
        }
    }

    /// Label used in logs and errors.
    #[must_use]
    pub fn describe(&self) -> String {
        match &self.external_id {
            Some(external_id) => format!("id={} external_id={external_id}", self.id),
            None => format!("id={}", self.id),
        }
    }
}
