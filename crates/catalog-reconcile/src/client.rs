//! Remote entry operations used by the engine.

use std::collections::BTreeMap;

use async_trait::async_trait;
use catalog_core::{AttributeBinding, DesiredEntry, ObservedEntry};
use serde::{Deserialize, Serialize};

/// Error type returned by [`EntriesClient`] implementations.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Payload for creating one entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateEntry {
    pub catalog_type_id: String,
    pub name: String,
    pub external_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank: Option<i32>,
    pub aliases: Vec<String>,
    pub attribute_values: BTreeMap<String, AttributeBinding>,
}

/// One entry of a bulk update. Always carries a rank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialEntry {
    pub entry_id: String,
    pub name: String,
    pub external_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank: Option<i32>,
    pub aliases: Vec<String>,
    pub attribute_values: BTreeMap<String, AttributeBinding>,
}

/// Attribute values of `entry` that the importer may write.
pub(crate) fn writable_values(
    entry: &DesiredEntry,
    writable_attribute_ids: &[String],
) -> BTreeMap<String, AttributeBinding> {
    entry
        .attribute_values
        .iter()
        .filter(|(id, _)| writable_attribute_ids.contains(id))
        .map(|(id, binding)| (id.clone(), binding.clone()))
        .collect()
}

impl CreateEntry {
    #[must_use]
    pub fn from_desired(
        catalog_type_id: &str,
        entry: &DesiredEntry,
        writable_attribute_ids: &[String],
    ) -> Self {
        Self {
            catalog_type_id: catalog_type_id.to_string(),
            name: entry.name.clone(),
            external_id: entry.external_id.clone(),
            rank: entry.rank,
            aliases: entry.aliases.clone(),
            attribute_values: writable_values(entry, writable_attribute_ids),
        }
    }
}

impl PartialEntry {
    #[must_use]
    pub fn from_desired(
        entry_id: &str,
        entry: &DesiredEntry,
        writable_attribute_ids: &[String],
    ) -> Self {
        Self {
            entry_id: entry_id.to_string(),
            name: entry.name.clone(),
            external_id: entry.external_id.clone(),
            // Unset ranks compare as 0, so they are written as 0.
            rank: Some(entry.rank.unwrap_or(0)),
            aliases: entry.aliases.clone(),
            attribute_values: writable_values(entry, writable_attribute_ids),
        }
    }
}

/// Remote catalog entry operations.
///
/// `fetch_page`, `create` and `delete` are called concurrently from the
/// worker pool.
#[async_trait]
pub trait EntriesClient: Send + Sync {
    /// One page of entries of a type, starting after the entry with id
    /// `after`. An empty page ends pagination.
    async fn fetch_page(
        &self,
        catalog_type_id: &str,
        page_size: usize,
        after: Option<&str>,
    ) -> Result<Vec<ObservedEntry>, BoxError>;

    async fn create(&self, payload: CreateEntry) -> Result<ObservedEntry, BoxError>;

    async fn delete(&self, entry: &ObservedEntry) -> Result<(), BoxError>;

    /// Update several entries at once. Only attributes listed in
    /// `update_attributes` are written.
    async fn bulk_update(
        &self,
        catalog_type_id: &str,
        entries: Vec<PartialEntry>,
        update_attributes: &[String],
    ) -> Result<(), BoxError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payloads_drop_non_writable_values() {
        let entry = DesiredEntry::new("svc", "Service")
            .with_attribute("tier", AttributeBinding::Single("1".into()))
            .with_attribute("notes", AttributeBinding::Single("x".into()));
        let writable = vec!["tier".to_string()];

        let create = CreateEntry::from_desired("type-1", &entry, &writable);
        assert_eq!(create.catalog_type_id, "type-1");
        assert_eq!(create.attribute_values.len(), 1);
        assert!(create.attribute_values.contains_key("tier"));

        let partial = PartialEntry::from_desired("entry-1", &entry, &writable);
        assert_eq!(partial.entry_id, "entry-1");
        assert!(!partial.attribute_values.contains_key("notes"));
    }

    #[test]
    fn test_partial_entry_resets_unset_rank() {
        let entry = DesiredEntry::new("svc", "Service");
        let partial = PartialEntry::from_desired("entry-1", &entry, &[]);
        assert_eq!(partial.rank, Some(0));

        let create = CreateEntry::from_desired("type-1", &entry, &[]);
        assert_eq!(create.rank, None);

        let ranked = PartialEntry::from_desired("entry-1", &entry.with_rank(4), &[]);
        assert_eq!(ranked.rank, Some(4));
    }
}
