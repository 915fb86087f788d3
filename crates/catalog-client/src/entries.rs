//! [`EntriesClient`] over the live API.

use async_trait::async_trait;
use catalog_core::ObservedEntry;
use catalog_reconcile::{BoxError, CreateEntry, EntriesClient, PartialEntry};

use crate::client::CatalogClient;
use crate::models::{to_api_bindings, CreateEntryPayload, PartialEntryPayload};

#[async_trait]
impl EntriesClient for CatalogClient {
    async fn fetch_page(
        &self,
        catalog_type_id: &str,
        page_size: usize,
        after: Option<&str>,
    ) -> Result<Vec<ObservedEntry>, BoxError> {
        let entries = self
            .list_entries_page(catalog_type_id, page_size, after)
            .await?;
        Ok(entries.into_iter().map(ObservedEntry::from).collect())
    }

    async fn create(&self, payload: CreateEntry) -> Result<ObservedEntry, BoxError> {
        let payload = CreateEntryPayload {
            attribute_values: to_api_bindings(&payload.attribute_values),
            catalog_type_id: payload.catalog_type_id,
            name: payload.name,
            external_id: payload.external_id,
            rank: payload.rank,
            aliases: payload.aliases,
        };
        let entry = self.create_entry(&payload).await?;
        Ok(entry.into())
    }

    async fn delete(&self, entry: &ObservedEntry) -> Result<(), BoxError> {
        self.delete_entry(&entry.id).await?;
        Ok(())
    }

    async fn bulk_update(
        &self,
        catalog_type_id: &str,
        entries: Vec<PartialEntry>,
        update_attributes: &[String],
    ) -> Result<(), BoxError> {
        let entries = entries
            .into_iter()
            .map(|entry| PartialEntryPayload {
                attribute_values: to_api_bindings(&entry.attribute_values),
                entry_id: entry.entry_id,
                name: entry.name,
                external_id: entry.external_id,
                rank: entry.rank,
                aliases: entry.aliases,
            })
            .collect();
        self.bulk_update_entries(catalog_type_id, entries, update_attributes)
            .await?;
        Ok(())
    }
}
