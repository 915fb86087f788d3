//! HTTP client for the catalog API.
//!
//! [`CatalogClient`] wraps `reqwest` with bearer authentication, retries for
//! rate limits and transient failures, and an optional read-only mode that
//! refuses any mutating request before it is sent. It implements
//! [`catalog_reconcile::EntriesClient`] so the reconciliation engine can talk
//! to the live API.

pub mod client;
pub mod entries;
pub mod error;
pub mod models;
pub mod retry;

pub use client::{CatalogClient, ClientConfig};
pub use error::{ApiError, ApiResult};
pub use models::{
    ApiAttributeMode, ApiBinding, BindingValue, CatalogEntry, CatalogResource, CatalogType,
    CatalogTypeAttribute, CatalogTypeSchema, CreateTypePayload, PathItem, ResourceCategory,
    UpdateSchemaPayload, UpdateTypePayload,
};
pub use retry::RetryPolicy;
