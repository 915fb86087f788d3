//! # catalog-core
//!
//! Shared data model for the catalog importer.
//!
//! - [`Value`] / [`SourceRecord`]: dynamically typed records produced by sources
//! - [`DesiredEntry`]: the target state for one catalog entry, built from a record
//! - [`ObservedEntry`]: the current state as reported by the remote catalog
//! - [`AttributeBinding`] / [`AttributeMode`]: attribute values and ownership

pub mod entry;
pub mod record;
pub mod value;

pub use entry::{AttributeBinding, AttributeMode, DesiredEntry, ObservedEntry};
pub use record::SourceRecord;
pub use value::Value;
