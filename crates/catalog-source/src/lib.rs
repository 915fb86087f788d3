//! # catalog-source
//!
//! Produces [`SourceRecord`](catalog_core::SourceRecord)s from configured
//! sources.
//!
//! Three backends are supported:
//!
//! - `local`: files matched by glob patterns
//! - `inline`: entries written directly in the importer config
//! - `exec`: the standard output of a command
//!
//! Every backend yields raw [`SourceEntry`] content, which is parsed as JSON or
//! YAML (one or more documents, each a map or a list of maps), falling back to
//! CSV with a header row. Content that fails to parse is logged with a sample
//! and skipped so that one malformed file does not fail the whole import.

pub mod backend;
pub mod config;
pub mod error;
pub mod exec;
pub mod inline;
pub mod loader;
pub mod local;
pub mod parse;

pub use backend::{Backend, SourceEntry};
pub use config::SourceConfig;
pub use error::{SourceError, SourceResult};
pub use exec::ExecSource;
pub use inline::InlineSource;
pub use loader::{load_records, DEFAULT_SAMPLE_LENGTH};
pub use local::LocalSource;
