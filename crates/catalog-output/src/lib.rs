//! # catalog-output
//!
//! An output describes one catalog type managed by the importer: its schema,
//! which source records belong to it, and how each entry field is computed
//! from a record.
//!
//! This crate turns an [`OutputConfig`] plus source records into:
//!
//! - [`DesiredType`]s: the base type and one type per enum attribute
//! - [`DesiredEntry`](catalog_core::DesiredEntry)s: one per record that passes
//!   the output's filter, and one per distinct value of each enum attribute
//!
//! No network calls are made here.

pub mod builder;
pub mod compiled;
pub mod config;
pub mod error;
pub mod filter;
pub mod types;

pub use builder::{build_entries, build_enum_entries};
pub use compiled::CompiledOutput;
pub use config::{AttributeConfig, EnumConfig, OutputConfig, OutputSource};
pub use error::{BuildError, BuildResult};
pub use filter::collect;
pub use types::{desired_types, DesiredType, TypeAttribute};
