//! # catalog-importer
//!
//! Imports catalog entries from local files, inline config or command output
//! into a remote catalog.
//!
//! A sync runs in two stages. First the catalog types defined by the config
//! are created or updated ([`types`]). Then every pipeline loads its sources,
//! builds the desired entries of each output and reconciles them against the
//! remote catalog ([`pipeline`]).

pub mod commands;
pub mod config;
pub mod dry_run;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod progress;
pub mod types;

pub use error::{CliError, CliResult};
