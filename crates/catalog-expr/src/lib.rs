//! # catalog-expr
//!
//! Expression sandbox used to turn source records into catalog entry fields.
//!
//! Each field of an output (name, external id, rank, aliases, attributes) is a
//! small [Rhai](https://rhai.rs) script evaluated against one record, bound to
//! the variable `record`:
//!
//! ```text
//! record.metadata.name
//! coalesce(record.owner, record.team, "unowned")
//! pluck(record.links, "url")
//! ```
//!
//! Evaluation is bounded by a wall-clock deadline and by the engine's
//! operation, call depth and collection size limits. A script that yields `()`
//! (for example by reading a missing map key) produces "absent" rather than an
//! error, so optional fields can be skipped per record.

pub mod coerce;
pub mod config;
pub mod error;
mod functions;
pub mod sandbox;

pub use coerce::{coerce_literal, FromScript, LiteralKind};
pub use config::SandboxConfig;
pub use error::{EvalError, EvalErrorKind, EvalResult};
pub use sandbox::{Sandbox, Script};
