//! # catalog-reconcile
//!
//! Converges the entries of one remote catalog type to a list of
//! [`DesiredEntry`](catalog_core::DesiredEntry)s.
//!
//! A reconciliation runs `Fetch → Delete → Create → Update`:
//!
//! 1. every observed entry is fetched page by page
//! 2. observed entries without a matching external id are deleted (unless
//!    pruning is disabled)
//! 3. desired entries with no observed counterpart are created
//! 4. matched entries whose name, rank, aliases or api-writable attributes
//!    differ are updated in sequential bulk batches
//!
//! Deletes and creates run on a bounded worker pool; the first failure in a
//! phase stops new work from being launched and is returned. Nothing is
//! rolled back: running again recomputes the diff against the remote state.

pub mod client;
pub mod engine;
pub mod error;
pub mod options;
pub mod plan;
mod pool;
pub mod progress;

pub use client::{BoxError, CreateEntry, EntriesClient, PartialEntry};
pub use engine::{reconcile_entries, ReconcileSummary, ReconcileTarget};
pub use error::{Phase, ReconcileError, ReconcileResult};
pub use options::ReconcileOptions;
pub use plan::{entry_matches, plan, PlannedUpdate, ReconciliationPlan};
pub use progress::{NoopProgress, ProgressSink};
