//! Reconciliation errors.

use std::fmt;

use thiserror::Error;

use crate::client::BoxError;

/// Result type for reconciliation.
pub type ReconcileResult<T> = Result<T, ReconcileError>;

/// Mutation phases of a reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Delete,
    Create,
    Update,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Phase::Delete => "delete",
            Phase::Create => "create",
            Phase::Update => "update",
        })
    }
}

#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Listing observed entries failed.
    #[error("listing entries for {type_name}: {source}")]
    Fetch {
        type_name: String,
        #[source]
        source: BoxError,
    },

    #[error("destroying catalog entries: unable to destroy entry {entry}: {source}")]
    Delete {
        entry: String,
        external_id: Option<String>,
        #[source]
        source: BoxError,
    },

    #[error("creating catalog entries: unable to create entry with external_id={external_id}: {source}")]
    Create {
        external_id: String,
        #[source]
        source: BoxError,
    },

    #[error("updating catalog entries: bulk update batch {batch} ({size} entries, first external_id={first_external_id}): {source}")]
    BulkUpdate {
        batch: usize,
        size: usize,
        first_external_id: String,
        #[source]
        source: BoxError,
    },

    /// A worker task panicked or was aborted.
    #[error("{phase} worker failed: {message}")]
    Task { phase: Phase, message: String },
}

impl ReconcileError {
    /// The external id of the entry involved, where known.
    #[must_use]
    pub fn external_id(&self) -> Option<&str> {
        match self {
            ReconcileError::Delete { external_id, .. } => external_id.as_deref(),
            ReconcileError::Create { external_id, .. } => Some(external_id),
            ReconcileError::BulkUpdate {
                first_external_id, ..
            } => Some(first_external_id),
            ReconcileError::Fetch { .. } | ReconcileError::Task { .. } => None,
        }
    }

    /// The phase that failed, if any.
    #[must_use]
    pub fn phase(&self) -> Option<Phase> {
        match self {
            ReconcileError::Fetch { .. } => None,
            ReconcileError::Delete { .. } => Some(Phase::Delete),
            ReconcileError::Create { .. } => Some(Phase::Create),
            ReconcileError::BulkUpdate { .. } => Some(Phase::Update),
            ReconcileError::Task { phase, .. } => Some(*phase),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_context() {
        let err = ReconcileError::Create {
            external_id: "svc-1".into(),
            source: "HTTP 422".into(),
        };
        assert_eq!(
            err.to_string(),
            "creating catalog entries: unable to create entry with external_id=svc-1: HTTP 422"
        );
        assert_eq!(err.external_id(), Some("svc-1"));
        assert_eq!(err.phase(), Some(Phase::Create));
    }

    #[test]
    fn test_fetch_has_no_phase() {
        let err = ReconcileError::Fetch {
            type_name: r#"Custom["Service"]"#.into(),
            source: "timeout".into(),
        };
        assert_eq!(err.phase(), None);
        assert_eq!(err.external_id(), None);
    }
}
