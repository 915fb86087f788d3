//! Errors raised while building desired state.

use catalog_expr::EvalError;
use thiserror::Error;

/// Result type for building desired state.
pub type BuildResult<T> = Result<T, BuildError>;

#[derive(Debug, Error)]
pub enum BuildError {
    /// An expression in the output config does not compile.
    #[error("{field}: {source}")]
    Compile {
        field: String,
        #[source]
        source: EvalError,
    },

    /// The filter expression failed for a record.
    #[error("evaluating source.filter for record from {origin}: {source}")]
    Filter {
        origin: String,
        #[source]
        source: EvalError,
    },

    /// A required field failed to evaluate for a record.
    #[error("evaluating {field} for record from {origin}: {source}")]
    Field {
        field: &'static str,
        origin: String,
        #[source]
        source: EvalError,
    },

    /// A required field evaluated to nothing for a record.
    #[error("{field} is empty for record from {origin}")]
    MissingField { field: &'static str, origin: String },
}

impl BuildError {
    pub(crate) fn compile(field: impl Into<String>, source: EvalError) -> Self {
        BuildError::Compile {
            field: field.into(),
            source,
        }
    }
}
