//! Evaluation errors.

use thiserror::Error;

/// Result type for sandbox operations.
pub type EvalResult<T> = Result<T, EvalError>;

/// Coarse classification of an [`EvalError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvalErrorKind {
    Parse,
    Runtime,
    Timeout,
    Coercion,
}

/// Failure to evaluate a script against a record.
#[derive(Debug, Error)]
pub enum EvalError {
    /// The script does not compile.
    #[error("failed to parse expression `{script}`: {message}")]
    Parse {
        script: String,
        message: String,
        line: Option<usize>,
    },

    /// The script threw or called something that does not exist.
    #[error("expression `{script}` failed: {message}")]
    Runtime { script: String, message: String },

    /// The script ran past its deadline or operation limit.
    #[error("expression `{script}` did not finish within {timeout_ms}ms")]
    Timeout { script: String, timeout_ms: u64 },

    /// The result could not be converted to the requested type.
    #[error("cannot convert {found} to {expected}")]
    Coercion {
        expected: &'static str,
        found: String,
    },
}

impl EvalError {
    #[must_use]
    pub fn kind(&self) -> EvalErrorKind {
        match self {
            EvalError::Parse { .. } => EvalErrorKind::Parse,
            EvalError::Runtime { .. } => EvalErrorKind::Runtime,
            EvalError::Timeout { .. } => EvalErrorKind::Timeout,
            EvalError::Coercion { .. } => EvalErrorKind::Coercion,
        }
    }

    pub(crate) fn coercion(expected: &'static str, found: impl Into<String>) -> Self {
        EvalError::Coercion {
            expected,
            found: found.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind() {
        let err = EvalError::Timeout {
            script: "loop {}".into(),
            timeout_ms: 250,
        };
        assert_eq!(err.kind(), EvalErrorKind::Timeout);
        assert_eq!(
            err.to_string(),
            "expression `loop {}` did not finish within 250ms"
        );
        assert_eq!(
            EvalError::coercion("bool", "map").kind(),
            EvalErrorKind::Coercion
        );
    }
}
