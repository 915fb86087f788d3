//! Source errors.

use thiserror::Error;

/// Result type for source operations.
pub type SourceResult<T> = Result<T, SourceError>;

#[derive(Debug, Error)]
pub enum SourceError {
    /// A file could not be read.
    #[error("reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A glob pattern is malformed.
    #[error("invalid file pattern {pattern:?}: {message}")]
    Glob { pattern: String, message: String },

    /// A command could not be started.
    #[error("running {command:?}: {message}")]
    Exec { command: String, message: String },

    /// A command exited unsuccessfully.
    #[error("command {command:?} exited with {status}: {stderr}")]
    ExecFailed {
        command: String,
        status: String,
        stderr: String,
    },

    /// A command ran past its timeout.
    #[error("command {command:?} did not finish within {timeout_secs}s")]
    ExecTimeout { command: String, timeout_secs: u64 },

    /// Content could not be parsed into records.
    #[error("parsing {origin}: {message}")]
    Parse { origin: String, message: String },

    /// The source config does not select exactly one backend.
    #[error("invalid source config: {0}")]
    Config(String),
}

impl SourceError {
    pub fn parse(origin: impl Into<String>, message: impl Into<String>) -> Self {
        SourceError::Parse {
            origin: origin.into(),
            message: message.into(),
        }
    }
}
