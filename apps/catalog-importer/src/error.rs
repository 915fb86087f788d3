//! CLI error types and exit codes

use catalog_client::ApiError;
use catalog_output::BuildError;
use catalog_reconcile::ReconcileError;
use catalog_source::SourceError;
use thiserror::Error;

/// Exit codes for the CLI
/// - 0: Success
/// - 1: General error
/// - 3: Network error
/// - 4: Validation error
/// - 5: Server error
pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration: {0}")]
    Validation(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Server error: {0}")]
    Server(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Loading sources: {0}")]
    Source(String),

    #[error("Building entries: {0}")]
    Build(String),

    /// Reconciling a catalog type failed.
    #[error("{context}: {message}")]
    Sync {
        context: String,
        message: String,
        status: Option<u16>,
    },

    #[error("I/O error: {0}")]
    Io(String),
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Network(_) => 3,
            CliError::Validation(_) | CliError::Build(_) => 4,
            CliError::Server(_) => 5,
            CliError::Api { status, .. } => status_exit_code(*status),
            CliError::Sync {
                status: Some(status),
                ..
            } => status_exit_code(*status),
            CliError::Config(_) | CliError::Source(_) | CliError::Sync { .. } | CliError::Io(_) => 1,
        }
    }

    /// Print the error to stderr with appropriate formatting
    pub fn print(&self) {
        let use_color = std::env::var("NO_COLOR").is_err();
        if use_color {
            eprintln!("\x1b[31mError:\x1b[0m {self}");
        } else {
            eprintln!("Error: {self}");
        }

        if let Some(suggestion) = self.suggestion() {
            if use_color {
                eprintln!("\n\x1b[33mSuggestion:\x1b[0m {suggestion}");
            } else {
                eprintln!("\nSuggestion: {suggestion}");
            }
        }
    }

    fn suggestion(&self) -> Option<&'static str> {
        match self {
            CliError::Validation(_) => {
                Some("Run 'catalog-importer validate --config <file>' to check the config.")
            }
            CliError::Network(_) => Some("Check the API endpoint and your network connection."),
            CliError::Api { status: 401, .. } | CliError::Api { status: 403, .. } => {
                Some("Check the API key passed with --api-key or CATALOG_API_KEY.")
            }
            _ => None,
        }
    }

    /// Wrap a reconciliation failure with the output it happened in.
    pub fn sync(context: impl Into<String>, error: &ReconcileError) -> Self {
        let status = std::error::Error::source(error)
            .and_then(|source| source.downcast_ref::<ApiError>())
            .and_then(ApiError::status);
        CliError::Sync {
            context: context.into(),
            message: error.to_string(),
            status,
        }
    }

    /// Wrap an API failure with the operation that was attempted.
    pub fn api(context: impl Into<String>, error: ApiError) -> Self {
        match error {
            ApiError::Network(e) => CliError::Network(format!("{}: {e}", context.into())),
            other => CliError::Sync {
                context: context.into(),
                status: other.status(),
                message: other.to_string(),
            },
        }
    }
}

fn status_exit_code(status: u16) -> i32 {
    if status >= 500 {
        5
    } else {
        4
    }
}

impl From<ApiError> for CliError {
    fn from(e: ApiError) -> Self {
        match e {
            ApiError::Network(e) => CliError::Network(e.to_string()),
            ApiError::Server { status, body } => CliError::Api {
                status,
                message: body,
            },
            ApiError::Api { status, body } => CliError::Api {
                status,
                message: body,
            },
            ApiError::InvalidEndpoint(message) => CliError::Config(message),
            ApiError::MaxRetriesExceeded { message, .. } => CliError::Server(message),
            other => match other.status() {
                Some(status) => CliError::Api {
                    status,
                    message: other.to_string(),
                },
                None => CliError::Server(other.to_string()),
            },
        }
    }
}

impl From<SourceError> for CliError {
    fn from(e: SourceError) -> Self {
        CliError::Source(e.to_string())
    }
}

impl From<BuildError> for CliError {
    fn from(e: BuildError) -> Self {
        CliError::Build(e.to_string())
    }
}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        CliError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        CliError::Config(format!("JSON error: {e}"))
    }
}
