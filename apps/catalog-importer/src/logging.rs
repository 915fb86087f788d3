//! Tracing subscriber setup.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the tracing subscriber, writing to stderr.
///
/// `RUST_LOG` takes precedence over `filter`. With `json` set, events are
/// emitted as flattened JSON objects; otherwise in the compact text format.
pub fn init_logging(filter: &str, json: bool) {
    let filter_layer =
        match EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(filter)) {
            Ok(f) => f,
            Err(e) => {
                eprintln!("FATAL: Failed to create log filter: {e}");
                std::process::exit(1);
            }
        };

    let registry = tracing_subscriber::registry().with(filter_layer);
    if json {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .flatten_event(true),
            )
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .compact()
                    .with_writer(std::io::stderr)
                    .with_target(false),
            )
            .init();
    }

    tracing::debug!(filter = %filter, "Logging initialized");
}

/// The filter directive for the CLI flags.
#[must_use]
pub fn filter_for(level: &str, debug: bool) -> String {
    if debug {
        "debug".to_string()
    } else {
        level.to_string()
    }
}

/// Initialize logging for tests (with simpler output).
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("debug")
        .try_init();
}
