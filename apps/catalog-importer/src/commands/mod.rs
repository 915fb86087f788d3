//! CLI command implementations

pub mod import;
pub mod source;
pub mod sync;
pub mod types;
pub mod validate;

use catalog_client::ClientConfig;

use crate::error::{CliError, CliResult};

/// Client settings from the `--api-key` and `--api-endpoint` flags.
pub(crate) fn client_config(
    api_key: Option<&str>,
    api_endpoint: Option<&str>,
) -> CliResult<ClientConfig> {
    let api_key = api_key.ok_or_else(|| {
        CliError::Config("an API key is required, set --api-key or CATALOG_API_KEY".into())
    })?;
    let endpoint = api_endpoint.ok_or_else(|| {
        CliError::Config(
            "an API endpoint is required, set --api-endpoint or CATALOG_API_ENDPOINT".into(),
        )
    })?;
    Ok(ClientConfig::new(endpoint, api_key))
}
