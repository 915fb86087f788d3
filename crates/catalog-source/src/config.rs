//! Source configuration.

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::backend::Backend;
use crate::error::{SourceError, SourceResult};
use crate::exec::ExecSource;
use crate::inline::InlineSource;
use crate::local::LocalSource;

/// One configured source. Exactly one backend must be set.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_single_backend"))]
#[serde(deny_unknown_fields)]
pub struct SourceConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(nested)]
    pub local: Option<LocalSource>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(nested)]
    pub inline: Option<InlineSource>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(nested)]
    pub exec: Option<ExecSource>,
}

impl SourceConfig {
    fn configured(&self) -> Vec<&dyn Backend> {
        let mut backends: Vec<&dyn Backend> = Vec::new();
        if let Some(local) = &self.local {
            backends.push(local);
        }
        if let Some(inline) = &self.inline {
            backends.push(inline);
        }
        if let Some(exec) = &self.exec {
            backends.push(exec);
        }
        backends
    }

    /// The selected backend.
    pub fn backend(&self) -> SourceResult<&dyn Backend> {
        match self.configured().as_slice() {
            [backend] => Ok(*backend),
            [] => Err(SourceError::Config(
                "no backend configured, set one of local, inline, exec".into(),
            )),
            _ => Err(SourceError::Config(
                "multiple backends configured, set only one of local, inline, exec".into(),
            )),
        }
    }
}

fn validate_single_backend(config: &SourceConfig) -> Result<(), ValidationError> {
    match config.backend() {
        Ok(_) => Ok(()),
        Err(e) => {
            let mut err = ValidationError::new("source_backend");
            err.message = Some(e.to_string().into());
            Err(err)
        }
    }
}
