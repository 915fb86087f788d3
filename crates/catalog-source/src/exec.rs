//! Records from the standard output of a command.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::debug;
use validator::Validate;

use crate::backend::{Backend, SourceEntry};
use crate::error::{SourceError, SourceResult};

fn default_timeout_secs() -> u64 {
    300
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct ExecSource {
    /// Program followed by its arguments. Not run through a shell.
    #[validate(length(min = 1, message = "command must name a program"))]
    pub command: Vec<String>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl ExecSource {
    pub fn new(command: Vec<String>) -> Self {
        Self {
            command,
            timeout_secs: default_timeout_secs(),
        }
    }

    fn command_line(&self) -> String {
        self.command.join(" ")
    }
}

#[async_trait]
impl Backend for ExecSource {
    fn describe(&self) -> String {
        format!("command {}", self.command_line())
    }

    async fn load(&self) -> SourceResult<Vec<SourceEntry>> {
        let command_line = self.command_line();
        let (program, args) = self.command.split_first().ok_or_else(|| {
            SourceError::Config("exec source has an empty command".into())
        })?;

        let mut command = Command::new(program);
        command.args(args).kill_on_drop(true);

        let output = tokio::time::timeout(Duration::from_secs(self.timeout_secs), command.output())
            .await
            .map_err(|_| SourceError::ExecTimeout {
                command: command_line.clone(),
                timeout_secs: self.timeout_secs,
            })?
            .map_err(|e| SourceError::Exec {
                command: command_line.clone(),
                message: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(SourceError::ExecFailed {
                command: command_line,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        debug!(command = %command_line, bytes = output.stdout.len(), "Command produced output");
        Ok(vec![SourceEntry::new(command_line, output.stdout)])
    }
}
