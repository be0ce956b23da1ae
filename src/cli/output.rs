//! CLI output: error mapping and exit codes.

use crate::error::ApiError;
use crate::progress::RunStatus;

/// Map domain errors to a string for CLI output.
pub fn map_error(e: &ApiError) -> String {
    match e {
        ApiError::ConfigError(msg) => format!("Configuration error: {}\nCheck config/config.toml or TREATISE__* variables.", msg),
        other => other.to_string(),
    }
}

/// How a `generate` run ended, as seen by the shell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Finished(RunStatus),
    Failed,
}

impl RunOutcome {
    pub fn exit_code(self) -> i32 {
        match self {
            RunOutcome::Finished(RunStatus::Complete) => 0,
            RunOutcome::Finished(RunStatus::PartialSuccess) => 2,
            RunOutcome::Finished(RunStatus::Aborted) => 130,
            RunOutcome::Failed => 1,
        }
    }
}
