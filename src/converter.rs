//! Markdown to word-processor conversion through an external tool.

use crate::error::ApiError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, warn};

pub const DEFAULT_CONVERSION_TIMEOUT: Duration = Duration::from_secs(60);

#[async_trait]
pub trait DocumentConverter: Send + Sync {
    /// Convert `input` (markdown) into `output`. Fails on a missing input,
    /// a timeout, a non-zero exit, or when `output` does not appear.
    async fn convert(&self, input: &Path, output: &Path) -> Result<(), ApiError>;
}

/// Shells out to pandoc with a table of contents to depth 3.
#[derive(Debug, Clone)]
pub struct PandocConverter {
    program: String,
    leading_args: Vec<String>,
    reference_doc: Option<PathBuf>,
    timeout: Duration,
}

impl Default for PandocConverter {
    fn default() -> Self {
        Self::new("pandoc")
    }
}

impl PandocConverter {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            leading_args: Vec::new(),
            reference_doc: None,
            timeout: DEFAULT_CONVERSION_TIMEOUT,
        }
    }

    /// Arguments placed before the pandoc flags, e.g. a wrapper script path
    pub fn with_leading_args(mut self, args: Vec<String>) -> Self {
        self.leading_args = args;
        self
    }

    /// Style template, applied only if the file exists at conversion time
    pub fn with_reference_doc(mut self, path: Option<PathBuf>) -> Self {
        self.reference_doc = path;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn arguments(&self, input: &Path, output: &Path) -> Vec<String> {
        let mut args = self.leading_args.clone();
        args.push(input.to_string_lossy().into_owned());
        args.push("-o".to_string());
        args.push(output.to_string_lossy().into_owned());
        args.push("--standalone".to_string());
        args.push("--table-of-contents".to_string());
        args.push("--toc-depth=3".to_string());
        if let Some(reference) = self.reference_doc.as_ref().filter(|p| p.exists()) {
            args.push(format!("--reference-doc={}", reference.display()));
        }
        args
    }
}

#[async_trait]
impl DocumentConverter for PandocConverter {
    async fn convert(&self, input: &Path, output: &Path) -> Result<(), ApiError> {
        if !input.exists() {
            return Err(ApiError::ConversionFailed(format!(
                "Markdown file not found: {}",
                input.display()
            )));
        }

        let args = self.arguments(input, output);
        debug!(program = %self.program, ?args, "Starting conversion");

        let child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                ApiError::ConversionFailed(format!("Failed to start {}: {}", self.program, e))
            })?;

        let finished = tokio::time::timeout(self.timeout, child.wait_with_output()).await;
        let result = match finished {
            Ok(result) => result,
            Err(_) => {
                warn!(timeout_secs = self.timeout.as_secs(), "Conversion timed out");
                return Err(ApiError::ConversionFailed(format!(
                    "Conversion timed out after {} seconds",
                    self.timeout.as_secs()
                )));
            }
        };
        let output_status = result
            .map_err(|e| ApiError::ConversionFailed(format!("Conversion process failed: {}", e)))?;

        if !output_status.status.success() {
            let stderr = String::from_utf8_lossy(&output_status.stderr);
            return Err(ApiError::ConversionFailed(format!(
                "Pandoc conversion failed: {}",
                stderr.trim()
            )));
        }
        if !output.exists() {
            return Err(ApiError::ConversionFailed(
                "Word file was not created after conversion".to_string(),
            ));
        }

        info!(output = %output.display(), "Conversion finished");
        Ok(())
    }
}
