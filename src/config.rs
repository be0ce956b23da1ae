//! Configuration System
//!
//! Layered configuration for backends, retry, output and logging. Sources, lowest
//! precedence first: built-in defaults, the global config file, workspace files
//! (or one explicit file), then environment variables.

use crate::error::ApiError;
use crate::logging::LoggingConfig;
use crate::provider::{BackendRegistry, BackendSettings, ProviderKind};
use crate::retry::RetryConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

mod loader;
mod merge {
    pub mod merge_policy;
}
mod sources {
    pub mod environment;
    pub mod global_file;
    pub mod workspace_file;
}

pub use loader::ConfigLoader;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Active backend identifier
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Per-backend settings keyed by provider identifier
    #[serde(default)]
    pub providers: HashMap<String, BackendSettings>,

    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_provider() -> String {
    "gateway".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            providers: HashMap::new(),
            retry: RetryConfig::default(),
            output: OutputConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Where documents go and how they are converted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,

    /// Style template for the converter; ignored when missing on disk
    #[serde(default = "default_reference_doc")]
    pub reference_doc: Option<PathBuf>,

    /// Converter executable
    #[serde(default = "default_converter")]
    pub converter: String,

    /// Extra arguments placed before the converter's own flags
    #[serde(default)]
    pub converter_args: Vec<String>,

    #[serde(default = "default_conversion_timeout_secs")]
    pub conversion_timeout_secs: u64,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

fn default_reference_doc() -> Option<PathBuf> {
    Some(PathBuf::from("reference.docx"))
}

fn default_converter() -> String {
    "pandoc".to_string()
}

fn default_conversion_timeout_secs() -> u64 {
    60
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            reference_doc: default_reference_doc(),
            converter: default_converter(),
            converter_args: Vec::new(),
            conversion_timeout_secs: default_conversion_timeout_secs(),
        }
    }
}

impl OutputConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.dir.as_os_str().is_empty() {
            return Err("Output directory cannot be empty".to_string());
        }
        if self.converter.trim().is_empty() {
            return Err("Converter program cannot be empty".to_string());
        }
        if self.conversion_timeout_secs == 0 {
            return Err("conversion_timeout_secs must be greater than zero".to_string());
        }
        Ok(())
    }

    pub fn conversion_timeout(&self) -> Duration {
        Duration::from_secs(self.conversion_timeout_secs)
    }

    /// Output directory, anchored at `root` when relative
    pub fn resolve_dir(&self, root: &Path) -> PathBuf {
        anchor(root, &self.dir)
    }

    pub fn resolve_reference_doc(&self, root: &Path) -> Option<PathBuf> {
        self.reference_doc.as_ref().map(|path| anchor(root, path))
    }
}

fn anchor(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

/// Configuration validation errors
#[derive(Debug, Clone)]
pub enum ValidationError {
    Provider(String, String),
    Retry(String),
    Output(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Provider(name, msg) => write!(f, "Provider '{}': {}", name, msg),
            ValidationError::Retry(msg) => write!(f, "Retry: {}", msg),
            ValidationError::Output(msg) => write!(f, "Output: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

impl AppConfig {
    /// Validate the entire configuration, collecting every problem
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let Err(e) = ProviderKind::from_id(&self.provider) {
            errors.push(ValidationError::Provider(
                self.provider.clone(),
                format!(
                    "{} (known providers: {})",
                    e,
                    BackendRegistry::KNOWN_PROVIDERS.join(", ")
                ),
            ));
        }

        for (name, settings) in &self.providers {
            if let Err(e) = settings.validate() {
                errors.push(ValidationError::Provider(name.clone(), e));
            }
        }

        if let Err(e) = self.retry.validate() {
            errors.push(ValidationError::Retry(e));
        }

        if let Err(e) = self.output.validate() {
            errors.push(ValidationError::Output(e));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Fold validation errors into a single startup error
    pub fn ensure_valid(&self) -> Result<(), ApiError> {
        self.validate().map_err(|errors| {
            let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            ApiError::ConfigError(format!(
                "Configuration validation failed:\n{}",
                messages.join("\n")
            ))
        })
    }

    pub fn provider_kind(&self) -> Result<ProviderKind, ApiError> {
        ProviderKind::from_id(&self.provider)
    }

    /// Settings of the active backend, looked up by identifier then by canonical slug
    pub fn backend_settings(&self) -> BackendSettings {
        let by_slug = self
            .provider_kind()
            .ok()
            .and_then(|kind| self.providers.get(kind.slug()));
        self.providers
            .get(&self.provider)
            .or(by_slug)
            .cloned()
            .unwrap_or_default()
    }

    /// Model used when a request does not name one
    pub fn default_model(&self) -> Result<String, ApiError> {
        let kind = self.provider_kind()?;
        Ok(self
            .backend_settings()
            .default_model
            .unwrap_or_else(|| kind.default_model().to_string()))
    }
}
