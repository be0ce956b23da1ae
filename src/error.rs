//! Error types for the document generation pipeline.

use thiserror::Error;

/// Errors surfaced by backends, planning, conversion and orchestration.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Provider request failed: {0}")]
    ProviderRequestFailed(String),

    #[error("Failed to generate content after trying {model} and {fallbacks} fallback models")]
    GenerationExhausted { model: String, fallbacks: usize },

    #[error("Failed to generate {mode} structure: {reason}")]
    StructureFailed { mode: String, reason: String },

    #[error("Conversion failed: {0}")]
    ConversionFailed(String),

    #[error("Generation aborted by user")]
    Aborted,

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ApiError {
    /// Whether the retry wrapper may attempt the failed operation again.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            ApiError::Aborted
                | ApiError::ConfigError(_)
                | ApiError::InvalidRequest(_)
                | ApiError::Serialization(_)
        )
    }

    /// Total number of models attempted, for exhaustion errors.
    pub fn attempted_models(&self) -> Option<usize> {
        match self {
            ApiError::GenerationExhausted { fallbacks, .. } => Some(fallbacks + 1),
            _ => None,
        }
    }
}

impl From<config::ConfigError> for ApiError {
    fn from(err: config::ConfigError) -> Self {
        ApiError::ConfigError(err.to_string())
    }
}
