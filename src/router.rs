//! Generation Router
//!
//! Sends every generation request through the retry policy. Backends that support it
//! get a second tier: when the requested model still fails (or answers with nothing),
//! the remaining catalogue is tried once per model, in rank order.

use crate::error::ApiError;
use crate::provider::ModelBackend;
use crate::retry::{retry_with_backoff, RetryPolicy};
use std::sync::Arc;
use tracing::{info, warn};

pub struct Router {
    backend: Arc<dyn ModelBackend>,
    policy: RetryPolicy,
}

impl Router {
    pub fn new(backend: Arc<dyn ModelBackend>, policy: RetryPolicy) -> Self {
        Self { backend, policy }
    }

    pub fn provider_name(&self) -> &str {
        self.backend.provider_name()
    }

    /// Model catalogue of the active backend, preferred models first
    pub async fn list_models(&self) -> Result<Vec<String>, ApiError> {
        self.backend.list_models().await
    }

    /// Generate text for `prompt`, retrying and falling back as the backend allows
    pub async fn route(&self, model: &str, prompt: &str) -> Result<String, ApiError> {
        let backend: &dyn ModelBackend = self.backend.as_ref();
        let model = match backend.default_model() {
            Some(default) if model.trim().is_empty() => default,
            _ => model,
        };
        let primary = retry_with_backoff(&self.policy, move || {
            backend.generate_content(model, prompt)
        })
        .await;

        if !backend.supports_model_fallback() {
            return primary;
        }

        match primary {
            Ok(text) if !text.trim().is_empty() => {
                info!(provider = backend.provider_name(), model, "Generation succeeded");
                return Ok(text);
            }
            Ok(_) => warn!(model, "Empty response from primary model"),
            Err(ApiError::Aborted) => return Err(ApiError::Aborted),
            Err(err) => warn!(model, error = %err, "Primary model failed"),
        }

        let candidates: Vec<String> = match backend.list_models().await {
            Ok(models) => models.into_iter().filter(|m| m != model).collect(),
            Err(err) => {
                warn!(error = %err, "Could not list fallback models");
                Vec::new()
            }
        };

        for candidate in &candidates {
            match backend.generate_content(candidate, prompt).await {
                Ok(text) if !text.trim().is_empty() => {
                    info!(
                        requested = model,
                        fallback = candidate.as_str(),
                        "Generated with fallback model"
                    );
                    return Ok(text);
                }
                Ok(_) => warn!(fallback = candidate.as_str(), "Empty response from fallback model"),
                Err(err) => warn!(fallback = candidate.as_str(), error = %err, "Fallback model failed"),
            }
        }

        Err(ApiError::GenerationExhausted {
            model: model.to_string(),
            fallbacks: candidates.len(),
        })
    }
}
