//! Default backend: a multi-model chat gateway.
//!
//! The gateway fronts many upstream models behind one OpenAI-style endpoint. Its
//! catalogue is resolved once per process: configured models first, then the
//! gateway's own listing, then a fixed default list.

use crate::error::ApiError;
use crate::provider::{
    build_provider_http_client, ensure_success, map_http_error, parse_json, rank_preferred,
    BackendSettings, ChatCompletionRequest, ChatCompletionResponse, CompletionOptions, ModelBackend,
    ModelCache, ModelEntry, ModelsResponse,
};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_GATEWAY_URL: &str = "http://localhost:1337/v1";
pub const DEFAULT_GATEWAY_MODEL: &str = "gpt-4o";

/// Flagship models ranked to the front of the catalogue
pub const PREFERRED_MODELS: [&str; 3] = ["gpt-4o", "gpt-4", "claude-2"];

/// Used when the catalogue cannot be enumerated
pub const FALLBACK_MODELS: [&str; 5] = ["gpt-4o", "gpt-4", "gpt-3.5-turbo", "llama2-70b", "claude-2"];

pub struct GatewayBackend {
    client: Client,
    base_url: String,
    default_model: String,
    configured_models: Vec<String>,
    options: CompletionOptions,
    catalogue: ModelCache,
}

impl GatewayBackend {
    pub fn new(settings: &BackendSettings) -> Result<Self, ApiError> {
        Ok(Self {
            client: build_provider_http_client()?,
            base_url: settings.base_url_or(DEFAULT_GATEWAY_URL),
            default_model: settings
                .default_model
                .clone()
                .unwrap_or_else(|| DEFAULT_GATEWAY_MODEL.to_string()),
            configured_models: settings.models.clone(),
            options: settings.default_options.clone(),
            catalogue: ModelCache::new(Duration::MAX),
        })
    }

    async fn enumerate(&self) -> Result<Vec<String>, ApiError> {
        if !self.configured_models.is_empty() {
            return Ok(self.configured_models.clone());
        }
        let url = format!("{}/models", self.base_url);
        let response = self.client.get(&url).send().await.map_err(map_http_error)?;
        let models: ModelsResponse = parse_json(ensure_success(response).await?).await?;
        let mut ids: Vec<String> = models.data.into_iter().map(ModelEntry::into_id).collect();
        if ids.is_empty() {
            return Err(ApiError::ProviderRequestFailed(
                "Gateway returned an empty model list".to_string(),
            ));
        }
        ids.sort();
        Ok(ids)
    }
}

#[async_trait]
impl ModelBackend for GatewayBackend {
    fn provider_name(&self) -> &str {
        "gateway"
    }

    fn supports_model_fallback(&self) -> bool {
        true
    }

    async fn list_models(&self) -> Result<Vec<String>, ApiError> {
        if let Some(models) = self.catalogue.get() {
            return Ok(models);
        }
        let models = match self.enumerate().await {
            Ok(models) => models,
            Err(err) => {
                warn!(error = %err, "Failed to enumerate gateway models, using defaults");
                FALLBACK_MODELS.iter().map(|m| m.to_string()).collect()
            }
        };
        let ranked = rank_preferred(models, &PREFERRED_MODELS);
        self.catalogue.store(ranked.clone());
        Ok(ranked)
    }

    fn default_model(&self) -> Option<&str> {
        Some(&self.default_model)
    }

    async fn generate_content(&self, model: &str, prompt: &str) -> Result<String, ApiError> {
        let model = if model.trim().is_empty() {
            self.default_model.as_str()
        } else {
            model
        };
        debug!(model, prompt_len = prompt.len(), "Gateway completion request");

        let request = ChatCompletionRequest::user_prompt(model, prompt, &self.options);
        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(map_http_error)?;
        let completion: ChatCompletionResponse = parse_json(ensure_success(response).await?).await?;
        let text = completion.into_text()?;
        if text.trim().is_empty() {
            return Err(ApiError::ProviderRequestFailed(format!(
                "Empty response from model {}",
                model
            )));
        }
        Ok(text)
    }
}
