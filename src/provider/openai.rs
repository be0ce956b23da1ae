//! OpenAI-compatible chat completions API.

use crate::error::ApiError;
use crate::provider::{
    build_provider_http_client, ensure_success, map_http_error, parse_json, BackendSettings,
    ChatCompletionRequest, ChatCompletionResponse, CompletionOptions, ModelBackend, ModelCache,
    ModelEntry, ModelsResponse,
};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_OPENAI_URL: &str = "https://api.openai.com/v1";

/// How long an enumerated model list is reused
pub const MODEL_CACHE_TTL: Duration = Duration::from_secs(60 * 60);

const OPENAI_FALLBACK_MODELS: [&str; 3] = ["gpt-4o", "gpt-4", "gpt-3.5-turbo"];

pub struct OpenAiBackend {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    organization: Option<String>,
    options: CompletionOptions,
    cache: ModelCache,
}

impl OpenAiBackend {
    pub fn new(settings: &BackendSettings) -> Result<Self, ApiError> {
        Ok(Self {
            client: build_provider_http_client()?,
            base_url: settings.base_url_or(DEFAULT_OPENAI_URL),
            api_key: settings.api_key.clone(),
            organization: settings.organization.clone(),
            options: settings.default_options.clone(),
            cache: ModelCache::new(MODEL_CACHE_TTL),
        })
    }

    fn authorize(&self, mut request_builder: RequestBuilder) -> RequestBuilder {
        if let Some(api_key) = &self.api_key {
            request_builder = request_builder.bearer_auth(api_key);
        }
        if let Some(organization) = &self.organization {
            request_builder = request_builder.header("OpenAI-Organization", organization);
        }
        request_builder
    }

    async fn fetch_models(&self) -> Result<Vec<String>, ApiError> {
        let url = format!("{}/models", self.base_url);
        let response = self
            .authorize(self.client.get(&url))
            .send()
            .await
            .map_err(map_http_error)?;
        let models: ModelsResponse = parse_json(ensure_success(response).await?).await?;
        let mut ids: Vec<String> = models
            .data
            .into_iter()
            .map(ModelEntry::into_id)
            .filter(|id| id.starts_with("gpt-"))
            .collect();
        ids.sort();
        Ok(ids)
    }
}

#[async_trait]
impl ModelBackend for OpenAiBackend {
    fn provider_name(&self) -> &str {
        "openai"
    }

    async fn list_models(&self) -> Result<Vec<String>, ApiError> {
        if let Some(models) = self.cache.get() {
            return Ok(models);
        }
        match self.fetch_models().await {
            Ok(models) if !models.is_empty() => {
                self.cache.store(models.clone());
                Ok(models)
            }
            Ok(_) => Ok(OPENAI_FALLBACK_MODELS.iter().map(|m| m.to_string()).collect()),
            Err(err) => {
                warn!(error = %err, "Failed to list OpenAI models, using defaults");
                Ok(OPENAI_FALLBACK_MODELS.iter().map(|m| m.to_string()).collect())
            }
        }
    }

    async fn generate_content(&self, model: &str, prompt: &str) -> Result<String, ApiError> {
        let request = ChatCompletionRequest::user_prompt(model, prompt, &self.options);
        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .authorize(self.client.post(&url))
            .json(&request)
            .send()
            .await
            .map_err(map_http_error)?;
        let completion: ChatCompletionResponse = parse_json(ensure_success(response).await?).await?;
        completion.into_text()
    }
}
