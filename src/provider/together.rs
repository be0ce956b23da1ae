//! Token-authenticated completion API (Together AI).

use crate::error::ApiError;
use crate::provider::{
    build_provider_http_client, ensure_success, map_http_error, parse_json, BackendSettings,
    CompletionOptions, ModelBackend,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

pub const DEFAULT_TOGETHER_URL: &str = "https://api.together.xyz/v1/completions";

const TOGETHER_MODELS: [&str; 3] = [
    "togethercomputer/llama-2-70b-chat",
    "mistralai/Mixtral-8x7B-Instruct-v0.1",
    "togethercomputer/CodeLlama-34b-Instruct",
];

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    stop: Vec<String>,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    text: String,
}

pub struct TogetherBackend {
    client: Client,
    url: String,
    api_key: Option<String>,
    models: Vec<String>,
    options: CompletionOptions,
}

impl TogetherBackend {
    pub fn new(settings: &BackendSettings) -> Result<Self, ApiError> {
        let models = if settings.models.is_empty() {
            TOGETHER_MODELS.iter().map(|m| m.to_string()).collect()
        } else {
            settings.models.clone()
        };
        Ok(Self {
            client: build_provider_http_client()?,
            url: settings.base_url_or(DEFAULT_TOGETHER_URL),
            api_key: settings.api_key.clone(),
            models,
            options: settings.default_options.clone(),
        })
    }
}

#[async_trait]
impl ModelBackend for TogetherBackend {
    fn provider_name(&self) -> &str {
        "together"
    }

    async fn list_models(&self) -> Result<Vec<String>, ApiError> {
        Ok(self.models.clone())
    }

    async fn generate_content(&self, model: &str, prompt: &str) -> Result<String, ApiError> {
        let request = CompletionRequest {
            model,
            prompt,
            max_tokens: self.options.max_tokens,
            temperature: self.options.temperature,
            top_p: self.options.top_p,
            stop: self
                .options
                .stop
                .clone()
                .unwrap_or_else(|| vec!["</s>".to_string()]),
        };

        let mut request_builder = self.client.post(&self.url).json(&request);
        if let Some(api_key) = &self.api_key {
            request_builder = request_builder.bearer_auth(api_key);
        }

        let response = request_builder.send().await.map_err(map_http_error)?;
        let completion: CompletionResponse = parse_json(ensure_success(response).await?).await?;
        completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.text)
            .ok_or_else(|| ApiError::ProviderRequestFailed("No choices in response".to_string()))
    }
}
