//! Token-authenticated instruction API (Hugging Face inference endpoints).

use crate::error::ApiError;
use crate::provider::{
    build_provider_http_client, ensure_success, map_http_error, parse_json, BackendSettings,
    CompletionOptions, ModelBackend,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

pub const DEFAULT_HUGGINGFACE_URL: &str = "https://api-inference.huggingface.co/models";

const HUGGINGFACE_MODELS: [&str; 3] = [
    "meta-llama/Llama-2-70b-chat-hf",
    "mistralai/Mixtral-8x7B-Instruct-v0.1",
    "google/gemma-7b-it",
];

#[derive(Serialize)]
struct InferenceRequest<'a> {
    inputs: &'a str,
    parameters: InferenceParameters,
}

#[derive(Serialize)]
struct InferenceParameters {
    #[serde(skip_serializing_if = "Option::is_none")]
    max_new_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Deserialize)]
struct GeneratedText {
    generated_text: String,
}

pub struct HuggingFaceBackend {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    models: Vec<String>,
    options: CompletionOptions,
}

impl HuggingFaceBackend {
    pub fn new(settings: &BackendSettings) -> Result<Self, ApiError> {
        let models = if settings.models.is_empty() {
            HUGGINGFACE_MODELS.iter().map(|m| m.to_string()).collect()
        } else {
            settings.models.clone()
        };
        Ok(Self {
            client: build_provider_http_client()?,
            base_url: settings.base_url_or(DEFAULT_HUGGINGFACE_URL),
            api_key: settings.api_key.clone(),
            models,
            options: settings.default_options.clone(),
        })
    }
}

#[async_trait]
impl ModelBackend for HuggingFaceBackend {
    fn provider_name(&self) -> &str {
        "huggingface"
    }

    async fn list_models(&self) -> Result<Vec<String>, ApiError> {
        Ok(self.models.clone())
    }

    async fn generate_content(&self, model: &str, prompt: &str) -> Result<String, ApiError> {
        let request = InferenceRequest {
            inputs: prompt,
            parameters: InferenceParameters {
                max_new_tokens: self.options.max_tokens,
                temperature: self.options.temperature,
            },
        };

        let url = format!("{}/{}", self.base_url, model);
        let mut request_builder = self.client.post(&url).json(&request);
        if let Some(api_key) = &self.api_key {
            request_builder = request_builder.bearer_auth(api_key);
        }

        let response = request_builder.send().await.map_err(map_http_error)?;
        let generated: Vec<GeneratedText> = parse_json(ensure_success(response).await?).await?;
        generated
            .into_iter()
            .next()
            .map(|g| g.generated_text)
            .ok_or_else(|| ApiError::ProviderRequestFailed("No generated text in response".to_string()))
    }
}
