//! Model Provider Abstraction
//!
//! Uniform interface over the language-model backends the generator can talk to:
//! a multi-model chat gateway (the default), a token-authenticated instruction API,
//! a token-authenticated completion API and an OpenAI-compatible API. Each backend
//! knows how to list its models and turn one prompt into one block of text.

use crate::error::ApiError;
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

pub mod catalog;
pub mod gateway;
pub mod huggingface;
pub mod openai;
pub mod profile;
pub mod scripted;
pub mod together;

pub use catalog::{rank_preferred, ModelCache};
pub use gateway::GatewayBackend;
pub use huggingface::HuggingFaceBackend;
pub use openai::OpenAiBackend;
pub use profile::{BackendSettings, ProviderKind};
pub use scripted::ScriptedBackend;
pub use together::TogetherBackend;

/// Generation parameters sent with every request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionOptions {
    pub temperature: Option<f32>,       // 0.0-2.0
    pub max_tokens: Option<u32>,        // Maximum tokens to generate
    pub top_p: Option<f32>,             // Nucleus sampling
    pub frequency_penalty: Option<f32>, // -2.0 to 2.0
    pub presence_penalty: Option<f32>,  // -2.0 to 2.0
    pub stop: Option<Vec<String>>,      // Stop sequences
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            temperature: Some(0.7),
            max_tokens: Some(1000),
            top_p: Some(0.9),
            frequency_penalty: None,
            presence_penalty: None,
            stop: None,
        }
    }
}

/// Capability interface implemented once per provider
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// Provider identifier, as used in configuration
    fn provider_name(&self) -> &str;

    /// Whether the router may walk this backend's catalogue when a model fails
    fn supports_model_fallback(&self) -> bool {
        false
    }

    /// Model used when a request names none
    fn default_model(&self) -> Option<&str> {
        None
    }

    /// Ordered model identifiers, preferred models first
    async fn list_models(&self) -> Result<Vec<String>, ApiError>;

    /// Generate text for a single prompt with the given model
    async fn generate_content(&self, model: &str, prompt: &str) -> Result<String, ApiError>;
}

// OpenAI-style chat payloads shared by the gateway and OpenAI backends
#[derive(Serialize)]
pub(crate) struct ChatCompletionRequest<'a> {
    pub model: &'a str,
    pub messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f32>,
    pub stream: bool,
}

#[derive(Serialize)]
pub(crate) struct ChatMessage<'a> {
    pub role: &'static str,
    pub content: &'a str,
}

impl<'a> ChatCompletionRequest<'a> {
    pub(crate) fn user_prompt(model: &'a str, prompt: &'a str, options: &CompletionOptions) -> Self {
        Self {
            model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: options.temperature,
            max_tokens: options.max_tokens,
            top_p: options.top_p,
            frequency_penalty: options.frequency_penalty,
            presence_penalty: options.presence_penalty,
            stream: false,
        }
    }
}

#[derive(Deserialize)]
pub(crate) struct ChatCompletionResponse {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
pub(crate) struct ChatChoice {
    pub message: ChatChoiceMessage,
}

#[derive(Deserialize)]
pub(crate) struct ChatChoiceMessage {
    #[serde(default)]
    pub content: Option<String>,
}

impl ChatCompletionResponse {
    /// First choice's text, or an error when the payload carried none
    pub(crate) fn into_text(self) -> Result<String, ApiError> {
        self.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                ApiError::ProviderRequestFailed("No content in completion response".to_string())
            })
    }
}

/// `GET /models` shape used by OpenAI-compatible servers
#[derive(Deserialize)]
pub(crate) struct ModelsResponse {
    pub data: Vec<ModelEntry>,
}

/// Model entries come back either as objects with an `id` or as bare strings
#[derive(Deserialize)]
#[serde(untagged)]
pub(crate) enum ModelEntry {
    Object { id: String },
    Name(String),
}

impl ModelEntry {
    pub(crate) fn into_id(self) -> String {
        match self {
            ModelEntry::Object { id } => id,
            ModelEntry::Name(name) => name,
        }
    }
}

// Helper function to map transport errors to ApiError
pub(crate) fn map_http_error(error: reqwest::Error) -> ApiError {
    if error.is_timeout() {
        ApiError::ProviderRequestFailed(format!("Request timeout: {}", error))
    } else if error.is_connect() {
        ApiError::ProviderRequestFailed(format!("Connection error: {}", error))
    } else {
        ApiError::ProviderRequestFailed(format!("HTTP error: {}", error))
    }
}

/// Turn a non-2xx response into an error carrying the upstream detail
pub(crate) async fn ensure_success(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    Err(ApiError::ProviderRequestFailed(format!(
        "Request failed with status {}: {}",
        status, error_text
    )))
}

/// Decode a JSON body, mapping malformed payloads to a request failure
pub(crate) async fn parse_json<T: serde::de::DeserializeOwned>(
    response: Response,
) -> Result<T, ApiError> {
    response
        .json()
        .await
        .map_err(|e| ApiError::ProviderRequestFailed(format!("Failed to parse response: {}", e)))
}

const PROVIDER_HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const PROVIDER_HTTP_REQUEST_TIMEOUT: Duration = Duration::from_secs(190);

pub(crate) fn build_provider_http_client() -> Result<Client, ApiError> {
    Client::builder()
        .connect_timeout(PROVIDER_HTTP_CONNECT_TIMEOUT)
        .timeout(PROVIDER_HTTP_REQUEST_TIMEOUT)
        .build()
        .map_err(|e| ApiError::ConfigError(format!("Failed to create HTTP client: {}", e)))
}

/// Registry keyed by provider identifier
///
/// Selection happens once at startup; unknown identifiers fail fast.
pub struct BackendRegistry;

impl BackendRegistry {
    /// Provider identifiers accepted by [`BackendRegistry::create`]
    pub const KNOWN_PROVIDERS: [&'static str; 4] = ["gateway", "huggingface", "together", "openai"];

    pub fn create(
        provider_id: &str,
        settings: &BackendSettings,
    ) -> Result<Arc<dyn ModelBackend>, ApiError> {
        let kind = ProviderKind::from_id(provider_id)?;
        let settings = settings.clone().with_env_fallbacks(kind);
        let backend: Arc<dyn ModelBackend> = match kind {
            ProviderKind::Gateway => Arc::new(GatewayBackend::new(&settings)?),
            ProviderKind::HuggingFace => Arc::new(HuggingFaceBackend::new(&settings)?),
            ProviderKind::Together => Arc::new(TogetherBackend::new(&settings)?),
            ProviderKind::OpenAi => Arc::new(OpenAiBackend::new(&settings)?),
        };
        Ok(backend)
    }
}
