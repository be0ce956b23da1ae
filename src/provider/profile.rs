//! Per-provider settings and provider identifiers.

use crate::error::ApiError;
use crate::provider::CompletionOptions;
use serde::{Deserialize, Serialize};

/// Supported provider families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Gateway,
    HuggingFace,
    Together,
    OpenAi,
}

impl ProviderKind {
    /// Resolve a configured identifier, case-insensitively
    pub fn from_id(provider_id: &str) -> Result<Self, ApiError> {
        match provider_id.trim().to_ascii_lowercase().as_str() {
            "gateway" | "g4f" => Ok(ProviderKind::Gateway),
            "huggingface" => Ok(ProviderKind::HuggingFace),
            "together" => Ok(ProviderKind::Together),
            "openai" | "g4f-api" => Ok(ProviderKind::OpenAi),
            other => Err(ApiError::ConfigError(format!(
                "Unsupported AI provider: {}",
                other
            ))),
        }
    }

    pub fn slug(self) -> &'static str {
        match self {
            ProviderKind::Gateway => "gateway",
            ProviderKind::HuggingFace => "huggingface",
            ProviderKind::Together => "together",
            ProviderKind::OpenAi => "openai",
        }
    }

    /// Model used when neither the request nor the settings name one
    pub fn default_model(self) -> &'static str {
        match self {
            ProviderKind::Gateway | ProviderKind::OpenAi => "gpt-4o",
            ProviderKind::HuggingFace => "meta-llama/Llama-2-70b-chat-hf",
            ProviderKind::Together => "togethercomputer/llama-2-70b-chat",
        }
    }

    /// Environment variable conventionally holding this provider's credential
    fn api_key_env(self) -> Option<&'static str> {
        match self {
            ProviderKind::Gateway => None,
            ProviderKind::HuggingFace => Some("HUGGINGFACE_API_KEY"),
            ProviderKind::Together => Some("TOGETHER_API_KEY"),
            ProviderKind::OpenAi => Some("OPENAI_API_KEY"),
        }
    }
}

/// Endpoint, credentials and generation parameters for one provider
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BackendSettings {
    /// Base URL override; each backend has its own default
    #[serde(default)]
    pub base_url: Option<String>,

    #[serde(default)]
    pub api_key: Option<String>,

    /// OpenAI organisation header
    #[serde(default)]
    pub organization: Option<String>,

    /// Model used when a request names none
    #[serde(default)]
    pub default_model: Option<String>,

    /// Explicit model catalogue; replaces enumeration when non-empty
    #[serde(default)]
    pub models: Vec<String>,

    #[serde(default)]
    pub default_options: CompletionOptions,
}

impl BackendSettings {
    /// Fill missing credentials from the conventional environment variables
    pub fn with_env_fallbacks(mut self, kind: ProviderKind) -> Self {
        if self.api_key.is_none() {
            self.api_key = kind.api_key_env().and_then(|var| std::env::var(var).ok());
        }
        if kind == ProviderKind::OpenAi {
            if self.organization.is_none() {
                self.organization = std::env::var("OPENAI_ORG_ID").ok();
            }
            if self.base_url.is_none() {
                self.base_url = std::env::var("OPENAI_BASE_URL").ok();
            }
        }
        self
    }

    /// Validate the settings for the given provider
    pub fn validate(&self) -> Result<(), String> {
        if let Some(base_url) = &self.base_url {
            if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
                return Err(format!("Invalid base_url: {}", base_url));
            }
        }
        if let Some(temperature) = self.default_options.temperature {
            if !(0.0..=2.0).contains(&temperature) {
                return Err(format!("Temperature out of range: {}", temperature));
            }
        }
        if self.default_options.max_tokens == Some(0) {
            return Err("max_tokens must be greater than zero".to_string());
        }
        Ok(())
    }

    pub(crate) fn base_url_or(&self, default: &str) -> String {
        self.base_url
            .as_deref()
            .unwrap_or(default)
            .trim_end_matches('/')
            .to_string()
    }
}
