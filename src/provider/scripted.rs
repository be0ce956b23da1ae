//! In-memory backend with scripted outcomes, for tests and offline dry runs.

use crate::error::ApiError;
use crate::provider::ModelBackend;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};

#[derive(Debug, Clone)]
enum Outcome {
    Text(String),
    Fail(String),
}

impl Outcome {
    fn into_result(self) -> Result<String, ApiError> {
        match self {
            Outcome::Text(text) => Ok(text),
            Outcome::Fail(message) => Err(ApiError::ProviderRequestFailed(message)),
        }
    }
}

/// One recorded `generate_content` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub model: String,
    pub prompt: String,
}

/// Resolution order per call: queued outcomes for the model, then prompt rules
/// (first match wins), then failing models, then an echo of the prompt.
pub struct ScriptedBackend {
    name: String,
    models: Vec<String>,
    default_model: Option<String>,
    fallback: bool,
    queued: Mutex<HashMap<String, VecDeque<Outcome>>>,
    prompt_rules: Vec<(String, Outcome)>,
    failing_models: Vec<String>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedBackend {
    pub fn new(name: impl Into<String>, models: Vec<String>) -> Self {
        Self {
            name: name.into(),
            models,
            default_model: None,
            fallback: false,
            queued: Mutex::new(HashMap::new()),
            prompt_rules: Vec::new(),
            failing_models: Vec::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Let the router apply its model fallback tier to this backend
    pub fn with_model_fallback(mut self, enabled: bool) -> Self {
        self.fallback = enabled;
        self
    }

    /// Model the router substitutes for a blank request
    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = Some(model.into());
        self
    }

    /// Respond with `text` whenever the prompt contains `fragment`
    pub fn respond_when(mut self, fragment: impl Into<String>, text: impl Into<String>) -> Self {
        self.prompt_rules
            .push((fragment.into(), Outcome::Text(text.into())));
        self
    }

    /// Fail whenever the prompt contains `fragment`
    pub fn fail_when(mut self, fragment: impl Into<String>, message: impl Into<String>) -> Self {
        self.prompt_rules
            .push((fragment.into(), Outcome::Fail(message.into())));
        self
    }

    /// Fail every call made with `model`
    pub fn fail_model(mut self, model: impl Into<String>) -> Self {
        self.failing_models.push(model.into());
        self
    }

    /// Queue a one-shot success for `model`
    pub fn push_text(&self, model: &str, text: impl Into<String>) {
        self.queued
            .lock()
            .entry(model.to_string())
            .or_default()
            .push_back(Outcome::Text(text.into()));
    }

    /// Queue a one-shot failure for `model`
    pub fn push_failure(&self, model: &str, message: impl Into<String>) {
        self.queued
            .lock()
            .entry(model.to_string())
            .or_default()
            .push_back(Outcome::Fail(message.into()));
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Models called, in call order
    pub fn models_called(&self) -> Vec<String> {
        self.calls.lock().iter().map(|c| c.model.clone()).collect()
    }
}

#[async_trait]
impl ModelBackend for ScriptedBackend {
    fn provider_name(&self) -> &str {
        &self.name
    }

    fn supports_model_fallback(&self) -> bool {
        self.fallback
    }

    fn default_model(&self) -> Option<&str> {
        self.default_model.as_deref()
    }

    async fn list_models(&self) -> Result<Vec<String>, ApiError> {
        Ok(self.models.clone())
    }

    async fn generate_content(&self, model: &str, prompt: &str) -> Result<String, ApiError> {
        self.calls.lock().push(RecordedCall {
            model: model.to_string(),
            prompt: prompt.to_string(),
        });

        let queued = self
            .queued
            .lock()
            .get_mut(model)
            .and_then(VecDeque::pop_front);
        if let Some(outcome) = queued {
            return outcome.into_result();
        }

        if let Some((_, outcome)) = self
            .prompt_rules
            .iter()
            .find(|(fragment, _)| prompt.contains(fragment.as_str()))
        {
            return outcome.clone().into_result();
        }

        if self.failing_models.iter().any(|m| m == model) {
            return Err(ApiError::ProviderRequestFailed(format!(
                "model {} unavailable",
                model
            )));
        }

        Ok(format!("Generated text for: {}", prompt))
    }
}
