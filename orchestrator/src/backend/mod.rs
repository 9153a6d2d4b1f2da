// Model backends: prompt in, completion text out

pub mod ollama;
pub mod openai;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

pub use ollama::OllamaBackend;
pub use openai::OpenAiCompatibleBackend;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("model backend unavailable: {0}")]
    Unavailable(String),

    #[error("model backend rate limited the request")]
    RateLimited,

    #[error("model backend timed out")]
    Timeout,

    #[error("model backend rejected the request: {0}")]
    Rejected(String),

    #[error("model backend returned an unreadable response: {0}")]
    Malformed(String),
}

impl BackendError {
    /// Maps a transport-level failure from reqwest.
    pub fn from_transport(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            BackendError::Timeout
        } else if err.is_decode() {
            BackendError::Malformed(err.to_string())
        } else {
            BackendError::Unavailable(err.to_string())
        }
    }

    /// Maps a non-success HTTP status. `body` is only used for the message.
    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let snippet: String = body.chars().take(200).collect();
        match status.as_u16() {
            429 => BackendError::RateLimited,
            408 | 504 => BackendError::Timeout,
            500..=599 => BackendError::Unavailable(format!("HTTP {}", status)),
            _ => BackendError::Rejected(format!("HTTP {}: {}", status, snippet)),
        }
    }
}

/// Model settings for one call: which model, how it samples, where it lives.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BackendProfile {
    pub model: String,
    pub temperature: f32,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub endpoint: Option<String>,
}

impl BackendProfile {
    pub fn new(model: impl Into<String>, temperature: f32) -> Self {
        Self {
            model: model.into(),
            temperature,
            max_tokens: None,
            endpoint: None,
        }
    }

    /// Same sampling settings for another model. The endpoint override only
    /// carries over when the provider stays the same.
    pub fn with_model(&self, model: impl Into<String>) -> Self {
        let model = model.into();
        let same_provider = Provider::resolve(&model).0 == Provider::resolve(&self.model).0;
        Self {
            endpoint: if same_provider { self.endpoint.clone() } else { None },
            model,
            ..self.clone()
        }
    }
}

/// One prompt for a model: the persona framing plus the task text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelRequest {
    pub system: String,
    pub prompt: String,
}

#[async_trait]
pub trait ModelBackend: Send + Sync {
    async fn call(&self, request: &ModelRequest, profile: &BackendProfile) -> Result<String, BackendError>;
}

/// Provider families addressable through a `provider/model` id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Ollama,
    Groq,
    Gemini,
    OpenAi,
}

impl Provider {
    /// Splits `groq/llama-3.1-8b-instant` into its provider and the provider's own model name.
    /// A bare id is treated as an OpenAI model.
    pub fn resolve(model_id: &str) -> (Provider, &str) {
        match model_id.split_once('/') {
            Some(("ollama", model)) => (Provider::Ollama, model),
            Some(("groq", model)) => (Provider::Groq, model),
            Some(("gemini", model)) => (Provider::Gemini, model),
            Some(("openai", model)) => (Provider::OpenAi, model),
            _ => (Provider::OpenAi, model_id),
        }
    }

    pub fn default_endpoint(self) -> &'static str {
        match self {
            Provider::Ollama => "http://localhost:11434",
            Provider::Groq => "https://api.groq.com/openai/v1",
            Provider::Gemini => "https://generativelanguage.googleapis.com/v1beta/openai",
            Provider::OpenAi => "https://api.openai.com/v1",
        }
    }
}

/// Credentials for the hosted providers.
#[derive(Debug, Clone, Default)]
pub struct ProviderKeys {
    pub openai: Option<String>,
    pub groq: Option<String>,
    pub gemini: Option<String>,
}

/// Routes each call to a provider client based on the profile's model id.
pub struct ProviderRouter {
    ollama: OllamaBackend,
    openai: OpenAiCompatibleBackend,
    groq: OpenAiCompatibleBackend,
    gemini: OpenAiCompatibleBackend,
}

impl ProviderRouter {
    pub fn new(timeout: Duration, keys: ProviderKeys) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            ollama: OllamaBackend::new(client.clone()),
            openai: OpenAiCompatibleBackend::new(client.clone(), Provider::OpenAi, keys.openai),
            groq: OpenAiCompatibleBackend::new(client.clone(), Provider::Groq, keys.groq),
            gemini: OpenAiCompatibleBackend::new(client, Provider::Gemini, keys.gemini),
        })
    }

    pub fn into_shared(self) -> Arc<dyn ModelBackend> {
        Arc::new(self)
    }
}

#[async_trait]
impl ModelBackend for ProviderRouter {
    async fn call(&self, request: &ModelRequest, profile: &BackendProfile) -> Result<String, BackendError> {
        let (provider, _) = Provider::resolve(&profile.model);
        debug!(model = %profile.model, ?provider, "Routing model call");
        match provider {
            Provider::Ollama => self.ollama.call(request, profile).await,
            Provider::Groq => self.groq.call(request, profile).await,
            Provider::Gemini => self.gemini.call(request, profile).await,
            Provider::OpenAi => self.openai.call(request, profile).await,
        }
    }
}

pub(crate) fn endpoint_for(profile: &BackendProfile, provider: Provider) -> String {
    profile
        .endpoint
        .as_deref()
        .unwrap_or(provider.default_endpoint())
        .trim_end_matches('/')
        .to_string()
}
