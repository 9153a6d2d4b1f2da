// Hosted models behind an OpenAI-compatible chat completions API (OpenAI, Groq, Gemini)

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{endpoint_for, BackendError, BackendProfile, ModelBackend, ModelRequest, Provider};

pub struct OpenAiCompatibleBackend {
    client: reqwest::Client,
    provider: Provider,
    api_key: Option<String>,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl OpenAiCompatibleBackend {
    pub fn new(client: reqwest::Client, provider: Provider, api_key: Option<String>) -> Self {
        Self {
            client,
            provider,
            api_key: api_key.filter(|key| !key.trim().is_empty()),
        }
    }
}

#[async_trait]
impl ModelBackend for OpenAiCompatibleBackend {
    async fn call(&self, request: &ModelRequest, profile: &BackendProfile) -> Result<String, BackendError> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            BackendError::Rejected(format!("no API key configured for {:?}", self.provider))
        })?;
        let (_, model) = Provider::resolve(&profile.model);
        let url = format!("{}/chat/completions", endpoint_for(profile, self.provider));

        let body = CompletionRequest {
            model,
            messages: vec![
                Message {
                    role: "system",
                    content: &request.system,
                },
                Message {
                    role: "user",
                    content: &request.prompt,
                },
            ],
            temperature: profile.temperature,
            max_tokens: profile.max_tokens,
        };

        debug!(%url, model, provider = ?self.provider, "Calling chat completions");
        let res = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| BackendError::from_transport(&e))?;

        let status = res.status();
        if !status.is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(BackendError::from_status(status, &text));
        }

        let bytes = res.bytes().await.map_err(|e| BackendError::from_transport(&e))?;
        let parsed: CompletionResponse =
            serde_json::from_slice(&bytes).map_err(|e| BackendError::Malformed(e.to_string()))?;

        Ok(parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request() -> ModelRequest {
        ModelRequest {
            system: "You are Trip Summary Generator.".into(),
            prompt: "Summarize the trip".into(),
        }
    }

    fn groq_profile(server: &MockServer) -> BackendProfile {
        BackendProfile {
            model: "groq/llama-3.1-8b-instant".into(),
            temperature: 0.2,
            max_tokens: None,
            endpoint: Some(server.uri()),
        }
    }

    #[tokio::test]
    async fn sends_bearer_key_and_bare_model_name() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_partial_json(serde_json::json!({ "model": "llama-3.1-8b-instant" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "chatcmpl-test",
                "object": "chat.completion",
                "choices": [{
                    "index": 0,
                    "message": { "role": "assistant", "content": "## Lisbon in 5 days" },
                    "finish_reason": "stop"
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let backend = OpenAiCompatibleBackend::new(reqwest::Client::new(), Provider::Groq, Some("test-key".into()));
        let text = backend.call(&request(), &groq_profile(&server)).await.unwrap();
        assert_eq!(text, "## Lisbon in 5 days");
    }

    #[tokio::test]
    async fn throttling_maps_to_rate_limited() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(429).set_body_string(r#"{"error": "rate_limit_exceeded"}"#))
            .mount(&server)
            .await;

        let backend = OpenAiCompatibleBackend::new(reqwest::Client::new(), Provider::Groq, Some("k".into()));
        let err = backend.call(&request(), &groq_profile(&server)).await.unwrap_err();
        assert_eq!(err, BackendError::RateLimited);
    }

    #[tokio::test]
    async fn missing_key_is_rejected_without_a_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let backend = OpenAiCompatibleBackend::new(reqwest::Client::new(), Provider::Groq, Some("  ".into()));
        let err = backend.call(&request(), &groq_profile(&server)).await.unwrap_err();
        assert!(matches!(err, BackendError::Rejected(_)));
    }

    #[tokio::test]
    async fn empty_choices_yield_empty_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "choices": [] })))
            .mount(&server)
            .await;

        let backend = OpenAiCompatibleBackend::new(reqwest::Client::new(), Provider::Groq, Some("k".into()));
        let text = backend.call(&request(), &groq_profile(&server)).await.unwrap();
        assert!(text.is_empty());
    }
}
