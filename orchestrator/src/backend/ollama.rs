// Local models served by Ollama's chat API

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{endpoint_for, BackendError, BackendProfile, ModelBackend, ModelRequest, Provider};

pub struct OllamaBackend {
    client: reqwest::Client,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatOptions {
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
    options: ChatOptions,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: Option<ResponseMessage>,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: String,
}

impl OllamaBackend {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ModelBackend for OllamaBackend {
    async fn call(&self, request: &ModelRequest, profile: &BackendProfile) -> Result<String, BackendError> {
        let (_, model) = Provider::resolve(&profile.model);
        let url = format!("{}/api/chat", endpoint_for(profile, Provider::Ollama));

        let body = ChatRequest {
            model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &request.system,
                },
                ChatMessage {
                    role: "user",
                    content: &request.prompt,
                },
            ],
            stream: false,
            options: ChatOptions {
                temperature: profile.temperature,
                num_predict: profile.max_tokens,
            },
        };

        debug!(%url, model, "Calling Ollama");
        let res = self
            .client
            .post(&url)
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
        let parsed: ChatResponse =
            serde_json::from_slice(&bytes).map_err(|e| BackendError::Malformed(e.to_string()))?;

        Ok(parsed.message.map(|m| m.content).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn profile_for(server: &MockServer) -> BackendProfile {
        BackendProfile {
            model: "ollama/llama3".into(),
            temperature: 0.2,
            max_tokens: Some(600),
            endpoint: Some(server.uri()),
        }
    }

    fn request() -> ModelRequest {
        ModelRequest {
            system: "You are Budget Planner.".into(),
            prompt: "Destination: Lisbon".into(),
        }
    }

    #[tokio::test]
    async fn returns_assistant_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .and(body_partial_json(serde_json::json!({
                "model": "llama3",
                "stream": false,
                "options": { "num_predict": 600 }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "model": "llama3",
                "message": { "role": "assistant", "content": "Final Answer: 40-60 EUR/day" },
                "done": true
            })))
            .expect(1)
            .mount(&server)
            .await;

        let backend = OllamaBackend::new(reqwest::Client::new());
        let text = backend.call(&request(), &profile_for(&server)).await.unwrap();
        assert_eq!(text, "Final Answer: 40-60 EUR/day");
    }

    #[tokio::test]
    async fn server_errors_are_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let backend = OllamaBackend::new(reqwest::Client::new());
        let err = backend.call(&request(), &profile_for(&server)).await.unwrap_err();
        assert!(matches!(err, BackendError::Unavailable(_)));
    }

    #[tokio::test]
    async fn garbage_body_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let backend = OllamaBackend::new(reqwest::Client::new());
        let err = backend.call(&request(), &profile_for(&server)).await.unwrap_err();
        assert!(matches!(err, BackendError::Malformed(_)));
    }

    #[tokio::test]
    async fn slow_responses_are_timeouts() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "message": { "content": "late" } }))
                    .set_delay(std::time::Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(50))
            .build()
            .unwrap();
        let backend = OllamaBackend::new(client);
        let err = backend.call(&request(), &profile_for(&server)).await.unwrap_err();
        assert_eq!(err, BackendError::Timeout);
    }
}
