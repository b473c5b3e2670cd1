//! Ollama HTTP client.
//!
//! Talks to a locally served Ollama runtime via `POST /api/generate` with
//! streaming disabled.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{GenerationOptions, ModelClient};
use crate::domain::{ModelTarget, TransportError};

/// Default Ollama endpoint.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:11434";

const MAX_ERROR_BODY: usize = 200;

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: &'a GenerationOptions,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: Option<String>,
}

/// [`ModelClient`] for the Ollama generate API.
pub struct OllamaClient {
    http: reqwest::Client,
    generate_url: String,
    options: GenerationOptions,
}

impl OllamaClient {
    /// Create a client for the runtime at `endpoint` (e.g. `http://localhost:11434`).
    pub fn new(endpoint: &str, options: GenerationOptions) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("norsk-eval/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TransportError::Request(e.to_string()))?;

        Ok(Self {
            http,
            generate_url: format!("{}/api/generate", endpoint.trim_end_matches('/')),
            options,
        })
    }

    pub fn generate_url(&self) -> &str {
        &self.generate_url
    }
}

fn truncate_body(body: &str) -> String {
    match body.char_indices().nth(MAX_ERROR_BODY) {
        Some((idx, _)) => format!("{}…", &body[..idx]),
        None => body.to_string(),
    }
}

#[async_trait]
impl ModelClient for OllamaClient {
    async fn generate(&self, model: &ModelTarget, prompt: &str) -> Result<String, TransportError> {
        let request = GenerateRequest {
            model: &model.id,
            prompt,
            stream: false,
            options: &self.options,
        };

        debug!(url = %self.generate_url, model = %model.id, "POST generate");
        let response = self.http.post(&self.generate_url).json(&request).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                status: status.as_u16(),
                body: truncate_body(body.trim()),
            });
        }

        let bytes = response.bytes().await?;
        let parsed: GenerateResponse = serde_json::from_slice(&bytes)
            .map_err(|e| TransportError::Malformed(format!("invalid JSON body: {e}")))?;

        parsed
            .response
            .ok_or_else(|| TransportError::Malformed("missing `response` field".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ModelGroup;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn model() -> ModelTarget {
        ModelTarget::new("Mistral-7B", "mistral:7b", ModelGroup::International)
    }

    #[test]
    fn generate_url_strips_trailing_slash() {
        let client =
            OllamaClient::new("http://localhost:11434/", GenerationOptions::default()).unwrap();
        assert_eq!(client.generate_url(), "http://localhost:11434/api/generate");
    }

    #[test]
    fn long_error_bodies_are_truncated() {
        let body = "x".repeat(500);
        let truncated = truncate_body(&body);
        assert_eq!(truncated.chars().count(), MAX_ERROR_BODY + 1);
    }

    #[tokio::test]
    async fn sends_ollama_request_and_reads_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .and(body_partial_json(serde_json::json!({
                "model": "mistral:7b",
                "prompt": "Hva er en koseklut?",
                "stream": false,
                "options": {"num_predict": 250}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "model": "mistral:7b",
                "response": "Jeg kjenner ikke til det ordet.",
                "done": true
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = OllamaClient::new(&server.uri(), GenerationOptions::default()).unwrap();
        let text = client.generate(&model(), "Hva er en koseklut?").await.unwrap();
        assert_eq!(text, "Jeg kjenner ikke til det ordet.");
    }

    #[tokio::test]
    async fn missing_response_field_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"done": true})))
            .mount(&server)
            .await;

        let client = OllamaClient::new(&server.uri(), GenerationOptions::default()).unwrap();
        let err = client.generate(&model(), "q").await.unwrap_err();
        assert!(matches!(err, TransportError::Malformed(_)));
    }

    #[tokio::test]
    async fn non_json_body_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>proxy</html>"))
            .mount(&server)
            .await;

        let client = OllamaClient::new(&server.uri(), GenerationOptions::default()).unwrap();
        let err = client.generate(&model(), "q").await.unwrap_err();
        assert!(matches!(err, TransportError::Malformed(_)));
    }

    #[tokio::test]
    async fn http_errors_carry_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(404).set_body_string(r#"{"error":"model 'x' not found"}"#),
            )
            .mount(&server)
            .await;

        let client = OllamaClient::new(&server.uri(), GenerationOptions::default()).unwrap();
        let err = client.generate(&model(), "q").await.unwrap_err();
        match err {
            TransportError::Status { status, body } => {
                assert_eq!(status, 404);
                assert!(body.contains("not found"));
                assert!(!TransportError::Status { status, body }.is_retryable());
            }
            other => panic!("expected Status, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn http_stack_timeout_keeps_its_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"response": "sent"}))
                    .set_delay(std::time::Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(50))
            .build()
            .unwrap();
        let err = http.post(server.uri()).send().await.unwrap_err();
        assert!(err.is_timeout());

        let mapped = TransportError::from(err);
        assert!(matches!(mapped, TransportError::HttpTimeout(_)));
        assert!(mapped.is_retryable());
        assert!(!mapped.to_string().contains("0ms"));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_connect_error() {
        // Port 9 (discard) is almost never listening locally.
        let client = OllamaClient::new("http://127.0.0.1:9", GenerationOptions::default()).unwrap();
        let err = client.generate(&model(), "q").await.unwrap_err();
        assert!(err.is_retryable());
    }
}
