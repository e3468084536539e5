//! OpenAI-compatible `chat/completions` provider.
//!
//! Works against any server speaking the same request and response shape
//! (hosted APIs, LM Studio, Ollama's compatibility endpoint, proxies).
//! Requests are non-streaming; the whole body is parsed at once.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use serde_json::{Value, json};
use tokio::time::Instant;
use tracing::{debug, instrument, warn};
use ucp_tokens::Usage;

use crate::config::ProviderConfig;
use crate::error_parsing::parse_api_error;
use crate::errors::{ProviderError, ProviderResult};
use crate::provider::{Provider, ProviderRequest, ProviderResponse};

/// HTTP provider for OpenAI-compatible endpoints.
pub struct OpenAiCompatProvider {
    config: ProviderConfig,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    /// Provider with its own HTTP client.
    pub fn new(config: ProviderConfig) -> Self {
        Self::with_client(config, reqwest::Client::new())
    }

    /// Provider sharing an existing HTTP client.
    pub fn with_client(config: ProviderConfig, client: reqwest::Client) -> Self {
        Self { config, client }
    }

    /// Configuration this provider was built from.
    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// Request body for `request`.
    pub fn build_body(&self, request: &ProviderRequest) -> Value {
        json!({
            "model": self.config.model,
            "messages": [
                {"role": "system", "content": request.system_context},
                {"role": "user", "content": request.serialized_packet},
            ],
            "max_tokens": request.max_tokens,
            "temperature": request.temperature,
            "stream": false,
        })
    }

    fn map_send_error(&self, err: reqwest::Error) -> ProviderError {
        if err.is_timeout() {
            ProviderError::Timeout {
                timeout_ms: self.config.timeout_ms,
            }
        } else {
            ProviderError::Http(err)
        }
    }
}

/// Pull the completion text out of a `chat/completions` body.
pub fn extract_text(body: &Value) -> ProviderResult<String> {
    let choices = body["choices"].as_array().ok_or_else(|| ProviderError::Malformed {
        message: "response has no choices array".into(),
    })?;
    let first = choices.first().ok_or_else(|| ProviderError::Malformed {
        message: "response has an empty choices array".into(),
    })?;
    first["message"]["content"]
        .as_str()
        .map(str::to_owned)
        .ok_or_else(|| ProviderError::Malformed {
            message: "choices[0].message.content is missing or not a string".into(),
        })
}

/// Usage block, when the provider reports prompt tokens.
pub fn extract_usage(body: &Value) -> Option<Usage> {
    let usage = &body["usage"];
    let prompt_tokens = usage["prompt_tokens"].as_u64()?;
    Some(Usage {
        prompt_tokens,
        completion_tokens: usage["completion_tokens"].as_u64().unwrap_or(0),
    })
}

#[async_trait]
impl Provider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    #[instrument(skip_all, fields(provider = %self.config.name, model = %self.config.model))]
    async fn invoke(&self, request: &ProviderRequest) -> ProviderResult<ProviderResponse> {
        let url = self.config.completions_url();
        let mut builder = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .timeout(Duration::from_millis(self.config.timeout_ms))
            .json(&self.build_body(request));
        if let Some(key) = self.config.api_key.as_deref().filter(|k| !k.is_empty()) {
            builder = builder.header(AUTHORIZATION, format!("Bearer {key}"));
        }

        debug!(%url, max_tokens = request.max_tokens, "sending completion request");
        let started = Instant::now();
        let response = builder.send().await.map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let info = parse_api_error(&body, status.as_u16());
            warn!(status = status.as_u16(), message = %info.message, "provider returned error");
            return Err(info.into_error(status.as_u16()));
        }

        let text = response.text().await.map_err(|e| self.map_send_error(e))?;
        let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        let raw: Value = serde_json::from_str(&text).map_err(|e| ProviderError::Malformed {
            message: format!("response is not JSON: {e}"),
        })?;
        let output = extract_text(&raw)?;
        let usage = extract_usage(&raw);
        debug!(latency_ms, reported_usage = usage.is_some(), "completion received");

        Ok(ProviderResponse {
            text: output,
            usage,
            latency_ms,
            raw,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request() -> ProviderRequest {
        ProviderRequest {
            serialized_packet: "[UCP:SUMMARIZE][FORMAT:BULLETS][DATA:START]the report[DATA:END]".into(),
            system_context: "You are a helpful AI assistant.\n\nTask Type: SUMMARIZE".into(),
            temperature: 0.7,
            max_tokens: 256,
        }
    }

    fn provider(server: &MockServer, key: Option<&str>) -> OpenAiCompatProvider {
        let mut config = ProviderConfig::new("mock", server.uri(), "test-model");
        config.api_key = key.map(str::to_owned);
        config.timeout_ms = 500;
        OpenAiCompatProvider::new(config)
    }

    fn completion(content: &str) -> Value {
        json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": content}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 31, "completion_tokens": 12, "total_tokens": 43}
        })
    }

    // ── Success ──

    #[tokio::test]
    async fn sends_packet_and_parses_completion() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({
                "model": "test-model",
                "max_tokens": 256,
                "stream": false,
                "messages": [
                    {"role": "system", "content": "You are a helpful AI assistant.\n\nTask Type: SUMMARIZE"},
                    {"role": "user", "content": "[UCP:SUMMARIZE][FORMAT:BULLETS][DATA:START]the report[DATA:END]"}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("- point one")))
            .expect(1)
            .mount(&server)
            .await;

        let response = provider(&server, Some("sk-test")).invoke(&request()).await.unwrap();
        assert_eq!(response.text, "- point one");
        assert_eq!(
            response.usage,
            Some(Usage {
                prompt_tokens: 31,
                completion_tokens: 12
            })
        );
        assert_eq!(response.raw["id"], "chatcmpl-1");
    }

    #[tokio::test]
    async fn missing_usage_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"content": "hola"}}]
            })))
            .mount(&server)
            .await;

        let response = provider(&server, None).invoke(&request()).await.unwrap();
        assert_eq!(response.text, "hola");
        assert_eq!(response.usage, None);
    }

    // ── Failures ──

    #[tokio::test]
    async fn client_error_is_parsed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": {"message": "Incorrect API key provided", "type": "invalid_request_error"}
            })))
            .mount(&server)
            .await;

        let err = provider(&server, Some("bad")).invoke(&request()).await.unwrap_err();
        assert_eq!(err.category(), "client");
        assert_matches!(err, ProviderError::Api { status: 401, ref message, .. } if message == "Incorrect API key provided");
    }

    #[tokio::test]
    async fn server_error_is_retryable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("upstream overloaded"))
            .mount(&server)
            .await;

        let err = provider(&server, None).invoke(&request()).await.unwrap_err();
        assert_eq!(err.category(), "server");
        assert!(err.is_retryable());
        assert_eq!(err.to_string(), "API error (503): HTTP 503: upstream overloaded");
    }

    #[tokio::test]
    async fn non_json_body_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
            .mount(&server)
            .await;

        let err = provider(&server, None).invoke(&request()).await.unwrap_err();
        assert_matches!(err, ProviderError::Malformed { .. });
    }

    #[tokio::test]
    async fn empty_choices_are_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
            .mount(&server)
            .await;

        let err = provider(&server, None).invoke(&request()).await.unwrap_err();
        assert_eq!(err.category(), "malformed");
    }

    #[tokio::test]
    async fn slow_server_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(completion("late"))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let err = provider(&server, None).invoke(&request()).await.unwrap_err();
        assert_matches!(err, ProviderError::Timeout { timeout_ms: 500 });
    }

    #[tokio::test]
    async fn unreachable_host_is_transport() {
        let config = ProviderConfig::new("gone", "http://127.0.0.1:9", "m");
        let err = OpenAiCompatProvider::new(config).invoke(&request()).await.unwrap_err();
        assert_eq!(err.category(), "transport");
    }

    // ── Parsing ──

    #[test]
    fn extract_text_requires_string_content() {
        assert_matches!(
            extract_text(&json!({"choices": [{"message": {"content": null}}]})),
            Err(ProviderError::Malformed { .. })
        );
        assert_matches!(extract_text(&json!({})), Err(ProviderError::Malformed { .. }));
        assert_eq!(extract_text(&completion("x")).unwrap(), "x");
    }
}
