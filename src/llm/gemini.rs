//! Google Gemini `generateContent` client
//!
//! Auth is the `?key=` query parameter. Each request carries the system
//! instruction as a top-level field and asks for `application/json`
//! output constrained by the operation's response schema.

use super::{GenerateRequest, LanguageService, LlmError};
use crate::config::LlmConfig;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

pub struct GeminiService {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl std::fmt::Debug for GeminiService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiService")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl GeminiService {
    /// Create a client from configuration.
    ///
    /// Returns `LlmError::MissingCredential` when no key can be resolved;
    /// no pipeline stage can run without one.
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        let api_key = config.resolve_api_key().ok_or_else(|| {
            LlmError::MissingCredential(format!(
                "set llm.api_key or the '{}' environment variable",
                config.api_key_env
            ))
        })?;
        Self::new_with_key(config, api_key)
    }

    /// Create a client with an explicitly provided key.
    pub fn new_with_key(config: &LlmConfig, api_key: impl Into<String>) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| LlmError::Request(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: config.model.clone(),
        })
    }

    fn endpoint_url(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    fn build_request_body(request: &GenerateRequest) -> Value {
        let mut generation_config = json!({
            "responseMimeType": "application/json",
            "responseSchema": request.response_schema,
        });
        if let Some(temperature) = request.temperature {
            generation_config["temperature"] = json!(temperature);
        }

        json!({
            "system_instruction": { "parts": [{ "text": request.system_instruction }] },
            "contents": [{ "role": "user", "parts": [{ "text": request.contents }] }],
            "generationConfig": generation_config,
        })
    }

    /// Concatenate the text parts of the first candidate.
    fn parse_response(request: &GenerateRequest, body: &Value) -> Result<String, LlmError> {
        let parts = body["candidates"][0]["content"]["parts"]
            .as_array()
            .ok_or(LlmError::EmptyResponse {
                operation: request.operation,
            })?;

        let text: String = parts
            .iter()
            .filter_map(|part| part["text"].as_str())
            .collect();

        if text.trim().is_empty() {
            return Err(LlmError::EmptyResponse {
                operation: request.operation,
            });
        }
        Ok(text)
    }

    fn map_http_error(status: StatusCode, body: &str) -> LlmError {
        if body.contains("API key not valid") {
            return LlmError::InvalidCredential(format!("HTTP {}", status.as_u16()));
        }
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                LlmError::InvalidCredential(format!("HTTP {}", status.as_u16()))
            }
            StatusCode::SERVICE_UNAVAILABLE => {
                LlmError::Unavailable(format!("HTTP 503: {}", truncate(body, 200)))
            }
            _ => LlmError::Request(format!("HTTP {}: {}", status.as_u16(), truncate(body, 200))),
        }
    }
}

fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[async_trait]
impl LanguageService for GeminiService {
    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, request: &GenerateRequest) -> Result<String, LlmError> {
        let body = Self::build_request_body(request);

        debug!(
            model = self.model.as_str(),
            operation = request.operation.name(),
            "sending Gemini request"
        );

        let response = self
            .client
            .post(self.endpoint_url())
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Request(format!("request to Gemini API failed: {}", e)))?;

        let status = response.status();
        let body_text = response
            .text()
            .await
            .map_err(|e| LlmError::Request(format!("failed to read response body: {}", e)))?;

        if !status.is_success() {
            return Err(Self::map_http_error(status, &body_text));
        }

        let json: Value = serde_json::from_str(&body_text).map_err(|e| {
            LlmError::MalformedResponse {
                operation: request.operation,
                message: format!("invalid JSON envelope: {}", e),
            }
        })?;

        Self::parse_response(request, &json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{prompts, Operation};

    fn config(base_url: &str) -> LlmConfig {
        LlmConfig {
            base_url: base_url.to_string(),
            ..LlmConfig::default()
        }
    }

    #[test]
    fn missing_credential() {
        let config = LlmConfig {
            api_key: None,
            api_key_env: "DIALECTICA_TEST_NO_SUCH_KEY".into(),
            fallback_api_key_env: None,
            ..LlmConfig::default()
        };
        let err = GeminiService::from_config(&config).unwrap_err();
        assert!(matches!(err, LlmError::MissingCredential(_)));
    }

    #[test]
    fn request_body_carries_schema_and_temperature() {
        let req = prompts::standardize_request("q");
        let body = GeminiService::build_request_body(&req);
        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(body["generationConfig"]["responseSchema"]["required"][0], "refinedQuery");
        assert!(body["generationConfig"]["temperature"].is_number());
        assert_eq!(body["contents"][0]["parts"][0]["text"], "User question: \"q\"");

        let follow_up = prompts::follow_up_request("q", "o", &[]);
        let body = GeminiService::build_request_body(&follow_up);
        assert!(body["generationConfig"].get("temperature").is_none());
    }

    #[tokio::test]
    async fn generate_returns_candidate_text() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", mockito::Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "candidates": [{
                        "content": { "parts": [{ "text": "{\"refinedQuery\":" }, { "text": " \"x\"}" }] }
                    }]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let service = GeminiService::new_with_key(&config(&server.url()), "k").unwrap();
        let text = service
            .generate(&prompts::standardize_request("q"))
            .await
            .unwrap();
        assert_eq!(text, "{\"refinedQuery\": \"x\"}");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn invalid_key_is_reported() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", mockito::Matcher::Any)
            .with_status(400)
            .with_body("{\"error\": {\"message\": \"API key not valid. Please pass a valid API key.\"}}")
            .create_async()
            .await;

        let service = GeminiService::new_with_key(&config(&server.url()), "bad").unwrap();
        let err = service
            .generate(&prompts::standardize_request("q"))
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::InvalidCredential(_)));
    }

    #[tokio::test]
    async fn unavailable_and_empty_candidates() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", mockito::Matcher::Any)
            .with_status(503)
            .with_body("overloaded")
            .create_async()
            .await;
        let service = GeminiService::new_with_key(&config(&server.url()), "k").unwrap();
        let err = service
            .generate(&prompts::synthesis_request(&[], "q"))
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::Unavailable(_)));

        let body = json!({ "candidates": [] });
        let req = prompts::synthesis_request(&[], "q");
        let err = GeminiService::parse_response(&req, &body).unwrap_err();
        assert!(matches!(err, LlmError::EmptyResponse { operation: Operation::Synthesize }));
    }
}
