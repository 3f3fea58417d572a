//! Generative-language service client
//!
//! Every language-service interaction in the pipeline is one structured
//! call: a system instruction, user contents and a JSON response schema go
//! out, raw text comes back. Callers decode that text into the typed
//! payloads in [`payload`] before using any of it; a payload that does not
//! match its schema is a [`LlmError::MalformedResponse`], never a partially
//! trusted value.
//!
//! Two implementations:
//! - `GeminiService`: HTTP client for the Gemini `generateContent` API (production)
//! - `MockService`: scripted responses with request recording (testing)

mod gemini;
mod mock;
pub mod payload;
pub mod prompts;

pub use gemini::GeminiService;
pub use mock::MockService;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// The structured operations the pipeline asks of the language service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Operation {
    StandardizeQuery,
    BroadenQuery,
    AssessRelevance,
    Synthesize,
    FollowUp,
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::StandardizeQuery => "standardizeQuery",
            Operation::BroadenQuery => "broadenQuery",
            Operation::AssessRelevance => "assessRelevance",
            Operation::Synthesize => "synthesize",
            Operation::FollowUp => "followUp",
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A single structured request to the language service
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateRequest {
    pub operation: Operation,
    pub system_instruction: String,
    /// User-turn contents
    pub contents: String,
    /// JSON schema the response must follow
    pub response_schema: serde_json::Value,
    /// Sampling temperature; `None` leaves the service default
    pub temperature: Option<f32>,
}

/// Errors from language-service calls.
#[derive(Debug, Clone, thiserror::Error)]
pub enum LlmError {
    #[error("Gemini API key is not set: {0}")]
    MissingCredential(String),
    #[error("API key not valid: {0}")]
    InvalidCredential(String),
    #[error("language service unavailable: {0}")]
    Unavailable(String),
    #[error("language service request failed: {0}")]
    Request(String),
    #[error("{operation} returned an empty response")]
    EmptyResponse { operation: Operation },
    #[error("{operation} returned malformed output: {message}")]
    MalformedResponse { operation: Operation, message: String },
}

impl LlmError {
    /// Whether the failure is in the payload rather than the transport
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            LlmError::MalformedResponse { .. } | LlmError::EmptyResponse { .. }
        )
    }
}

/// Client trait for the generative-language service.
///
/// Abstracts over transport (HTTP, mock) so pipeline stages don't depend
/// on how the service is reached.
#[async_trait]
pub trait LanguageService: Send + Sync {
    /// Model identifier, for logging
    fn model(&self) -> &str;

    /// Run one structured generation and return the raw response text.
    async fn generate(&self, request: &GenerateRequest) -> Result<String, LlmError>;
}

/// Strip a surrounding Markdown code fence, if the whole text is fenced
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    if !trimmed.ends_with("```") || trimmed.len() < 6 {
        return trimmed;
    }
    let body = if let Some(rest) = trimmed.strip_prefix("```json") {
        rest
    } else if let Some(rest) = trimmed.strip_prefix("```") {
        rest
    } else {
        return trimmed;
    };
    body.strip_suffix("```").unwrap_or(body).trim()
}

/// Decode raw service text into a typed payload.
///
/// Tries, in order:
/// 1. The text itself, minus a surrounding code fence
/// 2. The span from the first `{` to the last `}`
pub fn decode<T: DeserializeOwned>(operation: Operation, text: &str) -> Result<T, LlmError> {
    let candidate = strip_code_fence(text);
    if candidate.is_empty() {
        return Err(LlmError::EmptyResponse { operation });
    }

    let first_err = match serde_json::from_str::<T>(candidate) {
        Ok(value) => return Ok(value),
        Err(e) => e,
    };

    if let (Some(start), Some(end)) = (candidate.find('{'), candidate.rfind('}')) {
        if start < end {
            if let Ok(value) = serde_json::from_str::<T>(&candidate[start..=end]) {
                return Ok(value);
            }
        }
    }

    Err(LlmError::MalformedResponse {
        operation,
        message: first_err.to_string(),
    })
}

/// Strip a dangling boolean operator (`AND`, `OR`, `NOT`) from the end of a query
pub fn strip_trailing_operator(query: &str) -> String {
    let trimmed = query.trim();
    if let Some((head, last)) = trimmed.rsplit_once(char::is_whitespace) {
        if ["AND", "OR", "NOT"]
            .iter()
            .any(|op| last.eq_ignore_ascii_case(op))
        {
            return head.trim().to_string();
        }
    }
    trimmed.to_string()
}
