//! Mock language service for testing: scripted responses

use super::{GenerateRequest, LanguageService, LlmError, Operation};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

/// Scripted language service.
///
/// Responses are queued per operation. Each call consumes the front of the
/// queue, except that the last queued response is sticky and answers every
/// later call. Every request is recorded.
pub struct MockService {
    responses: Mutex<HashMap<Operation, VecDeque<Result<String, LlmError>>>>,
    requests: Mutex<Vec<GenerateRequest>>,
}

impl Default for MockService {
    fn default() -> Self {
        Self::new()
    }
}

impl MockService {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(HashMap::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a raw text response for an operation.
    pub fn with_response(self, operation: Operation, text: impl Into<String>) -> Self {
        self.push(operation, Ok(text.into()));
        self
    }

    /// Queue a JSON response for an operation.
    pub fn with_json(self, operation: Operation, value: serde_json::Value) -> Self {
        self.push(operation, Ok(value.to_string()));
        self
    }

    /// Queue a failure for an operation.
    pub fn with_failure(self, operation: Operation, error: LlmError) -> Self {
        self.push(operation, Err(error));
        self
    }

    fn push(&self, operation: Operation, response: Result<String, LlmError>) {
        self.responses
            .lock()
            .unwrap()
            .entry(operation)
            .or_default()
            .push_back(response);
    }

    /// All recorded requests, in call order
    pub fn requests(&self) -> Vec<GenerateRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Number of calls made for an operation
    pub fn calls(&self, operation: Operation) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.operation == operation)
            .count()
    }
}

#[async_trait]
impl LanguageService for MockService {
    fn model(&self) -> &str {
        "mock"
    }

    async fn generate(&self, request: &GenerateRequest) -> Result<String, LlmError> {
        self.requests.lock().unwrap().push(request.clone());

        let mut responses = self.responses.lock().unwrap();
        let queue = match responses.get_mut(&request.operation) {
            Some(queue) if !queue.is_empty() => queue,
            _ => {
                return Err(LlmError::Request(format!(
                    "no mock response for operation '{}'",
                    request.operation
                )))
            }
        };

        if queue.len() > 1 {
            queue.pop_front().unwrap_or_else(|| {
                Err(LlmError::Request("mock queue drained".to_string()))
            })
        } else {
            queue[0].clone()
        }
    }
}
