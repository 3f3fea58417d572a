//! Query standardization and broadening

use crate::llm::payload::{BroadenedQuery, StandardizedQuery};
use crate::llm::{decode, prompts, strip_trailing_operator, LanguageService, LlmError, Operation};
use std::sync::Arc;
use tracing::{debug, warn};

/// Turns research questions into database queries.
///
/// Neither operation fails: service errors degrade to a deterministic
/// fallback derived from the input.
pub struct QueryRefiner {
    service: Arc<dyn LanguageService>,
}

impl QueryRefiner {
    pub fn new(service: Arc<dyn LanguageService>) -> Self {
        Self { service }
    }

    /// Convert a free-text question into a boolean keyword query.
    ///
    /// Falls back to the question itself.
    pub async fn standardize(&self, question: &str) -> String {
        match self.try_standardize(question).await {
            Ok(query) if !query.is_empty() => {
                debug!(question, query = %query, "standardized question");
                query
            }
            Ok(_) => {
                warn!(question, "standardization returned an empty query, using question");
                question.trim().to_string()
            }
            Err(e) => {
                warn!(question, error = %e, "standardization failed, using question");
                question.trim().to_string()
            }
        }
    }

    async fn try_standardize(&self, question: &str) -> Result<String, LlmError> {
        let text = self
            .service
            .generate(&prompts::standardize_request(question))
            .await?;
        let payload: StandardizedQuery = decode(Operation::StandardizeQuery, &text)?;
        Ok(strip_trailing_operator(&payload.refined_query))
    }

    /// Ask for a simpler, more general version of a query that found nothing.
    ///
    /// Falls back to the query with its quote characters removed.
    pub async fn broaden(&self, failed_query: &str) -> String {
        match self.try_broaden(failed_query).await {
            Ok(query) if !query.is_empty() => {
                debug!(from = failed_query, to = %query, "broadened query");
                query
            }
            Ok(_) => {
                warn!(query = failed_query, "broadening returned an empty query, stripping quotes");
                strip_quotes(failed_query)
            }
            Err(e) => {
                warn!(query = failed_query, error = %e, "broadening failed, stripping quotes");
                strip_quotes(failed_query)
            }
        }
    }

    async fn try_broaden(&self, failed_query: &str) -> Result<String, LlmError> {
        let text = self
            .service
            .generate(&prompts::broaden_request(failed_query))
            .await?;
        let payload: BroadenedQuery = decode(Operation::BroadenQuery, &text)?;
        Ok(strip_trailing_operator(&payload.broadened_query))
    }
}

fn strip_quotes(query: &str) -> String {
    query.replace('"', "")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockService;
    use serde_json::json;

    #[tokio::test]
    async fn standardize_strips_trailing_operator() {
        let mock = MockService::new().with_json(
            Operation::StandardizeQuery,
            json!({"refinedQuery": "\"intermittent fasting\" AND weight AND"}),
        );
        let refiner = QueryRefiner::new(Arc::new(mock));
        assert_eq!(
            refiner.standardize("Does fasting work?").await,
            "\"intermittent fasting\" AND weight"
        );
    }

    #[tokio::test]
    async fn standardize_falls_back_to_question() {
        let mock = MockService::new()
            .with_failure(Operation::StandardizeQuery, LlmError::Request("down".into()));
        let refiner = QueryRefiner::new(Arc::new(mock));
        assert_eq!(refiner.standardize("  Is X effective? ").await, "Is X effective?");
    }

    #[tokio::test]
    async fn standardize_malformed_falls_back() {
        let mock = MockService::new().with_response(Operation::StandardizeQuery, "not json");
        let refiner = QueryRefiner::new(Arc::new(mock));
        assert_eq!(refiner.standardize("Is X effective?").await, "Is X effective?");
    }

    #[tokio::test]
    async fn broaden_returns_service_query() {
        let mock = MockService::new()
            .with_json(Operation::BroadenQuery, json!({"broadenedQuery": "fasting OR"}));
        let service = Arc::new(mock);
        let refiner = QueryRefiner::new(service.clone());
        assert_eq!(refiner.broaden("\"fasting\" AND obesity").await, "fasting");
        assert!(service.requests()[0].contents.contains("\"fasting\" AND obesity"));
    }

    #[tokio::test]
    async fn broaden_falls_back_to_unquoted_query() {
        let mock = MockService::new()
            .with_failure(Operation::BroadenQuery, LlmError::Unavailable("503".into()));
        let refiner = QueryRefiner::new(Arc::new(mock));
        assert_eq!(
            refiner.broaden("\"intermittent fasting\" AND weight").await,
            "intermittent fasting AND weight"
        );
    }
}
