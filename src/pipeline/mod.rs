//! Research pipeline: question in, contention map out.
//!
//! ```text
//! standardize ─▶ retrieve ─┬─▶ assess ─▶ review ─▶ synthesize ─▶ results
//!                    ▲     │ (no papers)
//!                    └─ broaden
//! ```
//!
//! [`PipelineController`] drives the stages for one session at a time. The
//! components it composes are usable on their own:
//! - [`QueryRefiner`]: question standardization and query broadening
//! - [`RelevanceAssessor`]: batched relevance screening with fallback
//! - [`SynthesisOrchestrator`]: synthesis and follow-up questions
//! - [`UsageTracker`]: shared token and cost accumulator

mod controller;
mod refiner;
mod relevance;
mod stage;
mod synthesis;
mod usage;

pub use controller::{PipelineController, SearchId};
pub use refiner::QueryRefiner;
pub use relevance::RelevanceAssessor;
pub use stage::{PipelineStage, RecoveryStage};
pub use synthesis::{excluded_papers, SynthesisOrchestrator, MANUAL_EXCLUSION_REASON};
pub use usage::{estimate_tokens, UsageStats, UsageTracker};

use crate::llm::{LlmError, Operation};

/// Errors surfaced by the pipeline controller.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PipelineError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("research question is empty")]
    EmptyQuestion,
    #[error("no bibliographic source is enabled")]
    NoSourceEnabled,
    #[error("no papers found for query: {query}")]
    NoResults { query: String },
    #[error("no papers are selected for synthesis")]
    EmptySelection,
    #[error("invalid stage transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },
    #[error("search was superseded by a newer one")]
    Superseded,
    #[error(transparent)]
    Service(#[from] LlmError),
}

impl PipelineError {
    /// Text suitable for showing to the end user
    pub fn user_message(&self) -> String {
        match self {
            PipelineError::Configuration(message) => message.clone(),
            PipelineError::EmptyQuestion => "Please enter a research question.".to_string(),
            PipelineError::NoSourceEnabled => {
                "Please select at least one data source to search.".to_string()
            }
            PipelineError::NoResults { .. } => {
                "No relevant papers found, even after broadening the search. Please try rephrasing your question or adjusting the filters.".to_string()
            }
            PipelineError::EmptySelection => {
                "Please select at least one paper to analyze.".to_string()
            }
            PipelineError::InvalidTransition { .. } => {
                "That action is not available right now.".to_string()
            }
            PipelineError::Superseded => {
                "This search was replaced by a newer one.".to_string()
            }
            PipelineError::Service(err) => service_message(err),
        }
    }

    /// Whether retrying the same action may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            PipelineError::Service(err) => !matches!(
                err,
                LlmError::MissingCredential(_) | LlmError::InvalidCredential(_)
            ),
            _ => false,
        }
    }
}

fn service_message(err: &LlmError) -> String {
    match err {
        LlmError::MissingCredential(_) => {
            "The Gemini API key is not configured. Please set GEMINI_API_KEY and try again.".to_string()
        }
        LlmError::InvalidCredential(_) => {
            "Your Gemini API key is not valid. Please check it and try again.".to_string()
        }
        LlmError::Unavailable(_) => {
            "The analysis service is temporarily unavailable. Please try again.".to_string()
        }
        LlmError::EmptyResponse { operation } | LlmError::MalformedResponse { operation, .. } => {
            match operation {
                Operation::FollowUp => {
                    "The AI model returned a malformed answer that could not be read. Please try asking again.".to_string()
                }
                _ => {
                    "The AI model returned a malformed analysis that could not be read. This is often a temporary issue. Please try your analysis again.".to_string()
                }
            }
        }
        LlmError::Request(message) => format!("An error occurred during the analysis: {}", message),
    }
}
