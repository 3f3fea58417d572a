//! Synthesis of the curated corpus, and follow-up questions on it

use super::usage::UsageTracker;
use crate::config::PricingConfig;
use crate::llm::payload::{FollowUpPayload, SynthesisPayload};
use crate::llm::{decode, prompts, LanguageService, LlmError, Operation};
use crate::model::{AnalysisResult, Doi, FollowUp, Paper};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Justification attached to relevant papers the user deselected
pub const MANUAL_EXCLUSION_REASON: &str = "Manually excluded by user during review.";

/// Papers left out of a synthesis: `(corpus \ R) ∪ (R \ S)` where `R` is
/// the assessed-relevant set and `S` the selection.
///
/// Originally irrelevant papers come first and keep their assessment
/// justification; deselected relevant papers follow, tagged with
/// [`MANUAL_EXCLUSION_REASON`]. Both groups keep corpus order.
pub fn excluded_papers(corpus: &[Paper], selection: &HashSet<Doi>) -> Vec<Paper> {
    let irrelevant = corpus.iter().filter(|p| !p.is_marked_relevant()).cloned();
    let deselected = corpus
        .iter()
        .filter(|p| p.is_marked_relevant() && !selection.contains(&p.doi))
        .map(|p| {
            let mut p = p.clone();
            p.relevance_justification = Some(MANUAL_EXCLUSION_REASON.to_string());
            p
        });
    irrelevant.chain(deselected).collect()
}

/// Runs the synthesis and follow-up calls and accounts their usage.
pub struct SynthesisOrchestrator {
    service: Arc<dyn LanguageService>,
    pricing: PricingConfig,
    usage: UsageTracker,
}

impl SynthesisOrchestrator {
    pub fn new(service: Arc<dyn LanguageService>, pricing: PricingConfig, usage: UsageTracker) -> Self {
        Self {
            service,
            pricing,
            usage,
        }
    }

    pub fn usage(&self) -> &UsageTracker {
        &self.usage
    }

    /// Synthesize the selected papers.
    ///
    /// An empty selection yields [`AnalysisResult::degenerate`] without a
    /// service call. The returned result lists exactly `selected` as its
    /// papers, whatever the service echoed back.
    pub async fn synthesize(&self, selected: &[Paper], question: &str) -> Result<AnalysisResult, LlmError> {
        if selected.is_empty() {
            debug!("empty selection, skipping synthesis call");
            return Ok(AnalysisResult::degenerate());
        }

        let request = prompts::synthesis_request(selected, question);
        let started = Instant::now();
        let text = self.service.generate(&request).await?;
        let elapsed = started.elapsed().as_secs_f64();

        let payload: SynthesisPayload = decode(Operation::Synthesize, &text)?;
        let mut result = payload.into_result(selected.to_vec());
        result.synthesis_time = Some(elapsed);

        let output = serde_json::to_string(&result).unwrap_or_default();
        let stats = self.usage.record_text(&request.contents, &output, &self.pricing);

        info!(
            papers = selected.len(),
            contentions = result.contention_points.len(),
            seconds = elapsed,
            total_cost = stats.total_cost,
            "synthesis complete"
        );
        Ok(result)
    }

    /// Synthesize the selection drawn from an assessed corpus and attach
    /// the excluded papers.
    ///
    /// Selected papers are taken in corpus order; selected DOIs not in the
    /// corpus are ignored.
    pub async fn synthesize_curated(
        &self,
        corpus: &[Paper],
        selection: &HashSet<Doi>,
        question: &str,
    ) -> Result<AnalysisResult, LlmError> {
        let selected: Vec<Paper> = corpus
            .iter()
            .filter(|p| selection.contains(&p.doi))
            .cloned()
            .collect();
        let mut result = self.synthesize(&selected, question).await?;
        result.excluded_papers = excluded_papers(corpus, selection);
        Ok(result)
    }

    /// Answer a follow-up question from the analyzed papers.
    pub async fn follow_up(
        &self,
        question: &str,
        original_question: &str,
        papers: &[Paper],
    ) -> Result<FollowUp, LlmError> {
        let request = prompts::follow_up_request(question, original_question, papers);
        let text = self.service.generate(&request).await?;
        let payload: FollowUpPayload = decode(Operation::FollowUp, &text)?;
        let follow_up = payload.into_follow_up(question);

        let output = serde_json::to_string(&follow_up).unwrap_or_default();
        self.usage.record_text(&request.contents, &output, &self.pricing);

        info!(question, sources = follow_up.sources.len(), "follow-up answered");
        Ok(follow_up)
    }
}
