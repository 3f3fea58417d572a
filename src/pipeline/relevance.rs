//! Batched relevance screening

use crate::llm::payload::{Assessment, RelevanceAssessments};
use crate::llm::{decode, prompts, LanguageService, LlmError, Operation};
use crate::model::{Doi, Paper};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

const NOT_ASSESSED: &str = "AI assessment was not provided for this paper.";
const ASSESSMENT_FAILED: &str = "Automatic relevance assessment failed. Included by default.";
const FALLBACK_SCORE: u8 = 3;

/// Scores every paper in a corpus against the research question.
pub struct RelevanceAssessor {
    service: Arc<dyn LanguageService>,
    threshold: u8,
}

impl RelevanceAssessor {
    /// Papers scoring at or above `threshold` are marked relevant.
    pub fn new(service: Arc<dyn LanguageService>, threshold: u8) -> Self {
        Self { service, threshold }
    }

    /// Assess the whole corpus in one call.
    ///
    /// The output has one entry per input paper, in input order. A paper the
    /// service did not assess is marked not relevant with score 1. If the
    /// call fails outright, every paper is marked relevant with a mid-range
    /// score.
    pub async fn assess(&self, papers: &[Paper], question: &str) -> Vec<Paper> {
        if papers.is_empty() {
            return Vec::new();
        }

        let assessments = match self.request(papers, question).await {
            Ok(assessments) => assessments,
            Err(e) => {
                warn!(error = %e, count = papers.len(), "relevance assessment failed, including all papers");
                return papers
                    .iter()
                    .cloned()
                    .map(|p| p.with_assessment(FALLBACK_SCORE, true, ASSESSMENT_FAILED))
                    .collect();
            }
        };

        let by_doi: HashMap<Doi, Assessment> = assessments
            .into_iter()
            .map(|a| (a.doi.clone(), a))
            .collect();

        let assessed: Vec<Paper> = papers
            .iter()
            .cloned()
            .map(|paper| match by_doi.get(&paper.doi) {
                Some(a) => {
                    let score = a.clamped_score();
                    let justification = a.relevance_justification.clone();
                    paper.with_assessment(score, score >= self.threshold, justification)
                }
                None => paper.with_assessment(1, false, NOT_ASSESSED),
            })
            .collect();

        let relevant = assessed.iter().filter(|p| p.is_marked_relevant()).count();
        info!(total = assessed.len(), relevant, "relevance assessment complete");
        assessed
    }

    async fn request(&self, papers: &[Paper], question: &str) -> Result<Vec<Assessment>, LlmError> {
        let text = self
            .service
            .generate(&prompts::relevance_request(papers, question))
            .await?;
        let payload: RelevanceAssessments = decode(Operation::AssessRelevance, &text)?;
        let (assessments, rejected) = payload.decode_entries();
        if rejected > 0 {
            warn!(rejected, "skipping malformed relevance assessments");
        }
        Ok(assessments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockService;
    use serde_json::json;

    fn corpus() -> Vec<Paper> {
        ["10.1/a", "10.1/b", "10.1/c"]
            .iter()
            .map(|d| Paper::new(*d, *d, vec!["A Author".into()], 2020, "abstract"))
            .collect()
    }

    #[tokio::test]
    async fn threshold_decides_relevance() {
        let mock = MockService::new().with_json(
            Operation::AssessRelevance,
            json!({"assessments": [
                {"doi": "10.1/a", "isRelevant": true, "score": 5, "relevanceJustification": "direct"},
                {"doi": "10.1/b", "isRelevant": true, "score": 2, "relevanceJustification": "tangential"},
                {"doi": "10.1/c", "isRelevant": false, "score": 3, "relevanceJustification": "partial"}
            ]}),
        );
        let assessor = RelevanceAssessor::new(Arc::new(mock), 3);
        let papers = assessor.assess(&corpus(), "q").await;

        assert_eq!(papers.len(), 3);
        assert_eq!(papers[0].score, Some(5));
        assert!(papers[0].is_marked_relevant());
        assert!(!papers[1].is_marked_relevant());
        assert!(papers[2].is_marked_relevant());
        assert_eq!(papers[1].relevance_justification.as_deref(), Some("tangential"));
    }

    #[tokio::test]
    async fn missing_assessment_marks_not_relevant() {
        let mock = MockService::new().with_json(
            Operation::AssessRelevance,
            json!({"assessments": [
                {"doi": "10.1/a", "isRelevant": true, "score": 4, "relevanceJustification": "ok"}
            ]}),
        );
        let assessor = RelevanceAssessor::new(Arc::new(mock), 3);
        let papers = assessor.assess(&corpus(), "q").await;

        assert_eq!(papers.len(), 3);
        for paper in &papers[1..] {
            assert_eq!(paper.score, Some(1));
            assert_eq!(paper.is_relevant, Some(false));
            assert_eq!(paper.relevance_justification.as_deref(), Some(NOT_ASSESSED));
        }
    }

    #[tokio::test]
    async fn one_malformed_entry_does_not_discard_the_batch() {
        let mock = MockService::new().with_json(
            Operation::AssessRelevance,
            json!({"assessments": [
                {"doi": "10.1/a", "isRelevant": false, "score": 1, "relevanceJustification": "off topic"},
                {"doi": "10.1/b", "score": 4, "relevanceJustification": "on topic"},
                {"doi": "10.1/c", "isRelevant": true, "score": "high"}
            ]}),
        );
        let assessor = RelevanceAssessor::new(Arc::new(mock), 3);
        let papers = assessor.assess(&corpus(), "q").await;

        assert_eq!(papers.len(), 3);
        assert_eq!(papers[0].score, Some(1));
        assert!(!papers[0].is_marked_relevant());
        assert_eq!(papers[0].relevance_justification.as_deref(), Some("off topic"));
        assert_eq!(papers[1].score, Some(4));
        assert!(papers[1].is_marked_relevant());
        assert_eq!(papers[2].score, Some(1));
        assert_eq!(papers[2].relevance_justification.as_deref(), Some(NOT_ASSESSED));
    }

    #[tokio::test]
    async fn service_failure_includes_every_paper() {
        let mock = MockService::new()
            .with_failure(Operation::AssessRelevance, LlmError::Request("timeout".into()));
        let assessor = RelevanceAssessor::new(Arc::new(mock), 3);
        let papers = assessor.assess(&corpus(), "q").await;

        assert_eq!(papers.len(), 3);
        assert!(papers.iter().all(|p| p.is_marked_relevant() && p.score == Some(3)));
    }

    #[tokio::test]
    async fn malformed_response_includes_every_paper() {
        let mock = MockService::new().with_response(Operation::AssessRelevance, "{\"verdicts\": []}");
        let assessor = RelevanceAssessor::new(Arc::new(mock), 3);
        let papers = assessor.assess(&corpus(), "q").await;
        assert!(papers.iter().all(|p| p.is_marked_relevant()));
    }

    #[tokio::test]
    async fn empty_corpus_skips_service() {
        let mock = Arc::new(MockService::new());
        let assessor = RelevanceAssessor::new(mock.clone(), 3);
        assert!(assessor.assess(&[], "q").await.is_empty());
        assert_eq!(mock.calls(Operation::AssessRelevance), 0);
    }
}
