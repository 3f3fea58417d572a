//! Typed response payloads, one per [`Operation`](super::Operation)
//!
//! Fields without `#[serde(default)]` are required: a response missing them
//! fails to decode.

use crate::model::{
    AnalysisResult, ContentionPoint, DisagreementScore, Doi, FollowUp, KeyPaper, Paper,
    SourceCounts,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StandardizedQuery {
    pub refined_query: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BroadenedQuery {
    pub broadened_query: String,
}

/// Relevance verdict for one paper
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assessment {
    pub doi: Doi,
    #[serde(default)]
    pub is_relevant: bool,
    pub score: f64,
    #[serde(default)]
    pub relevance_justification: String,
}

impl Assessment {
    /// Score rounded and clamped into 1..=5
    pub fn clamped_score(&self) -> u8 {
        if self.score.is_nan() {
            return 1;
        }
        self.score.round().clamp(1.0, 5.0) as u8
    }
}

/// Batch of verdicts, kept raw so one bad entry cannot sink the rest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelevanceAssessments {
    pub assessments: Vec<serde_json::Value>,
}

impl RelevanceAssessments {
    /// Entries that decode as an [`Assessment`], plus how many did not
    pub fn decode_entries(self) -> (Vec<Assessment>, usize) {
        let total = self.assessments.len();
        let valid: Vec<Assessment> = self
            .assessments
            .into_iter()
            .filter_map(|entry| serde_json::from_value(entry).ok())
            .collect();
        let rejected = total - valid.len();
        (valid, rejected)
    }
}

/// Structured synthesis as returned by the service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SynthesisPayload {
    pub summary: String,
    pub disagreement_score: DisagreementScore,
    pub key_papers: Vec<KeyPaper>,
    pub contention_points: Vec<ContentionPoint>,
    pub research_gaps: Vec<String>,
}

impl SynthesisPayload {
    /// Convert into a result over `papers`.
    ///
    /// Any paper list the service echoes back is never decoded; the
    /// caller's selection is authoritative.
    pub fn into_result(self, papers: Vec<Paper>) -> AnalysisResult {
        AnalysisResult {
            summary: self.summary,
            disagreement_score: self.disagreement_score,
            key_papers: self.key_papers,
            contention_points: self.contention_points,
            research_gaps: self.research_gaps,
            papers,
            synthesis_time: None,
            final_query: None,
            excluded_papers: Vec::new(),
            source_counts: SourceCounts::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FollowUpPayload {
    pub question: String,
    pub answer: String,
    pub sources: Vec<Paper>,
}

impl FollowUpPayload {
    /// Keep the question as asked, not as echoed
    pub fn into_follow_up(self, question: &str) -> FollowUp {
        FollowUp {
            question: question.to_string(),
            answer: self.answer,
            sources: self.sources,
        }
    }
}
