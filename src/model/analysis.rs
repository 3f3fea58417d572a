//! Synthesis output: contention points, stances and research gaps

use super::filters::SourceKind;
use super::paper::{Doi, Paper};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Number of papers each source contributed (post-filter, pre-dedup)
pub type SourceCounts = BTreeMap<SourceKind, usize>;

/// A paper singled out as central to the debate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyPaper {
    pub paper: Paper,
    pub rationale: String,
}

/// One paper's position on a contention point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stance {
    pub id: String,
    pub summary: String,
    /// Verbatim supporting quote
    pub quote: String,
    pub paper: Paper,
}

/// A corpus paper evaluated against a contention point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelatedPaper {
    pub doi: Doi,
    /// Relevance to the topic, 1 (tangential) to 5 (highly relevant)
    pub relevance: f64,
}

/// A topic on which the retrieved papers disagree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentionPoint {
    pub topic: String,
    pub stances: Vec<Stance>,
    pub related_papers: Vec<RelatedPaper>,
}

impl ContentionPoint {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            stances: Vec::new(),
            related_papers: Vec::new(),
        }
    }

    pub fn with_related(mut self, doi: impl Into<Doi>, relevance: f64) -> Self {
        self.related_papers.push(RelatedPaper {
            doi: doi.into(),
            relevance,
        });
        self
    }

    pub fn with_stance(mut self, stance: Stance) -> Self {
        self.stances.push(stance);
        self
    }

    /// DOIs of the related papers, in listed order
    pub fn related_dois(&self) -> impl Iterator<Item = &Doi> {
        self.related_papers.iter().map(|r| &r.doi)
    }
}

/// Coarse band of the disagreement score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisagreementLevel {
    Low,
    Moderate,
    High,
}

/// Disagreement score, 1 (consensus) to 10 (total disagreement)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisagreementScore {
    pub score: f64,
    pub qualitative: String,
}

impl DisagreementScore {
    pub fn level(&self) -> DisagreementLevel {
        if self.score <= 3.0 {
            DisagreementLevel::Low
        } else if self.score <= 7.0 {
            DisagreementLevel::Moderate
        } else {
            DisagreementLevel::High
        }
    }
}

/// A finished synthesis plus the bookkeeping attached after the service call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub summary: String,
    pub disagreement_score: DisagreementScore,
    pub key_papers: Vec<KeyPaper>,
    pub contention_points: Vec<ContentionPoint>,
    pub research_gaps: Vec<String>,
    /// Exactly the papers sent for synthesis
    pub papers: Vec<Paper>,
    /// Wall-clock duration of the synthesis call, in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub synthesis_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_query: Option<String>,
    /// Corpus papers left out of the synthesis, with the reason in
    /// `relevance_justification`
    #[serde(default)]
    pub excluded_papers: Vec<Paper>,
    #[serde(default)]
    pub source_counts: SourceCounts,
}

impl AnalysisResult {
    /// Well-formed result for an empty selection; no service call behind it
    pub fn degenerate() -> Self {
        Self {
            summary: "Analysis could not be completed because no papers were selected for the final synthesis.".to_string(),
            disagreement_score: DisagreementScore {
                score: 0.0,
                qualitative: "N/A".to_string(),
            },
            key_papers: Vec::new(),
            contention_points: Vec::new(),
            research_gaps: Vec::new(),
            papers: Vec::new(),
            synthesis_time: Some(0.0),
            final_query: None,
            excluded_papers: Vec::new(),
            source_counts: SourceCounts::new(),
        }
    }

    /// Analyzed papers ordered newest first, then by first author's last name
    pub fn bibliography(&self) -> Vec<&Paper> {
        let mut papers: Vec<&Paper> = self.papers.iter().collect();
        papers.sort_by(|a, b| {
            b.year
                .cmp(&a.year)
                .then_with(|| a.first_author_last_name().cmp(b.first_author_last_name()))
        });
        papers
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Answer to a follow-up question, grounded in the analyzed papers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FollowUp {
    pub question: String,
    pub answer: String,
    pub sources: Vec<Paper>,
}
