//! Paper representation and its identity key

use serde::{Deserialize, Serialize};

/// Digital Object Identifier: the identity of a paper.
///
/// Serializes as a plain string. Two papers with the same DOI are the
/// same entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Doi(String);

impl Doi {
    /// Create a DOI, trimming surrounding whitespace
    pub fn new(doi: impl Into<String>) -> Self {
        let doi = doi.into();
        let trimmed = doi.trim();
        if trimmed.len() == doi.len() {
            Self(doi)
        } else {
            Self(trimmed.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for Doi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Doi {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Doi {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// An academic paper as retrieved from a bibliographic source.
///
/// The relevance fields are empty until the paper has been through
/// relevance assessment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Paper {
    pub title: String,
    pub authors: Vec<String>,
    pub year: i32,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub doi: Doi,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_institution: Option<String>,
    /// Relevance to the research question, 1-5
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relevance_justification: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_relevant: Option<bool>,
}

impl Paper {
    /// Create an unassessed paper
    pub fn new(
        doi: impl Into<Doi>,
        title: impl Into<String>,
        authors: Vec<String>,
        year: i32,
        abstract_text: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            authors,
            year,
            abstract_text: abstract_text.into(),
            doi: doi.into(),
            primary_institution: None,
            score: None,
            relevance_justification: None,
            is_relevant: None,
        }
    }

    pub fn with_institution(mut self, institution: impl Into<String>) -> Self {
        self.primary_institution = Some(institution.into());
        self
    }

    /// Attach a relevance assessment
    pub fn with_assessment(
        mut self,
        score: u8,
        is_relevant: bool,
        justification: impl Into<String>,
    ) -> Self {
        self.score = Some(score);
        self.is_relevant = Some(is_relevant);
        self.relevance_justification = Some(justification.into());
        self
    }

    /// Whether the paper carries both an identifier and an abstract.
    ///
    /// Downstream stages need both; sources drop papers failing this check.
    pub fn is_usable(&self) -> bool {
        !self.doi.is_empty() && !self.abstract_text.trim().is_empty()
    }

    /// Marked relevant by assessment. Unassessed papers are not relevant.
    pub fn is_marked_relevant(&self) -> bool {
        self.is_relevant == Some(true)
    }

    /// Last name of the first author, or empty
    pub fn first_author_last_name(&self) -> &str {
        self.authors
            .first()
            .and_then(|a| a.split_whitespace().last())
            .unwrap_or("")
    }

    /// Serialize for the language service's synthesis and follow-up prompts
    pub(crate) fn synthesis_context(&self) -> String {
        format!(
            "Title: {}\nAuthors: {}\nYear: {}\nAbstract: {}\nDOI: {}",
            self.title,
            self.authors.join(", "),
            self.year,
            self.abstract_text,
            self.doi
        )
    }
}

/// Ordering applied to the review screen's corpus listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewSort {
    /// Highest relevance score first
    #[default]
    Relevance,
    /// Newest first
    Year,
}

/// Sort a copy of the corpus for review. Stable: ties keep input order.
pub fn sort_for_review(papers: &[Paper], sort: ReviewSort) -> Vec<Paper> {
    let mut sorted = papers.to_vec();
    match sort {
        ReviewSort::Relevance => sorted.sort_by(|a, b| b.score.unwrap_or(0).cmp(&a.score.unwrap_or(0))),
        ReviewSort::Year => sorted.sort_by(|a, b| b.year.cmp(&a.year)),
    }
    sorted
}
