//! Reference formatting for a single paper

use super::paper::Paper;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CitationStyle {
    Apa,
    Mla,
    Chicago,
}

impl CitationStyle {
    pub const ALL: [CitationStyle; 3] = [CitationStyle::Apa, CitationStyle::Mla, CitationStyle::Chicago];

    pub fn label(&self) -> &'static str {
        match self {
            CitationStyle::Apa => "APA",
            CitationStyle::Mla => "MLA",
            CitationStyle::Chicago => "Chicago",
        }
    }
}

/// One, two, or "first et al."
fn format_authors(authors: &[String]) -> String {
    match authors {
        [] => String::new(),
        [only] => only.clone(),
        [first, second] => format!("{} & {}", first, second),
        [first, ..] => format!("{} et al.", first),
    }
}

/// Author string closed with a period, without doubling one already there
fn author_sentence(authors: &str) -> String {
    if authors.ends_with('.') {
        authors.to_string()
    } else {
        format!("{}.", authors)
    }
}

impl Paper {
    /// Format a reference to this paper in the given style
    pub fn citation(&self, style: CitationStyle) -> String {
        let authors = author_sentence(&format_authors(&self.authors));
        match style {
            CitationStyle::Apa => format!(
                "{} ({}). {}. https://doi.org/{}",
                authors, self.year, self.title, self.doi
            ),
            CitationStyle::Mla => format!(
                "{} \"{}.\" {}, doi:{}.",
                authors, self.title, self.year, self.doi
            ),
            CitationStyle::Chicago => format!(
                "{} {}. \"{}.\" https://doi.org/{}.",
                authors, self.year, self.title, self.doi
            ),
        }
    }
}
