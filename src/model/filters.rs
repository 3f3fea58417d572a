//! Search filters applied by the bibliographic sources

use chrono::Datelike;
use serde::{Deserialize, Serialize};

/// A bibliographic source the retriever can fan out to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SourceKind {
    OpenAlex,
    SemanticScholar,
}

impl SourceKind {
    /// All known sources, in fan-out order
    pub const ALL: [SourceKind; 2] = [SourceKind::OpenAlex, SourceKind::SemanticScholar];

    /// Human-readable name
    pub fn label(&self) -> &'static str {
        match self {
            SourceKind::OpenAlex => "OpenAlex",
            SourceKind::SemanticScholar => "Semantic Scholar",
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Per-source enable flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceToggles {
    pub open_alex: bool,
    pub semantic_scholar: bool,
}

impl SourceToggles {
    pub fn is_enabled(&self, source: SourceKind) -> bool {
        match source {
            SourceKind::OpenAlex => self.open_alex,
            SourceKind::SemanticScholar => self.semantic_scholar,
        }
    }

    pub fn set(&mut self, source: SourceKind, enabled: bool) {
        match source {
            SourceKind::OpenAlex => self.open_alex = enabled,
            SourceKind::SemanticScholar => self.semantic_scholar = enabled,
        }
    }

    pub fn any_enabled(&self) -> bool {
        SourceKind::ALL.iter().any(|s| self.is_enabled(*s))
    }
}

impl Default for SourceToggles {
    fn default() -> Self {
        Self {
            open_alex: true,
            semantic_scholar: true,
        }
    }
}

/// Filters chosen before a search begins.
///
/// Frozen once the search starts: the controller keeps its own copy.
/// Keys are snake_case like the rest of the configuration, so
/// `DIALECTICA_FILTERS__START_YEAR` lands on `start_year`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSet {
    /// First publication year, inclusive
    pub start_year: i32,
    /// Last publication year, inclusive
    pub end_year: i32,
    pub open_access_only: bool,
    pub min_citations: u32,
    pub sources: SourceToggles,
}

impl Default for FilterSet {
    fn default() -> Self {
        Self {
            start_year: 2010,
            end_year: chrono::Utc::now().year(),
            open_access_only: false,
            min_citations: 0,
            sources: SourceToggles::default(),
        }
    }
}

impl FilterSet {
    pub fn with_years(mut self, start_year: i32, end_year: i32) -> Self {
        self.start_year = start_year;
        self.end_year = end_year;
        self
    }

    pub fn with_source(mut self, source: SourceKind, enabled: bool) -> Self {
        self.sources.set(source, enabled);
        self
    }

    pub fn with_open_access_only(mut self, open_access_only: bool) -> Self {
        self.open_access_only = open_access_only;
        self
    }

    pub fn with_min_citations(mut self, min_citations: u32) -> Self {
        self.min_citations = min_citations;
        self
    }

    /// Year range as `start-end`, the form both sources accept
    pub fn year_range(&self) -> String {
        format!("{}-{}", self.start_year, self.end_year)
    }
}
