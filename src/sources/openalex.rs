//! OpenAlex `/works` search

use super::{SourceAdapter, SourceError};
use crate::config::SourcesConfig;
use crate::model::{FilterSet, Paper, SourceKind};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, warn};

const SELECT_FIELDS: &str =
    "title,authorships,publication_year,abstract_inverted_index,doi,primary_location";
const DOI_PREFIX: &str = "https://doi.org/";

#[derive(Debug, Deserialize)]
struct WorksPage {
    #[serde(default)]
    results: Vec<Work>,
}

#[derive(Debug, Deserialize)]
struct Work {
    title: Option<String>,
    #[serde(default)]
    authorships: Vec<Authorship>,
    publication_year: Option<i32>,
    abstract_inverted_index: Option<HashMap<String, Vec<usize>>>,
    doi: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Authorship {
    author: Option<Author>,
    #[serde(default)]
    institutions: Vec<Institution>,
}

#[derive(Debug, Deserialize)]
struct Author {
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Institution {
    display_name: Option<String>,
}

/// Rebuild abstract text from OpenAlex's word → positions index
fn rebuild_abstract(index: &HashMap<String, Vec<usize>>) -> String {
    let mut positioned: Vec<(usize, &str)> = index
        .iter()
        .flat_map(|(word, positions)| positions.iter().map(move |p| (*p, word.as_str())))
        .collect();
    positioned.sort_by_key(|(pos, _)| *pos);
    positioned
        .into_iter()
        .map(|(_, word)| word)
        .collect::<Vec<_>>()
        .join(" ")
}

impl Work {
    fn into_paper(self) -> Paper {
        let authors = self
            .authorships
            .iter()
            .filter_map(|a| a.author.as_ref().and_then(|au| au.display_name.clone()))
            .collect();
        let institution = self
            .authorships
            .first()
            .and_then(|a| a.institutions.first())
            .and_then(|i| i.display_name.clone());
        let abstract_text = self
            .abstract_inverted_index
            .as_ref()
            .map(rebuild_abstract)
            .unwrap_or_default();
        let doi = self
            .doi
            .as_deref()
            .map(|d| d.strip_prefix(DOI_PREFIX).unwrap_or(d))
            .unwrap_or("");

        let mut paper = Paper::new(
            doi,
            self.title.unwrap_or_default(),
            authors,
            self.publication_year.unwrap_or_default(),
            abstract_text,
        );
        paper.primary_institution = institution;
        paper
    }
}

/// Parse a `/works` page, keeping only usable papers
fn parse_works(body: &str) -> Result<Vec<Paper>, SourceError> {
    let page: WorksPage = serde_json::from_str(body)?;
    Ok(page
        .results
        .into_iter()
        .map(Work::into_paper)
        .filter(Paper::is_usable)
        .collect())
}

/// The `filter` parameter for a filter set
fn filter_param(filters: &FilterSet) -> String {
    let mut parts = vec![
        format!("publication_year:{}", filters.year_range()),
        "has_abstract:true".to_string(),
    ];
    if filters.open_access_only {
        parts.push("is_oa:true".to_string());
    }
    if filters.min_citations > 0 {
        parts.push(format!("cited_by_count:>{}", filters.min_citations));
    }
    parts.join(",")
}

pub struct OpenAlexSource {
    client: reqwest::Client,
    base_url: String,
    per_page: usize,
    mailto: Option<String>,
}

impl OpenAlexSource {
    pub fn new(client: reqwest::Client, config: &SourcesConfig) -> Self {
        Self {
            client,
            base_url: config.openalex_base_url.trim_end_matches('/').to_string(),
            per_page: config.per_source_limit,
            mailto: config.mailto.clone(),
        }
    }

    async fn try_fetch(&self, query: &str, filters: &FilterSet) -> Result<Vec<Paper>, SourceError> {
        let mut params = vec![
            ("search", query.to_string()),
            ("filter", filter_param(filters)),
            ("per_page", self.per_page.to_string()),
            ("sort", "relevance_score:desc".to_string()),
            ("select", SELECT_FIELDS.to_string()),
        ];
        if let Some(mailto) = &self.mailto {
            params.push(("mailto", mailto.clone()));
        }

        let response = self
            .client
            .get(format!("{}/works", self.base_url))
            .query(&params)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if status.as_u16() == 429 {
            return Err(SourceError::RateLimited);
        }
        if !status.is_success() {
            return Err(SourceError::Status {
                status: status.as_u16(),
                body,
            });
        }
        parse_works(&body)
    }
}

#[async_trait]
impl SourceAdapter for OpenAlexSource {
    fn kind(&self) -> SourceKind {
        SourceKind::OpenAlex
    }

    async fn fetch(&self, query: &str, filters: &FilterSet) -> Vec<Paper> {
        match self.try_fetch(query, filters).await {
            Ok(papers) => {
                debug!(count = papers.len(), "OpenAlex returned papers");
                papers
            }
            Err(e) => {
                warn!(error = %e, "OpenAlex fetch failed, skipping source");
                Vec::new()
            }
        }
    }
}
