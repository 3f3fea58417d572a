//! Semantic Scholar Graph API paper search

use super::{SourceAdapter, SourceError};
use crate::config::SourcesConfig;
use crate::model::{FilterSet, Paper, SourceKind};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

const FIELDS: &str = "title,authors,year,abstract,externalIds,authors.affiliations";

#[derive(Debug, Deserialize)]
struct SearchPage {
    #[serde(default)]
    data: Vec<S2Paper>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct S2Paper {
    title: Option<String>,
    #[serde(default)]
    authors: Vec<S2Author>,
    year: Option<i32>,
    #[serde(rename = "abstract")]
    abstract_text: Option<String>,
    external_ids: Option<ExternalIds>,
}

#[derive(Debug, Deserialize)]
struct S2Author {
    name: Option<String>,
    #[serde(default)]
    affiliations: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct ExternalIds {
    #[serde(rename = "DOI")]
    doi: Option<String>,
}

impl S2Paper {
    fn into_paper(self) -> Paper {
        let institution = self
            .authors
            .first()
            .and_then(|a| a.affiliations.as_ref())
            .and_then(|affs| affs.first().cloned());
        let authors = self.authors.into_iter().filter_map(|a| a.name).collect();
        let doi = self.external_ids.and_then(|ids| ids.doi).unwrap_or_default();

        let mut paper = Paper::new(
            doi,
            self.title.unwrap_or_default(),
            authors,
            self.year.unwrap_or_default(),
            self.abstract_text.unwrap_or_default(),
        );
        paper.primary_institution = institution;
        paper
    }
}

fn parse_search(body: &str) -> Result<Vec<Paper>, SourceError> {
    let page: SearchPage = serde_json::from_str(body)?;
    Ok(page
        .data
        .into_iter()
        .map(S2Paper::into_paper)
        .filter(Paper::is_usable)
        .collect())
}

pub struct SemanticScholarSource {
    client: reqwest::Client,
    base_url: String,
    limit: usize,
}

impl SemanticScholarSource {
    pub fn new(client: reqwest::Client, config: &SourcesConfig) -> Self {
        Self {
            client,
            base_url: config
                .semantic_scholar_base_url
                .trim_end_matches('/')
                .to_string(),
            limit: config.per_source_limit,
        }
    }

    fn query_params(&self, query: &str, filters: &FilterSet) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("query", query.to_string()),
            ("year", filters.year_range()),
            ("limit", self.limit.to_string()),
            ("fields", FIELDS.to_string()),
        ];
        if filters.min_citations > 0 {
            params.push(("min_citation_count", filters.min_citations.to_string()));
        }
        if filters.open_access_only {
            params.push(("openAccessPdf", "true".to_string()));
        }
        params
    }

    async fn try_fetch(&self, query: &str, filters: &FilterSet) -> Result<Vec<Paper>, SourceError> {
        let response = self
            .client
            .get(format!("{}/graph/v1/paper/search", self.base_url))
            .query(&self.query_params(query, filters))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if status.as_u16() == 429 || body.to_lowercase().contains("too many requests") {
            return Err(SourceError::RateLimited);
        }
        if !status.is_success() {
            return Err(SourceError::Status {
                status: status.as_u16(),
                body,
            });
        }
        parse_search(&body)
    }
}

#[async_trait]
impl SourceAdapter for SemanticScholarSource {
    fn kind(&self) -> SourceKind {
        SourceKind::SemanticScholar
    }

    async fn fetch(&self, query: &str, filters: &FilterSet) -> Vec<Paper> {
        match self.try_fetch(query, filters).await {
            Ok(papers) => {
                debug!(count = papers.len(), "Semantic Scholar returned papers");
                papers
            }
            Err(SourceError::RateLimited) => {
                warn!("Semantic Scholar is rate-limited, skipping source");
                Vec::new()
            }
            Err(e) => {
                warn!(error = %e, "Semantic Scholar fetch failed, skipping source");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn source_for(url: &str) -> SemanticScholarSource {
        let config = SourcesConfig {
            semantic_scholar_base_url: url.to_string(),
            ..SourcesConfig::default()
        };
        SemanticScholarSource::new(reqwest::Client::new(), &config)
    }

    #[test]
    fn parses_doi_and_affiliation() {
        let body = json!({
            "data": [
                {
                    "title": "On Y",
                    "authors": [{ "name": "Grace Hopper", "affiliations": ["Yale"] }, { "name": "B", "affiliations": [] }],
                    "year": 2019,
                    "abstract": "Y happens.",
                    "externalIds": { "DOI": "10.2/y", "CorpusId": 42 }
                },
                {
                    "title": "Missing abstract",
                    "authors": [],
                    "year": 2019,
                    "abstract": null,
                    "externalIds": { "DOI": "10.2/z" }
                }
            ]
        })
        .to_string();

        let papers = parse_search(&body).unwrap();
        assert_eq!(papers.len(), 1);
        assert_eq!(papers[0].doi.as_str(), "10.2/y");
        assert_eq!(papers[0].primary_institution.as_deref(), Some("Yale"));
        assert_eq!(papers[0].authors, vec!["Grace Hopper", "B"]);
    }

    #[test]
    fn optional_params_follow_filters() {
        let source = source_for("http://localhost");
        let params = source.query_params("q", &FilterSet::default().with_years(2001, 2002));
        assert!(params.contains(&("year", "2001-2002".to_string())));
        assert!(!params.iter().any(|(k, _)| *k == "openAccessPdf"));

        let strict = FilterSet::default().with_open_access_only(true).with_min_citations(10);
        let params = source.query_params("q", &strict);
        assert!(params.contains(&("openAccessPdf", "true".to_string())));
        assert!(params.contains(&("min_citation_count", "10".to_string())));
    }

    #[tokio::test]
    async fn rate_limit_body_yields_empty_list() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", mockito::Matcher::Any)
            .with_status(200)
            .with_body("Too Many Requests. Please wait and try again.")
            .create_async()
            .await;

        let source = source_for(&server.url());
        assert!(source.fetch("q", &FilterSet::default()).await.is_empty());
    }

    #[tokio::test]
    async fn unreachable_host_yields_empty_list() {
        let source = source_for("http://127.0.0.1:1");
        assert!(source.fetch("q", &FilterSet::default()).await.is_empty());
    }
}
