//! Bibliographic sources and the fan-out retriever
//!
//! A [`SourceAdapter`] never fails: transport, rate-limit and parse errors
//! are logged and turned into an empty result so that one source being
//! down never stops retrieval. [`SourceError`] exists only inside the
//! adapters, between the HTTP call and that isolation point.

mod openalex;
mod retriever;
mod semantic_scholar;

pub use openalex::OpenAlexSource;
pub use retriever::{Retrieval, Retriever};
pub use semantic_scholar::SemanticScholarSource;

use crate::config::SourcesConfig;
use crate::model::{FilterSet, Paper, SourceKind};
use async_trait::async_trait;
use std::time::Duration;

/// Errors inside a single source adapter.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("rate limited")]
    RateLimited,
    #[error("unparsable response: {0}")]
    Parse(#[from] serde_json::Error),
}

/// One external bibliographic source.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Which source this adapter queries
    fn kind(&self) -> SourceKind;

    /// Fetch papers matching the query and filters.
    ///
    /// Returns only papers with both a DOI and an abstract. Returns an
    /// empty list on any failure.
    async fn fetch(&self, query: &str, filters: &FilterSet) -> Vec<Paper>;
}

/// HTTP client shared by the adapters of one configuration
pub(crate) fn http_client(config: &SourcesConfig) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .user_agent(concat!("dialectica/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

/// Both production adapters, in fan-out order
pub fn default_adapters(config: &SourcesConfig) -> Vec<std::sync::Arc<dyn SourceAdapter>> {
    let client = http_client(config);
    vec![
        std::sync::Arc::new(OpenAlexSource::new(client.clone(), config)),
        std::sync::Arc::new(SemanticScholarSource::new(client, config)),
    ]
}
