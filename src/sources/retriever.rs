//! Concurrent fan-out across sources with first-seen deduplication

use super::SourceAdapter;
use crate::model::{Doi, FilterSet, Paper, SourceCounts};
use futures::future::join_all;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

/// Merged output of one retrieval round
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Retrieval {
    /// Deduplicated and truncated corpus
    pub papers: Vec<Paper>,
    /// Per-source result counts before deduplication; disabled sources report 0
    pub source_counts: SourceCounts,
}

impl Retrieval {
    pub fn is_empty(&self) -> bool {
        self.papers.is_empty()
    }
}

/// Keep the first paper for each DOI, preserving order
pub fn dedupe_by_doi(papers: impl IntoIterator<Item = Paper>) -> Vec<Paper> {
    let mut seen: HashSet<Doi> = HashSet::new();
    papers
        .into_iter()
        .filter(|p| seen.insert(p.doi.clone()))
        .collect()
}

/// Fans a query out to every enabled source.
pub struct Retriever {
    adapters: Vec<Arc<dyn SourceAdapter>>,
    max_corpus_size: usize,
}

impl Retriever {
    /// Adapters are queried, and their results merged, in the given order.
    pub fn new(adapters: Vec<Arc<dyn SourceAdapter>>, max_corpus_size: usize) -> Self {
        Self {
            adapters,
            max_corpus_size,
        }
    }

    pub fn adapters(&self) -> &[Arc<dyn SourceAdapter>] {
        &self.adapters
    }

    /// Query all enabled sources concurrently and merge the results.
    ///
    /// All sources are awaited jointly before merging. A failing source
    /// contributes an empty list.
    pub async fn fetch_all(&self, query: &str, filters: &FilterSet) -> Retrieval {
        let enabled: Vec<&Arc<dyn SourceAdapter>> = self
            .adapters
            .iter()
            .filter(|a| filters.sources.is_enabled(a.kind()))
            .collect();

        debug!(query, sources = enabled.len(), "fanning out to sources");

        let results = join_all(enabled.iter().map(|a| a.fetch(query, filters))).await;

        let mut source_counts = SourceCounts::new();
        for adapter in &self.adapters {
            source_counts.insert(adapter.kind(), 0);
        }
        for (adapter, papers) in enabled.iter().zip(&results) {
            *source_counts.entry(adapter.kind()).or_insert(0) += papers.len();
        }

        let mut papers = dedupe_by_doi(results.into_iter().flatten());
        papers.truncate(self.max_corpus_size);

        info!(query, count = papers.len(), "retrieval complete");
        Retrieval {
            papers,
            source_counts,
        }
    }
}
