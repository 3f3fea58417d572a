//! Session controller: drives one analysis from question to results
//!
//! The controller owns the session state behind a mutex that is never held
//! across an `await`. Every search gets a fresh [`SearchId`]; each stage
//! re-checks the id after its service call returns, so a response that
//! arrives after a newer search has started is dropped instead of
//! overwriting the newer session. Saved stances live outside the session
//! and survive new searches.

use super::{
    PipelineError, PipelineStage, QueryRefiner, RecoveryStage, RelevanceAssessor,
    SynthesisOrchestrator, UsageStats, UsageTracker,
};
use crate::config::DialecticaConfig;
use crate::llm::{GeminiService, LanguageService};
use crate::model::{
    sort_for_review, AnalysisResult, Doi, FilterSet, FollowUp, Paper, ReviewSort, SavedItem,
    SourceCounts, Stance,
};
use crate::sources::{default_adapters, Retriever, SourceAdapter};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Identity of one search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SearchId(Uuid);

impl SearchId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for SearchId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Default)]
struct Session {
    id: Option<SearchId>,
    stage: PipelineStage,
    question: String,
    filters: FilterSet,
    final_query: Option<String>,
    corpus: Vec<Paper>,
    selection: HashSet<Doi>,
    source_counts: SourceCounts,
    result: Option<AnalysisResult>,
    follow_ups: Vec<FollowUp>,
}

impl Session {
    fn owned_by(&self, id: SearchId) -> bool {
        self.id == Some(id)
    }
}

/// Drives the research pipeline for one session.
pub struct PipelineController {
    refiner: QueryRefiner,
    retriever: Retriever,
    assessor: RelevanceAssessor,
    synthesis: SynthesisOrchestrator,
    max_search_attempts: usize,
    session: Mutex<Session>,
    saved: Mutex<Vec<SavedItem>>,
}

impl PipelineController {
    pub fn new(
        service: Arc<dyn LanguageService>,
        adapters: Vec<Arc<dyn SourceAdapter>>,
        config: &DialecticaConfig,
    ) -> Self {
        Self {
            refiner: QueryRefiner::new(service.clone()),
            retriever: Retriever::new(adapters, config.pipeline.max_corpus_size),
            assessor: RelevanceAssessor::new(service.clone(), config.pipeline.relevance_threshold),
            synthesis: SynthesisOrchestrator::new(service, config.pricing.clone(), UsageTracker::new()),
            max_search_attempts: config.pipeline.max_search_attempts.max(1),
            session: Mutex::new(Session {
                filters: config.filters.clone(),
                ..Session::default()
            }),
            saved: Mutex::new(Vec::new()),
        }
    }

    /// Build a controller backed by Gemini and the default sources.
    ///
    /// Fails with [`PipelineError::Configuration`] when no API key resolves.
    pub fn from_config(config: &DialecticaConfig) -> Result<Self, PipelineError> {
        let service = GeminiService::from_config(&config.llm)
            .map_err(|e| PipelineError::Configuration(e.to_string()))?;
        info!(model = %config.llm.model, "language service ready");
        Ok(Self::new(
            Arc::new(service),
            default_adapters(&config.sources),
            config,
        ))
    }

    fn session(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap()
    }

    /// Move search `id` to `next`, unless a newer search owns the session.
    fn advance(&self, id: SearchId, next: PipelineStage) -> Result<(), PipelineError> {
        let mut session = self.session();
        if !session.owned_by(id) {
            debug!(search = %id, "dropping stale stage transition");
            return Err(PipelineError::Superseded);
        }
        if !session.stage.can_transition_to(&next) {
            return Err(PipelineError::InvalidTransition {
                from: session.stage.to_string(),
                to: next.to_string(),
            });
        }
        debug!(search = %id, from = %session.stage, to = %next, "stage transition");
        session.stage = next;
        Ok(())
    }

    /// Record `err` as the session's failure, if `id` still owns it.
    fn fail(&self, id: SearchId, err: PipelineError, recover_to: RecoveryStage) -> PipelineError {
        let mut session = self.session();
        if !session.owned_by(id) {
            return PipelineError::Superseded;
        }
        warn!(search = %id, error = %err, "pipeline stage failed");
        session.stage = PipelineStage::Failed {
            message: err.user_message(),
            recover_to,
        };
        err
    }

    /// Run a new search up to the review stage.
    ///
    /// Supersedes any previous session. Returns the assessed corpus; papers
    /// marked relevant start out selected.
    ///
    /// Any failure, including a rejected question, leaves the session in an
    /// error stage that recovers to idle.
    pub async fn search(&self, question: &str, filters: FilterSet) -> Result<Vec<Paper>, PipelineError> {
        let question = question.trim().to_string();
        let rejection = if question.is_empty() {
            Some(PipelineError::EmptyQuestion)
        } else if !filters.sources.any_enabled() {
            Some(PipelineError::NoSourceEnabled)
        } else {
            None
        };

        let id = SearchId::new();
        {
            let mut session = self.session();
            *session = Session {
                id: Some(id),
                stage: PipelineStage::Standardizing,
                question: question.clone(),
                filters: filters.clone(),
                ..Session::default()
            };
        }
        if let Some(err) = rejection {
            return Err(self.fail(id, err, RecoveryStage::Idle));
        }
        info!(search = %id, question = %question, "search started");

        let outcome = self.run_search(id, question, filters).await;
        self.settle_search(id, outcome)
    }

    /// Route a failed search into the error stage; stale work stays stale.
    fn settle_search(
        &self,
        id: SearchId,
        outcome: Result<Vec<Paper>, PipelineError>,
    ) -> Result<Vec<Paper>, PipelineError> {
        match outcome {
            Ok(corpus) => Ok(corpus),
            Err(PipelineError::Superseded) => Err(PipelineError::Superseded),
            Err(err) => Err(self.fail(id, err, RecoveryStage::Idle)),
        }
    }

    async fn run_search(
        &self,
        id: SearchId,
        question: String,
        filters: FilterSet,
    ) -> Result<Vec<Paper>, PipelineError> {
        let mut query = self.refiner.standardize(&question).await;
        self.advance(id, PipelineStage::Retrieving { attempt: 1 })?;

        let mut attempt = 1;
        let retrieval = loop {
            let retrieval = self.retriever.fetch_all(&query, &filters).await;
            if !retrieval.is_empty() || attempt >= self.max_search_attempts {
                break retrieval;
            }

            self.advance(id, PipelineStage::Broadening { attempt })?;
            let broader = self.refiner.broaden(&query).await;
            if broader == query {
                info!(search = %id, query = %query, "broadening converged");
                break retrieval;
            }
            query = broader;
            attempt += 1;
            self.advance(id, PipelineStage::Retrieving { attempt })?;
        };

        if retrieval.is_empty() {
            return Err(PipelineError::NoResults { query });
        }
        info!(search = %id, query = %query, papers = retrieval.papers.len(), attempts = attempt, "retrieval finished");

        self.advance(id, PipelineStage::Assessing)?;
        let assessed = self.assessor.assess(&retrieval.papers, &question).await;

        let mut session = self.session();
        if !session.owned_by(id) {
            return Err(PipelineError::Superseded);
        }
        session.selection = assessed
            .iter()
            .filter(|p| p.is_marked_relevant())
            .map(|p| p.doi.clone())
            .collect();
        session.corpus = assessed.clone();
        session.final_query = Some(query);
        session.source_counts = retrieval.source_counts;
        session.stage = PipelineStage::Reviewing;
        Ok(assessed)
    }

    /// Synthesize the current selection.
    ///
    /// On failure the session enters an error stage that recovers to
    /// review with corpus and selection intact.
    pub async fn proceed(&self) -> Result<AnalysisResult, PipelineError> {
        let (id, corpus, selection, question) = {
            let mut session = self.session();
            if session.stage != PipelineStage::Reviewing {
                return Err(PipelineError::InvalidTransition {
                    from: session.stage.to_string(),
                    to: PipelineStage::Synthesizing.to_string(),
                });
            }
            if session.selection.is_empty() {
                return Err(PipelineError::EmptySelection);
            }
            let id = session.id.ok_or(PipelineError::Superseded)?;
            session.stage = PipelineStage::Synthesizing;
            (
                id,
                session.corpus.clone(),
                session.selection.clone(),
                session.question.clone(),
            )
        };

        let outcome = self
            .synthesis
            .synthesize_curated(&corpus, &selection, &question)
            .await;
        let mut result = match outcome {
            Ok(result) => result,
            Err(e) => return Err(self.fail(id, e.into(), RecoveryStage::Reviewing)),
        };

        let mut session = self.session();
        if !session.owned_by(id) {
            return Err(PipelineError::Superseded);
        }
        result.final_query = session.final_query.clone();
        result.source_counts = session.source_counts.clone();
        session.result = Some(result.clone());
        session.corpus.clear();
        session.selection.clear();
        session.stage = PipelineStage::Results;
        Ok(result)
    }

    /// Ask a follow-up question about the current results.
    ///
    /// A failed call leaves the session at results.
    pub async fn ask_follow_up(&self, question: &str) -> Result<FollowUp, PipelineError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(PipelineError::EmptyQuestion);
        }
        let (id, original, papers) = {
            let session = self.session();
            match (&session.stage, &session.result, session.id) {
                (PipelineStage::Results, Some(result), Some(id)) => {
                    (id, session.question.clone(), result.papers.clone())
                }
                _ => {
                    return Err(PipelineError::InvalidTransition {
                        from: session.stage.to_string(),
                        to: "follow-up".to_string(),
                    })
                }
            }
        };

        let follow_up = self.synthesis.follow_up(question, &original, &papers).await?;

        let mut session = self.session();
        if !session.owned_by(id) {
            return Err(PipelineError::Superseded);
        }
        session.follow_ups.push(follow_up.clone());
        Ok(follow_up)
    }

    /// Leave the error stage for its recovery stage. No-op otherwise.
    pub fn dismiss_error(&self) -> PipelineStage {
        let mut session = self.session();
        if let PipelineStage::Failed { recover_to, .. } = session.stage {
            session.stage = recover_to.stage();
        }
        session.stage.clone()
    }

    /// Flip one paper's selection during review; returns whether it is now selected.
    pub fn toggle_selection(&self, doi: &Doi) -> Result<bool, PipelineError> {
        let mut session = self.session();
        Self::require_reviewing(&session)?;
        if !session.corpus.iter().any(|p| &p.doi == doi) {
            return Ok(false);
        }
        if session.selection.remove(doi) {
            Ok(false)
        } else {
            session.selection.insert(doi.clone());
            Ok(true)
        }
    }

    /// Replace the selection during review. DOIs outside the corpus are ignored.
    pub fn set_selection<I>(&self, dois: I) -> Result<(), PipelineError>
    where
        I: IntoIterator<Item = Doi>,
    {
        let mut session = self.session();
        Self::require_reviewing(&session)?;
        let in_corpus: HashSet<Doi> = session.corpus.iter().map(|p| p.doi.clone()).collect();
        session.selection = dois.into_iter().filter(|d| in_corpus.contains(d)).collect();
        Ok(())
    }

    fn require_reviewing(session: &Session) -> Result<(), PipelineError> {
        if session.stage == PipelineStage::Reviewing {
            Ok(())
        } else {
            Err(PipelineError::InvalidTransition {
                from: session.stage.to_string(),
                to: PipelineStage::Reviewing.to_string(),
            })
        }
    }

    pub fn selection(&self) -> HashSet<Doi> {
        self.session().selection.clone()
    }

    /// The assessed corpus awaiting review, in retrieval order
    pub fn review_corpus(&self) -> Vec<Paper> {
        self.session().corpus.clone()
    }

    pub fn sorted_for_review(&self, sort: ReviewSort) -> Vec<Paper> {
        sort_for_review(&self.session().corpus, sort)
    }

    pub fn stage(&self) -> PipelineStage {
        self.session().stage.clone()
    }

    pub fn search_id(&self) -> Option<SearchId> {
        self.session().id
    }

    pub fn question(&self) -> String {
        self.session().question.clone()
    }

    pub fn filters(&self) -> FilterSet {
        self.session().filters.clone()
    }

    /// Query that produced the corpus, after standardization and broadening
    pub fn final_query(&self) -> Option<String> {
        self.session().final_query.clone()
    }

    pub fn source_counts(&self) -> SourceCounts {
        self.session().source_counts.clone()
    }

    pub fn result(&self) -> Option<AnalysisResult> {
        self.session().result.clone()
    }

    pub fn follow_ups(&self) -> Vec<FollowUp> {
        self.session().follow_ups.clone()
    }

    /// Bookmark a stance under the current question.
    ///
    /// Returns false when a stance with the same id is already saved.
    pub fn save_stance(&self, stance: Stance) -> bool {
        let query = self.question();
        let mut saved = self.saved.lock().unwrap();
        if saved.iter().any(|item| item.id == stance.id) {
            return false;
        }
        debug!(stance = %stance.id, "stance saved");
        saved.push(SavedItem::new(query, stance));
        true
    }

    /// Remove a saved stance by id; returns whether one was removed.
    pub fn remove_saved(&self, id: &str) -> bool {
        let mut saved = self.saved.lock().unwrap();
        let before = saved.len();
        saved.retain(|item| item.id != id);
        saved.len() != before
    }

    /// Saved stances, oldest first
    pub fn saved_items(&self) -> Vec<SavedItem> {
        self.saved.lock().unwrap().clone()
    }

    /// Usage accumulated across all searches since the last reset
    pub fn usage(&self) -> UsageStats {
        self.synthesis.usage().snapshot()
    }

    pub fn reset_usage(&self) {
        self.synthesis.usage().reset();
    }
}
