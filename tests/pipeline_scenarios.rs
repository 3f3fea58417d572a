//! End-to-end pipeline scenarios against stub sources and a scripted
//! language service.
//!
//! Run with: `cargo test --test pipeline_scenarios`

mod common;

use common::{assessments, dois, synthesis, StubSource};
use dialectica::config::{DialecticaConfig, SourcesConfig};
use dialectica::layout::{GraphView, NodeKind};
use dialectica::llm::{LlmError, MockService, Operation};
use dialectica::model::{Doi, FilterSet, SourceKind};
use dialectica::pipeline::{PipelineController, PipelineError, PipelineStage, MANUAL_EXCLUSION_REASON};
use dialectica::sources::{OpenAlexSource, SourceAdapter};
use serde_json::json;
use std::sync::Arc;

fn controller(mock: MockService, sources: Vec<Arc<dyn SourceAdapter>>) -> PipelineController {
    PipelineController::new(Arc::new(mock), sources, &DialecticaConfig::default())
}

#[tokio::test]
async fn curated_search_produces_analysis_with_exclusions() {
    let all = dois(0..10);
    // Sources overlap on p4 and p5; the merged corpus has 10 unique papers
    let open_alex = Arc::new(StubSource::new(SourceKind::OpenAlex, &all[..6]));
    let s2 = Arc::new(StubSource::new(SourceKind::SemanticScholar, &all[4..]));

    let relevant: Vec<String> = all[..7].to_vec();
    let irrelevant: Vec<String> = all[7..].to_vec();
    let mut kept = relevant.clone();
    kept.remove(2);

    let mock = MockService::new()
        .with_json(Operation::StandardizeQuery, json!({"refinedQuery": "\"X\" AND effective*"}))
        .with_json(Operation::AssessRelevance, assessments(&relevant, &irrelevant))
        .with_json(Operation::Synthesize, synthesis(&kept));
    let controller = controller(mock, vec![open_alex.clone(), s2.clone()]);

    let corpus = controller
        .search("Is X effective?", FilterSet::default())
        .await
        .unwrap();
    assert_eq!(corpus.len(), 10);
    assert_eq!(controller.stage(), PipelineStage::Reviewing);
    assert_eq!(controller.selection().len(), 7);
    assert_eq!(open_alex.queries(), vec!["\"X\" AND effective*"]);

    // Deselect one relevant paper
    assert!(!controller.toggle_selection(&Doi::new(all[2].as_str())).unwrap());

    let result = controller.proceed().await.unwrap();
    assert_eq!(controller.stage(), PipelineStage::Results);
    assert_eq!(result.papers.len(), 6);
    assert_eq!(result.excluded_papers.len(), 4);

    let excluded: Vec<&str> = result.excluded_papers.iter().map(|p| p.doi.as_str()).collect();
    assert_eq!(excluded, vec![all[7].as_str(), all[8].as_str(), all[9].as_str(), all[2].as_str()]);
    assert_eq!(
        result.excluded_papers[3].relevance_justification.as_deref(),
        Some(MANUAL_EXCLUSION_REASON)
    );
    assert_eq!(
        result.excluded_papers[0].relevance_justification.as_deref(),
        Some("Scored 2")
    );

    assert_eq!(result.final_query.as_deref(), Some("\"X\" AND effective*"));
    assert_eq!(result.source_counts[&SourceKind::OpenAlex], 6);
    assert_eq!(result.source_counts[&SourceKind::SemanticScholar], 6);
    assert!(controller.review_corpus().is_empty());
    assert!(controller.usage().total_cost > 0.0);

    let view = GraphView::from_result(&result);
    assert_eq!(view.layout().column(NodeKind::Paper).count(), 6);
    assert_eq!(view.layout().column(NodeKind::Contention).count(), 2);
    assert_eq!(view.layout().column(NodeKind::Gap).count(), 2);
}

#[tokio::test]
async fn assessment_outage_keeps_whole_corpus() {
    let all = dois(0..5);
    let source = Arc::new(StubSource::new(SourceKind::OpenAlex, &all));
    let mock = MockService::new()
        .with_json(Operation::StandardizeQuery, json!({"refinedQuery": "x"}))
        .with_failure(Operation::AssessRelevance, LlmError::Unavailable("503".into()))
        .with_json(Operation::Synthesize, synthesis(&all));
    let controller = controller(mock, vec![source]);

    let corpus = controller.search("Is X effective?", FilterSet::default()).await.unwrap();
    assert!(corpus.iter().all(|p| p.is_marked_relevant() && p.score.is_some()));

    let result = controller.proceed().await.unwrap();
    assert_eq!(result.papers.len(), 5);
    assert!(result.excluded_papers.is_empty());
}

#[tokio::test]
async fn unreachable_source_does_not_stop_retrieval() {
    let config = SourcesConfig {
        openalex_base_url: "http://127.0.0.1:1".to_string(),
        timeout_secs: 5,
        ..SourcesConfig::default()
    };
    let down: Arc<dyn SourceAdapter> = Arc::new(OpenAlexSource::new(reqwest::Client::new(), &config));
    let up = Arc::new(StubSource::new(SourceKind::SemanticScholar, &dois(0..3)));

    let mock = MockService::new()
        .with_json(Operation::StandardizeQuery, json!({"refinedQuery": "x"}))
        .with_failure(Operation::AssessRelevance, LlmError::Request("offline".into()));
    let controller = controller(mock, vec![down, up]);

    let corpus = controller.search("Is X effective?", FilterSet::default()).await.unwrap();
    assert_eq!(corpus.len(), 3);
    assert_eq!(controller.source_counts()[&SourceKind::OpenAlex], 0);
    assert_eq!(controller.source_counts()[&SourceKind::SemanticScholar], 3);
}

#[tokio::test]
async fn stale_search_is_superseded() {
    let source = Arc::new(StubSource::new(SourceKind::OpenAlex, &dois(0..2)).gated());
    let mock = MockService::new()
        .with_json(Operation::StandardizeQuery, json!({"refinedQuery": "x"}))
        .with_failure(Operation::AssessRelevance, LlmError::Request("offline".into()));
    let controller = controller(mock, vec![source.clone()]);

    let first = controller.search("first question", FilterSet::default());
    let second = async {
        source.gate().started.notified().await;
        let outcome = controller.search("second question", FilterSet::default()).await;
        source.gate().release.notify_one();
        outcome
    };
    let (first, second) = tokio::join!(first, second);

    assert!(matches!(first, Err(PipelineError::Superseded)));
    assert_eq!(second.unwrap().len(), 2);
    assert_eq!(controller.question(), "second question");
    assert_eq!(controller.stage(), PipelineStage::Reviewing);
    assert_eq!(source.calls(), 2);
}

#[tokio::test]
async fn follow_ups_accumulate_and_usage_resets() {
    let all = dois(0..4);
    let source = Arc::new(StubSource::new(SourceKind::OpenAlex, &all));
    let mock = MockService::new()
        .with_json(Operation::StandardizeQuery, json!({"refinedQuery": "x"}))
        .with_failure(Operation::AssessRelevance, LlmError::Request("offline".into()))
        .with_json(Operation::Synthesize, synthesis(&all))
        .with_json(
            Operation::FollowUp,
            json!({"question": "q", "answer": "Only at high doses.", "sources": []}),
        );
    let controller = controller(mock, vec![source]);

    controller.search("Is X effective?", FilterSet::default()).await.unwrap();
    controller.proceed().await.unwrap();
    let after_synthesis = controller.usage();

    controller.ask_follow_up("Does dose matter?").await.unwrap();
    controller.ask_follow_up("For whom?").await.unwrap();
    let history = controller.follow_ups();
    assert_eq!(history.len(), 2);
    assert_eq!(history[1].question, "For whom?");
    assert!(controller.usage().total_input_tokens > after_synthesis.total_input_tokens);

    controller.reset_usage();
    assert_eq!(controller.usage().total_input_tokens, 0);
    assert_eq!(controller.stage(), PipelineStage::Results);
}

#[tokio::test]
async fn malformed_follow_up_keeps_results() {
    let all = dois(0..2);
    let source = Arc::new(StubSource::new(SourceKind::OpenAlex, &all));
    let mock = MockService::new()
        .with_json(Operation::StandardizeQuery, json!({"refinedQuery": "x"}))
        .with_failure(Operation::AssessRelevance, LlmError::Request("offline".into()))
        .with_json(Operation::Synthesize, synthesis(&all))
        .with_response(Operation::FollowUp, "sorry, no JSON today");
    let controller = controller(mock, vec![source]);

    controller.search("Is X effective?", FilterSet::default()).await.unwrap();
    controller.proceed().await.unwrap();

    let err = controller.ask_follow_up("Why?").await.unwrap_err();
    assert!(err.is_retryable());
    assert_eq!(controller.stage(), PipelineStage::Results);
    assert!(controller.result().is_some());
}
