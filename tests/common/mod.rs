//! Shared fixtures for pipeline scenario tests
//!
//! Stub bibliographic sources and canned language-service payloads, so the
//! full pipeline runs without network access.

#![allow(dead_code)]

use async_trait::async_trait;
use dialectica::model::{FilterSet, Paper, SourceKind};
use dialectica::SourceAdapter;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::sync::Notify;

pub fn paper(doi: &str) -> Paper {
    Paper::new(
        doi,
        format!("Study {}", doi),
        vec!["Maria Garcia".to_string(), "Wei Chen".to_string()],
        2019,
        format!("Abstract of {}", doi),
    )
}

pub fn dois(range: std::ops::Range<usize>) -> Vec<String> {
    range.map(|i| format!("10.5555/p{}", i)).collect()
}

/// Source returning a fixed list, optionally parked on its first call
/// until released.
pub struct StubSource {
    kind: SourceKind,
    papers: Vec<Paper>,
    calls: AtomicUsize,
    queries: Mutex<Vec<String>>,
    gate: Option<Gate>,
}

pub struct Gate {
    pub started: Notify,
    pub release: Notify,
}

impl StubSource {
    pub fn new(kind: SourceKind, dois: &[String]) -> Self {
        Self {
            kind,
            papers: dois.iter().map(|d| paper(d)).collect(),
            calls: AtomicUsize::new(0),
            queries: Mutex::new(Vec::new()),
            gate: None,
        }
    }

    /// Park the first fetch until `gate().release` is notified
    pub fn gated(mut self) -> Self {
        self.gate = Some(Gate {
            started: Notify::new(),
            release: Notify::new(),
        });
        self
    }

    pub fn gate(&self) -> &Gate {
        self.gate.as_ref().expect("source is not gated")
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl SourceAdapter for StubSource {
    fn kind(&self) -> SourceKind {
        self.kind
    }

    async fn fetch(&self, query: &str, _filters: &FilterSet) -> Vec<Paper> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        self.queries.lock().unwrap().push(query.to_string());
        if let (Some(gate), 0) = (&self.gate, call) {
            gate.started.notify_one();
            gate.release.notified().await;
        }
        self.papers.clone()
    }
}

/// Relevance payload scoring `relevant` 4 and `irrelevant` 2
pub fn assessments(relevant: &[String], irrelevant: &[String]) -> Value {
    let entry = |doi: &String, score: u8| {
        json!({
            "doi": doi,
            "isRelevant": score >= 3,
            "score": score,
            "relevanceJustification": format!("Scored {}", score)
        })
    };
    let items: Vec<Value> = relevant
        .iter()
        .map(|d| entry(d, 4))
        .chain(irrelevant.iter().map(|d| entry(d, 2)))
        .collect();
    json!({ "assessments": items })
}

/// Synthesis payload with two contention points over `dois`
pub fn synthesis(dois: &[String]) -> Value {
    let half = dois.len() / 2;
    let related = |slice: &[String]| -> Vec<Value> {
        slice.iter().map(|d| json!({"doi": d, "relevance": 4})).collect()
    };
    json!({
        "summary": "The literature splits on dosage and on long-term outcomes.",
        "disagreementScore": {"score": 7, "qualitative": "Significant disagreement"},
        "keyPapers": [{"paper": paper(&dois[0]), "rationale": "Largest trial"}],
        "contentionPoints": [
            {
                "topic": "Optimal dosage",
                "stances": [
                    {"id": "s1", "summary": "Low dose suffices", "quote": "low doses were sufficient", "paper": paper(&dois[0])}
                ],
                "relatedPapers": related(&dois[..half])
            },
            {
                "topic": "Long-term outcomes",
                "stances": [],
                "relatedPapers": related(&dois[half..])
            }
        ],
        "researchGaps": ["Dosage in older adults", "Outcomes beyond five years"],
        "papers": []
    })
}
