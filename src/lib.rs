//! Dialectica: maps where the academic literature disagrees
//!
//! Takes a research question through a multi-stage pipeline and produces a
//! structured map of the disagreement in the literature.
//!
//! # Pipeline
//!
//! - **Refine**: the question becomes a boolean keyword query
//! - **Retrieve**: OpenAlex and Semantic Scholar are searched concurrently,
//!   with query broadening when nothing comes back
//! - **Assess**: every paper is scored for relevance in one batched call
//! - **Review**: the caller curates the pre-selected corpus
//! - **Synthesize**: contention points, stances and research gaps
//! - **Lay out**: papers, contentions and gaps as a layered graph
//!
//! # Example
//!
//! ```no_run
//! use dialectica::{load_config, PipelineController};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config(None)?;
//! let controller = PipelineController::from_config(&config)?;
//! controller.search("Is intermittent fasting effective?", config.filters.clone()).await?;
//! let result = controller.proceed().await?;
//! println!("{}", result.summary);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod layout;
pub mod llm;
pub mod model;
pub mod pipeline;
pub mod sources;

pub use config::{load_config, ConfigError, DialecticaConfig};
pub use layout::{GraphLayout, GraphLayoutEngine, GraphView, NodeId};
pub use llm::{GeminiService, LanguageService, LlmError, MockService};
pub use model::{
    AnalysisResult, CitationStyle, ContentionPoint, Doi, FilterSet, FollowUp, Paper, SavedItem,
    SourceKind, Stance,
};
pub use pipeline::{PipelineController, PipelineError, PipelineStage, UsageStats};
pub use sources::{Retriever, SourceAdapter};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
