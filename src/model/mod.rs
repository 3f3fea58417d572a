//! Domain types shared by the retrieval pipeline and the layout engine

mod analysis;
mod citation;
mod filters;
mod paper;
mod saved;

pub use analysis::{
    AnalysisResult, ContentionPoint, DisagreementLevel, DisagreementScore, FollowUp, KeyPaper,
    RelatedPaper, SourceCounts, Stance,
};
pub use citation::CitationStyle;
pub use filters::{FilterSet, SourceKind, SourceToggles};
pub use paper::{sort_for_review, Doi, Paper, ReviewSort};
pub use saved::SavedItem;
