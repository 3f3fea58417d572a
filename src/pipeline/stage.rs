//! Pipeline stage machine

use serde::{Deserialize, Serialize};

/// Where a failed session returns once the error is dismissed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryStage {
    /// Failure before a corpus existed
    Idle,
    /// Failure during synthesis; corpus and selection are kept
    Reviewing,
}

impl RecoveryStage {
    pub fn stage(self) -> PipelineStage {
        match self {
            RecoveryStage::Idle => PipelineStage::Idle,
            RecoveryStage::Reviewing => PipelineStage::Reviewing,
        }
    }
}

/// Stage of one analysis session.
///
/// Attempts count from 1.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum PipelineStage {
    #[default]
    Idle,
    Standardizing,
    Retrieving { attempt: usize },
    Broadening { attempt: usize },
    Assessing,
    Reviewing,
    Synthesizing,
    Results,
    Failed { message: String, recover_to: RecoveryStage },
}

impl PipelineStage {
    /// Whether `next` is a legal successor of this stage.
    ///
    /// A new search (`Standardizing`), a reset (`Idle`) and a failure are
    /// legal from anywhere.
    pub fn can_transition_to(&self, next: &PipelineStage) -> bool {
        use PipelineStage::*;
        match (self, next) {
            (_, Standardizing) | (_, Idle) | (_, Failed { .. }) => true,
            (Standardizing, Retrieving { attempt }) => *attempt == 1,
            (Retrieving { attempt: a }, Broadening { attempt: b }) => a == b,
            (Retrieving { .. }, Assessing) => true,
            (Broadening { attempt: a }, Retrieving { attempt: b }) => *b == a + 1,
            (Assessing, Reviewing) => true,
            (Reviewing, Synthesizing) => true,
            (Synthesizing, Results) => true,
            (Failed { recover_to, .. }, Reviewing) => *recover_to == RecoveryStage::Reviewing,
            (Idle, _)
            | (Standardizing, _)
            | (Retrieving { .. }, _)
            | (Broadening { .. }, _)
            | (Assessing, _)
            | (Reviewing, _)
            | (Synthesizing, _)
            | (Results, _)
            | (Failed { .. }, _) => false,
        }
    }

    /// A service call is in flight
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            PipelineStage::Standardizing
                | PipelineStage::Retrieving { .. }
                | PipelineStage::Broadening { .. }
                | PipelineStage::Assessing
                | PipelineStage::Synthesizing
        )
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, PipelineStage::Failed { .. })
    }
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineStage::Idle => write!(f, "idle"),
            PipelineStage::Standardizing => write!(f, "standardizing"),
            PipelineStage::Retrieving { attempt } => write!(f, "retrieving (attempt {})", attempt),
            PipelineStage::Broadening { attempt } => write!(f, "broadening (after attempt {})", attempt),
            PipelineStage::Assessing => write!(f, "assessing"),
            PipelineStage::Reviewing => write!(f, "reviewing"),
            PipelineStage::Synthesizing => write!(f, "synthesizing"),
            PipelineStage::Results => write!(f, "results"),
            PipelineStage::Failed { message, .. } => write!(f, "error: {}", message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_is_legal() {
        let path = [
            PipelineStage::Idle,
            PipelineStage::Standardizing,
            PipelineStage::Retrieving { attempt: 1 },
            PipelineStage::Broadening { attempt: 1 },
            PipelineStage::Retrieving { attempt: 2 },
            PipelineStage::Assessing,
            PipelineStage::Reviewing,
            PipelineStage::Synthesizing,
            PipelineStage::Results,
        ];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition_to(&pair[1]), "{} -> {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn skipping_stages_is_illegal() {
        assert!(!PipelineStage::Idle.can_transition_to(&PipelineStage::Synthesizing));
        assert!(!PipelineStage::Assessing.can_transition_to(&PipelineStage::Results));
        assert!(!PipelineStage::Results.can_transition_to(&PipelineStage::Synthesizing));
        assert!(!PipelineStage::Broadening { attempt: 1 }
            .can_transition_to(&PipelineStage::Retrieving { attempt: 3 }));
    }

    #[test]
    fn failure_recovers_to_its_stage() {
        let failed = PipelineStage::Failed {
            message: "boom".into(),
            recover_to: RecoveryStage::Reviewing,
        };
        assert!(failed.can_transition_to(&PipelineStage::Reviewing));
        assert!(PipelineStage::Synthesizing.can_transition_to(&failed));

        let early = PipelineStage::Failed {
            message: "boom".into(),
            recover_to: RecoveryStage::Idle,
        };
        assert!(!early.can_transition_to(&PipelineStage::Reviewing));
        assert!(early.can_transition_to(&PipelineStage::Idle));
    }
}
