//! Stage Contract
//!
//! The mutable state envelope threaded through the pipeline. The contract
//! is single-owner (the dispatcher of the active topology) and handed to
//! each stage in turn; each stage reads the previous stage's output and
//! writes exactly one field.
//!
//! Status is encapsulated so it can only move forward or fail:
//!
//! ```text
//! PENDING -> ANALYZED -> SYNTHESIZED -> PERSISTED
//!    \----------\-----------\---------> FAILED (terminal)
//! ```

use serde::Serialize;
use uuid::Uuid;

// =============================================================================
// Pipeline Status
// =============================================================================

/// Progression marker for one pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PipelineStatus {
    Pending,
    Analyzed,
    Synthesized,
    Persisted,
    Failed,
}

impl PipelineStatus {
    /// Position in the forward progression; Failed sits outside it.
    fn rank(self) -> Option<u8> {
        match self {
            Self::Pending => Some(0),
            Self::Analyzed => Some(1),
            Self::Synthesized => Some(2),
            Self::Persisted => Some(3),
            Self::Failed => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Persisted | Self::Failed)
    }
}

impl std::fmt::Display for PipelineStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Pending => "PENDING",
            Self::Analyzed => "ANALYZED",
            Self::Synthesized => "SYNTHESIZED",
            Self::Persisted => "PERSISTED",
            Self::Failed => "FAILED",
        };
        write!(f, "{name}")
    }
}

// =============================================================================
// Stage Failure
// =============================================================================

/// Terminal failure description: which stage, and why.
#[derive(Debug, Clone, Serialize)]
pub struct StageFailure {
    pub stage: String,
    pub message: String,
}

impl std::fmt::Display for StageFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.stage, self.message)
    }
}

// =============================================================================
// Stage Contract
// =============================================================================

/// Mutable envelope owned by the pipeline dispatcher.
#[derive(Debug, Clone, Serialize)]
pub struct StageContract {
    /// Correlates log lines and the persisted row for this run
    pub run_id: Uuid,
    /// Strategy brief produced by the analysis stage
    pub instructions: Option<String>,
    /// Raw candidate-record text produced by the synthesis stage;
    /// may be malformed until persistence has parsed it
    pub profile: Option<String>,
    /// Human-readable persistence outcome
    pub final_message: Option<String>,
    status: PipelineStatus,
    error: Option<StageFailure>,
}

impl StageContract {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            instructions: None,
            profile: None,
            final_message: None,
            status: PipelineStatus::Pending,
            error: None,
        }
    }

    pub fn status(&self) -> PipelineStatus {
        self.status
    }

    pub fn error(&self) -> Option<&StageFailure> {
        self.error.as_ref()
    }

    /// Advance to the next forward status.
    ///
    /// Only single forward steps are legal; regression, stage skipping,
    /// and movement out of a terminal state are programming errors
    /// surfaced as a failed contract rather than a panic.
    pub fn advance(&mut self, next: PipelineStatus) {
        let legal = match (self.status.rank(), next.rank()) {
            (Some(current), Some(target)) => target == current + 1,
            _ => false,
        };

        if legal {
            self.status = next;
        } else {
            self.fail(
                "contract",
                format!("illegal status transition {} -> {}", self.status, next),
            );
        }
    }

    /// Transition to the terminal Failed state, recording the stage and
    /// reason. Failing an already-terminal contract keeps the first error.
    pub fn fail(&mut self, stage: impl Into<String>, message: impl Into<String>) {
        if self.status.is_terminal() {
            return;
        }
        self.status = PipelineStatus::Failed;
        self.error = Some(StageFailure {
            stage: stage.into(),
            message: message.into(),
        });
    }
}

impl Default for StageContract {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================
