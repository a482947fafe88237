//! The aggregate record of one pipeline run.

use crate::problem::{ParsedProblem, ProblemSubmission};
use crate::solution::{CandidateSolution, Explanation, VerificationResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Terminal status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinalStatus {
    /// Every gate passed automatically.
    AutoResolved,
    /// A human reviewer supplied or confirmed a decision along the way.
    HumanResolved,
    Failed,
}

/// Why a run ended in `Failed`. Kept for diagnostics on persisted records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "detail")]
pub enum FailureReason {
    UnusableInput(String),
    /// A collaborator kept failing after bounded retries.
    CollaboratorUnavailable(String),
    /// The verifier confidently rejected the candidate solution.
    InvalidSolution(String),
    ReviewRejected(String),
    ReviewTimedOut(String),
    Cancelled,
    /// The terminal record could not be persisted.
    Persistence(String),
}

/// Aggregate result of one pipeline run.
///
/// Created when the run starts; each stage fills in its section as it
/// completes. `final_status` is set exactly once, at termination, and
/// `Orchestrator::run` never returns a record without it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineRecord {
    /// Run identifier; reviewers key their decisions on it.
    pub id: String,

    pub created_at: DateTime<Utc>,

    pub submission: ProblemSubmission,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub parsed: Option<ParsedProblem>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub solution: Option<CandidateSolution>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification: Option<VerificationResult>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<Explanation>,

    /// Whether any stage routed through human review.
    #[serde(default)]
    pub escalated: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureReason>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_status: Option<FinalStatus>,
}

impl PipelineRecord {
    pub fn new(submission: ProblemSubmission) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            submission,
            parsed: None,
            solution: None,
            verification: None,
            explanation: None,
            escalated: false,
            failure: None,
            final_status: None,
        }
    }

    /// Mark the run resolved. Must be called at most once.
    pub fn resolve(&mut self, status: FinalStatus) {
        debug_assert!(self.final_status.is_none(), "run already terminal");
        self.final_status = Some(status);
    }

    /// Mark the run failed, keeping whatever partial stages completed.
    pub fn fail(&mut self, reason: FailureReason) {
        self.failure = Some(reason);
        self.final_status = Some(FinalStatus::Failed);
    }

    pub fn is_terminal(&self) -> bool {
        self.final_status.is_some()
    }
}
