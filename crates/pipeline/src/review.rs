//! Human-in-the-loop review channel.
//!
//! Escalation suspends a run until a reviewer supplies a decision. From the
//! run's perspective the wait is a single blocking call; at the system
//! level the reviewer interacts through a separate surface and submits a
//! decision keyed by run id (see [`PendingReviews`]).

use std::collections::HashMap;

use async_trait::async_trait;
use mentor_common::{MentorError, PipelineRecord, Result};
use serde::{Deserialize, Serialize};
use tokio::sync::{oneshot, Mutex};
use tracing::{info, warn};

/// Which gate routed the run to review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStage {
    /// OCR/transcription confidence below the floor, before parsing.
    Input,
    Solve,
    Verify,
}

/// A reviewer's decision for a suspended run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "decision")]
pub enum ReviewDecision {
    /// Accept the staged result as-is.
    Confirm,
    /// Replace the staged result: corrected input text at the input stage,
    /// a corrected final answer at the solve and verify stages.
    Correct { content: String },
    Reject { reason: String },
}

/// The review seam. Blocking from the run's perspective; the orchestrator
/// applies its configured timeout around this call.
#[async_trait]
pub trait ReviewChannel: Send + Sync {
    async fn review(&self, record: &PipelineRecord, stage: ReviewStage) -> Result<ReviewDecision>;
}

/// Confirms everything immediately. For unattended operation where
/// escalation has nowhere to go.
pub struct AutoApproveReviews;

#[async_trait]
impl ReviewChannel for AutoApproveReviews {
    async fn review(&self, record: &PipelineRecord, stage: ReviewStage) -> Result<ReviewDecision> {
        warn!(
            run_id = %record.id,
            stage = ?stage,
            "Auto-approving review; no reviewer is attached"
        );
        Ok(ReviewDecision::Confirm)
    }
}

/// Registry of runs waiting for a human decision.
///
/// `review` parks the run under its id; an external surface calls
/// [`PendingReviews::resolve`] with the run id to release it.
#[derive(Default)]
pub struct PendingReviews {
    waiting: Mutex<HashMap<String, oneshot::Sender<ReviewDecision>>>,
}

impl PendingReviews {
    pub fn new() -> Self {
        Self::default()
    }

    /// Submit a reviewer decision for a waiting run.
    pub async fn resolve(&self, run_id: &str, decision: ReviewDecision) -> Result<()> {
        let sender = self
            .waiting
            .lock()
            .await
            .remove(run_id)
            .ok_or_else(|| MentorError::Review(format!("no pending review for run {run_id}")))?;
        sender
            .send(decision)
            .map_err(|_| MentorError::Review(format!("run {run_id} is no longer waiting")))
    }

    /// Ids of runs currently suspended in review.
    pub async fn pending_runs(&self) -> Vec<String> {
        self.waiting.lock().await.keys().cloned().collect()
    }
}

#[async_trait]
impl ReviewChannel for PendingReviews {
    async fn review(&self, record: &PipelineRecord, stage: ReviewStage) -> Result<ReviewDecision> {
        let (sender, receiver) = oneshot::channel();
        self.waiting
            .lock()
            .await
            .insert(record.id.clone(), sender);

        info!(run_id = %record.id, stage = ?stage, "Run suspended for human review");

        let decision = receiver
            .await
            .map_err(|_| MentorError::Review("review channel closed".into()))?;

        info!(run_id = %record.id, decision = ?decision, "Review decision received");
        Ok(decision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mentor_common::ProblemSubmission;
    use std::sync::Arc;

    fn record() -> PipelineRecord {
        PipelineRecord::new(ProblemSubmission::text("2 + 2"))
    }

    #[tokio::test]
    async fn auto_approve_confirms() {
        let channel = AutoApproveReviews;
        let decision = channel.review(&record(), ReviewStage::Solve).await.unwrap();
        assert_eq!(decision, ReviewDecision::Confirm);
    }

    #[tokio::test]
    async fn pending_review_resolves_by_run_id() {
        let reviews = Arc::new(PendingReviews::new());
        let record = record();
        let run_id = record.id.clone();

        let reviews_clone = reviews.clone();
        let wait = tokio::spawn(async move {
            reviews_clone.review(&record, ReviewStage::Verify).await
        });

        // Wait until the run registers itself.
        while reviews.pending_runs().await.is_empty() {
            tokio::time::sleep(tokio::time::Duration::from_millis(5)).await;
        }
        assert_eq!(reviews.pending_runs().await, vec![run_id.clone()]);

        reviews
            .resolve(&run_id, ReviewDecision::Reject { reason: "wrong".into() })
            .await
            .unwrap();

        let decision = wait.await.unwrap().unwrap();
        assert_eq!(
            decision,
            ReviewDecision::Reject { reason: "wrong".into() }
        );
        assert!(reviews.pending_runs().await.is_empty());
    }

    #[tokio::test]
    async fn resolving_unknown_run_fails() {
        let reviews = PendingReviews::new();
        let err = reviews
            .resolve("nope", ReviewDecision::Confirm)
            .await
            .unwrap_err();
        assert!(matches!(err, MentorError::Review(_)));
    }

    #[test]
    fn decision_serialization_roundtrip() {
        let decision = ReviewDecision::Correct { content: "x = 2".into() };
        let json = serde_json::to_string(&decision).unwrap();
        let back: ReviewDecision = serde_json::from_str(&json).unwrap();
        assert_eq!(back, decision);
    }
}
