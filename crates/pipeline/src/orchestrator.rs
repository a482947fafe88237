//! The orchestrator: one submission, one record, one terminal status.

use std::sync::Arc;
use std::time::Duration;

use mentor_agents::{ExplainerAgent, ParserAgent, SolverAgent, VerifierAgent};
use mentor_common::{
    CandidateSolution, FailureReason, FinalStatus, MentorError, PipelineRecord,
    ProblemSubmission, Result, Verdict,
};
use mentor_llm::ReasoningModel;
use mentor_memory::MemoryStore;
use mentor_retrieval::Retriever;
use mentor_symbolic::SymbolicEngine;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::{PipelineConfig, StageRetry};
use crate::gate::{ConfidenceGate, GateDecision, GateStage};
use crate::review::{ReviewChannel, ReviewDecision, ReviewStage};

/// States of one pipeline run. Terminal states are `Done` and `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Parsing,
    Solving,
    AwaitingReviewSolve,
    Verifying,
    AwaitingReviewVerify,
    Explaining,
    Done,
    Failed,
}

/// Drives the four agents through the fixed stage sequence, owns the
/// escalation state machine, and persists the terminal record.
///
/// `run` never fails at the call surface: every outcome, including
/// exhausted retries and review timeouts, is encoded in the returned
/// record's `final_status` and `failure` fields.
pub struct Orchestrator {
    parser: ParserAgent,
    solver: SolverAgent,
    verifier: VerifierAgent,
    explainer: ExplainerAgent,
    gate: ConfidenceGate,
    memory: Arc<MemoryStore>,
    reviews: Arc<dyn ReviewChannel>,
    retry: StageRetry,
    input_confidence_floor: f32,
    similar_limit: usize,
    review_timeout: Option<Duration>,
}

impl Orchestrator {
    pub fn new(
        model: Arc<dyn ReasoningModel>,
        retriever: Arc<dyn Retriever>,
        symbolic: Arc<dyn SymbolicEngine>,
        memory: Arc<MemoryStore>,
        reviews: Arc<dyn ReviewChannel>,
        config: &PipelineConfig,
    ) -> Self {
        info!(model = model.model_name(), "Initializing pipeline");

        Self {
            parser: ParserAgent::new(model.clone()),
            solver: SolverAgent::new(
                model.clone(),
                retriever,
                symbolic.clone(),
                config.solver.clone(),
            ),
            verifier: VerifierAgent::new(model.clone(), symbolic, config.verifier.clone()),
            explainer: ExplainerAgent::new(model),
            gate: config.gate.clone(),
            memory,
            reviews,
            retry: config.stage_retry.clone(),
            input_confidence_floor: config.input_confidence_floor,
            similar_limit: config.similar_limit,
            review_timeout: config.review_timeout_ms.map(Duration::from_millis),
        }
    }

    /// Run a submission through the full pipeline.
    pub async fn run(&self, submission: ProblemSubmission) -> PipelineRecord {
        self.run_cancellable(submission, CancellationToken::new())
            .await
    }

    /// Like [`Orchestrator::run`], but observes `cancel` at stage
    /// boundaries. An in-flight collaborator call is allowed to complete;
    /// its result is discarded when the next boundary sees the token.
    pub async fn run_cancellable(
        &self,
        submission: ProblemSubmission,
        cancel: CancellationToken,
    ) -> PipelineRecord {
        let mut record = PipelineRecord::new(submission);
        info!(run_id = %record.id, modality = ?record.submission.source_modality, "Run started");

        match self.drive(&mut record, &cancel).await {
            Ok(status) => {
                if !record.is_terminal() {
                    record.resolve(status);
                }
            }
            Err(e) => record.fail(failure_reason_for(&e)),
        }

        // Exactly one append per run, whatever the terminal status: failed
        // runs are logged too, tagged as such, for diagnostics.
        if let Err(e) = self.memory.append(&record).await {
            error!(run_id = %record.id, error = %e, "Failed to persist run record");
            record.failure = Some(FailureReason::Persistence(e.to_string()));
            record.final_status = Some(FinalStatus::Failed);
        }

        info!(
            run_id = %record.id,
            status = ?record.final_status,
            escalated = record.escalated,
            "Run finished"
        );
        record
    }

    async fn drive(
        &self,
        record: &mut PipelineRecord,
        cancel: &CancellationToken,
    ) -> Result<FinalStatus> {
        let mut human_involved = false;
        let mut corrected_text: Option<String> = None;

        // Input gate: low-confidence OCR/transcription goes through the
        // same review path as a low-confidence solve, before parsing.
        if let Some(confidence) = record.submission.input_confidence {
            if confidence < self.input_confidence_floor {
                record.escalated = true;
                match self.await_review(record, ReviewStage::Input).await? {
                    ReviewDecision::Confirm => human_involved = true,
                    ReviewDecision::Correct { content } => {
                        human_involved = true;
                        corrected_text = Some(content);
                    }
                    ReviewDecision::Reject { reason } => {
                        record.fail(FailureReason::ReviewRejected(reason));
                        return Ok(FinalStatus::Failed);
                    }
                }
            }
        }

        self.check_cancelled(record, cancel)?;
        self.enter(record, PipelineState::Parsing);
        let problem = self
            .retry_stage(record, "parse", || {
                self.parser.parse(&record.submission, corrected_text.as_deref())
            })
            .await?;
        record.parsed = Some(problem.clone());

        self.check_cancelled(record, cancel)?;
        self.enter(record, PipelineState::Solving);
        let similar = self
            .memory
            .similar(&problem.canonical_statement, self.similar_limit)
            .await;
        debug!(run_id = %record.id, similar = similar.len(), "Similar problems from memory");

        let mut solution = self
            .retry_stage(record, "solve", || self.solver.solve(&problem, &similar))
            .await?;
        record.solution = Some(solution.clone());

        if self.gate.decide(solution.solver_confidence, GateStage::Solve) == GateDecision::Escalate
        {
            self.enter(record, PipelineState::AwaitingReviewSolve);
            record.escalated = true;
            match self.await_review(record, ReviewStage::Solve).await? {
                ReviewDecision::Confirm => {
                    // Human judgement replaces the solver's estimate
                    // outright; it is not merged.
                    human_involved = true;
                    solution.solver_confidence = 1.0;
                }
                ReviewDecision::Correct { content } => {
                    human_involved = true;
                    solution = CandidateSolution {
                        final_answer: content,
                        derivation: "Supplied by human reviewer.".to_string(),
                        symbolic_check: None,
                        solver_confidence: 1.0,
                    };
                }
                ReviewDecision::Reject { reason } => {
                    record.fail(FailureReason::ReviewRejected(reason));
                    return Ok(FinalStatus::Failed);
                }
            }
            self.enter(record, PipelineState::Solving);
            record.solution = Some(solution.clone());
        }

        self.check_cancelled(record, cancel)?;
        self.enter(record, PipelineState::Verifying);
        let verification = self
            .retry_stage(record, "verify", || {
                self.verifier.verify(&problem, &solution)
            })
            .await?;
        record.verification = Some(verification.clone());

        let gate_decision = self
            .gate
            .decide(verification.verifier_confidence, GateStage::Verify);

        match (verification.verdict, gate_decision) {
            (Verdict::Valid, GateDecision::Proceed) => {}
            (Verdict::Invalid, GateDecision::Proceed) => {
                record.fail(FailureReason::InvalidSolution(verification.notes.clone()));
                return Ok(FinalStatus::Failed);
            }
            _ => {
                self.enter(record, PipelineState::AwaitingReviewVerify);
                record.escalated = true;
                match self.await_review(record, ReviewStage::Verify).await? {
                    ReviewDecision::Confirm => human_involved = true,
                    ReviewDecision::Correct { content } => {
                        human_involved = true;
                        solution.final_answer = content;
                        solution.solver_confidence = 1.0;
                        record.solution = Some(solution.clone());
                    }
                    ReviewDecision::Reject { reason } => {
                        record.fail(FailureReason::ReviewRejected(reason));
                        return Ok(FinalStatus::Failed);
                    }
                }
            }
        }

        self.check_cancelled(record, cancel)?;
        self.enter(record, PipelineState::Explaining);
        // A verified answer is always explained; this stage degrades
        // instead of gating.
        let explanation = self
            .explainer
            .explain(&problem, &solution, &verification)
            .await;
        record.explanation = Some(explanation);

        self.enter(record, PipelineState::Done);
        Ok(if human_involved {
            FinalStatus::HumanResolved
        } else {
            FinalStatus::AutoResolved
        })
    }

    fn enter(&self, record: &PipelineRecord, state: PipelineState) {
        debug!(run_id = %record.id, state = ?state, "Pipeline state");
    }

    fn check_cancelled(&self, record: &PipelineRecord, cancel: &CancellationToken) -> Result<()> {
        if cancel.is_cancelled() {
            warn!(run_id = %record.id, "Run cancelled at stage boundary");
            return Err(MentorError::Cancelled);
        }
        Ok(())
    }

    /// Bounded sequential retry around one stage call. Only transient
    /// collaborator errors are retried; anything else surfaces at once.
    async fn retry_stage<T, Fut>(
        &self,
        record: &PipelineRecord,
        stage: &'static str,
        mut op: impl FnMut() -> Fut,
    ) -> Result<T>
    where
        Fut: std::future::Future<Output = Result<T>>,
    {
        let mut attempt = 1u32;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < self.retry.max_attempts => {
                    let delay = self.retry.delay_ms(attempt);
                    warn!(
                        run_id = %record.id,
                        stage,
                        attempt,
                        max_attempts = self.retry.max_attempts,
                        delay_ms = delay,
                        error = %e,
                        "Stage failed, retrying"
                    );
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                    attempt += 1;
                }
                Err(e) => {
                    if e.is_transient() {
                        warn!(run_id = %record.id, stage, error = %e, "Stage exhausted retries");
                    }
                    return Err(e);
                }
            }
        }
    }

    async fn await_review(
        &self,
        record: &PipelineRecord,
        stage: ReviewStage,
    ) -> Result<ReviewDecision> {
        info!(run_id = %record.id, stage = ?stage, "Escalating to human review");

        // The run holds no collaborator resources while it waits.
        let wait = self.reviews.review(record, stage);
        match self.review_timeout {
            Some(timeout) => tokio::time::timeout(timeout, wait)
                .await
                .map_err(|_| MentorError::ReviewTimeout(timeout.as_millis() as u64))?,
            None => wait.await,
        }
    }
}

fn failure_reason_for(error: &MentorError) -> FailureReason {
    match error {
        MentorError::Input(msg) => FailureReason::UnusableInput(msg.clone()),
        MentorError::ReviewTimeout(ms) => {
            FailureReason::ReviewTimedOut(format!("no decision within {ms} ms"))
        }
        MentorError::Cancelled => FailureReason::Cancelled,
        other => FailureReason::CollaboratorUnavailable(other.to_string()),
    }
}
