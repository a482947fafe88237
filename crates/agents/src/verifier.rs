//! Verifier agent: independent re-derivation of a candidate solution.

use std::sync::Arc;

use mentor_common::{
    clamp_confidence, CandidateSolution, ParsedProblem, Result, SymbolicResult, Verdict,
    VerificationResult,
};
use mentor_llm::{CompletionRequest, ReasoningModel};
use mentor_symbolic::{answer_values, extract_closed_form, values_match, SymbolicEngine};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::output::extract_final_answer;

const VERIFIER_SYSTEM_PROMPT: &str = r#"You are a mathematics verifier. Solve the given problem yourself, from scratch, without assuming any provided answer is correct.

Rules:
- Work independently; do not just confirm what you are given.
- Use plain ASCII math notation.
- End with a line of the form "Final answer: <answer>"."#;

/// Verdict policy for the verifier.
///
/// The confidence attached to each verdict reflects agreement strength
/// only; the solver's own confidence never feeds into it. A symbolic
/// re-check is deterministic and outranks a second model pass, which is why
/// its disagreements fail runs outright while model-vs-model disagreements
/// stay below the gate threshold and escalate instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifierPolicy {
    /// Numeric tolerance for answer equivalence.
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,

    /// Confidence of a symbolic re-check verdict (either direction).
    #[serde(default = "default_symbolic_confidence")]
    pub symbolic_confidence: f32,

    /// Confidence when an independent model pass agrees numerically.
    #[serde(default = "default_numeric_agreement_confidence")]
    pub numeric_agreement_confidence: f32,

    /// Confidence when the answers only match as normalized text.
    #[serde(default = "default_text_agreement_confidence")]
    pub text_agreement_confidence: f32,

    /// Confidence when two model passes disagree (kept below the gate
    /// threshold so a human decides).
    #[serde(default = "default_disagreement_confidence")]
    pub disagreement_confidence: f32,

    /// Confidence when re-derivation fails entirely.
    #[serde(default = "default_uncertain_confidence")]
    pub uncertain_confidence: f32,
}

fn default_tolerance() -> f64 {
    1e-6
}

fn default_symbolic_confidence() -> f32 {
    0.95
}

fn default_numeric_agreement_confidence() -> f32 {
    0.85
}

fn default_text_agreement_confidence() -> f32 {
    0.7
}

fn default_disagreement_confidence() -> f32 {
    0.6
}

fn default_uncertain_confidence() -> f32 {
    0.3
}

impl Default for VerifierPolicy {
    fn default() -> Self {
        Self {
            tolerance: default_tolerance(),
            symbolic_confidence: default_symbolic_confidence(),
            numeric_agreement_confidence: default_numeric_agreement_confidence(),
            text_agreement_confidence: default_text_agreement_confidence(),
            disagreement_confidence: default_disagreement_confidence(),
            uncertain_confidence: default_uncertain_confidence(),
        }
    }
}

/// Re-checks candidate solutions: symbolically when the problem is fully
/// symbolic, via an independent differently-prompted model pass otherwise.
pub struct VerifierAgent {
    model: Arc<dyn ReasoningModel>,
    symbolic: Arc<dyn SymbolicEngine>,
    policy: VerifierPolicy,
}

impl VerifierAgent {
    pub fn new(
        model: Arc<dyn ReasoningModel>,
        symbolic: Arc<dyn SymbolicEngine>,
        policy: VerifierPolicy,
    ) -> Self {
        Self {
            model,
            symbolic,
            policy,
        }
    }

    pub async fn verify(
        &self,
        problem: &ParsedProblem,
        solution: &CandidateSolution,
    ) -> Result<VerificationResult> {
        if let Some(result) = self.symbolic_recheck(problem, solution) {
            return Ok(result);
        }
        self.model_recheck(problem, solution).await
    }

    /// Deterministic path: when the statement itself is closed-form,
    /// re-solve it with the symbolic engine and compare.
    fn symbolic_recheck(
        &self,
        problem: &ParsedProblem,
        solution: &CandidateSolution,
    ) -> Option<VerificationResult> {
        let expression = extract_closed_form(&problem.canonical_statement)?;
        let result = match self.symbolic.evaluate(&expression) {
            Ok(result) => result,
            Err(e) => {
                debug!(error = %e, "Symbolic re-check unavailable, deferring to model pass");
                return None;
            }
        };

        let expected = match &result {
            SymbolicResult::Roots { values, .. } => values.clone(),
            SymbolicResult::Value { value } => vec![*value],
        };
        let stated = answer_values(&solution.final_answer);
        let agrees = values_match(&stated, &expected, self.policy.tolerance);

        let confidence = clamp_confidence(self.policy.symbolic_confidence);
        let (verdict, notes) = if agrees {
            (
                Verdict::Valid,
                format!("Symbolic re-check of `{expression}` confirms {}", solution.final_answer),
            )
        } else {
            (
                Verdict::Invalid,
                format!(
                    "Symbolic re-check of `{expression}` yields {expected:?}, stated answer was `{}`",
                    solution.final_answer
                ),
            )
        };

        info!(verdict = ?verdict, confidence, "Symbolic verification complete");

        Some(VerificationResult {
            verdict,
            notes,
            verifier_confidence: confidence,
        })
    }

    /// Heuristic path: a second, differently-prompted derivation compared
    /// against the candidate under numeric tolerance.
    async fn model_recheck(
        &self,
        problem: &ParsedProblem,
        solution: &CandidateSolution,
    ) -> Result<VerificationResult> {
        let request = CompletionRequest::single_turn(
            VERIFIER_SYSTEM_PROMPT,
            problem.canonical_statement.clone(),
        )
        .with_temperature(0.0);

        let completion = match self.model.complete(request).await {
            Ok(completion) => completion,
            Err(e) if e.is_transient() => return Err(e),
            Err(e) => {
                debug!(error = %e, "Re-derivation failed, verdict uncertain");
                return Ok(VerificationResult {
                    verdict: Verdict::Uncertain,
                    notes: format!("Independent re-derivation failed: {e}"),
                    verifier_confidence: clamp_confidence(self.policy.uncertain_confidence),
                });
            }
        };

        let Some(re_answer) = extract_final_answer(&completion.text) else {
            return Ok(VerificationResult {
                verdict: Verdict::Uncertain,
                notes: "Independent re-derivation produced no usable answer".into(),
                verifier_confidence: clamp_confidence(self.policy.uncertain_confidence),
            });
        };

        let stated = answer_values(&solution.final_answer);
        let rederived = answer_values(&re_answer);

        let result = if !stated.is_empty() && !rederived.is_empty() {
            if values_match(&stated, &rederived, self.policy.tolerance) {
                VerificationResult {
                    verdict: Verdict::Valid,
                    notes: format!("Independent re-derivation agrees: {re_answer}"),
                    verifier_confidence: clamp_confidence(
                        self.policy.numeric_agreement_confidence,
                    ),
                }
            } else {
                VerificationResult {
                    verdict: Verdict::Invalid,
                    notes: format!(
                        "Independent re-derivation got `{re_answer}`, stated answer was `{}`",
                        solution.final_answer
                    ),
                    verifier_confidence: clamp_confidence(self.policy.disagreement_confidence),
                }
            }
        } else if normalize_text(&re_answer) == normalize_text(&solution.final_answer) {
            VerificationResult {
                verdict: Verdict::Valid,
                notes: format!("Re-derivation matches textually: {re_answer}"),
                verifier_confidence: clamp_confidence(self.policy.text_agreement_confidence),
            }
        } else {
            VerificationResult {
                verdict: Verdict::Uncertain,
                notes: format!(
                    "Answers are not numerically comparable: `{re_answer}` vs `{}`",
                    solution.final_answer
                ),
                verifier_confidence: clamp_confidence(self.policy.uncertain_confidence),
            }
        };

        info!(
            verdict = ?result.verdict,
            confidence = result.verifier_confidence,
            "Model verification complete"
        );

        Ok(result)
    }
}

fn normalize_text(s: &str) -> String {
    s.to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use mentor_common::{Difficulty, MentorError, ProblemSubmission, Topic};
    use mentor_llm::Completion;
    use mentor_symbolic::ClosedFormEngine;

    struct StubModel {
        response: Result<String>,
    }

    #[async_trait]
    impl ReasoningModel for StubModel {
        async fn complete(&self, _request: CompletionRequest) -> Result<Completion> {
            match &self.response {
                Ok(text) => Ok(Completion {
                    text: text.clone(),
                    model: "stub".to_string(),
                    usage: None,
                    finish_reason: None,
                }),
                Err(MentorError::Transient(msg)) => Err(MentorError::Transient(msg.clone())),
                Err(e) => Err(MentorError::Model(e.to_string())),
            }
        }
        fn model_name(&self) -> &str {
            "stub"
        }
    }

    fn problem(statement: &str) -> ParsedProblem {
        ParsedProblem {
            canonical_statement: statement.to_string(),
            topic: Topic::Algebra,
            difficulty: Difficulty::Medium,
            original: ProblemSubmission::text(statement),
        }
    }

    fn candidate(answer: &str) -> CandidateSolution {
        CandidateSolution {
            final_answer: answer.to_string(),
            derivation: "derivation".to_string(),
            symbolic_check: None,
            solver_confidence: 0.8,
        }
    }

    fn verifier(response: Result<String>) -> VerifierAgent {
        VerifierAgent::new(
            Arc::new(StubModel { response }),
            Arc::new(ClosedFormEngine::new()),
            VerifierPolicy::default(),
        )
    }

    #[tokio::test]
    async fn symbolic_recheck_confirms_correct_answer() {
        let agent = verifier(Ok("unused".into()));
        let result = agent
            .verify(&problem("Solve x^2 - 4x + 4 = 0"), &candidate("x = 2"))
            .await
            .unwrap();

        assert_eq!(result.verdict, Verdict::Valid);
        assert!(result.verifier_confidence >= 0.9);
        assert!(result.notes.contains("x^2 - 4x + 4 = 0"));
    }

    #[tokio::test]
    async fn symbolic_recheck_rejects_wrong_answer() {
        let agent = verifier(Ok("unused".into()));
        let result = agent
            .verify(&problem("Solve x^2 - 4x + 4 = 0"), &candidate("x = 5"))
            .await
            .unwrap();

        assert_eq!(result.verdict, Verdict::Invalid);
        assert!(result.verifier_confidence >= 0.9);
    }

    #[tokio::test]
    async fn model_recheck_agreement_is_valid() {
        let agent = verifier(Ok("Speed = 60 / 0.75.\nFinal answer: 80 km/h".into()));
        let result = agent
            .verify(
                &problem("A train travels 60 km in 45 minutes; find its speed in km/h"),
                &candidate("80 km/h"),
            )
            .await
            .unwrap();

        assert_eq!(result.verdict, Verdict::Valid);
        assert!(result.verifier_confidence >= 0.7);
    }

    #[tokio::test]
    async fn model_recheck_disagreement_stays_below_threshold() {
        let agent = verifier(Ok("Final answer: 75 km/h".into()));
        let result = agent
            .verify(
                &problem("A train travels 60 km in 45 minutes; find its speed in km/h"),
                &candidate("80 km/h"),
            )
            .await
            .unwrap();

        assert_eq!(result.verdict, Verdict::Invalid);
        assert!(result.verifier_confidence < 0.7);
    }

    #[tokio::test]
    async fn failed_rederivation_is_uncertain() {
        let agent = verifier(Err(MentorError::Model("400 bad request".into())));
        let result = agent
            .verify(&problem("An open-ended word problem about trains"), &candidate("80"))
            .await
            .unwrap();

        assert_eq!(result.verdict, Verdict::Uncertain);
        assert!(result.verifier_confidence <= 0.4);
    }

    #[tokio::test]
    async fn transient_failure_propagates() {
        let agent = verifier(Err(MentorError::Transient("503".into())));
        let err = agent
            .verify(&problem("word problem"), &candidate("80"))
            .await
            .unwrap_err();
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn non_numeric_answers_compare_textually() {
        let agent = verifier(Ok("Final answer: no real solutions".into()));
        let result = agent
            .verify(
                &problem("Does x^2 + 1 = 0 have real solutions?"),
                &candidate("No real solutions"),
            )
            .await
            .unwrap();

        assert_eq!(result.verdict, Verdict::Valid);
    }
}
