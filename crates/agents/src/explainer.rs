//! Explainer agent: expand a verified solution into numbered steps.

use std::sync::Arc;

use mentor_common::{CandidateSolution, Explanation, ParsedProblem, VerificationResult};
use mentor_llm::{CompletionRequest, ReasoningModel};
use tracing::{debug, warn};

use crate::output::parse_numbered_steps;

const EXPLAINER_SYSTEM_PROMPT: &str = r#"You are a patient mathematics teacher. Explain the solution to a student, step by step.

Rules:
- Number every step: "1. ...", "2. ...", and so on.
- Each step should be one clear idea.
- Use plain ASCII math notation.
- End by restating the final answer."#;

/// Produces the student-facing explanation.
///
/// This stage never fails the pipeline: the answer is already verified by
/// the time it runs, so a degraded one-step explanation beats failing the
/// whole run over presentation.
pub struct ExplainerAgent {
    model: Arc<dyn ReasoningModel>,
}

impl ExplainerAgent {
    pub fn new(model: Arc<dyn ReasoningModel>) -> Self {
        Self { model }
    }

    pub async fn explain(
        &self,
        problem: &ParsedProblem,
        solution: &CandidateSolution,
        verification: &VerificationResult,
    ) -> Explanation {
        let prompt = format!(
            "Problem:\n{}\n\nDerivation:\n{}\n\nVerified answer: {}\nVerification notes: {}",
            problem.canonical_statement,
            solution.derivation,
            solution.final_answer,
            verification.notes,
        );
        let request = CompletionRequest::single_turn(EXPLAINER_SYSTEM_PROMPT, prompt);

        match self.model.complete(request).await {
            Ok(completion) => {
                let mut steps = parse_numbered_steps(&completion.text);
                if steps.is_empty() {
                    // The model answered but skipped the numbering; treat
                    // each non-empty line as a step.
                    steps = completion
                        .text
                        .lines()
                        .map(str::trim)
                        .filter(|l| !l.is_empty())
                        .map(String::from)
                        .collect();
                }
                if steps.is_empty() {
                    warn!("Empty explanation from model, falling back to final answer");
                    return Explanation::single(solution.final_answer.clone());
                }

                debug!(steps = steps.len(), "Generated explanation");
                Explanation::from_steps(steps)
            }
            Err(e) => {
                warn!(error = %e, "Explanation generation failed, falling back to final answer");
                Explanation::single(solution.final_answer.clone())
            }
        }
    }
}
