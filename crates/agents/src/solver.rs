//! Solver agent: derivation plus confidence, grounded in retrieval and
//! cross-checked symbolically.

use std::sync::Arc;

use mentor_common::{
    clamp_confidence, CandidateSolution, MentorError, ParsedProblem, Result, SymbolicCheck,
    SymbolicResult,
};
use mentor_llm::{CompletionRequest, ReasoningModel};
use mentor_memory::MemoryRecord;
use mentor_retrieval::{RetrievedSnippet, Retriever};
use mentor_symbolic::{answer_values, extract_closed_form, values_match, SymbolicEngine};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::output::extract_final_answer;

const SOLVER_SYSTEM_PROMPT: &str = r#"You are an expert mathematics tutor. Solve the given problem step by step.

Rules:
- Show your derivation clearly, one step per line.
- Use plain ASCII math notation (^ for powers, * for multiplication).
- End with a line of the form "Final answer: <answer>".
- If reference material or previously solved problems are provided, use them to ground your approach."#;

/// Confidence policy for the solver.
///
/// The exact combination formula is deliberately configuration, not a
/// constant: symbolic agreement is strong evidence, disagreement is strong
/// counter-evidence, and an answer the engine could not check stays capped
/// below the auto-proceed threshold so it always routes past a human.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolverPolicy {
    /// Confidence when the symbolic engine confirms the stated answer.
    #[serde(default = "default_agreement_confidence")]
    pub agreement_confidence: f32,

    /// Confidence when the symbolic engine contradicts the stated answer.
    #[serde(default = "default_disagreement_confidence")]
    pub disagreement_confidence: f32,

    /// Baseline for an answer that is free text only.
    #[serde(default = "default_freeform_baseline")]
    pub freeform_baseline: f32,

    /// Ceiling applied when no symbolic check was possible.
    #[serde(default = "default_unverified_cap")]
    pub unverified_cap: f32,

    /// Numeric tolerance when comparing stated and symbolic values.
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,

    /// Knowledge snippets to retrieve per problem.
    #[serde(default = "default_max_snippets")]
    pub max_snippets: usize,

    /// Prior similar solutions to fold into the prompt.
    #[serde(default = "default_max_similar")]
    pub max_similar: usize,
}

fn default_agreement_confidence() -> f32 {
    0.95
}

fn default_disagreement_confidence() -> f32 {
    0.35
}

fn default_freeform_baseline() -> f32 {
    0.75
}

fn default_unverified_cap() -> f32 {
    0.6
}

fn default_tolerance() -> f64 {
    1e-6
}

fn default_max_snippets() -> usize {
    4
}

fn default_max_similar() -> usize {
    3
}

impl Default for SolverPolicy {
    fn default() -> Self {
        Self {
            agreement_confidence: default_agreement_confidence(),
            disagreement_confidence: default_disagreement_confidence(),
            freeform_baseline: default_freeform_baseline(),
            unverified_cap: default_unverified_cap(),
            tolerance: default_tolerance(),
            max_snippets: default_max_snippets(),
            max_similar: default_max_similar(),
        }
    }
}

/// Produces a [`CandidateSolution`] for a parsed problem.
pub struct SolverAgent {
    model: Arc<dyn ReasoningModel>,
    retriever: Arc<dyn Retriever>,
    symbolic: Arc<dyn SymbolicEngine>,
    policy: SolverPolicy,
}

impl SolverAgent {
    pub fn new(
        model: Arc<dyn ReasoningModel>,
        retriever: Arc<dyn Retriever>,
        symbolic: Arc<dyn SymbolicEngine>,
        policy: SolverPolicy,
    ) -> Self {
        Self {
            model,
            retriever,
            symbolic,
            policy,
        }
    }

    /// Solve a problem, consulting retrieval for grounding and memory for
    /// prior similar solutions. The only side effect is the retriever query.
    pub async fn solve(
        &self,
        problem: &ParsedProblem,
        similar: &[MemoryRecord],
    ) -> Result<CandidateSolution> {
        let context = self
            .retriever
            .retrieve(&problem.canonical_statement, self.policy.max_snippets)
            .await?;

        let prompt = self.build_prompt(problem, &context, similar);
        let request =
            CompletionRequest::single_turn(SOLVER_SYSTEM_PROMPT, prompt).with_temperature(0.2);
        let completion = self.model.complete(request).await?;

        let derivation = completion.text.trim().to_string();
        if derivation.is_empty() {
            return Err(MentorError::Model("empty derivation from model".into()));
        }
        let final_answer = extract_final_answer(&derivation)
            .ok_or_else(|| MentorError::Model("no answer in derivation".into()))?;

        let (symbolic_check, solver_confidence) = self.cross_check(problem, &final_answer);

        info!(
            answer = %final_answer,
            confidence = solver_confidence,
            symbolically_checked = symbolic_check.is_some(),
            "Produced candidate solution"
        );

        Ok(CandidateSolution {
            final_answer,
            derivation,
            symbolic_check,
            solver_confidence,
        })
    }

    /// Try to confirm the stated answer with the symbolic engine. A parse
    /// or evaluation failure is not an error: the answer simply stays
    /// unverified, with its confidence capped accordingly.
    fn cross_check(
        &self,
        problem: &ParsedProblem,
        final_answer: &str,
    ) -> (Option<SymbolicCheck>, f32) {
        let unverified =
            clamp_confidence(self.policy.freeform_baseline.min(self.policy.unverified_cap));

        let Some(expression) = extract_closed_form(&problem.canonical_statement) else {
            debug!("No closed form in statement, skipping symbolic check");
            return (None, unverified);
        };

        match self.symbolic.evaluate(&expression) {
            Ok(result) => {
                let symbolic_values = match &result {
                    SymbolicResult::Roots { values, .. } => values.clone(),
                    SymbolicResult::Value { value } => vec![*value],
                };
                let stated = answer_values(final_answer);
                let agrees = values_match(&stated, &symbolic_values, self.policy.tolerance);

                let confidence = clamp_confidence(if agrees {
                    self.policy.agreement_confidence
                } else {
                    self.policy.disagreement_confidence
                });

                debug!(
                    expression = %expression,
                    agrees,
                    confidence,
                    "Symbolic cross-check complete"
                );

                (
                    Some(SymbolicCheck {
                        expression,
                        result,
                        agrees,
                    }),
                    confidence,
                )
            }
            Err(e) => {
                debug!(error = %e, "Symbolic check unavailable, using capped confidence");
                (None, unverified)
            }
        }
    }

    fn build_prompt(
        &self,
        problem: &ParsedProblem,
        context: &[RetrievedSnippet],
        similar: &[MemoryRecord],
    ) -> String {
        let mut sections = vec![format!(
            "Problem ({}, {:?}):\n{}",
            problem.topic.as_str(),
            problem.difficulty,
            problem.canonical_statement
        )];

        if !context.is_empty() {
            let snippets = context
                .iter()
                .map(|s| format!("- {}", s.snippet))
                .collect::<Vec<_>>()
                .join("\n");
            sections.push(format!("Reference material:\n{snippets}"));
        }

        let hints: Vec<String> = similar
            .iter()
            .take(self.policy.max_similar)
            .filter_map(|record| {
                let solution = record.record.solution.as_ref()?;
                Some(format!(
                    "- Problem: {}\n  Answer: {}",
                    record.statement(),
                    solution.final_answer
                ))
            })
            .collect();
        if !hints.is_empty() {
            sections.push(format!("Previously solved similar problems:\n{}", hints.join("\n")));
        }

        sections.join("\n\n")
    }
}
