//! Candidate solutions, verification verdicts, and explanations.

use serde::{Deserialize, Serialize};

/// Clamp a confidence value into `[0, 1]`, mapping NaN/inf to 0.
pub fn clamp_confidence(confidence: f32) -> f32 {
    if confidence.is_finite() {
        confidence.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Outcome of a deterministic symbolic evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum SymbolicResult {
    /// A plain closed-form expression evaluated to a number.
    Value { value: f64 },

    /// An equation in one variable solved to real roots, ascending.
    Roots { variable: String, values: Vec<f64> },
}

/// A symbolic cross-check attached to a candidate solution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolicCheck {
    /// The expression or equation that was evaluated.
    pub expression: String,

    pub result: SymbolicResult,

    /// Whether the symbolic result agrees with the stated final answer.
    pub agrees: bool,
}

/// Solver output: the proposed answer with its supporting derivation.
///
/// Read-only input to the verifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateSolution {
    pub final_answer: String,

    /// Free-form derivation text from the reasoning model.
    pub derivation: String,

    /// Present when a closed-form expression could be extracted and evaluated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbolic_check: Option<SymbolicCheck>,

    /// Solver self-assessment in `[0, 1]`.
    pub solver_confidence: f32,
}

/// Verifier verdict on a candidate solution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Valid,
    Invalid,
    Uncertain,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationResult {
    pub verdict: Verdict,

    /// Human-readable notes: what was re-derived, issues found.
    pub notes: String,

    /// Agreement strength in `[0, 1]`; independent of the solver's confidence.
    pub verifier_confidence: f32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExplanationStep {
    pub step_number: usize,
    pub text: String,
}

/// Ordered, numbered walkthrough of a verified solution.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Explanation {
    pub steps: Vec<ExplanationStep>,
}

impl Explanation {
    /// Build an explanation from step texts, numbering from 1.
    pub fn from_steps(texts: impl IntoIterator<Item = String>) -> Self {
        let steps = texts
            .into_iter()
            .enumerate()
            .map(|(i, text)| ExplanationStep {
                step_number: i + 1,
                text,
            })
            .collect();
        Self { steps }
    }

    /// A minimal one-step explanation (degraded-mode fallback).
    pub fn single(text: impl Into<String>) -> Self {
        Self {
            steps: vec![ExplanationStep {
                step_number: 1,
                text: text.into(),
            }],
        }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confidence_clamping() {
        assert_eq!(clamp_confidence(0.5), 0.5);
        assert_eq!(clamp_confidence(-0.2), 0.0);
        assert_eq!(clamp_confidence(1.7), 1.0);
        assert_eq!(clamp_confidence(f32::NAN), 0.0);
        assert_eq!(clamp_confidence(f32::INFINITY), 0.0);
    }

    #[test]
    fn explanation_numbering() {
        let exp = Explanation::from_steps(vec!["first".into(), "second".into()]);
        assert_eq!(exp.len(), 2);
        assert_eq!(exp.steps[0].step_number, 1);
        assert_eq!(exp.steps[1].step_number, 2);
    }

    #[test]
    fn single_step_explanation() {
        let exp = Explanation::single("x = 2");
        assert_eq!(exp.len(), 1);
        assert_eq!(exp.steps[0].text, "x = 2");
        assert_eq!(exp.steps[0].step_number, 1);
    }

    #[test]
    fn symbolic_result_roundtrip() {
        let result = SymbolicResult::Roots {
            variable: "x".into(),
            values: vec![2.0],
        };
        let json = serde_json::to_string(&result).unwrap();
        let back: SymbolicResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back, result);
    }

    #[test]
    fn verdict_serializes_snake_case() {
        assert_eq!(serde_json::to_string(&Verdict::Valid).unwrap(), "\"valid\"");
        assert_eq!(
            serde_json::to_string(&Verdict::Uncertain).unwrap(),
            "\"uncertain\""
        );
    }
}
