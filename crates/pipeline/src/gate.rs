//! Confidence gating between pipeline stages.

use serde::{Deserialize, Serialize};

/// The stage whose output is being gated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateStage {
    Solve,
    Verify,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Proceed,
    Escalate,
}

/// Per-stage confidence thresholds.
///
/// `decide` is a pure function: it holds no state and performs no I/O, so
/// the same inputs always produce the same decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfidenceGate {
    #[serde(default = "default_solve_threshold")]
    pub solve_threshold: f32,

    #[serde(default = "default_verify_threshold")]
    pub verify_threshold: f32,
}

fn default_solve_threshold() -> f32 {
    0.7
}

fn default_verify_threshold() -> f32 {
    0.7
}

impl Default for ConfidenceGate {
    fn default() -> Self {
        Self {
            solve_threshold: default_solve_threshold(),
            verify_threshold: default_verify_threshold(),
        }
    }
}

impl ConfidenceGate {
    pub fn decide(&self, confidence: f32, stage: GateStage) -> GateDecision {
        let threshold = match stage {
            GateStage::Solve => self.solve_threshold,
            GateStage::Verify => self.verify_threshold,
        };
        if confidence >= threshold {
            GateDecision::Proceed
        } else {
            GateDecision::Escalate
        }
    }
}
