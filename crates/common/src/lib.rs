//! Common types shared across Mentor crates.
//!
//! This crate provides the data contracts the pipeline stages exchange,
//! so that agents, memory, and the orchestrator can reference them
//! without circular dependencies.

pub mod error;
pub mod problem;
pub mod record;
pub mod solution;

pub use error::{MentorError, Result};
pub use problem::{Difficulty, ParsedProblem, ProblemSubmission, SourceModality, Topic};
pub use record::{FailureReason, FinalStatus, PipelineRecord};
pub use solution::{
    clamp_confidence, CandidateSolution, Explanation, ExplanationStep, SymbolicCheck,
    SymbolicResult, Verdict, VerificationResult,
};
