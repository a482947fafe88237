//! Symbolic-computation collaborator for the Mentor pipeline.
//!
//! Deterministic, synchronous, side-effect free: closed-form expressions
//! evaluate to numbers, and low-degree single-variable equations solve to
//! real roots. Anything else is a `MentorError::Symbolic`, which the solver
//! treats as "this problem is not closed-form" rather than as a failure.

pub mod engine;
pub mod equivalence;

pub use engine::{extract_closed_form, ClosedFormEngine, SymbolicEngine};
pub use equivalence::{answer_values, approx_eq, values_match};
