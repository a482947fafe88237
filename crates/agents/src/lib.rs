//! The four stage agents of the Mentor pipeline.
//!
//! Each agent is an independent component unified only by its stage
//! contract (`input → output | error`); there is no shared base type.
//! The orchestrator in `mentor-pipeline` drives them in a fixed order:
//!
//! ```text
//! ParserAgent ──► SolverAgent ──► VerifierAgent ──► ExplainerAgent
//!                    │
//!                    ├── Retriever (knowledge snippets)
//!                    ├── SymbolicEngine (closed-form cross-check)
//!                    └── MemoryStore (similar past problems)
//! ```
//!
//! Agents absorb what they can (symbolic parse failures, malformed model
//! JSON) and propagate only what the orchestrator must act on: unusable
//! input, transient collaborator trouble, and permanent model failures.

pub mod explainer;
pub mod output;
pub mod parser;
pub mod solver;
pub mod verifier;

pub use explainer::ExplainerAgent;
pub use parser::ParserAgent;
pub use solver::{SolverAgent, SolverPolicy};
pub use verifier::{VerifierAgent, VerifierPolicy};
