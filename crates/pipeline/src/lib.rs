//! Pipeline orchestration for Mentor.
//!
//! The orchestrator drives one submission through a fixed stage sequence:
//!
//! ```text
//! Submission
//!     │  (input-confidence gate for OCR/audio)
//!     ▼
//! ┌─────────┐    ┌────────┐  gate  ┌──────────┐  gate  ┌───────────┐
//! │ Parsing │ ─► │ Solving│ ─────► │ Verifying│ ─────► │ Explaining│ ─► Done
//! └─────────┘    └────────┘        └──────────┘        └───────────┘
//!                     │ low            │ uncertain /
//!                     ▼ confidence     ▼ low confidence
//!              AwaitingReviewSolve  AwaitingReviewVerify
//! ```
//!
//! Every terminal run, failed ones included, is appended to the memory
//! store exactly once so later submissions can draw on it.

pub mod config;
pub mod gate;
pub mod intake;
pub mod orchestrator;
pub mod review;

pub use config::{PipelineConfig, StageRetry};
pub use gate::{ConfidenceGate, GateDecision, GateStage};
pub use intake::{Intake, TextExtractor};
pub use orchestrator::{Orchestrator, PipelineState};
pub use review::{
    AutoApproveReviews, PendingReviews, ReviewChannel, ReviewDecision, ReviewStage,
};
