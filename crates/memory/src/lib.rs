//! Append-only memory for the Mentor pipeline.
//!
//! Every terminal pipeline run is logged here, one JSON line per record,
//! and the log doubles as the index for similar-problem lookup: the solver
//! asks for past records whose statements overlap the current one and folds
//! them into its prompt as worked hints.
//!
//! Records are never updated or deleted once appended. Concurrent appends
//! serialize through a write lock; similarity queries read a consistent
//! snapshot and may miss a record that is being appended at the same
//! moment, but never observe a partially written one.

pub mod similarity;
pub mod store;
pub mod types;

pub use store::MemoryStore;
pub use types::{MemoryConfig, MemoryRecord};
