//! Error types for the Mentor pipeline.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MentorError {
    /// The submission carries no usable mathematical content. Fatal, never retried.
    #[error("Unusable input: {0}")]
    Input(String),

    /// A collaborator failed in a way that may succeed on a later attempt
    /// (rate limit, timeout, upstream 5xx).
    #[error("Transient collaborator error: {0}")]
    Transient(String),

    /// A non-retryable reasoning-model failure (bad request, auth, malformed body).
    #[error("Model error: {0}")]
    Model(String),

    /// The symbolic engine could not parse or evaluate an expression.
    /// Expected for non-closed-form problems; absorbed by the solver.
    #[error("Symbolic evaluation error: {0}")]
    Symbolic(String),

    #[error("Retrieval error: {0}")]
    Retrieval(String),

    #[error("Memory error: {0}")]
    Memory(String),

    #[error("Review error: {0}")]
    Review(String),

    #[error("Review timed out after {0} ms")]
    ReviewTimeout(u64),

    #[error("Run cancelled")]
    Cancelled,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl MentorError {
    /// Whether a later attempt at the same operation may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, MentorError::Transient(_))
    }
}

pub type Result<T> = std::result::Result<T, MentorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(MentorError::Transient("429".into()).is_transient());
        assert!(!MentorError::Input("empty".into()).is_transient());
        assert!(!MentorError::Symbolic("unparseable".into()).is_transient());
        assert!(!MentorError::Cancelled.is_transient());
    }

    #[test]
    fn io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: MentorError = io.into();
        assert!(matches!(err, MentorError::Io(_)));
    }
}
