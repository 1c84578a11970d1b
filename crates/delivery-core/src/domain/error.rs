//! Verification error taxonomy.
//!
//! A private profile is not an error: it is the `Private` status on a
//! successful result. Individual source failures never surface here either;
//! only the chain-level aggregate does.

/// Errors returned to callers of the verification engine.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VerifyError {
    #[error("invalid expectation: {0}")]
    InvalidExpectation(String),

    #[error("no inventory sources configured")]
    EmptyChain,

    #[error("all {tried} inventory source(s) failed, last error: {last_error}")]
    ChainExhausted { tried: usize, last_error: String },

    #[error("verification deadline of {deadline_ms}ms exceeded after {tried} source(s)")]
    DeadlineExceeded { deadline_ms: u64, tried: usize },
}

impl VerifyError {
    /// Whether the caller should schedule a later re-check.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            VerifyError::ChainExhausted { .. } | VerifyError::DeadlineExceeded { .. }
        )
    }
}

/// Result type for verification operations.
pub type Result<T> = std::result::Result<T, VerifyError>;
