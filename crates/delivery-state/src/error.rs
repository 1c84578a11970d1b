//! Error types for delivery-state

use thiserror::Error;

/// Errors that can occur in the cooldown/cache layer
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The backing store could not be reached or rejected the operation
    #[error("cooldown store backend failed: {0}")]
    Backend(String),

    /// A stored hash was not a valid SHA-256 hex digest
    #[error("invalid content digest: {digest}")]
    InvalidDigest { digest: String },

    /// A key was empty or otherwise unusable
    #[error("invalid cooldown key: {0}")]
    InvalidKey(String),
}
