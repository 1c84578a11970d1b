//! Data model for delivery verification.
//!
//! Everything here is created fresh per verification call and never mutated
//! afterwards.

pub mod asset;
pub mod error;
pub mod expectation;
pub mod result;
pub mod status;

pub use asset::Asset;
pub use error::{Result, VerifyError};
pub use expectation::DeliveryExpectation;
pub use result::VerificationResult;
pub use status::DeliveryStatus;
