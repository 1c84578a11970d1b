//! Inventory sources and their composition.
//!
//! # Modules
//!
//! - [`gate`]: `CooldownGate`, which applies retry-after, crawl rate limits and change detection
//! - [`chain`]: `FallbackChain`, ordered gated links, first success wins
//! - [`fakes`]: `ScriptedSource` for tests

pub mod chain;
pub mod fakes;
pub mod gate;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::domain::Asset;

pub use chain::{ChainFailure, ChainReport, FallbackChain, SourceFailure};
pub use gate::{CooldownGate, CooldownPolicy, GatedFetch};

/// Result of one source invocation.
///
/// `PrivateProfile` is a terminal observation ("cannot see"), distinct from
/// an empty `Success` ("saw nothing") and from `TransientError` ("try later").
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Success(Vec<Asset>),
    PrivateProfile,
    TransientError(String),
}

impl FetchOutcome {
    pub fn kind(&self) -> &'static str {
        match self {
            FetchOutcome::Success(_) => "success",
            FetchOutcome::PrivateProfile => "private",
            FetchOutcome::TransientError(_) => "transient_error",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, FetchOutcome::Success(_))
    }
}

/// A mechanism for fetching one inventory snapshot.
///
/// Implementations must be safe to call concurrently for different
/// identifiers, must give up by `deadline`, and must report a private
/// inventory as `PrivateProfile` rather than as an error.
#[async_trait]
pub trait AssetSource: Send + Sync {
    /// Stable identifier used for provenance and cooldown keys.
    fn id(&self) -> &str;

    async fn fetch(&self, identifier: &str, deadline: Instant) -> FetchOutcome;
}
