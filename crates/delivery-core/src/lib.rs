//! Delivery Verification Engine
//!
//! Confirms that a marketplace gift delivery happened by checking the buyer's
//! public inventory for the expected item and the seller's gift note.
//!
//! Data flow:
//!
//! ```text
//! caller → DeliveryVerifier → FallbackChain → CooldownGate → AssetSource
//!                     ↓
//!              matching::classify → VerificationResult
//! ```

pub mod config;
pub mod domain;
pub mod matching;
pub mod metrics;
pub mod obs;
pub mod source;
pub mod telemetry;
pub mod verifier;

pub use config::{ConfigError, VerifierConfig};
pub use domain::{
    Asset, DeliveryExpectation, DeliveryStatus, Result, VerificationResult, VerifyError,
};
pub use matching::{
    classify, classify_inventory, normalize_name, sender_matches, ContainerCatalog, MatchOutcome,
    NoContainers, StaticContainerCatalog,
};
pub use metrics::METRICS;
pub use obs::{
    emit_gate_suppressed, emit_source_outcome, emit_store_error, emit_verification_failed,
    emit_verification_finished, emit_verification_started, verification_span,
};
pub use source::{
    AssetSource, ChainFailure, ChainReport, CooldownGate, CooldownPolicy, FallbackChain,
    FetchOutcome, GatedFetch, SourceFailure,
};
pub use telemetry::{init_tracing, init_tracing_from};
pub use verifier::DeliveryVerifier;

pub use delivery_state::{ContentDigest, CooldownScope, CooldownStore, MemoryCooldownStore};

/// Engine version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
