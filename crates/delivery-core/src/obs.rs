//! Structured observability hooks for the verification lifecycle.
//!
//! This module provides:
//! - A verification-scoped span via [`verification_span`]
//! - Emission functions for key events: start, per-source outcome, gate
//!   suppression, store failure, finish and failure
//!
//! Events are emitted at `info!` level except suppressions (`debug!`) and
//! failures (`warn!`). Configure output with [`crate::telemetry::init_tracing`].

use tracing::{debug, info, warn};

use crate::domain::DeliveryStatus;

/// Span tagging every event of one verification call.
///
/// Attach it with `tracing::Instrument::instrument` so it follows the future
/// across await points.
pub fn verification_span(verification_id: &str, subject: &str) -> tracing::Span {
    tracing::info_span!(
        "delivery.verify",
        verification_id = %verification_id,
        subject = %subject
    )
}

/// Emit event: verification started.
///
/// # Example
///
/// ```ignore
/// emit_verification_started("7656119...", "Cannonroar Confessor", 3);
/// // logs: event=verify.started subject=7656119... item=Cannonroar Confessor sources=3
/// ```
pub fn emit_verification_started(subject: &str, item: &str, sources: usize) {
    info!(event = "verify.started", subject = %subject, item = %item, sources = sources);
}

/// Emit event: one source in the chain produced an outcome.
pub fn emit_source_outcome(source_id: &str, outcome: &str, elapsed_ms: u64) {
    info!(
        event = "source.outcome",
        source = %source_id,
        outcome = %outcome,
        elapsed_ms = elapsed_ms,
    );
}

/// Emit event: a gate short-circuited a fetch.
pub fn emit_gate_suppressed(source_id: &str, subject: &str, reason: &str) {
    debug!(event = "gate.suppressed", source = %source_id, subject = %subject, reason = %reason);
}

/// Emit event: the cooldown store failed; the gate continues without it.
pub fn emit_store_error(operation: &str, error: &dyn std::fmt::Display) {
    warn!(event = "gate.store_error", operation = %operation, error = %error);
}

/// Emit event: verification produced a result.
pub fn emit_verification_finished(status: DeliveryStatus, verified_by: &str, elapsed_ms: u64) {
    info!(
        event = "verify.finished",
        status = %status,
        verified_by = %verified_by,
        elapsed_ms = elapsed_ms,
    );
}

/// Emit event: verification returned an error (warning level).
pub fn emit_verification_failed(error: &dyn std::fmt::Display, retryable: bool) {
    warn!(event = "verify.failed", error = %error, retryable = retryable);
}
