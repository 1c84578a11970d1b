//! Verification orchestrator.
//!
//! Drives a [`FallbackChain`] under one deadline, classifies every snapshot
//! it gets, and keeps the strongest status seen:
//!
//! ```text
//! Start ─┬─ all links private ───────────────▶ Private
//!        ├─ snapshot(s) ─▶ classify ─────────▶ NoHit | NameVerified | SenderVerified
//!        ├─ all links transient ─────────────▶ Err(ChainExhausted)   (retryable)
//!        └─ deadline before any snapshot ────▶ Err(DeadlineExceeded) (retryable)
//! ```
//!
//! No state survives between calls except what the cooldown gates persist.

use std::ops::ControlFlow;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tokio::time::Instant;
use tracing::Instrument;

use crate::config::VerifierConfig;
use crate::domain::{
    Asset, DeliveryExpectation, DeliveryStatus, Result, VerificationResult, VerifyError,
};
use crate::matching::{classify, classify_inventory, ContainerCatalog, MatchOutcome, NoContainers};
use crate::metrics::METRICS;
use crate::obs::{
    emit_verification_failed, emit_verification_finished, emit_verification_started,
    verification_span,
};
use crate::source::{ChainFailure, FallbackChain};

/// Best classification seen so far in one walk.
struct Best {
    outcome: MatchOutcome,
    source_id: String,
    unchanged: bool,
}

/// Entry point for delivery and inventory checks.
pub struct DeliveryVerifier {
    chain: Arc<FallbackChain>,
    catalog: Arc<dyn ContainerCatalog>,
    config: VerifierConfig,
}

impl DeliveryVerifier {
    pub fn new(chain: FallbackChain, config: VerifierConfig) -> Self {
        Self {
            chain: Arc::new(chain),
            catalog: Arc::new(NoContainers),
            config,
        }
    }

    /// Use `catalog` to decide which containers hold which items.
    pub fn with_catalog(mut self, catalog: Arc<dyn ContainerCatalog>) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn config(&self) -> &VerifierConfig {
        &self.config
    }

    pub fn chain(&self) -> &FallbackChain {
        &self.chain
    }

    /// Check that `expectation`'s item reached the buyer, and from whom.
    pub async fn verify_delivery(
        &self,
        expectation: &DeliveryExpectation,
    ) -> Result<VerificationResult> {
        expectation.validate()?;
        let ceiling = if expectation.has_seller() {
            DeliveryStatus::SenderVerified
        } else {
            DeliveryStatus::NameVerified
        };
        let catalog = Arc::clone(&self.catalog);
        self.run(
            &expectation.buyer_identifier,
            &expectation.expected_item_name,
            ceiling,
            move |assets| classify(assets, expectation, catalog.as_ref()),
        )
        .await
    }

    /// Check only that the buyer currently holds `item_name`; gift notes are
    /// ignored, so the result never exceeds `NameVerified`.
    pub async fn verify_inventory(
        &self,
        identifier: &str,
        item_name: &str,
    ) -> Result<VerificationResult> {
        DeliveryExpectation::new("", identifier, item_name).validate()?;
        let catalog = Arc::clone(&self.catalog);
        self.run(
            identifier,
            item_name,
            DeliveryStatus::NameVerified,
            move |assets| classify_inventory(assets, item_name, catalog.as_ref()),
        )
        .await
    }

    /// Verify independent deliveries concurrently.
    ///
    /// At most `max_concurrency` run at once; results keep input order.
    pub async fn verify_batch(
        &self,
        expectations: &[DeliveryExpectation],
    ) -> Vec<Result<VerificationResult>> {
        let results: Vec<_> = stream::iter(expectations)
            .map(|expectation| self.verify_delivery(expectation))
            .buffered(self.config.max_concurrency.max(1))
            .collect()
            .await;
        METRICS.flush();
        results
    }

    async fn run<C>(
        &self,
        identifier: &str,
        item_name: &str,
        ceiling: DeliveryStatus,
        classify_snapshot: C,
    ) -> Result<VerificationResult>
    where
        C: Fn(&[Asset]) -> MatchOutcome + Send + Sync,
    {
        if self.chain.is_empty() {
            return Err(VerifyError::EmptyChain);
        }

        let verification_id = uuid::Uuid::new_v4().to_string();
        let span = verification_span(&verification_id, identifier);
        self.walk_and_classify(identifier, item_name, ceiling, classify_snapshot)
            .instrument(span)
            .await
    }

    async fn walk_and_classify<C>(
        &self,
        identifier: &str,
        item_name: &str,
        ceiling: DeliveryStatus,
        classify_snapshot: C,
    ) -> Result<VerificationResult>
    where
        C: Fn(&[Asset]) -> MatchOutcome + Send + Sync,
    {
        emit_verification_started(identifier, item_name, self.chain.len());
        let started = Instant::now();
        let deadline = started + self.config.deadline();
        let escalate = self.config.escalate;

        let mut best: Option<Best> = None;
        let report = self
            .chain
            .walk(identifier, deadline, |source_id, assets, unchanged| {
                let outcome = classify_snapshot(assets);
                tracing::debug!(
                    source = %source_id,
                    status = %outcome.status,
                    matched = outcome.matched.len(),
                    "snapshot classified"
                );
                // Strictly greater: the earliest source wins ties.
                if best
                    .as_ref()
                    .map_or(true, |b| outcome.status > b.outcome.status)
                {
                    best = Some(Best {
                        outcome,
                        source_id: source_id.to_string(),
                        unchanged,
                    });
                }
                let reached = best
                    .as_ref()
                    .is_some_and(|b| b.outcome.status >= ceiling);
                if reached || !escalate {
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                }
            })
            .await;

        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        if let Some(best) = best {
            let result = VerificationResult::from_match(best.outcome, best.source_id, best.unchanged);
            METRICS.inc_completed();
            emit_verification_finished(result.status, &result.verified_by, elapsed_ms);
            return Ok(result);
        }

        let err = match report.failure() {
            Some(ChainFailure::Private) => {
                let result = VerificationResult::private();
                METRICS.inc_completed();
                emit_verification_finished(result.status, &result.verified_by, elapsed_ms);
                return Ok(result);
            }
            Some(ChainFailure::DeadlineExceeded { tried }) => VerifyError::DeadlineExceeded {
                deadline_ms: self.config.deadline_ms,
                tried,
            },
            Some(ChainFailure::Exhausted { tried, last_error }) => {
                VerifyError::ChainExhausted { tried, last_error }
            }
            None => VerifyError::ChainExhausted {
                tried: report.tried,
                last_error: "no snapshot was classified".to_string(),
            },
        };
        METRICS.inc_failed();
        emit_verification_failed(&err, err.is_retryable());
        Err(err)
    }
}
