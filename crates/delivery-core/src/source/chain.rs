//! Sequential fallback chain over gated sources.
//!
//! Links are tried strictly in configured order. Precedence when no link
//! answers with `Success`:
//! - any `PrivateProfile` → the chain is private
//! - else, deadline reached → deadline exceeded
//! - else → exhausted (every link failed transiently)
//!
//! A private link never stops the walk; a later link may reach the inventory
//! through a different access path.

use std::ops::ControlFlow;
use std::sync::Arc;

use async_trait::async_trait;
use delivery_state::CooldownStore;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use super::gate::{CooldownGate, CooldownPolicy};
use super::{AssetSource, FetchOutcome};
use crate::domain::Asset;
use crate::obs::emit_source_outcome;

const DEADLINE_CAUSE: &str = "deadline exceeded";

/// One link that did not produce a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFailure {
    pub source_id: String,
    pub cause: String,
}

/// Terminal outcome of a walk in which no link answered with `Success`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainFailure {
    Private,
    DeadlineExceeded { tried: usize },
    Exhausted { tried: usize, last_error: String },
}

/// What happened during one chain walk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChainReport {
    /// Links actually invoked (including gate short-circuits).
    pub tried: usize,
    /// Successful snapshots handed to the visitor.
    pub answered: usize,
    pub private_seen: bool,
    pub deadline_hit: bool,
    pub failures: Vec<SourceFailure>,
}

impl ChainReport {
    fn record_failure(&mut self, source_id: &str, cause: impl Into<String>) {
        self.failures.push(SourceFailure {
            source_id: source_id.to_string(),
            cause: cause.into(),
        });
    }

    /// The walk's terminal failure, or `None` if some link answered.
    pub fn failure(&self) -> Option<ChainFailure> {
        if self.answered > 0 {
            return None;
        }
        if self.private_seen {
            return Some(ChainFailure::Private);
        }
        if self.deadline_hit {
            return Some(ChainFailure::DeadlineExceeded { tried: self.tried });
        }
        let last_error = self
            .failures
            .last()
            .map(|f| format!("{}: {}", f.source_id, f.cause))
            .unwrap_or_else(|| "no sources configured".to_string());
        Some(ChainFailure::Exhausted {
            tried: self.tried,
            last_error,
        })
    }
}

/// Ordered list of gated sources.
///
/// Used as a source itself, the chain reports an id built from its links
/// (`"steam>backpack"`) unless one is set with [`FallbackChain::with_id`].
pub struct FallbackChain {
    id: String,
    named: bool,
    links: Vec<CooldownGate>,
}

fn derived_id(links: &[CooldownGate]) -> String {
    if links.is_empty() {
        return "chain".to_string();
    }
    links
        .iter()
        .map(CooldownGate::source_id)
        .collect::<Vec<_>>()
        .join(">")
}

impl FallbackChain {
    pub fn new(links: Vec<CooldownGate>) -> Self {
        Self {
            id: derived_id(&links),
            named: false,
            links,
        }
    }

    /// Gate every source with the same store and policy.
    pub fn gated(
        sources: Vec<Arc<dyn AssetSource>>,
        store: Arc<dyn CooldownStore>,
        policy: CooldownPolicy,
    ) -> Self {
        Self::new(
            sources
                .into_iter()
                .map(|s| CooldownGate::new(s, Arc::clone(&store), policy))
                .collect(),
        )
    }

    /// Chain whose links reach their sources unconditionally.
    pub fn ungated(sources: Vec<Arc<dyn AssetSource>>) -> Self {
        Self::new(sources.into_iter().map(CooldownGate::ungated).collect())
    }

    /// Override the id this chain reports when used as a source itself.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self.named = true;
        self
    }

    pub fn push(&mut self, link: CooldownGate) {
        self.links.push(link);
        if !self.named {
            self.id = derived_id(&self.links);
        }
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn source_ids(&self) -> Vec<&str> {
        self.links.iter().map(CooldownGate::source_id).collect()
    }

    /// Walk the links in order until `visit` breaks or links run out.
    ///
    /// `visit` receives `(source_id, assets, unchanged)` for each `Success`.
    /// A link still in flight when `deadline` passes is dropped, and it and
    /// every untried link are recorded as deadline failures.
    pub async fn walk<F>(&self, identifier: &str, deadline: Instant, mut visit: F) -> ChainReport
    where
        F: FnMut(&str, &[Asset], bool) -> ControlFlow<()> + Send,
    {
        let mut report = ChainReport::default();

        for (idx, link) in self.links.iter().enumerate() {
            let source_id = link.source_id();
            if Instant::now() >= deadline {
                report.deadline_hit = true;
                for untried in &self.links[idx..] {
                    report.record_failure(untried.source_id(), DEADLINE_CAUSE);
                }
                break;
            }

            report.tried += 1;
            let started = Instant::now();
            let gated =
                match tokio::time::timeout_at(deadline, link.fetch_gated(identifier, deadline))
                    .await
                {
                    Ok(gated) => gated,
                    Err(_elapsed) => {
                        emit_source_outcome(source_id, "deadline", elapsed_ms(started));
                        report.deadline_hit = true;
                        for rest in &self.links[idx..] {
                            report.record_failure(rest.source_id(), DEADLINE_CAUSE);
                        }
                        break;
                    }
                };
            emit_source_outcome(source_id, gated.outcome.kind(), elapsed_ms(started));

            match gated.outcome {
                FetchOutcome::Success(assets) => {
                    report.answered += 1;
                    if visit(source_id, &assets, gated.unchanged).is_break() {
                        break;
                    }
                }
                FetchOutcome::PrivateProfile => {
                    report.private_seen = true;
                    report.record_failure(source_id, "private profile");
                }
                FetchOutcome::TransientError(cause) => {
                    report.record_failure(source_id, cause);
                }
            }
        }

        // A source that gave up at the deadline on its own still counts.
        if Instant::now() >= deadline {
            report.deadline_hit = true;
        }
        report
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

#[async_trait]
impl AssetSource for FallbackChain {
    fn id(&self) -> &str {
        &self.id
    }

    /// First `Success` wins; otherwise the chain's terminal outcome.
    async fn fetch(&self, identifier: &str, deadline: Instant) -> FetchOutcome {
        let mut first: Option<Vec<Asset>> = None;
        let report = self
            .walk(identifier, deadline, |_, assets, _| {
                first = Some(assets.to_vec());
                ControlFlow::Break(())
            })
            .await;

        if let Some(assets) = first {
            return FetchOutcome::Success(assets);
        }
        match report.failure() {
            Some(ChainFailure::Private) => FetchOutcome::PrivateProfile,
            Some(ChainFailure::DeadlineExceeded { .. }) => {
                FetchOutcome::TransientError(DEADLINE_CAUSE.to_string())
            }
            Some(ChainFailure::Exhausted { last_error, .. }) => {
                FetchOutcome::TransientError(last_error)
            }
            None => FetchOutcome::TransientError("chain produced no outcome".to_string()),
        }
    }
}
