//! Cooldown gate: request suppression and change detection around a source.
//!
//! Before a fetch the gate checks, in order:
//! 1. the subject's private marker (set by an earlier private fetch), which
//!    short-circuits with `PrivateProfile`
//! 2. the subject's retry-after timer, claimed atomically so concurrent
//!    callers for one subject cannot both reach the source
//! 3. the source's crawl timer, claimed the same way
//!
//! After a completed fetch it re-arms the retry-after timer on
//! `PrivateProfile` or `TransientError` (marking the subject private for the
//! former), releases it on `Success`, and compares the inventory digest with
//! the last one stored for the subject.
//!
//! Claims taken before dispatch are released if the fetch is dropped
//! mid-flight (cancellation, deadline), so an abandoned call leaves no
//! cooldown state behind.
//!
//! Store failures are logged and ignored: the gate falls back to fetching.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use delivery_state::{ContentDigest, CooldownScope, CooldownStore};
use tokio::time::Instant;

use super::{AssetSource, FetchOutcome};
use crate::config::VerifierConfig;
use crate::domain::Asset;
use crate::metrics::METRICS;
use crate::obs::{emit_gate_suppressed, emit_store_error};

/// Cause reported when a fetch is suppressed by a timer.
pub const COOLING_DOWN: &str = "cooling down";

/// Expiries the gate applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CooldownPolicy {
    pub retry_after: Duration,
    /// Zero disables the crawl rate limit.
    pub crawl_interval: Duration,
    pub hash_ttl: Duration,
    /// Upper bound on how long an in-flight claim for one subject holds.
    pub in_flight: Duration,
}

impl Default for CooldownPolicy {
    fn default() -> Self {
        Self::from(&VerifierConfig::default())
    }
}

impl From<&VerifierConfig> for CooldownPolicy {
    fn from(config: &VerifierConfig) -> Self {
        Self {
            retry_after: config.retry_after(),
            crawl_interval: config.crawl_interval(),
            hash_ttl: config.hash_ttl(),
            in_flight: config.deadline(),
        }
    }
}

/// Outcome of one gated fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatedFetch {
    pub outcome: FetchOutcome,
    /// `Success` whose digest equals the previously stored one.
    pub unchanged: bool,
    /// The underlying source was not called.
    pub suppressed: bool,
}

impl GatedFetch {
    fn passed(outcome: FetchOutcome, unchanged: bool) -> Self {
        Self {
            outcome,
            unchanged,
            suppressed: false,
        }
    }

    fn cooling_down() -> Self {
        Self {
            outcome: FetchOutcome::TransientError(COOLING_DOWN.to_string()),
            unchanged: false,
            suppressed: true,
        }
    }

    /// Replays the private classification recorded inside the window.
    fn still_private() -> Self {
        Self {
            outcome: FetchOutcome::PrivateProfile,
            unchanged: false,
            suppressed: true,
        }
    }
}

/// Digest of an inventory snapshot, independent of the source that produced it.
pub fn inventory_digest(assets: &[Asset]) -> Option<ContentDigest> {
    serde_json::to_vec(assets)
        .ok()
        .map(|bytes| ContentDigest::from_bytes(&bytes))
}

/// Timers armed before dispatch on behalf of one fetch.
///
/// Dropping it with claims still held releases them on the runtime, so a
/// fetch cancelled mid-flight writes no cooldown state.
struct Claims {
    store: Arc<dyn CooldownStore>,
    held: Vec<(CooldownScope, String)>,
}

impl Claims {
    fn new(store: Arc<dyn CooldownStore>) -> Self {
        Self {
            store,
            held: Vec::new(),
        }
    }

    fn hold(&mut self, scope: CooldownScope, key: String) {
        self.held.push((scope, key));
    }

    /// The fetch completed: the claims become ordinary state.
    fn settle(&mut self) {
        self.held.clear();
    }

    async fn release(mut self) {
        let held = std::mem::take(&mut self.held);
        clear_all(self.store.as_ref(), held).await;
    }
}

impl Drop for Claims {
    fn drop(&mut self) {
        if self.held.is_empty() {
            return;
        }
        let held = std::mem::take(&mut self.held);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let store = Arc::clone(&self.store);
                handle.spawn(async move { clear_all(store.as_ref(), held).await });
            }
            Err(_) => tracing::warn!(
                event = "gate.claims_leaked",
                claims = held.len(),
                "no runtime to release cooldown claims; they expire on their own"
            ),
        }
    }
}

async fn clear_all(store: &dyn CooldownStore, held: Vec<(CooldownScope, String)>) {
    for (scope, key) in held {
        if let Err(e) = store.clear_cooldown(scope, &key).await {
            emit_store_error("clear_cooldown", &e);
        }
    }
}

/// Rate-limit and cache wrapper around one [`AssetSource`].
pub struct CooldownGate {
    source: Arc<dyn AssetSource>,
    store: Option<Arc<dyn CooldownStore>>,
    policy: CooldownPolicy,
}

impl CooldownGate {
    pub fn new(
        source: Arc<dyn AssetSource>,
        store: Arc<dyn CooldownStore>,
        policy: CooldownPolicy,
    ) -> Self {
        Self {
            source,
            store: Some(store),
            policy,
        }
    }

    /// Gate without a store: every call reaches the source.
    pub fn ungated(source: Arc<dyn AssetSource>) -> Self {
        Self {
            source,
            store: None,
            policy: CooldownPolicy::default(),
        }
    }

    pub fn source_id(&self) -> &str {
        self.source.id()
    }

    pub fn policy(&self) -> &CooldownPolicy {
        &self.policy
    }

    fn subject_key(&self, identifier: &str) -> String {
        format!("{}:{}", self.source.id(), identifier)
    }

    pub async fn fetch_gated(&self, identifier: &str, deadline: Instant) -> GatedFetch {
        let Some(store) = self.store.as_ref() else {
            METRICS.inc_fetches();
            let outcome = self.source.fetch(identifier, deadline).await;
            return GatedFetch::passed(outcome, false);
        };

        let source_id = self.source.id();
        let subject = self.subject_key(identifier);

        match store.get_cooldown(CooldownScope::Private, &subject).await {
            Ok(true) => {
                METRICS.inc_suppressed();
                emit_gate_suppressed(source_id, identifier, "private");
                return GatedFetch::still_private();
            }
            Ok(false) => {}
            Err(e) => emit_store_error("get_cooldown", &e),
        }

        let mut claims = Claims::new(Arc::clone(store));
        match store
            .try_acquire_cooldown(CooldownScope::RetryAfter, &subject, self.policy.in_flight)
            .await
        {
            Ok(true) => claims.hold(CooldownScope::RetryAfter, subject.clone()),
            Ok(false) => {
                METRICS.inc_suppressed();
                emit_gate_suppressed(source_id, identifier, "retry_after");
                return GatedFetch::cooling_down();
            }
            Err(e) => emit_store_error("try_acquire_cooldown", &e),
        }

        if !self.policy.crawl_interval.is_zero() {
            match store
                .try_acquire_cooldown(CooldownScope::Crawl, source_id, self.policy.crawl_interval)
                .await
            {
                Ok(true) => claims.hold(CooldownScope::Crawl, source_id.to_string()),
                Ok(false) => {
                    claims.release().await;
                    METRICS.inc_suppressed();
                    emit_gate_suppressed(source_id, identifier, "crawl");
                    return GatedFetch::cooling_down();
                }
                Err(e) => emit_store_error("try_acquire_cooldown", &e),
            }
        }

        METRICS.inc_fetches();
        let outcome = self.source.fetch(identifier, deadline).await;
        // The upstream call happened; the crawl slot stays consumed.
        claims.settle();

        match &outcome {
            FetchOutcome::Success(assets) => {
                if let Err(e) = store.clear_cooldown(CooldownScope::RetryAfter, &subject).await {
                    emit_store_error("clear_cooldown", &e);
                }
                let unchanged = self.observe_inventory(store.as_ref(), &subject, assets).await;
                GatedFetch::passed(outcome, unchanged)
            }
            FetchOutcome::PrivateProfile | FetchOutcome::TransientError(_) => {
                if matches!(outcome, FetchOutcome::PrivateProfile) {
                    self.arm(store.as_ref(), CooldownScope::Private, &subject).await;
                }
                self.arm(store.as_ref(), CooldownScope::RetryAfter, &subject).await;
                GatedFetch::passed(outcome, false)
            }
        }
    }

    async fn arm(&self, store: &dyn CooldownStore, scope: CooldownScope, subject: &str) {
        if let Err(e) = store
            .set_cooldown(scope, subject, self.policy.retry_after)
            .await
        {
            emit_store_error("set_cooldown", &e);
        }
    }

    async fn observe_inventory(
        &self,
        store: &dyn CooldownStore,
        subject: &str,
        assets: &[Asset],
    ) -> bool {
        let Some(digest) = inventory_digest(assets) else {
            return false;
        };

        let previous = match store.get_hash(subject).await {
            Ok(previous) => previous,
            Err(e) => {
                emit_store_error("get_hash", &e);
                None
            }
        };
        if let Err(e) = store.set_hash(subject, &digest, self.policy.hash_ttl).await {
            emit_store_error("set_hash", &e);
        }

        let unchanged = previous.as_ref() == Some(&digest);
        if unchanged {
            METRICS.inc_unchanged();
            tracing::debug!(subject = %subject, digest = %digest.short(), "inventory unchanged");
        }
        unchanged
    }
}

#[async_trait]
impl AssetSource for CooldownGate {
    fn id(&self) -> &str {
        self.source.id()
    }

    async fn fetch(&self, identifier: &str, deadline: Instant) -> FetchOutcome {
        self.fetch_gated(identifier, deadline).await.outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::fakes::ScriptedSource;
    use delivery_state::MemoryCooldownStore;

    fn deadline() -> Instant {
        Instant::now() + Duration::from_secs(5)
    }

    #[tokio::test]
    async fn test_ungated_always_calls_source() {
        let source = Arc::new(ScriptedSource::new("steam").default_outcome(FetchOutcome::PrivateProfile));
        let gate = CooldownGate::ungated(source.clone());

        gate.fetch_gated("1", deadline()).await;
        gate.fetch_gated("1", deadline()).await;
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn test_private_is_replayed_inside_window() {
        let source = Arc::new(ScriptedSource::new("steam").default_outcome(FetchOutcome::PrivateProfile));
        let store = Arc::new(MemoryCooldownStore::new());
        let gate = CooldownGate::new(source.clone(), store.clone(), CooldownPolicy::default());

        let first = gate.fetch_gated("1", deadline()).await;
        assert_eq!(first.outcome, FetchOutcome::PrivateProfile);
        assert!(!first.suppressed);

        let second = gate.fetch_gated("1", deadline()).await;
        assert!(second.suppressed);
        assert_eq!(second.outcome, FetchOutcome::PrivateProfile);
        assert_eq!(source.calls(), 1);
        assert!(store
            .get_cooldown(CooldownScope::Private, "steam:1")
            .await
            .unwrap());

        // Other subjects are unaffected.
        gate.fetch_gated("2", deadline()).await;
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn test_transient_suppresses_with_cooling_down() {
        let source = Arc::new(
            ScriptedSource::new("steam").default_outcome(FetchOutcome::TransientError("429".into())),
        );
        let store = Arc::new(MemoryCooldownStore::new());
        let gate = CooldownGate::new(source.clone(), store.clone(), CooldownPolicy::default());

        gate.fetch_gated("1", deadline()).await;
        let second = gate.fetch_gated("1", deadline()).await;
        assert!(second.suppressed);
        assert_eq!(
            second.outcome,
            FetchOutcome::TransientError(COOLING_DOWN.to_string())
        );
        assert_eq!(source.calls(), 1);
        assert!(!store
            .get_cooldown(CooldownScope::Private, "steam:1")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_success_releases_in_flight_claim() {
        let source = Arc::new(
            ScriptedSource::new("steam").default_outcome(FetchOutcome::Success(vec![])),
        );
        let store = Arc::new(MemoryCooldownStore::new());
        let gate = CooldownGate::new(source.clone(), store.clone(), CooldownPolicy::default());

        gate.fetch_gated("1", deadline()).await;
        assert!(!store
            .get_cooldown(CooldownScope::RetryAfter, "steam:1")
            .await
            .unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_crawl_refusal_releases_subject_claim() {
        let source = Arc::new(ScriptedSource::new("steam").default_outcome(FetchOutcome::Success(vec![])));
        let store = Arc::new(MemoryCooldownStore::new());
        let policy = CooldownPolicy {
            crawl_interval: Duration::from_secs(60),
            ..CooldownPolicy::default()
        };
        let gate = CooldownGate::new(source.clone(), store.clone(), policy);

        gate.fetch_gated("1", deadline()).await;
        let refused = gate.fetch_gated("2", deadline()).await;
        assert!(refused.suppressed);
        assert!(!store
            .get_cooldown(CooldownScope::RetryAfter, "steam:2")
            .await
            .unwrap());
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn test_success_reports_unchanged_on_second_look() {
        let source = Arc::new(
            ScriptedSource::new("steam")
                .default_outcome(FetchOutcome::Success(vec![Asset::new("Arcana")])),
        );
        let store = Arc::new(MemoryCooldownStore::new());
        let gate = CooldownGate::new(source.clone(), store, CooldownPolicy::default());

        assert!(!gate.fetch_gated("1", deadline()).await.unchanged);
        assert!(gate.fetch_gated("1", deadline()).await.unchanged);
        assert_eq!(source.calls(), 2);
    }

    #[test]
    fn test_inventory_digest_depends_on_content() {
        let a = inventory_digest(&[Asset::new("Arcana")]);
        let b = inventory_digest(&[Asset::new("Arcana").with_gift_from("x")]);
        assert!(a.is_some());
        assert_ne!(a, b);
    }
}
