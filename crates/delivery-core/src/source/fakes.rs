//! Scripted inventory source (testing only)
//!
//! `ScriptedSource` replays queued outcomes per identifier, falls back to a
//! default outcome, can simulate latency, and counts its invocations so tests
//! can assert how often a gate let calls through.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use super::{AssetSource, FetchOutcome};

#[derive(Debug)]
pub struct ScriptedSource {
    id: String,
    default: FetchOutcome,
    scripts: Mutex<HashMap<String, VecDeque<FetchOutcome>>>,
    per_identifier: Mutex<HashMap<String, usize>>,
    calls: AtomicUsize,
    latency: Duration,
}

impl ScriptedSource {
    /// Source answering `Success([])` for every identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            default: FetchOutcome::Success(Vec::new()),
            scripts: Mutex::new(HashMap::new()),
            per_identifier: Mutex::new(HashMap::new()),
            calls: AtomicUsize::new(0),
            latency: Duration::ZERO,
        }
    }

    /// Outcome returned once an identifier's script is exhausted.
    pub fn default_outcome(mut self, outcome: FetchOutcome) -> Self {
        self.default = outcome;
        self
    }

    /// Queue outcomes for one identifier, consumed in order.
    pub fn script<I>(self, identifier: impl Into<String>, outcomes: I) -> Self
    where
        I: IntoIterator<Item = FetchOutcome>,
    {
        lock(&self.scripts)
            .entry(identifier.into())
            .or_default()
            .extend(outcomes);
        self
    }

    /// Simulated upstream latency per call.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Total invocations that reached this source.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn calls_for(&self, identifier: &str) -> usize {
        lock(&self.per_identifier)
            .get(identifier)
            .copied()
            .unwrap_or(0)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl AssetSource for ScriptedSource {
    fn id(&self) -> &str {
        &self.id
    }

    async fn fetch(&self, identifier: &str, deadline: Instant) -> FetchOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *lock(&self.per_identifier)
            .entry(identifier.to_string())
            .or_insert(0) += 1;

        if !self.latency.is_zero() {
            let ready_at = Instant::now() + self.latency;
            if ready_at > deadline {
                tokio::time::sleep_until(deadline).await;
                return FetchOutcome::TransientError("deadline exceeded".to_string());
            }
            tokio::time::sleep_until(ready_at).await;
        }

        let scripted = lock(&self.scripts)
            .get_mut(identifier)
            .and_then(VecDeque::pop_front);
        scripted.unwrap_or_else(|| self.default.clone())
    }
}
