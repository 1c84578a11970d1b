//! Global atomic counters for verification observability.
//!
//! Counters are incremented silently at the call site. Call
//! [`Metrics::flush`] to emit current values as a single
//! `tracing::info!` event (e.g. at the end of a batch).

use std::sync::atomic::{AtomicU64, Ordering};

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

/// Lock-free atomic counters.
pub struct Metrics {
    fetches_dispatched: AtomicU64,
    fetches_suppressed: AtomicU64,
    inventories_unchanged: AtomicU64,
    verifications_completed: AtomicU64,
    verifications_failed: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            fetches_dispatched: AtomicU64::new(0),
            fetches_suppressed: AtomicU64::new(0),
            inventories_unchanged: AtomicU64::new(0),
            verifications_completed: AtomicU64::new(0),
            verifications_failed: AtomicU64::new(0),
        }
    }

    /// A gate let a fetch through to its source.
    pub fn inc_fetches(&self) {
        self.fetches_dispatched.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "fetches_dispatched", "counter incremented");
    }

    /// A gate short-circuited a fetch because of an active cooldown.
    pub fn inc_suppressed(&self) {
        self.fetches_suppressed.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "fetches_suppressed", "counter incremented");
    }

    pub fn inc_unchanged(&self) {
        self.inventories_unchanged.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "inventories_unchanged", "counter incremented");
    }

    pub fn inc_completed(&self) {
        self.verifications_completed.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "verifications_completed", "counter incremented");
    }

    pub fn inc_failed(&self) {
        self.verifications_failed.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "verifications_failed", "counter incremented");
    }

    /// Emit all current counter values as a single `info!` event.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            fetches_dispatched = self.fetches_dispatched(),
            fetches_suppressed = self.fetches_suppressed(),
            inventories_unchanged = self.inventories_unchanged(),
            verifications_completed = self.verifications_completed(),
            verifications_failed = self.verifications_failed(),
        );
    }

    pub fn fetches_dispatched(&self) -> u64 {
        self.fetches_dispatched.load(Ordering::Relaxed)
    }

    pub fn fetches_suppressed(&self) -> u64 {
        self.fetches_suppressed.load(Ordering::Relaxed)
    }

    pub fn inventories_unchanged(&self) -> u64 {
        self.inventories_unchanged.load(Ordering::Relaxed)
    }

    pub fn verifications_completed(&self) -> u64 {
        self.verifications_completed.load(Ordering::Relaxed)
    }

    pub fn verifications_failed(&self) -> u64 {
        self.verifications_failed.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_counters_increment() {
        let m = Metrics::new();
        m.inc_fetches();
        m.inc_fetches();
        m.inc_suppressed();
        m.inc_failed();
        assert_eq!(m.fetches_dispatched(), 2);
        assert_eq!(m.fetches_suppressed(), 1);
        assert_eq!(m.verifications_failed(), 1);
        assert_eq!(m.verifications_completed(), 0);
        m.flush();
    }
}
