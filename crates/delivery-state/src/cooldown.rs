//! Cooldown/cache capability definitions
//!
//! Timers kept per inventory source:
//! - `RetryAfter`: suppresses re-querying one subject while a fetch for it is
//!   in flight and right after a failed or private fetch
//! - `Private`: marks a subject whose last fetch saw a private inventory
//! - `Crawl`: rate-limits the aggregate query rate against one source
//!
//! Alongside the timers, the store keeps the last observed inventory digest
//! per subject so callers can detect "unchanged since last check".
//!
//! All methods are async and backend-agnostic. An in-memory implementation
//! lives in the `fakes` module.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::error::StoreError;

/// Result type for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

// ---------------------------------------------------------------------------
// ContentDigest
// ---------------------------------------------------------------------------

/// Inventory snapshot digest (SHA-256 hex string).
///
/// The inner field is private so the string is always lowercase hex produced
/// by `from_bytes` or validated via `TryFrom<String>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentDigest(String);

impl ContentDigest {
    /// Compute the SHA-256 digest of the given bytes.
    pub fn from_bytes(data: &[u8]) -> Self {
        use sha2::Digest;
        let mut hasher = Sha256::new();
        hasher.update(data);
        ContentDigest(hex::encode(hasher.finalize()))
    }

    /// Return the full hex string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short form (first 12 hex chars).
    pub fn short(&self) -> &str {
        &self.0[..12.min(self.0.len())]
    }
}

impl TryFrom<String> for ContentDigest {
    type Error = StoreError;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        if s.len() != 64 || !s.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(StoreError::InvalidDigest { digest: s });
        }
        Ok(ContentDigest(s.to_ascii_lowercase()))
    }
}

impl std::fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// CooldownScope
// ---------------------------------------------------------------------------

/// Namespace of a cooldown timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CooldownScope {
    /// Per (source, subject) suppression after a failed or private fetch.
    RetryAfter,
    /// Per (source, subject) marker: the last fetch saw a private inventory.
    Private,
    /// Per source rate limit on total query volume.
    Crawl,
}

impl CooldownScope {
    /// Stable key prefix used by backends that share one flat keyspace.
    pub fn prefix(&self) -> &'static str {
        match self {
            CooldownScope::RetryAfter => "retry_after",
            CooldownScope::Private => "private",
            CooldownScope::Crawl => "crawl",
        }
    }

    /// Render the namespaced key for `key` within this scope.
    pub fn namespaced(&self, key: &str) -> String {
        format!("{}:{}", self.prefix(), key)
    }
}

impl std::fmt::Display for CooldownScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.prefix())
    }
}

// ---------------------------------------------------------------------------
// CooldownStore
// ---------------------------------------------------------------------------

/// Expiring key/value capability backing the cooldown gate.
///
/// Guarantees:
/// - A zero `ttl` never arms a timer or stores a hash.
/// - Expired entries behave exactly like absent ones.
/// - `try_acquire_cooldown` is atomic per (scope, key): of any number of
///   concurrent callers on an idle key, exactly one observes `true`.
#[async_trait]
pub trait CooldownStore: Send + Sync {
    /// Whether a timer is currently active for (scope, key).
    async fn get_cooldown(&self, scope: CooldownScope, key: &str) -> StoreResult<bool>;

    /// Arm (or re-arm) the timer for (scope, key).
    async fn set_cooldown(&self, scope: CooldownScope, key: &str, ttl: Duration)
        -> StoreResult<()>;

    /// Arm the timer only if none is active. Returns `true` when this call
    /// armed it.
    async fn try_acquire_cooldown(
        &self,
        scope: CooldownScope,
        key: &str,
        ttl: Duration,
    ) -> StoreResult<bool>;

    /// Disarm the timer for (scope, key). No-op if absent.
    async fn clear_cooldown(&self, scope: CooldownScope, key: &str) -> StoreResult<()>;

    /// Last stored inventory digest for `key`, if still live.
    async fn get_hash(&self, key: &str) -> StoreResult<Option<ContentDigest>>;

    /// Store the inventory digest for `key` with the given expiry.
    async fn set_hash(&self, key: &str, digest: &ContentDigest, ttl: Duration)
        -> StoreResult<()>;
}
