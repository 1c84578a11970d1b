//! In-memory cooldown store
//!
//! `MemoryCooldownStore` satisfies the `CooldownStore` contract without any
//! external dependencies. Expiries use `tokio::time::Instant`, so tests running
//! with a paused clock can advance past a TTL deterministically.
//!
//! Expired entries are evicted when read, and every write sweeps the whole
//! map, so the store only holds entries written within the longest TTL.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::cooldown::{ContentDigest, CooldownScope, CooldownStore, StoreResult};
use crate::error::StoreError;

#[derive(Debug, Clone)]
enum Entry {
    Timer,
    Hash(ContentDigest),
}

#[derive(Debug, Clone)]
struct Slot {
    entry: Entry,
    expires_at: Instant,
}

impl Slot {
    fn live(&self, now: Instant) -> bool {
        self.expires_at > now
    }
}

type Slots = HashMap<String, Slot>;

/// In-memory expiring store backed by a `HashMap<namespaced key, Slot>`.
///
/// Every operation holds the map lock for its whole read-modify-write, which
/// makes `try_acquire_cooldown` atomic.
#[derive(Debug, Default)]
pub struct MemoryCooldownStore {
    slots: Mutex<Slots>,
}

impl MemoryCooldownStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries currently held, including expired ones that no read
    /// or write has evicted yet.
    pub fn len(&self) -> usize {
        self.lock().map(|slots| slots.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Slots>> {
        self.slots.lock().map_err(|_| {
            tracing::warn!(event = "store.lock_poisoned", "memory cooldown store lock poisoned");
            StoreError::Backend("memory store lock poisoned".to_string())
        })
    }

    fn hash_key(key: &str) -> String {
        format!("hash:{}", key)
    }
}

fn check_key(key: &str) -> StoreResult<()> {
    if key.trim().is_empty() {
        return Err(StoreError::InvalidKey("key must not be empty".to_string()));
    }
    Ok(())
}

/// Drop every expired entry.
fn sweep(slots: &mut Slots, now: Instant) {
    let before = slots.len();
    slots.retain(|_, slot| slot.live(now));
    let evicted = before - slots.len();
    if evicted > 0 {
        tracing::trace!(evicted, remaining = slots.len(), "swept expired entries");
    }
}

/// Live slot under `name`, evicting it if it has expired.
fn live_slot<'a>(slots: &'a mut Slots, name: &str, now: Instant) -> Option<&'a Slot> {
    if slots.get(name).is_some_and(|slot| !slot.live(now)) {
        slots.remove(name);
    }
    slots.get(name)
}

fn insert(slots: &mut Slots, name: String, entry: Entry, expires_at: Instant, now: Instant) {
    sweep(slots, now);
    slots.insert(name, Slot { entry, expires_at });
}

#[async_trait]
impl CooldownStore for MemoryCooldownStore {
    async fn get_cooldown(&self, scope: CooldownScope, key: &str) -> StoreResult<bool> {
        check_key(key)?;
        let now = Instant::now();
        let mut slots = self.lock()?;
        Ok(live_slot(&mut slots, &scope.namespaced(key), now).is_some())
    }

    async fn set_cooldown(
        &self,
        scope: CooldownScope,
        key: &str,
        ttl: Duration,
    ) -> StoreResult<()> {
        check_key(key)?;
        if ttl.is_zero() {
            return Ok(());
        }
        let now = Instant::now();
        let mut slots = self.lock()?;
        insert(&mut slots, scope.namespaced(key), Entry::Timer, now + ttl, now);
        Ok(())
    }

    async fn try_acquire_cooldown(
        &self,
        scope: CooldownScope,
        key: &str,
        ttl: Duration,
    ) -> StoreResult<bool> {
        check_key(key)?;
        let now = Instant::now();
        let mut slots = self.lock()?;
        let name = scope.namespaced(key);
        if live_slot(&mut slots, &name, now).is_some() {
            return Ok(false);
        }
        if !ttl.is_zero() {
            insert(&mut slots, name, Entry::Timer, now + ttl, now);
        }
        Ok(true)
    }

    async fn clear_cooldown(&self, scope: CooldownScope, key: &str) -> StoreResult<()> {
        check_key(key)?;
        let mut slots = self.lock()?;
        slots.remove(&scope.namespaced(key));
        Ok(())
    }

    async fn get_hash(&self, key: &str) -> StoreResult<Option<ContentDigest>> {
        check_key(key)?;
        let now = Instant::now();
        let mut slots = self.lock()?;
        Ok(
            live_slot(&mut slots, &Self::hash_key(key), now).and_then(|slot| match &slot.entry {
                Entry::Hash(digest) => Some(digest.clone()),
                Entry::Timer => None,
            }),
        )
    }

    async fn set_hash(
        &self,
        key: &str,
        digest: &ContentDigest,
        ttl: Duration,
    ) -> StoreResult<()> {
        check_key(key)?;
        if ttl.is_zero() {
            return Ok(());
        }
        let now = Instant::now();
        let mut slots = self.lock()?;
        insert(
            &mut slots,
            Self::hash_key(key),
            Entry::Hash(digest.clone()),
            now + ttl,
            now,
        );
        Ok(())
    }
}
