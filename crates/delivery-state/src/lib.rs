//! Delivery-State: Cooldown and Inventory-Hash Store
//!
//! This crate provides the only persistence seam of the delivery verification
//! engine. It holds the rate-limit timers and inventory content hashes that
//! must survive between verification calls.
//!
//! ## Layer 0 - Data/Persistence
//!
//! Focus: expiring keys, atomic check-then-set, backend substitution.
//!
//! ## Key Components
//!
//! - `CooldownStore`: async capability any expiring key/value backend implements
//! - `CooldownScope`: the timer namespaces (retry-after, private, crawl)
//! - `ContentDigest`: SHA-256 fingerprint of an inventory snapshot
//! - `fakes::MemoryCooldownStore`: in-process store for tests and single-node use

pub mod cooldown;
mod error;
pub mod fakes;

pub use cooldown::{ContentDigest, CooldownScope, CooldownStore, StoreResult};
pub use error::StoreError;
pub use fakes::MemoryCooldownStore;
