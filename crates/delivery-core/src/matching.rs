//! Asset matching and confidence classification.
//!
//! Pure, synchronous functions: given the assets of one successful fetch and
//! what the caller expects, decide how strongly the snapshot supports the
//! delivery and which assets are the evidence.
//!
//! Matching tiers:
//! 1. name: the asset is the expected item, or a container the
//!    [`ContainerCatalog`] says includes it
//! 2. sender: a name-matched asset's gift note names the seller

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::domain::{Asset, DeliveryExpectation, DeliveryStatus};

// ---------------------------------------------------------------------------
// Container catalog
// ---------------------------------------------------------------------------

/// Lookup answering "does container X include item Y".
///
/// Bundle contents are catalog knowledge the inventory snapshot does not
/// carry, so the predicate is injected.
pub trait ContainerCatalog: Send + Sync {
    fn includes(&self, container: &str, item: &str) -> bool;
}

/// Catalog that knows no containers. Container assets never match.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoContainers;

impl ContainerCatalog for NoContainers {
    fn includes(&self, _container: &str, _item: &str) -> bool {
        false
    }
}

/// Fixed container → item-names table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StaticContainerCatalog {
    bundles: HashMap<String, HashSet<String>>,
}

impl StaticContainerCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or extend) a container's contents.
    pub fn with_bundle<I, S>(mut self, container: impl Into<String>, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.bundles
            .entry(container.into())
            .or_default()
            .extend(items.into_iter().map(Into::into));
        self
    }

    pub fn len(&self) -> usize {
        self.bundles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bundles.is_empty()
    }
}

impl ContainerCatalog for StaticContainerCatalog {
    fn includes(&self, container: &str, item: &str) -> bool {
        self.bundles
            .get(container.trim())
            .is_some_and(|items| items.contains(item.trim()))
    }
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Status plus the assets that support it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchOutcome {
    pub status: DeliveryStatus,
    /// Evidence in inventory fetch order.
    pub matched: Vec<Asset>,
}

impl MatchOutcome {
    fn no_hit() -> Self {
        Self {
            status: DeliveryStatus::NoHit,
            matched: Vec::new(),
        }
    }
}

/// Lowercase, trim and collapse internal whitespace.
pub fn normalize_name(raw: &str) -> String {
    raw.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Whether a gift note attributes the item to `seller`.
///
/// Gift notes capture the sender's name at send time, so a note that merely
/// contains the seller's current name also counts. An empty note or an empty
/// seller never matches.
pub fn sender_matches(gift_from: &str, seller: &str) -> bool {
    let note = normalize_name(gift_from);
    let seller = normalize_name(seller);
    if note.is_empty() || seller.is_empty() {
        return false;
    }
    note == seller || note.contains(&seller)
}

fn name_matches(asset: &Asset, item_name: &str, catalog: &dyn ContainerCatalog) -> bool {
    let item = item_name.trim();
    if asset.name.trim() == item {
        return true;
    }
    asset.is_container && catalog.includes(&asset.name, item)
}

/// Name-only tier: `NoHit` or `NameVerified`.
pub fn classify_inventory(
    assets: &[Asset],
    item_name: &str,
    catalog: &dyn ContainerCatalog,
) -> MatchOutcome {
    let matched: Vec<Asset> = assets
        .iter()
        .filter(|asset| name_matches(asset, item_name, catalog))
        .cloned()
        .collect();

    if matched.is_empty() {
        return MatchOutcome::no_hit();
    }
    MatchOutcome {
        status: DeliveryStatus::NameVerified,
        matched,
    }
}

/// Full classification against a delivery expectation.
///
/// When any name-matched asset names the seller, the evidence narrows to
/// exactly those assets. An empty seller name caps the result at
/// `NameVerified`.
pub fn classify(
    assets: &[Asset],
    expectation: &DeliveryExpectation,
    catalog: &dyn ContainerCatalog,
) -> MatchOutcome {
    let by_name = classify_inventory(assets, &expectation.expected_item_name, catalog);
    if by_name.status != DeliveryStatus::NameVerified || !expectation.has_seller() {
        return by_name;
    }

    let by_sender: Vec<Asset> = by_name
        .matched
        .iter()
        .filter(|asset| sender_matches(&asset.gift_from, &expectation.seller_display_name))
        .cloned()
        .collect();

    if by_sender.is_empty() {
        return by_name;
    }
    MatchOutcome {
        status: DeliveryStatus::SenderVerified,
        matched: by_sender,
    }
}
