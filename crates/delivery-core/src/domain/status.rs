//! Ordered delivery confidence levels.

use serde::{Deserialize, Serialize};

/// Confidence that a delivery happened, weakest first.
///
/// The derived `Ord` follows declaration order, so "keep the best status
/// seen" is a plain `max`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    /// Nothing has been checked yet.
    #[default]
    Pending,
    /// The buyer's inventory could not be observed.
    Private,
    /// The inventory was observed and the item is absent.
    NoHit,
    /// The item (or a container holding it) is present.
    NameVerified,
    /// The item is present and its gift note names the seller.
    SenderVerified,
}

impl DeliveryStatus {
    /// Strongest attainable status.
    pub const MAX: DeliveryStatus = DeliveryStatus::SenderVerified;

    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Pending => "pending",
            DeliveryStatus::Private => "private",
            DeliveryStatus::NoHit => "no_hit",
            DeliveryStatus::NameVerified => "name_verified",
            DeliveryStatus::SenderVerified => "sender_verified",
        }
    }

    /// Numeric rank, 0 for `Pending` up to 4 for `SenderVerified`.
    pub fn rank(&self) -> u8 {
        *self as u8
    }

    /// Whether the item was found in the buyer's inventory.
    pub fn is_verified(&self) -> bool {
        *self >= DeliveryStatus::NameVerified
    }
}

impl std::fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
