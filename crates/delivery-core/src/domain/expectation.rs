//! The delivery a caller expects to find.

use serde::{Deserialize, Serialize};

use super::error::{Result, VerifyError};

/// Immutable description of one expected gift delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryExpectation {
    /// Seller's current display name. Empty disables sender matching.
    pub seller_display_name: String,
    /// Opaque platform identifier addressing the buyer's inventory.
    pub buyer_identifier: String,
    /// Exact display name of the item that should have arrived.
    pub expected_item_name: String,
}

impl DeliveryExpectation {
    pub fn new(
        seller_display_name: impl Into<String>,
        buyer_identifier: impl Into<String>,
        expected_item_name: impl Into<String>,
    ) -> Self {
        Self {
            seller_display_name: seller_display_name.into(),
            buyer_identifier: buyer_identifier.into(),
            expected_item_name: expected_item_name.into(),
        }
    }

    /// Reject expectations that cannot be checked at all.
    pub fn validate(&self) -> Result<()> {
        if self.buyer_identifier.trim().is_empty() {
            return Err(VerifyError::InvalidExpectation(
                "buyer identifier must not be empty".to_string(),
            ));
        }
        if self.expected_item_name.trim().is_empty() {
            return Err(VerifyError::InvalidExpectation(
                "expected item name must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Whether sender attribution can be checked for this expectation.
    pub fn has_seller(&self) -> bool {
        !self.seller_display_name.trim().is_empty()
    }
}
