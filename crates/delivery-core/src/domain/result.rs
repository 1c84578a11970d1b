//! Verification output.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::asset::Asset;
use super::status::DeliveryStatus;
use crate::matching::MatchOutcome;

/// Final classification of one verification call, with its evidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub status: DeliveryStatus,
    /// Supporting assets in fetch order. Empty for `Private` and `NoHit`.
    pub matched_assets: Vec<Asset>,
    /// Id of the source whose snapshot produced `status`; empty if none.
    pub verified_by: String,
    /// The source returned the same inventory digest as the previous check.
    #[serde(default)]
    pub unchanged: bool,
    pub checked_at: DateTime<Utc>,
}

impl VerificationResult {
    /// Terminal result for an inventory no source could observe.
    pub fn private() -> Self {
        Self {
            status: DeliveryStatus::Private,
            matched_assets: Vec::new(),
            verified_by: String::new(),
            unchanged: false,
            checked_at: Utc::now(),
        }
    }

    pub fn from_match(outcome: MatchOutcome, source_id: impl Into<String>, unchanged: bool) -> Self {
        Self {
            status: outcome.status,
            matched_assets: outcome.matched,
            verified_by: source_id.into(),
            unchanged,
            checked_at: Utc::now(),
        }
    }
}
