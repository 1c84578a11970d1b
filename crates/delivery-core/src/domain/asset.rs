//! Inventory asset as observed in one snapshot.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// A single (possibly stacked) item instance found in an inventory snapshot.
///
/// Empty strings mean "no data recorded on the item". They never stand in for
/// a failed fetch; that is what [`crate::source::FetchOutcome`] is for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    /// Display name of the item, or of the container bundling it.
    pub name: String,
    /// True when this asset bundles the target item rather than being it.
    #[serde(default)]
    pub is_container: bool,
    /// Sender attribution from the gift note.
    #[serde(default)]
    pub gift_from: String,
    /// Receive date as recorded on the item.
    #[serde(default)]
    pub date_received: String,
    /// Free-text gift message.
    #[serde(default)]
    pub dedication: String,
    /// Stack size, always at least 1.
    #[serde(default = "one", deserialize_with = "at_least_one")]
    pub quantity: u32,
}

fn one() -> u32 {
    1
}

fn at_least_one<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(u32::deserialize(deserializer)?.max(1))
}

impl Asset {
    /// Plain single-quantity asset with no gift note.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_container: false,
            gift_from: String::new(),
            date_received: String::new(),
            dedication: String::new(),
            quantity: 1,
        }
    }

    pub fn container(name: impl Into<String>) -> Self {
        Self {
            is_container: true,
            ..Self::new(name)
        }
    }

    pub fn with_gift_from(mut self, sender: impl Into<String>) -> Self {
        self.gift_from = sender.into();
        self
    }

    pub fn with_date_received(mut self, date: impl Into<String>) -> Self {
        self.date_received = date.into();
        self
    }

    pub fn with_dedication(mut self, message: impl Into<String>) -> Self {
        self.dedication = message.into();
        self
    }

    /// Set the stack size. Zero is clamped to 1.
    pub fn with_quantity(mut self, quantity: u32) -> Self {
        self.quantity = quantity.max(1);
        self
    }

    /// Whether the item carries any gift attribution.
    pub fn has_gift_note(&self) -> bool {
        !self.gift_from.trim().is_empty()
    }

    /// Parse `date_received` as RFC 3339 or a bare `YYYY-MM-DD` date.
    ///
    /// Returns `None` for empty or unrecognised values.
    pub fn received_at(&self) -> Option<DateTime<Utc>> {
        let raw = self.date_received.trim();
        if raw.is_empty() {
            return None;
        }
        if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
            return Some(ts.with_timezone(&Utc));
        }
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|naive| naive.and_utc())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantity_never_zero() {
        assert_eq!(Asset::new("x").with_quantity(0).quantity, 1);

        let parsed: Asset = serde_json::from_str(r#"{"name":"x","quantity":0}"#).unwrap();
        assert_eq!(parsed.quantity, 1);

        let defaulted: Asset = serde_json::from_str(r#"{"name":"x"}"#).unwrap();
        assert_eq!(defaulted.quantity, 1);
        assert_eq!(defaulted.gift_from, "");
    }

    #[test]
    fn test_received_at_formats() {
        let rfc = Asset::new("x").with_date_received("2023-04-01T10:00:00Z");
        assert!(rfc.received_at().is_some());

        let date = Asset::new("x").with_date_received("2023-04-01");
        assert_eq!(
            date.received_at().map(|d| d.to_rfc3339()),
            Some("2023-04-01T00:00:00+00:00".to_string())
        );

        assert!(Asset::new("x").received_at().is_none());
        assert!(Asset::new("x")
            .with_date_received("last tuesday")
            .received_at()
            .is_none());
    }

    #[test]
    fn test_gift_note_presence() {
        assert!(!Asset::new("x").has_gift_note());
        assert!(!Asset::new("x").with_gift_from("   ").has_gift_note());
        assert!(Asset::new("x").with_gift_from("kudarap").has_gift_note());
    }
}
