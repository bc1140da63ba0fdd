//! Catalog items.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use shekels_core::{ItemId, Shekels};

use super::account::OwnedItem;

/// Longest lifetime an item may give its purchased records: 100 years.
pub const MAX_LIFETIME_SECS: u64 = 100 * 366 * 24 * 60 * 60;

/// An item members can buy with Shekels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItem {
    /// Stable identifier, kept across catalog edits.
    pub id: ItemId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub price: Shekels,
    /// The item cannot be bought after this instant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    /// Cap on concurrently owned, unexpired records of this item.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_quantity: Option<u32>,
    /// Lifetime of a purchased record, counted from purchase time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_after_secs: Option<u64>,
}

impl CatalogItem {
    /// Whether the item can still be bought at `now`.
    #[must_use]
    pub fn is_available(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_none_or(|at| at > now)
    }

    /// Lifetime of a purchased record, or `None` if the item has none or
    /// the configured value exceeds [`MAX_LIFETIME_SECS`].
    #[must_use]
    pub fn lifetime(&self) -> Option<TimeDelta> {
        self.expires_after_secs
            .filter(|secs| *secs <= MAX_LIFETIME_SECS)
            .and_then(|secs| i64::try_from(secs).ok())
            .and_then(TimeDelta::try_seconds)
    }

    /// Whether `expires_after_secs` is unset or within [`MAX_LIFETIME_SECS`].
    #[must_use]
    pub fn has_valid_lifetime(&self) -> bool {
        self.expires_after_secs.is_none() || self.lifetime().is_some()
    }

    /// Freeze this item into an owned record acquired at `now`.
    ///
    /// Returns `None` if the record's expiry cannot be represented.
    #[must_use]
    pub fn to_owned_item(&self, now: DateTime<Utc>) -> Option<OwnedItem> {
        let expires_at = match self.expires_after_secs {
            Some(_) => Some(now.checked_add_signed(self.lifetime()?)?),
            None => None,
        };

        Some(OwnedItem {
            id: self.id.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            price: self.price,
            acquired_at: now,
            expires_at,
        })
    }
}

/// The full catalog as loaded from storage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    pub items: Vec<CatalogItem>,
}

impl Catalog {
    #[must_use]
    pub fn get(&self, id: &ItemId) -> Option<&CatalogItem> {
        self.items.iter().find(|item| &item.id == id)
    }

    /// Items that can still be bought at `now`, in catalog order.
    pub fn available(&self, now: DateTime<Utc>) -> impl Iterator<Item = &CatalogItem> {
        self.items.iter().filter(move |item| item.is_available(now))
    }
}
