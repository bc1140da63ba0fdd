//! Catalog validation.

use chrono::{DateTime, Utc};
use shekels_server::store::CatalogStore;

use super::CommandError;

/// Summary of a catalog check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogReport {
    pub items: usize,
    pub available: usize,
}

/// Load the catalog, which validates ids, and report what can be bought.
pub async fn check(store: &CatalogStore, now: DateTime<Utc>) -> Result<CatalogReport, CommandError> {
    let catalog = store.load().await?;

    for item in &catalog.items {
        let available = item.is_available(now);
        if available {
            tracing::info!(id = %item.id, price = %item.price, max = ?item.max_quantity, "{}", item.title);
        } else {
            tracing::warn!(id = %item.id, expires_at = ?item.expires_at, "{} has expired", item.title);
        }
    }

    let report = CatalogReport {
        items: catalog.items.len(),
        available: catalog.available(now).count(),
    };
    tracing::info!(items = report.items, available = report.available, "Catalog OK");
    Ok(report)
}
