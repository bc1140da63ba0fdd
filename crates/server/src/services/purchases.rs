//! Spending Shekels on catalog items.

use chrono::{DateTime, Utc};
use thiserror::Error;

use shekels_core::{AccountId, ItemId, Shekels};

use crate::models::{Catalog, CatalogItem, OwnedItem};
use crate::store::Transaction;

/// Reasons a purchase is refused. Checked in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PurchaseRejection {
    #[error("Item not found.")]
    ItemNotFound(ItemId),

    #[error("This item can no longer be purchased.")]
    ItemExpired,

    #[error("You need {deficit} more Shekels to purchase this item.")]
    InsufficientShekels { deficit: Shekels },

    #[error("You can't purchase any more of this item.")]
    LimitReached { max: u32 },

    #[error("account {0} not found")]
    UnknownAccount(AccountId),

    #[error("catalog item {0} has an out-of-range lifetime")]
    LifetimeOutOfRange(ItemId),
}

/// A completed purchase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub item: CatalogItem,
    pub record: OwnedItem,
    /// Balance after the purchase.
    pub balance: Shekels,
    /// Records of this item the buyer now holds, expired ones included.
    pub owned: usize,
}

impl Receipt {
    /// Notification footer, e.g. `"1 / 3 owned."`.
    #[must_use]
    pub fn owned_footer(&self) -> String {
        match self.item.max_quantity {
            Some(max) => format!("{} / {max} owned.", self.owned),
            None => format!("{} owned.", self.owned),
        }
    }

    /// Body of the purchase notification for `buyer`.
    #[must_use]
    pub fn notification_body(&self, buyer: &str) -> String {
        format!(
            "{buyer} purchased {} for {} Shekels.\n\nThey now have {} Shekels.\n\n{} owned.",
            self.item.title, self.item.price, self.balance, self.owned
        )
    }
}

/// Buy `item_id` for `account_id`.
///
/// `debug_account` may buy without enough Shekels; its balance floors at
/// zero instead.
///
/// # Errors
///
/// Returns the first failing [`PurchaseRejection`]. Nothing is modified on
/// rejection.
pub fn purchase(
    tx: &mut Transaction,
    catalog: &Catalog,
    account_id: AccountId,
    item_id: &ItemId,
    debug_account: Option<AccountId>,
    now: DateTime<Utc>,
) -> Result<Receipt, PurchaseRejection> {
    let item = catalog
        .get(item_id)
        .ok_or_else(|| PurchaseRejection::ItemNotFound(item_id.clone()))?;
    let account = tx
        .get(&account_id)
        .ok_or(PurchaseRejection::UnknownAccount(account_id))?;

    if !item.is_available(now) {
        return Err(PurchaseRejection::ItemExpired);
    }

    let balance = match account.shekels.debit(item.price) {
        Ok(rest) => rest,
        Err(_) if debug_account == Some(account_id) => account.shekels.saturating_debit(item.price),
        Err(short) => {
            return Err(PurchaseRejection::InsufficientShekels {
                deficit: short.deficit,
            });
        }
    };

    if let Some(max) = item.max_quantity {
        let held = account.active_count(&item.id, now);
        if held >= usize::try_from(max).unwrap_or(usize::MAX) {
            return Err(PurchaseRejection::LimitReached { max });
        }
    }

    let record = item
        .to_owned_item(now)
        .ok_or_else(|| PurchaseRejection::LifetimeOutOfRange(item.id.clone()))?;
    let account = tx
        .get_mut(&account_id)
        .ok_or(PurchaseRejection::UnknownAccount(account_id))?;
    account.shekels = balance;
    account.items.push(record.clone());
    let owned = account.owned_count(&item.id);

    Ok(Receipt {
        item: item.clone(),
        record,
        balance,
        owned,
    })
}
