//! Officer bulk updates.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use shekels_core::{AccountId, Shekels};

use crate::models::Account;
use crate::store::Transaction;

/// Refusal of an admin operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdminRejection {
    #[error("You are not authorized to perform this action.")]
    NotAdmin,
}

/// One row of a bulk update.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AccountUpdate {
    /// Account to update. Rows without a known id create a new account.
    #[serde(default)]
    pub shekel_guid: Option<AccountId>,
    pub real_name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    /// Shekels to add. Balances are never set directly.
    #[serde(default)]
    pub grant: Shekels,
}

/// Accounts touched by a bulk update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UpdateReport {
    pub updated: Vec<AccountId>,
    pub created: Vec<AccountId>,
}

/// Apply `updates` on behalf of `actor`.
///
/// # Errors
///
/// Returns [`AdminRejection::NotAdmin`] unless `actor` is an admin.
pub fn apply_updates(
    tx: &mut Transaction,
    actor: AccountId,
    updates: &[AccountUpdate],
) -> Result<UpdateReport, AdminRejection> {
    if !tx.get(&actor).is_some_and(|a| a.admin) {
        return Err(AdminRejection::NotAdmin);
    }

    let mut report = UpdateReport::default();
    for update in updates {
        let known = update.shekel_guid.filter(|id| tx.get(id).is_some());
        if let Some(account) = known.and_then(|id| tx.get_mut(&id)) {
            account.name = Some(update.real_name.clone());
            account.display_name.clone_from(&update.display_name);
            account.shekels = account.shekels.credit(update.grant);
            report.updated.push(account.id);
        } else {
            let mut account = Account::new(AccountId::generate());
            account.name = Some(update.real_name.clone());
            account.display_name.clone_from(&update.display_name);
            account.shekels = update.grant;
            report.created.push(tx.insert(account).id);
        }
    }
    Ok(report)
}
