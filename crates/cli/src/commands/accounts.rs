//! Account maintenance commands.
//!
//! # Usage
//!
//! ```bash
//! # List every account, richest first
//! shekels-cli accounts list
//!
//! # Add Shekels to an account
//! shekels-cli accounts grant --id <uuid> --amount 25
//!
//! # Make an account an officer
//! shekels-cli accounts promote --id <uuid>
//!
//! # Sign an account out everywhere
//! shekels-cli accounts revoke-sessions --id <uuid>
//! ```

use shekels_core::{AccountId, Shekels};
use shekels_server::models::Account;
use shekels_server::store::AccountStore;

use super::CommandError;

/// Log every account, richest first.
///
/// Returns the number of accounts listed.
pub async fn list(store: &AccountStore, claimed_only: bool) -> Result<usize, CommandError> {
    let snapshot = store.load().await?;
    let mut accounts: Vec<&Account> = if claimed_only {
        snapshot.claimed().collect()
    } else {
        snapshot.iter().collect()
    };
    accounts.sort_by(|a, b| b.shekels.cmp(&a.shekels));

    for account in &accounts {
        tracing::info!(
            id = %account.id,
            name = account.label().unwrap_or("(unclaimed)"),
            shekels = %account.shekels,
            admin = account.admin,
            discord = account.has_discord(),
            sessions = account.tokens.len(),
            items = account.items.len(),
            "account"
        );
    }
    tracing::info!("{} accounts", accounts.len());
    Ok(accounts.len())
}

/// Credit `amount` Shekels to an account. Returns the new balance.
pub async fn grant(
    store: &AccountStore,
    id: AccountId,
    amount: u64,
) -> Result<Shekels, CommandError> {
    if amount == 0 {
        return Err(CommandError::InvalidArgument(
            "amount must be positive".to_string(),
        ));
    }

    let balance = store
        .transaction(|tx| {
            let account = tx.get_mut(&id).ok_or(CommandError::UnknownAccount(id))?;
            account.shekels = account.shekels.credit(Shekels::new(amount));
            Ok::<_, CommandError>(account.shekels)
        })
        .await?;

    tracing::info!(%id, amount, %balance, "Granted Shekels");
    Ok(balance)
}

/// Give an account officer rights.
pub async fn promote(store: &AccountStore, id: AccountId) -> Result<(), CommandError> {
    store
        .transaction(|tx| {
            let account = tx.get_mut(&id).ok_or(CommandError::UnknownAccount(id))?;
            account.admin = true;
            Ok::<_, CommandError>(())
        })
        .await?;

    tracing::info!(%id, "Account promoted to admin");
    Ok(())
}

/// Drop every session token and pending login code of an account.
///
/// Returns the number of sessions revoked.
pub async fn revoke_sessions(store: &AccountStore, id: AccountId) -> Result<usize, CommandError> {
    let revoked = store
        .transaction(|tx| {
            let account = tx.get_mut(&id).ok_or(CommandError::UnknownAccount(id))?;
            let revoked = account.tokens.len();
            account.tokens.clear();
            account.login_code = None;
            Ok::<_, CommandError>(revoked)
        })
        .await?;

    tracing::info!(%id, revoked, "Sessions revoked");
    Ok(revoked)
}
