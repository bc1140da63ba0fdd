//! Member-editable leaderboard preferences.

use thiserror::Error;

use shekels_core::AccountId;

use crate::services::claims::is_denied;
use crate::store::Transaction;

/// Longest display name accepted.
pub const MAX_DISPLAY_NAME_CHARS: usize = 64;

/// Reasons a preference update is refused. Checked in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PreferencesRejection {
    #[error("You must be in the StogaCS Discord server to claim your account.")]
    NotInGuild,

    #[error("You have not yet claimed your account.")]
    NotClaimed,

    #[error("Please include all fields.")]
    MissingDisplayName,

    #[error("Display names can be at most {max} characters.")]
    DisplayNameTooLong { max: usize },

    #[error("Your name may need admin approval, please contact a club officer.")]
    NeedsApproval,

    #[error("account {0} not found")]
    UnknownAccount(AccountId),
}

/// Set the display name shown on the leaderboard.
///
/// Guild membership is read from the snapshot stored at the last Discord
/// login. Returns the stored (trimmed) display name.
///
/// # Errors
///
/// Returns the first failing [`PreferencesRejection`].
pub fn update_display_name(
    tx: &mut Transaction,
    account_id: AccountId,
    display_name: &str,
    guild_id: &str,
    denylist: &[String],
) -> Result<String, PreferencesRejection> {
    let account = tx
        .get(&account_id)
        .ok_or(PreferencesRejection::UnknownAccount(account_id))?;

    if !account.in_guild(guild_id) {
        return Err(PreferencesRejection::NotInGuild);
    }
    if !account.is_claimed() {
        return Err(PreferencesRejection::NotClaimed);
    }

    let display_name = display_name.trim();
    if display_name.is_empty() {
        return Err(PreferencesRejection::MissingDisplayName);
    }
    if display_name.chars().count() > MAX_DISPLAY_NAME_CHARS {
        return Err(PreferencesRejection::DisplayNameTooLong {
            max: MAX_DISPLAY_NAME_CHARS,
        });
    }
    if is_denied(display_name, denylist) {
        return Err(PreferencesRejection::NeedsApproval);
    }

    let account = tx
        .get_mut(&account_id)
        .ok_or(PreferencesRejection::UnknownAccount(account_id))?;
    account.display_name = Some(display_name.to_owned());
    Ok(display_name.to_owned())
}
