//! Public projections of accounts.
//!
//! These are the only account shapes that leave the server. Neither carries
//! session tokens, login codes or the provider access token.

use serde::Serialize;

use shekels_core::{AccountId, Shekels};

use super::account::Account;

/// A leaderboard row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublicAccount {
    pub id: AccountId,
    pub name: String,
    pub display_name: Option<String>,
    pub shekels: Shekels,
    /// Whether a Discord identity is linked.
    pub linked: bool,
    /// Best-effort graduation year, `None` when unknown.
    pub graduation_year: Option<i32>,
}

/// The caller's own account, returned by `GET /me`.
#[derive(Debug, Clone, Serialize)]
pub struct AccountProfile {
    pub id: AccountId,
    pub name: Option<String>,
    pub admin: bool,
    pub shekels: Shekels,
    pub email: Option<String>,
    pub discord_id: Option<String>,
    pub display_name: Option<String>,
    pub username: Option<String>,
    pub avatar: Option<String>,
}

impl From<&Account> for AccountProfile {
    fn from(account: &Account) -> Self {
        let profile = account.discord_profile.as_ref();
        Self {
            id: account.id,
            name: account.name.clone(),
            admin: account.admin,
            shekels: account.shekels,
            email: account.email.as_ref().map(ToString::to_string),
            discord_id: account.discord_id.clone(),
            display_name: account.display_name.clone(),
            username: profile.map(|p| p.username.clone()),
            avatar: profile.and_then(|p| p.avatar.clone()),
        }
    }
}
