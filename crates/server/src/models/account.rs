//! Account domain types.
//!
//! An [`Account`] is both an identity and a ledger: it carries the member's
//! balance, their active session tokens, at most one pending login code, the
//! items they bought and the visits that drive streak rewards.

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use shekels_core::{AccountId, Email, ItemId, LoginCode, Shekels};

use super::record::{AccountRecord, OwnedItemRecord};

/// A member account.
///
/// Implements `Debug` manually to redact credentials. Deserializes from
/// both the current and the legacy `users.json` layouts.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "AccountRecord")]
pub struct Account {
    /// Stable account id, assigned once.
    pub id: AccountId,
    /// Claimed real name. `None` until claimed, and again after being merged away.
    pub name: Option<String>,
    /// Officers can run bulk updates.
    pub admin: bool,
    /// Current balance.
    pub shekels: Shekels,
    pub email: Option<Email>,
    /// Name shown on the leaderboard instead of the real name.
    pub display_name: Option<String>,
    /// Graduation year recorded at claim time.
    pub graduation_year: Option<i32>,
    /// Discord user id of the linked identity.
    pub discord_id: Option<String>,
    /// Profile snapshot from the last Discord login.
    pub discord_profile: Option<DiscordProfile>,
    /// Guild snapshot from the last Discord login.
    pub discord_guilds: Vec<DiscordGuild>,
    /// Discord access token, used to re-check guild membership at claim time.
    pub discord_token: Option<String>,
    /// Active session tokens.
    pub tokens: BTreeSet<String>,
    /// Outstanding login code, if any.
    pub login_code: Option<PendingLoginCode>,
    /// Purchased items, oldest first.
    pub items: Vec<OwnedItem>,
    /// Streak visits, oldest first.
    pub visits: Vec<DateTime<Utc>>,
}

impl std::fmt::Debug for Account {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Account")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("admin", &self.admin)
            .field("shekels", &self.shekels)
            .field("email", &self.email)
            .field("display_name", &self.display_name)
            .field("graduation_year", &self.graduation_year)
            .field("discord_id", &self.discord_id)
            .field("discord_token", &"[REDACTED]")
            .field("tokens", &self.tokens.len())
            .field("login_code", &self.login_code.as_ref().map(|_| "[REDACTED]"))
            .field("items", &self.items.len())
            .field("visits", &self.visits.len())
            .finish_non_exhaustive()
    }
}

impl Account {
    /// A blank account with a fresh id and zero balance.
    #[must_use]
    pub fn new(id: AccountId) -> Self {
        Self {
            id,
            name: None,
            admin: false,
            shekels: Shekels::ZERO,
            email: None,
            display_name: None,
            graduation_year: None,
            discord_id: None,
            discord_profile: None,
            discord_guilds: Vec::new(),
            discord_token: None,
            tokens: BTreeSet::new(),
            login_code: None,
            items: Vec::new(),
            visits: Vec::new(),
        }
    }

    /// Whether the account has been through the claim flow.
    #[must_use]
    pub const fn is_claimed(&self) -> bool {
        self.name.is_some()
    }

    /// Whether a Discord identity is linked.
    #[must_use]
    pub const fn has_discord(&self) -> bool {
        self.discord_id.is_some()
    }

    /// Display name if set, else the claimed name.
    #[must_use]
    pub fn label(&self) -> Option<&str> {
        self.display_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .or(self.name.as_deref())
    }

    /// Whether the stored guild snapshot includes `guild_id`.
    #[must_use]
    pub fn in_guild(&self, guild_id: &str) -> bool {
        self.discord_guilds.iter().any(|g| g.id == guild_id)
    }

    /// Number of records of `item` that have not expired at `now`.
    #[must_use]
    pub fn active_count(&self, item: &ItemId, now: DateTime<Utc>) -> usize {
        self.items
            .iter()
            .filter(|owned| &owned.id == item && owned.is_active(now))
            .count()
    }

    /// Number of records of `item`, expired or not.
    #[must_use]
    pub fn owned_count(&self, item: &ItemId) -> usize {
        self.items.iter().filter(|owned| &owned.id == item).count()
    }

    /// The pending login code if it has not expired at `now`.
    #[must_use]
    pub fn live_login_code(&self, now: DateTime<Utc>) -> Option<&PendingLoginCode> {
        self.login_code.as_ref().filter(|pending| pending.is_live(now))
    }
}

/// A frozen snapshot of a catalog item at purchase time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "OwnedItemRecord")]
pub struct OwnedItem {
    pub id: ItemId,
    pub title: String,
    pub description: String,
    /// Price paid.
    pub price: Shekels,
    pub acquired_at: DateTime<Utc>,
    /// Absolute expiry, for items sold with a lifetime.
    pub expires_at: Option<DateTime<Utc>>,
}

impl OwnedItem {
    /// A record counts until its expiry passes; records without one never expire.
    #[must_use]
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_none_or(|at| at > now)
    }
}

/// An outstanding login code and its absolute expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingLoginCode {
    pub code: LoginCode,
    pub expires_at: DateTime<Utc>,
}

impl PendingLoginCode {
    #[must_use]
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }

    /// Time left before expiry, zero once expired.
    #[must_use]
    pub fn remaining(&self, now: DateTime<Utc>) -> Duration {
        (self.expires_at - now).max(Duration::zero())
    }
}

/// Profile snapshot of a linked Discord user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscordProfile {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub discriminator: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// A guild the linked Discord user belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscordGuild {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// Case-insensitive matching key for real names with the middle name dropped.
///
/// `"Mary Anne Smith"` and `"mary smith"` share the key `"mary smith"`.
#[must_use]
pub fn name_key(name: &str) -> String {
    let mut parts: Vec<String> = name.split_whitespace().map(str::to_lowercase).collect();
    if parts.len() > 2 {
        parts.remove(1);
    }
    parts.join(" ")
}
