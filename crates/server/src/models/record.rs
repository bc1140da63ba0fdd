//! Stored account records.
//!
//! `users.json` is read in two layouts: the current snake_case one this
//! server writes, and the legacy camelCase one (`Shekels`, `discordID`,
//! `logonCode`, ...) with millisecond timestamps and positional item ids.
//! Records are always written back in the current layout.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use shekels_core::{AccountId, Email, ItemId, LoginCode, Shekels};

use super::account::{Account, DiscordGuild, DiscordProfile, OwnedItem, PendingLoginCode};

/// An instant stored as RFC 3339 text or as Unix milliseconds.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(try_from = "InstantRepr")]
struct StoredInstant(DateTime<Utc>);

#[derive(Deserialize)]
#[serde(untagged)]
enum InstantRepr {
    Millis(i64),
    Text(DateTime<Utc>),
}

impl TryFrom<InstantRepr> for StoredInstant {
    type Error = String;

    fn try_from(repr: InstantRepr) -> Result<Self, Self::Error> {
        match repr {
            InstantRepr::Millis(ms) => DateTime::from_timestamp_millis(ms)
                .map(Self)
                .ok_or_else(|| format!("timestamp {ms} is out of range")),
            InstantRepr::Text(at) => Ok(Self(at)),
        }
    }
}

/// A balance. Legacy records may hold a negative balance, which floors at zero.
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredBalance {
    Amount(Shekels),
    Overdrawn(i64),
}

impl From<StoredBalance> for Shekels {
    fn from(balance: StoredBalance) -> Self {
        match balance {
            StoredBalance::Amount(amount) => amount,
            StoredBalance::Overdrawn(_) => Self::ZERO,
        }
    }
}

/// Item ids are slugs; legacy records used catalog positions.
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredItemId {
    Slug(String),
    Position(u64),
}

impl From<StoredItemId> for ItemId {
    fn from(id: StoredItemId) -> Self {
        match id {
            StoredItemId::Slug(slug) => Self::new(slug),
            StoredItemId::Position(position) => Self::new(position.to_string()),
        }
    }
}

#[derive(Deserialize)]
pub(super) struct OwnedItemRecord {
    id: StoredItemId,
    title: String,
    #[serde(default)]
    description: String,
    price: Shekels,
    #[serde(alias = "timestamp")]
    acquired_at: StoredInstant,
    #[serde(default, alias = "expires_after")]
    expires_at: Option<StoredInstant>,
}

impl From<OwnedItemRecord> for OwnedItem {
    fn from(record: OwnedItemRecord) -> Self {
        Self {
            id: record.id.into(),
            title: record.title,
            description: record.description,
            price: record.price,
            acquired_at: record.acquired_at.0,
            expires_at: record.expires_at.map(|at| at.0),
        }
    }
}

#[derive(Deserialize)]
pub(super) struct AccountRecord {
    id: AccountId,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    admin: Option<bool>,
    #[serde(alias = "Shekels")]
    shekels: StoredBalance,
    #[serde(default)]
    email: Option<String>,
    #[serde(default, alias = "displayName")]
    display_name: Option<String>,
    #[serde(default, alias = "gradYear")]
    graduation_year: Option<i32>,
    #[serde(default, alias = "discordID")]
    discord_id: Option<String>,
    #[serde(default, alias = "discordInfo")]
    discord_profile: Option<DiscordProfile>,
    #[serde(default, alias = "discordGuilds")]
    discord_guilds: Option<Vec<DiscordGuild>>,
    #[serde(default, alias = "discordToken")]
    discord_token: Option<String>,
    #[serde(default)]
    tokens: Option<BTreeSet<String>>,
    #[serde(default)]
    login_code: Option<PendingLoginCode>,
    #[serde(default, rename = "logonCode")]
    legacy_code: Option<u32>,
    #[serde(default, rename = "logonCodeExpires")]
    legacy_code_expires: Option<StoredInstant>,
    #[serde(default)]
    items: Option<Vec<OwnedItem>>,
    #[serde(default)]
    visits: Option<Vec<StoredInstant>>,
}

impl From<AccountRecord> for Account {
    fn from(record: AccountRecord) -> Self {
        let email = record.email.as_deref().and_then(|raw| match Email::parse(raw) {
            Ok(email) => Some(email),
            Err(err) => {
                if !raw.trim().is_empty() {
                    tracing::warn!(account_id = %record.id, error = %err, "dropping stored email");
                }
                None
            }
        });

        let login_code = record.login_code.or_else(|| {
            let code = LoginCode::try_from(record.legacy_code?).ok()?;
            let expires_at = record.legacy_code_expires?.0;
            Some(PendingLoginCode { code, expires_at })
        });

        Self {
            id: record.id,
            name: record.name,
            admin: record.admin.unwrap_or_default(),
            shekels: record.shekels.into(),
            email,
            display_name: record.display_name,
            graduation_year: record.graduation_year,
            discord_id: record.discord_id,
            discord_profile: record.discord_profile,
            discord_guilds: record.discord_guilds.unwrap_or_default(),
            discord_token: record.discord_token,
            tokens: record.tokens.unwrap_or_default(),
            login_code,
            items: record.items.unwrap_or_default(),
            visits: record
                .visits
                .unwrap_or_default()
                .into_iter()
                .map(|at| at.0)
                .collect(),
        }
    }
}
