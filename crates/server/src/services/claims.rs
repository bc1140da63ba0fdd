//! Claiming an account.
//!
//! Members first appear as unclaimed streak-only accounts (created by the
//! kiosk under whatever name they typed) or as fresh Discord-linked accounts
//! with no name. Claiming binds a real name and graduation year to the
//! Discord-linked account. If an unclaimed, unlinked streak account carries
//! the same name (ignoring case and middle names) its balance, email and
//! display name move over and its name is cleared.
//!
//! Both records are committed in the same transaction, so a crash can never
//! leave the balance in both accounts or in neither.

use chrono::{DateTime, Datelike, Utc};
use thiserror::Error;

use shekels_core::{AccountId, Shekels};

use crate::models::Account;
use crate::store::Transaction;

/// Whether the caller is in the required Discord guild, as reported by the
/// identity provider just before claiming.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Membership {
    Member,
    NotMember,
}

impl Membership {
    /// Membership of `guild_id` given the guild ids the provider returned.
    pub fn of<'a>(guild_id: &str, guild_ids: impl IntoIterator<Item = &'a str>) -> Self {
        if guild_ids.into_iter().any(|id| id == guild_id) {
            Self::Member
        } else {
            Self::NotMember
        }
    }
}

/// Reasons a claim is refused. Checked in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClaimRejection {
    #[error("You must be in the StogaCS Discord server to claim your account.")]
    NotInGuild,

    #[error("Your account has already been claimed.")]
    AlreadyClaimed,

    #[error("Your name may need admin approval. Please, contact a club officer.")]
    NeedsApproval,

    #[error("Please enter your full name.")]
    NotFullName,

    #[error("Each part of your name should contain more than one character.")]
    NamePartTooShort,

    #[error("account {0} not found")]
    UnknownAccount(AccountId),
}

/// A claim request.
#[derive(Debug, Clone)]
pub struct ClaimRequest<'a> {
    pub name: &'a str,
    /// Years after the current school year's graduating class.
    pub grad_year_offset: i32,
    pub membership: Membership,
    /// Lowercased substrings that need officer approval.
    pub denylist: &'a [String],
}

/// What a successful claim did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimOutcome {
    pub name: String,
    pub graduation_year: i32,
    /// The streak account merged in, if any.
    pub merged_from: Option<AccountId>,
    /// Balance after the claim.
    pub shekels: Shekels,
}

/// Whether `name` contains any denylisted substring, ignoring case.
#[must_use]
pub fn is_denied(name: &str, denylist: &[String]) -> bool {
    let lowered = name.to_lowercase();
    denylist.iter().any(|bad| lowered.contains(bad.as_str()))
}

/// Graduation year of a student `offset` years behind the current seniors.
///
/// The school year rolls over in August: before then the current seniors
/// graduate next calendar year.
#[must_use]
pub fn graduation_year(now: DateTime<Utc>, offset: i32) -> i32 {
    let base = if now.month0() < 7 {
        now.year() + 1
    } else {
        now.year()
    };
    base + offset
}

/// Claim `account_id` under `request.name`.
///
/// # Errors
///
/// Returns the first failing [`ClaimRejection`]. Nothing is modified on
/// rejection.
pub fn claim(
    tx: &mut Transaction,
    account_id: AccountId,
    request: &ClaimRequest<'_>,
    now: DateTime<Utc>,
) -> Result<ClaimOutcome, ClaimRejection> {
    let account = tx
        .get(&account_id)
        .ok_or(ClaimRejection::UnknownAccount(account_id))?;

    if request.membership != Membership::Member {
        return Err(ClaimRejection::NotInGuild);
    }
    if account.is_claimed() {
        return Err(ClaimRejection::AlreadyClaimed);
    }
    if is_denied(request.name, request.denylist) {
        return Err(ClaimRejection::NeedsApproval);
    }

    let name = request.name.trim();
    let parts: Vec<&str> = name.split_whitespace().collect();
    if parts.len() != 2 {
        return Err(ClaimRejection::NotFullName);
    }
    if parts.iter().any(|part| part.chars().count() < 2) {
        return Err(ClaimRejection::NamePartTooShort);
    }
    let name = parts.join(" ");

    let merge_source = tx
        .by_name_key(&name)
        .find(|other| other.id != account_id && !other.has_discord())
        .map(|other| other.id);

    let graduation_year = graduation_year(now, request.grad_year_offset);

    let shekels = if let Some(old_id) = merge_source {
        let (claimer, old) = tx
            .get_pair_mut(&account_id, &old_id)
            .ok_or(ClaimRejection::UnknownAccount(old_id))?;
        absorb(claimer, old);
        claimer.name = Some(name.clone());
        claimer.graduation_year = Some(graduation_year);
        claimer.shekels
    } else {
        let claimer = tx
            .get_mut(&account_id)
            .ok_or(ClaimRejection::UnknownAccount(account_id))?;
        claimer.name = Some(name.clone());
        claimer.graduation_year = Some(graduation_year);
        claimer.shekels
    };

    Ok(ClaimOutcome {
        name,
        graduation_year,
        merged_from: merge_source,
        shekels,
    })
}

/// Move `old`'s balance, email and display name onto `claimer` and clear
/// `old`'s name. `old` keeps its record so history stays intact.
fn absorb(claimer: &mut Account, old: &mut Account) {
    claimer.shekels = claimer.shekels.credit(old.shekels);
    old.shekels = Shekels::ZERO;
    if old.email.is_some() {
        claimer.email.clone_from(&old.email);
    }
    claimer.display_name = Some(old.display_name.clone().unwrap_or_default());
    old.name = None;
}
