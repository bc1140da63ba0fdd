//! Public leaderboard projection.

use chrono::{DateTime, Datelike, Utc};

use crate::models::{Account, PublicAccount};
use crate::store::AccountSnapshot;

/// Project every claimed account into a public row, richest first.
///
/// Rows are first ordered with Discord-linked accounts ahead of unlinked
/// ones, then by display name ignoring case. A final stable sort on balance
/// then decides the order, so linked status and name only break ties between
/// equal balances.
#[must_use]
pub fn project(snapshot: &AccountSnapshot, now: DateTime<Utc>) -> Vec<PublicAccount> {
    let mut rows: Vec<PublicAccount> = snapshot
        .claimed()
        .filter_map(|account| public_row(account, now))
        .collect();

    rows.sort_by(|a, b| {
        b.linked
            .cmp(&a.linked)
            .then_with(|| sort_name(a).cmp(&sort_name(b)))
    });
    rows.sort_by(|a, b| b.shekels.cmp(&a.shekels));
    rows
}

fn sort_name(row: &PublicAccount) -> String {
    row.display_name
        .as_deref()
        .filter(|name| !name.is_empty())
        .unwrap_or(&row.name)
        .to_lowercase()
}

fn public_row(account: &Account, now: DateTime<Utc>) -> Option<PublicAccount> {
    Some(PublicAccount {
        id: account.id,
        name: account.name.clone()?,
        display_name: account.display_name.clone(),
        shekels: account.shekels,
        linked: account.has_discord(),
        graduation_year: graduation_year(account, now),
    })
}

/// Stored graduation year, else the century of `now` joined with the
/// class-year digits that school email addresses start with.
fn graduation_year(account: &Account, now: DateTime<Utc>) -> Option<i32> {
    if let Some(year) = account.graduation_year {
        return Some(year);
    }
    let digits = account.email.as_ref()?.class_year_digits()?;
    let century = now.year() / 100 * 100;
    Some(century + i32::from(digits))
}
