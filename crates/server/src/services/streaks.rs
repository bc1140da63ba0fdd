//! Weekly visit streaks.
//!
//! The club kiosk reports a visit by name. Visits at least six days apart
//! extend a streak as long as no gap exceeds eight days, and each visit pays
//! more the longer the streak runs.

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use shekels_core::{AccountId, Email, Shekels};

use crate::models::Account;
use crate::store::Transaction;

/// Minimum time between two counted visits.
pub const MIN_GAP: Duration = Duration::days(6);

/// Longest gap that keeps a streak alive.
pub const MAX_GAP: Duration = Duration::days(8);

/// Reasons a visit is not counted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StreakRejection {
    #[error("Please provide a name.")]
    MissingName,

    #[error("Bumped too recently.")]
    TooSoon,
}

/// What a recorded visit did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BumpOutcome {
    /// An existing account's streak was extended.
    Bumped {
        account_id: AccountId,
        name: String,
        /// Streak length including this visit.
        streak: u64,
        credited: Shekels,
        balance: Shekels,
    },
    /// No account matched, so an unclaimed streak account was created.
    Created {
        account_id: AccountId,
        name: String,
        balance: Shekels,
    },
}

impl BumpOutcome {
    #[must_use]
    pub const fn account_id(&self) -> AccountId {
        match self {
            Self::Bumped { account_id, .. } | Self::Created { account_id, .. } => *account_id,
        }
    }
}

/// Number of consecutive trailing gaps of at most [`MAX_GAP`].
#[must_use]
pub fn trailing_streak(visits: &[DateTime<Utc>]) -> u64 {
    let streak = visits
        .windows(2)
        .rev()
        .take_while(|pair| pair[1] - pair[0] <= MAX_GAP)
        .count();
    u64::try_from(streak).unwrap_or(u64::MAX)
}

/// Shekels paid for a visit that ends a streak of `streak` gaps.
#[must_use]
pub const fn reward(streak: u64) -> Shekels {
    Shekels::new(streak.saturating_add(1).saturating_mul(2).saturating_sub(1))
}

/// Record a visit by `name` at `now`.
///
/// The account is found by exact claimed name, then by display name, then
/// by claimed name with the middle name removed.
///
/// # Errors
///
/// Returns [`StreakRejection::TooSoon`] if the account's last visit was
/// less than [`MIN_GAP`] ago.
pub fn bump(
    tx: &mut Transaction,
    name: &str,
    email: Option<Email>,
    now: DateTime<Utc>,
) -> Result<BumpOutcome, StreakRejection> {
    let name = name.trim();
    if name.is_empty() {
        return Err(StreakRejection::MissingName);
    }

    let existing = tx
        .by_name(name)
        .or_else(|| tx.by_display_name(name))
        .or_else(|| tx.by_name(&strip_middle(name)))
        .map(|account| account.id);

    let Some(account_id) = existing else {
        let mut account = Account::new(AccountId::generate());
        account.name = Some(name.to_owned());
        account.shekels = Shekels::new(1);
        account.email = email;
        account.visits.push(now);
        let account = tx.insert(account);
        return Ok(BumpOutcome::Created {
            account_id: account.id,
            name: name.to_owned(),
            balance: account.shekels,
        });
    };

    let account = tx
        .get(&account_id)
        .filter(|account| {
            account
                .visits
                .last()
                .is_none_or(|last| now - *last >= MIN_GAP)
        })
        .ok_or(StreakRejection::TooSoon)?;
    let display = account.name.clone().unwrap_or_else(|| name.to_owned());

    let Some(account) = tx.get_mut(&account_id) else {
        return Err(StreakRejection::TooSoon);
    };
    account.visits.push(now);
    let streak = trailing_streak(&account.visits);
    let credited = reward(streak);
    account.shekels = account.shekels.credit(credited);

    Ok(BumpOutcome::Bumped {
        account_id,
        name: display,
        streak: streak + 1,
        credited,
        balance: account.shekels,
    })
}

/// Drop the middle name of a three-or-more part name, keeping case.
fn strip_middle(name: &str) -> String {
    let mut parts: Vec<&str> = name.split_whitespace().collect();
    if parts.len() > 2 {
        parts.remove(1);
    }
    parts.join(" ")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::store::{AccountStore, StoreError};

    async fn run(
        store: &AccountStore,
        name: &str,
        now: DateTime<Utc>,
    ) -> Result<BumpOutcome, StreakRejection> {
        store
            .transaction(|tx| Ok::<_, StoreError>(bump(tx, name, None, now)))
            .await
            .unwrap()
    }

    fn named(name: &str) -> Account {
        let mut account = Account::new(AccountId::generate());
        account.name = Some(name.to_string());
        account
    }

    #[test]
    fn test_trailing_streak() {
        let start = Utc::now();
        let weekly = |weeks: &[i64]| -> Vec<DateTime<Utc>> {
            weeks.iter().map(|d| start + Duration::days(*d)).collect()
        };
        assert_eq!(trailing_streak(&[]), 0);
        assert_eq!(trailing_streak(&weekly(&[0])), 0);
        assert_eq!(trailing_streak(&weekly(&[0, 7, 14])), 2);
        assert_eq!(trailing_streak(&weekly(&[0, 20, 27, 35])), 2);
        assert_eq!(trailing_streak(&weekly(&[0, 7, 30])), 0);
    }

    #[test]
    fn test_reward_grows_with_streak() {
        assert_eq!(reward(0), Shekels::new(1));
        assert_eq!(reward(1), Shekels::new(3));
        assert_eq!(reward(4), Shekels::new(9));
    }

    #[tokio::test]
    async fn test_unknown_name_creates_streak_account() {
        let store = AccountStore::memory([]);
        let now = Utc::now();

        let outcome = run(&store, "  Ada Lovelace ", now).await.unwrap();
        let BumpOutcome::Created {
            account_id,
            name,
            balance,
        } = outcome
        else {
            panic!("expected a new account");
        };
        assert_eq!(name, "Ada Lovelace");
        assert_eq!(balance, Shekels::new(1));

        let snapshot = store.load().await.unwrap();
        let stored = snapshot.get(&account_id).unwrap();
        assert_eq!(stored.visits, vec![now]);
        assert!(!stored.has_discord());
    }

    #[tokio::test]
    async fn test_weekly_visits_build_streak() {
        let store = AccountStore::memory([]);
        let start = Utc::now();

        run(&store, "Ada Lovelace", start).await.unwrap();
        let second = run(&store, "Ada Lovelace", start + Duration::days(7))
            .await
            .unwrap();
        assert!(matches!(
            second,
            BumpOutcome::Bumped { streak: 2, credited, balance, .. }
                if credited == Shekels::new(3) && balance == Shekels::new(4)
        ));

        let third = run(&store, "Ada Lovelace", start + Duration::days(14))
            .await
            .unwrap();
        assert!(matches!(
            third,
            BumpOutcome::Bumped { streak: 3, credited, .. } if credited == Shekels::new(5)
        ));
    }

    #[tokio::test]
    async fn test_bump_too_soon_is_rejected() {
        let store = AccountStore::memory([]);
        let start = Utc::now();

        run(&store, "Ada Lovelace", start).await.unwrap();
        assert_eq!(
            run(&store, "Ada Lovelace", start + Duration::days(5)).await,
            Err(StreakRejection::TooSoon)
        );
    }

    #[tokio::test]
    async fn test_lookup_by_display_and_stripped_name() {
        let mut by_display = named("Grace Hopper");
        by_display.display_name = Some("amazing grace".to_string());
        let stripped = named("Alan Turing");
        let store = AccountStore::memory([by_display.clone(), stripped.clone()]);
        let now = Utc::now();

        let outcome = run(&store, "amazing grace", now).await.unwrap();
        assert_eq!(outcome.account_id(), by_display.id);

        let outcome = run(&store, "Alan Mathison Turing", now).await.unwrap();
        assert_eq!(outcome.account_id(), stripped.id);

        assert_eq!(store.load().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_blank_name_is_rejected() {
        let store = AccountStore::memory([]);
        assert_eq!(
            run(&store, "   ", Utc::now()).await,
            Err(StreakRejection::MissingName)
        );
    }
}
