//! Account store.
//!
//! Accounts are kept as a keyed map from [`AccountId`] to [`Account`]. Reads
//! go through [`AccountStore::load`], which always reloads from the backend.
//! Writes go through [`AccountStore::commit`] (a keyed upsert of the changed
//! records) or [`AccountStore::transaction`], which runs reload, mutate and
//! commit under one lock so concurrent requests cannot lose each other's
//! updates. A commit returns only after the data is on disk.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, RwLock};
use tracing::instrument;

use shekels_core::{AccountId, LoginCode};

use super::{StoreError, read_optional, write_atomic};
use crate::models::{Account, name_key};

/// Where account records live.
enum Backend {
    File(PathBuf),
    Memory(RwLock<BTreeMap<AccountId, Account>>),
}

/// Store of all member accounts.
pub struct AccountStore {
    backend: Backend,
    write_lock: Mutex<()>,
}

impl std::fmt::Debug for AccountStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let backend = match &self.backend {
            Backend::File(path) => path.display().to_string(),
            Backend::Memory(_) => "memory".to_string(),
        };
        f.debug_struct("AccountStore")
            .field("backend", &backend)
            .finish_non_exhaustive()
    }
}

impl AccountStore {
    /// A store backed by a JSON file. The file is created on first commit.
    #[must_use]
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            backend: Backend::File(path.into()),
            write_lock: Mutex::new(()),
        }
    }

    /// A store held in memory, seeded with `accounts`.
    #[must_use]
    pub fn memory(accounts: impl IntoIterator<Item = Account>) -> Self {
        let map = accounts.into_iter().map(|a| (a.id, a)).collect();
        Self {
            backend: Backend::Memory(RwLock::new(map)),
            write_lock: Mutex::new(()),
        }
    }

    /// Path of the backing file, if file-backed.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match &self.backend {
            Backend::File(path) => Some(path),
            Backend::Memory(_) => None,
        }
    }

    /// Load the current set of accounts.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the backing file cannot be read, is not valid
    /// JSON, or contains duplicate account ids.
    pub async fn load(&self) -> Result<AccountSnapshot, StoreError> {
        match &self.backend {
            Backend::File(path) => {
                let Some(bytes) = read_optional(path).await? else {
                    return Ok(AccountSnapshot::default());
                };
                let records: Vec<Account> = serde_json::from_slice(&bytes)?;
                AccountSnapshot::from_records(records)
            }
            Backend::Memory(map) => Ok(AccountSnapshot {
                accounts: map.read().await.clone(),
            }),
        }
    }

    /// Upsert `changed` into the store and wait until it is durable.
    ///
    /// Only the given records are replaced; every other record is taken from
    /// a fresh reload, not from whatever snapshot the caller holds.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if reloading or writing fails.
    #[instrument(skip(self, changed))]
    pub async fn commit(
        &self,
        changed: impl IntoIterator<Item = Account>,
    ) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        self.upsert(changed.into_iter().collect()).await
    }

    /// Run `f` against a fresh snapshot and commit the records it touched.
    ///
    /// Transactions are serialized: no other transaction or commit runs
    /// between the reload and the write. If `f` fails nothing is written.
    ///
    /// # Errors
    ///
    /// Returns the error from `f`, or a `StoreError` (converted into `E`) if
    /// loading or committing fails.
    pub async fn transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Transaction) -> Result<T, E>,
        E: From<StoreError>,
    {
        let _guard = self.write_lock.lock().await;
        let mut tx = Transaction {
            snapshot: self.load().await?,
            touched: BTreeSet::new(),
        };

        let value = f(&mut tx)?;

        let changed: Vec<Account> = tx
            .touched
            .iter()
            .filter_map(|id| tx.snapshot.accounts.get(id).cloned())
            .collect();
        if !changed.is_empty() {
            self.upsert(changed).await?;
        }
        Ok(value)
    }

    /// Reload, replace `changed` by id, write. Caller holds the write lock.
    async fn upsert(&self, changed: Vec<Account>) -> Result<(), StoreError> {
        if changed.is_empty() {
            return Ok(());
        }
        let count = changed.len();

        match &self.backend {
            Backend::File(path) => {
                let mut snapshot = self.load().await?;
                for account in changed {
                    snapshot.accounts.insert(account.id, account);
                }
                let records: Vec<&Account> = snapshot.accounts.values().collect();
                let payload = serde_json::to_vec_pretty(&records)?;
                write_atomic(path, &payload).await?;
            }
            Backend::Memory(map) => {
                let mut map = map.write().await;
                for account in changed {
                    map.insert(account.id, account);
                }
            }
        }

        tracing::debug!(count, "Committed account records");
        Ok(())
    }
}

/// A point-in-time view of every account, keyed by id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountSnapshot {
    accounts: BTreeMap<AccountId, Account>,
}

impl AccountSnapshot {
    fn from_records(records: Vec<Account>) -> Result<Self, StoreError> {
        let mut accounts = BTreeMap::new();
        for account in records {
            let id = account.id;
            if accounts.insert(id, account).is_some() {
                return Err(StoreError::DataCorruption(format!(
                    "duplicate account id {id}"
                )));
            }
        }
        Ok(Self { accounts })
    }

    #[must_use]
    pub fn get(&self, id: &AccountId) -> Option<&Account> {
        self.accounts.get(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// All accounts in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Account> {
        self.accounts.values()
    }

    /// Accounts that have been through the claim flow.
    pub fn claimed(&self) -> impl Iterator<Item = &Account> {
        self.accounts.values().filter(|a| a.is_claimed())
    }

    /// The account holding session `token`.
    #[must_use]
    pub fn by_token(&self, token: &str) -> Option<&Account> {
        self.accounts.values().find(|a| a.tokens.contains(token))
    }

    /// The account linked to Discord user `discord_id`.
    #[must_use]
    pub fn by_discord_id(&self, discord_id: &str) -> Option<&Account> {
        self.accounts
            .values()
            .find(|a| a.discord_id.as_deref() == Some(discord_id))
    }

    /// The account whose claimed name is exactly `name`.
    #[must_use]
    pub fn by_name(&self, name: &str) -> Option<&Account> {
        self.accounts
            .values()
            .find(|a| a.name.as_deref() == Some(name))
    }

    /// The account whose display name is exactly `name`.
    #[must_use]
    pub fn by_display_name(&self, name: &str) -> Option<&Account> {
        self.accounts
            .values()
            .find(|a| a.display_name.as_deref() == Some(name))
    }

    /// Accounts whose claimed name matches `name` ignoring case and middle names.
    pub fn by_name_key<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a Account> + use<'a> {
        let key = name_key(name);
        self.accounts
            .values()
            .filter(move |a| a.name.as_deref().is_some_and(|n| name_key(n) == key))
    }

    /// The account holding `code` unexpired at `now`.
    #[must_use]
    pub fn by_live_code(&self, code: LoginCode, now: DateTime<Utc>) -> Option<&Account> {
        self.accounts
            .values()
            .find(|a| a.live_login_code(now).is_some_and(|p| p.code == code))
    }

    /// An account holding `code`, expired or not.
    #[must_use]
    pub fn by_any_code(&self, code: LoginCode) -> Option<&Account> {
        self.accounts
            .values()
            .find(|a| a.login_code.is_some_and(|p| p.code == code))
    }

    /// Consume the snapshot, yielding accounts in id order.
    #[must_use]
    pub fn into_accounts(self) -> Vec<Account> {
        self.accounts.into_values().collect()
    }
}

/// A snapshot being mutated inside [`AccountStore::transaction`].
///
/// Reads go through `Deref` to the snapshot. Every record reached through
/// [`Transaction::get_mut`] or added with [`Transaction::insert`] is written
/// back when the transaction closure succeeds.
#[derive(Debug)]
pub struct Transaction {
    snapshot: AccountSnapshot,
    touched: BTreeSet<AccountId>,
}

impl Transaction {
    /// Mutable access to an account; the record is committed afterwards.
    pub fn get_mut(&mut self, id: &AccountId) -> Option<&mut Account> {
        let account = self.snapshot.accounts.get_mut(id)?;
        self.touched.insert(*id);
        Some(account)
    }

    /// Mutable access to two distinct accounts at once.
    ///
    /// Returns `None` if either is missing or the ids are equal.
    pub fn get_pair_mut(
        &mut self,
        first: &AccountId,
        second: &AccountId,
    ) -> Option<(&mut Account, &mut Account)> {
        if first == second
            || !self.snapshot.accounts.contains_key(first)
            || !self.snapshot.accounts.contains_key(second)
        {
            return None;
        }
        self.touched.insert(*first);
        self.touched.insert(*second);

        let mut a = None;
        let mut b = None;
        for (id, account) in &mut self.snapshot.accounts {
            if id == first {
                a = Some(account);
            } else if id == second {
                b = Some(account);
            }
        }
        a.zip(b)
    }

    /// Add a new account, or replace an existing one with the same id.
    pub fn insert(&mut self, account: Account) -> &mut Account {
        let id = account.id;
        self.touched.insert(id);
        match self.snapshot.accounts.entry(id) {
            Entry::Occupied(mut entry) => {
                entry.insert(account);
                entry.into_mut()
            }
            Entry::Vacant(entry) => entry.insert(account),
        }
    }
}

impl std::ops::Deref for Transaction {
    type Target = AccountSnapshot;

    fn deref(&self) -> &Self::Target {
        &self.snapshot
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Duration;

    use shekels_core::{Email, ItemId, Shekels};

    use super::*;
    use crate::models::{OwnedItem, PendingLoginCode};

    fn named(name: &str, shekels: u64) -> Account {
        let mut account = Account::new(AccountId::generate());
        account.name = Some(name.to_string());
        account.shekels = Shekels::new(shekels);
        account
    }

    fn full_account() -> Account {
        let now = Utc::now();
        let mut account = named("Ada Lovelace", 12);
        account.email = Some(Email::parse("26alovelace@school.org").unwrap());
        account.display_name = Some("countess".to_string());
        account.graduation_year = Some(2026);
        account.discord_id = Some("80351110224678912".to_string());
        account.discord_token = Some("provider-token".to_string());
        account.tokens.insert("tok-a".to_string());
        account.tokens.insert("tok-b".to_string());
        account.login_code = Some(PendingLoginCode {
            code: LoginCode::try_from(424_242).unwrap(),
            expires_at: now + Duration::minutes(15),
        });
        account.items.push(OwnedItem {
            id: ItemId::new("hall-pass"),
            title: "Hall pass".to_string(),
            description: "Skip a meeting".to_string(),
            price: Shekels::new(10),
            acquired_at: now,
            expires_at: Some(now + Duration::days(7)),
        });
        account.visits = vec![now - Duration::days(7), now];
        account
    }

    #[tokio::test]
    async fn test_file_round_trip_is_field_for_field() {
        let dir = tempfile::tempdir().unwrap();
        let store = AccountStore::file(dir.path().join("users.json"));
        let account = full_account();

        store.commit([account.clone()]).await.unwrap();

        let reopened = AccountStore::file(dir.path().join("users.json"));
        let snapshot = reopened.load().await.unwrap();
        assert_eq!(snapshot.get(&account.id), Some(&account));
    }

    #[tokio::test]
    async fn test_missing_file_is_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = AccountStore::file(dir.path().join("users.json"));
        assert!(store.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_ids_are_corruption() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.json");
        let account = named("Ada Lovelace", 1);
        let payload = serde_json::to_vec(&[&account, &account]).unwrap();
        std::fs::write(&path, payload).unwrap();

        let err = AccountStore::file(&path).load().await.unwrap_err();
        assert!(matches!(err, StoreError::DataCorruption(_)));
    }

    #[tokio::test]
    async fn test_commit_upserts_without_clobbering_others() {
        let dir = tempfile::tempdir().unwrap();
        let store = AccountStore::file(dir.path().join("users.json"));
        let ada = named("Ada Lovelace", 1);
        let alan = named("Alan Turing", 2);
        store.commit([ada.clone(), alan.clone()]).await.unwrap();

        // A stale snapshot that still has the old `alan`.
        let stale = store.load().await.unwrap();

        let mut alan_updated = alan.clone();
        alan_updated.shekels = Shekels::new(50);
        store.commit([alan_updated]).await.unwrap();

        let mut ada_updated = stale.get(&ada.id).cloned().unwrap();
        ada_updated.shekels = Shekels::new(9);
        store.commit([ada_updated]).await.unwrap();

        let snapshot = store.load().await.unwrap();
        assert_eq!(snapshot.get(&ada.id).unwrap().shekels, Shekels::new(9));
        assert_eq!(snapshot.get(&alan.id).unwrap().shekels, Shekels::new(50));
    }

    #[tokio::test]
    async fn test_failed_transaction_writes_nothing() {
        let account = named("Ada Lovelace", 5);
        let store = AccountStore::memory([account.clone()]);

        let result: Result<(), StoreError> = store
            .transaction(|tx| {
                tx.get_mut(&account.id).unwrap().shekels = Shekels::new(999);
                Err(StoreError::NotFound("nope".to_string()))
            })
            .await;
        assert!(result.is_err());

        let snapshot = store.load().await.unwrap();
        assert_eq!(snapshot.get(&account.id).unwrap().shekels, Shekels::new(5));
    }

    #[tokio::test]
    async fn test_concurrent_transactions_do_not_lose_updates() {
        let account = named("Ada Lovelace", 0);
        let id = account.id;
        let store = std::sync::Arc::new(AccountStore::memory([account]));

        let mut handles = Vec::new();
        for _ in 0..20 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .transaction(|tx| {
                        let account = tx.get_mut(&id).unwrap();
                        account.shekels = account.shekels.credit(Shekels::new(1));
                        Ok::<_, StoreError>(())
                    })
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let snapshot = store.load().await.unwrap();
        assert_eq!(snapshot.get(&id).unwrap().shekels, Shekels::new(20));
    }

    #[tokio::test]
    async fn test_get_pair_mut_rejects_same_id() {
        let ada = named("Ada Lovelace", 1);
        let alan = named("Alan Turing", 2);
        let store = AccountStore::memory([ada.clone(), alan.clone()]);

        store
            .transaction(|tx| {
                assert!(tx.get_pair_mut(&ada.id, &ada.id).is_none());
                let (a, b) = tx.get_pair_mut(&ada.id, &alan.id).unwrap();
                assert_eq!(a.id, ada.id);
                assert_eq!(b.id, alan.id);
                Ok::<_, StoreError>(())
            })
            .await
            .unwrap();
    }

    #[test]
    fn test_lookups() {
        let now = Utc::now();
        let mut ada = full_account();
        ada.name = Some("Ada King Lovelace".to_string());
        let snapshot = AccountSnapshot::from_records(vec![ada.clone(), named("Alan Turing", 3)])
            .unwrap();

        assert_eq!(snapshot.by_token("tok-b").map(|a| a.id), Some(ada.id));
        assert!(snapshot.by_token("tok-z").is_none());
        assert_eq!(
            snapshot.by_discord_id("80351110224678912").map(|a| a.id),
            Some(ada.id)
        );
        assert_eq!(snapshot.by_display_name("countess").map(|a| a.id), Some(ada.id));
        assert_eq!(snapshot.by_name_key("ada lovelace").count(), 1);
        assert_eq!(snapshot.claimed().count(), 2);

        let code = LoginCode::try_from(424_242).unwrap();
        assert_eq!(snapshot.by_live_code(code, now).map(|a| a.id), Some(ada.id));
        assert!(snapshot.by_live_code(code, now + Duration::hours(1)).is_none());
        assert_eq!(snapshot.by_any_code(code).map(|a| a.id), Some(ada.id));
    }
}
