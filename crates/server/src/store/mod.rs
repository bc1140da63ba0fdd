//! Persistent stores for accounts and the catalog.
//!
//! # Stores
//!
//! - [`AccountStore`] - keyed account records with serialized transactions
//! - [`CatalogStore`] - read-only catalog, reloaded on every call
//!
//! Both stores have a JSON file backend (`users.json`, `store.json` in the
//! data directory) and an in-memory backend used by tests and dry runs.

pub mod accounts;
pub mod catalog;

pub use accounts::{AccountSnapshot, AccountStore, Transaction};
pub use catalog::CatalogStore;

use std::path::Path;

use thiserror::Error;

/// Errors from store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading or writing the backing file failed.
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The backing file is not valid JSON for the expected shape.
    #[error("store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Stored data violates an invariant (e.g. duplicate ids).
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested record was not found.
    #[error("not found: {0}")]
    NotFound(String),
}

/// Read a file, treating a missing file as absent.
async fn read_optional(path: &Path) -> Result<Option<Vec<u8>>, StoreError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Durably replace `path` with `payload`.
///
/// Writes a sibling temp file, syncs it, then renames it over the target so
/// readers only ever see the old or the new contents.
async fn write_atomic(path: &Path, payload: &[u8]) -> Result<(), StoreError> {
    use tokio::io::AsyncWriteExt;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    let temp_path = path.with_extension(format!("{}.tmp", uuid::Uuid::new_v4().simple()));
    let mut file = tokio::fs::File::create(&temp_path).await?;
    file.write_all(payload).await?;
    file.sync_all().await?;
    drop(file);

    if let Err(e) = tokio::fs::rename(&temp_path, path).await {
        let _ = tokio::fs::remove_file(&temp_path).await;
        return Err(e.into());
    }
    Ok(())
}
