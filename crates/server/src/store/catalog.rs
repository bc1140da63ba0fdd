//! Catalog store.
//!
//! The catalog file is edited by hand, so it is re-read on every load and
//! validated each time.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tokio::sync::RwLock;

use super::{StoreError, read_optional};
use crate::models::Catalog;

enum Backend {
    File(PathBuf),
    Memory(RwLock<Catalog>),
}

/// Read-only source of purchasable items.
pub struct CatalogStore {
    backend: Backend,
}

impl std::fmt::Debug for CatalogStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let backend = match &self.backend {
            Backend::File(path) => path.display().to_string(),
            Backend::Memory(_) => "memory".to_string(),
        };
        f.debug_struct("CatalogStore")
            .field("backend", &backend)
            .finish()
    }
}

impl CatalogStore {
    /// A catalog read from a JSON file of the form `{"items": [...]}`.
    #[must_use]
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            backend: Backend::File(path.into()),
        }
    }

    /// A catalog held in memory.
    #[must_use]
    pub fn memory(catalog: Catalog) -> Self {
        Self {
            backend: Backend::Memory(RwLock::new(catalog)),
        }
    }

    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match &self.backend {
            Backend::File(path) => Some(path),
            Backend::Memory(_) => None,
        }
    }

    /// Load the catalog. A missing file is an empty catalog.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the file cannot be read or parsed, if two
    /// items share an id, or if an item's lifetime is out of range.
    pub async fn load(&self) -> Result<Catalog, StoreError> {
        let catalog = match &self.backend {
            Backend::File(path) => match read_optional(path).await? {
                Some(bytes) => serde_json::from_slice(&bytes)?,
                None => Catalog::default(),
            },
            Backend::Memory(catalog) => catalog.read().await.clone(),
        };
        validate(&catalog)?;
        Ok(catalog)
    }

    /// Replace an in-memory catalog.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` for file-backed stores, which are only
    /// edited on disk.
    pub async fn replace(&self, catalog: Catalog) -> Result<(), StoreError> {
        match &self.backend {
            Backend::Memory(current) => {
                *current.write().await = catalog;
                Ok(())
            }
            Backend::File(path) => Err(StoreError::NotFound(format!(
                "in-memory catalog (store is backed by {})",
                path.display()
            ))),
        }
    }
}

fn validate(catalog: &Catalog) -> Result<(), StoreError> {
    let mut seen = HashSet::new();
    for item in &catalog.items {
        if item.id.as_str().trim().is_empty() {
            return Err(StoreError::DataCorruption(format!(
                "catalog item \"{}\" has an empty id",
                item.title
            )));
        }
        if !item.has_valid_lifetime() {
            return Err(StoreError::DataCorruption(format!(
                "catalog item {} has an out-of-range lifetime",
                item.id
            )));
        }
        if !seen.insert(item.id.as_str()) {
            return Err(StoreError::DataCorruption(format!(
                "duplicate catalog item id {}",
                item.id
            )));
        }
    }
    Ok(())
}
