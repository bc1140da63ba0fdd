//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::ServerConfig;
use crate::discord::DiscordClient;
use crate::services::audit::AuditLog;
use crate::services::notify::Notifier;
use crate::services::rate_limit::RateLimiter;
use crate::services::sessions::SessionIssuer;
use crate::store::{AccountStore, CatalogStore};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// the stores, the session issuer and the external collaborators.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ServerConfig,
    accounts: AccountStore,
    catalog: CatalogStore,
    sessions: SessionIssuer,
    limiter: RateLimiter,
    discord: DiscordClient,
    notifier: Notifier,
    audit: AuditLog,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.inner.config)
            .field("discord", &self.inner.discord)
            .field("notifier", &self.inner.notifier)
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// Create application state backed by the JSON files in the data directory.
    #[must_use]
    pub fn new(config: ServerConfig) -> Self {
        let accounts = AccountStore::file(config.accounts_path());
        let catalog = CatalogStore::file(config.catalog_path());
        let notifier = Notifier::new(config.notify_webhook.clone());
        Self::with_stores(config, accounts, catalog, notifier)
    }

    /// Create application state over the given stores and notifier.
    #[must_use]
    pub fn with_stores(
        config: ServerConfig,
        accounts: AccountStore,
        catalog: CatalogStore,
        notifier: Notifier,
    ) -> Self {
        let sessions = SessionIssuer::new(&config.signing_key);
        let discord = DiscordClient::new(&config.discord);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                accounts,
                catalog,
                sessions,
                limiter: RateLimiter::new(),
                discord,
                notifier,
                audit: AuditLog::new(),
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn accounts(&self) -> &AccountStore {
        &self.inner.accounts
    }

    #[must_use]
    pub fn catalog(&self) -> &CatalogStore {
        &self.inner.catalog
    }

    #[must_use]
    pub fn sessions(&self) -> &SessionIssuer {
        &self.inner.sessions
    }

    /// Rate limiter for the login code exchange.
    #[must_use]
    pub fn limiter(&self) -> &RateLimiter {
        &self.inner.limiter
    }

    #[must_use]
    pub fn discord(&self) -> &DiscordClient {
        &self.inner.discord
    }

    #[must_use]
    pub fn notifier(&self) -> &Notifier {
        &self.inner.notifier
    }

    #[must_use]
    pub fn audit(&self) -> &AuditLog {
        &self.inner.audit
    }
}
