//! Append-only audit trail of account events.
//!
//! Audit events are structured `tracing` events on the `shekels::audit`
//! target, so they can be routed to their own sink with an `EnvFilter`
//! directive. Each event also leaves a Sentry breadcrumb.

use std::fmt;

use shekels_core::EventId;

use crate::error::add_breadcrumb;
use crate::models::Account;

/// Tracing target for audit events.
pub const AUDIT_TARGET: &str = "shekels::audit";

/// What happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditKind {
    AccountCreated,
    AccountLinked,
    AccountClaimed,
    OAuthLogin,
    CodeLogin,
    LoginCodeIssued,
    Logout,
    LogoutAll,
    Purchase,
    StreakBumped,
    PreferencesUpdated,
    AdminUpdate,
    UnauthorizedAdminAttempt,
}

impl AuditKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AccountCreated => "account_created",
            Self::AccountLinked => "account_linked",
            Self::AccountClaimed => "account_claimed",
            Self::OAuthLogin => "oauth_login",
            Self::CodeLogin => "code_login",
            Self::LoginCodeIssued => "login_code_issued",
            Self::Logout => "logout",
            Self::LogoutAll => "logout_all",
            Self::Purchase => "purchase",
            Self::StreakBumped => "streak_bumped",
            Self::PreferencesUpdated => "preferences_updated",
            Self::AdminUpdate => "admin_update",
            Self::UnauthorizedAdminAttempt => "unauthorized_admin_attempt",
        }
    }
}

impl fmt::Display for AuditKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Records audit events. Recording never fails and never blocks.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuditLog;

impl AuditLog {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Record `kind` for `account` with a free-form `detail`.
    ///
    /// Returns the id assigned to the event.
    pub fn record(
        &self,
        kind: AuditKind,
        account: Option<&Account>,
        detail: impl fmt::Display,
    ) -> EventId {
        let event_id = EventId::generate();
        let account_id = account.map(|a| a.id.to_string());
        let account_name = account.and_then(|a| a.name.clone());
        let detail = detail.to_string();

        tracing::info!(
            target: AUDIT_TARGET,
            event_id = %event_id,
            kind = %kind,
            account_id = account_id.as_deref(),
            account_name = account_name.as_deref(),
            detail = %detail,
            "audit event"
        );

        let event_id_str = event_id.to_string();
        let mut data = vec![("event_id", event_id_str.as_str())];
        if let Some(id) = account_id.as_deref() {
            data.push(("account_id", id));
        }
        add_breadcrumb("audit", kind.as_str(), Some(&data));

        event_id
    }
}
