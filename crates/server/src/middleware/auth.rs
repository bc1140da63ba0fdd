//! Authentication extractors.
//!
//! Resolve the credential found by
//! [`extract_credential`](super::credentials::extract_credential) to an
//! account. Every resolution reloads the account store.

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::error::{AppError, set_sentry_user};
use crate::models::Account;
use crate::services::identity::{self, Credential, Resolution};
use crate::state::AppState;

/// Extractor that requires an authenticated account.
///
/// Rejects with 401 when the request has no credential, or one that does
/// not belong to any account.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireAuth(account): RequireAuth,
/// ) -> impl IntoResponse {
///     format!("You have {} Shekels", account.shekels)
/// }
/// ```
pub struct RequireAuth(pub Account);

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match resolve(parts, state).await? {
            Resolution::Resolved(account) => Ok(Self(*account)),
            Resolution::NoCredential => Err(AppError::no_token()),
            Resolution::UnknownCredential => Err(AppError::invalid_token()),
        }
    }
}

async fn resolve(parts: &Parts, state: &AppState) -> Result<Resolution, AppError> {
    let credential = parts.extensions.get::<Credential>();
    let resolution = identity::resolve(state.accounts(), state.sessions(), credential).await?;

    if let Resolution::Resolved(account) = &resolution {
        set_sentry_user(&account.id, account.name.as_deref());
        tracing::Span::current().record("account_id", tracing::field::display(account.id));
    }
    Ok(resolution)
}
