//! Discord OAuth route handlers.
//!
//! - Login: redirects to Discord's authorization page
//! - Callback: exchanges the code, links or creates the account, and sends
//!   the member back to the leaderboard with a fresh session token

use axum::{
    extract::{Query, State},
    response::Redirect,
};
use chrono::Utc;
use secrecy::ExposeSecret;
use serde::Deserialize;
use tracing::instrument;

use shekels_core::{AccountId, Email};

use crate::error::AppError;
use crate::models::Account;
use crate::services::audit::AuditKind;
use crate::state::AppState;
use crate::store::StoreError;

/// Query parameters from the Discord OAuth callback.
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    /// Authorization code to exchange for tokens.
    pub code: Option<String>,
    /// Error code if authorization failed.
    pub error: Option<String>,
}

/// Start a Discord login.
///
/// # Route
///
/// `GET /login`
pub async fn login(State(state): State<AppState>) -> Redirect {
    Redirect::to(&state.discord().authorization_url())
}

/// Handle the Discord OAuth callback.
///
/// An account already linked to the Discord id gets its profile, guild
/// snapshot and access token refreshed; otherwise an unclaimed account is
/// created with a balance of zero.
///
/// # Route
///
/// `GET /auth/discord/callback?code=...`
#[instrument(skip(state, query))]
pub async fn discord_callback(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
) -> Result<Redirect, AppError> {
    if let Some(error) = query.error {
        tracing::warn!(%error, "Discord OAuth denied");
        return Err(AppError::BadRequest(
            "Discord login was not completed.".to_string(),
        ));
    }

    let Some(code) = query.code.filter(|c| !c.is_empty()) else {
        return Err(AppError::BadRequest("No code provided.".to_string()));
    };

    let login = state.discord().exchange_code(&code).await?;
    let now = Utc::now();

    let (account, token, created) = state
        .accounts()
        .transaction(|tx| {
            let existing = tx.by_discord_id(&login.profile.id).map(|a| a.id);
            let (account, created) = if let Some(id) = existing {
                let account = tx
                    .get_mut(&id)
                    .ok_or_else(|| StoreError::NotFound(format!("account {id}")))?;
                (account, false)
            } else {
                let mut account = Account::new(AccountId::generate());
                account.discord_id = Some(login.profile.id.clone());
                account.email = login
                    .profile
                    .email
                    .as_deref()
                    .and_then(|e| Email::parse(e).ok());
                (tx.insert(account), true)
            };

            account.discord_profile = Some(login.profile.clone());
            account.discord_guilds.clone_from(&login.guilds);
            account.discord_token = Some(login.access_token.expose_secret().to_owned());

            let token = state.sessions().issue(account.id, now)?;
            account.tokens.insert(token.clone());
            Ok::<_, AppError>((account.clone(), token, created))
        })
        .await?;

    if created {
        state
            .audit()
            .record(AuditKind::AccountCreated, Some(&account), "via Discord login");
    }
    state.audit().record(
        AuditKind::OAuthLogin,
        Some(&account),
        format_args!("discord user {}", login.profile.username),
    );

    let separator = if state.config().leaderboard_url.contains('?') {
        '&'
    } else {
        '?'
    };
    Ok(Redirect::to(&format!(
        "{}{separator}access_token={}",
        state.config().leaderboard_url,
        urlencoding::encode(&token)
    )))
}
