//! Leaderboard route handlers: public listing, claiming and display names.

use axum::{Json, extract::State};
use chrono::Utc;
use secrecy::SecretString;
use serde::Deserialize;
use tracing::instrument;

use crate::discord::DiscordError;
use crate::error::AppError;
use crate::middleware::{ApiJson, RequireAuth};
use crate::models::PublicAccount;
use crate::routes::ApiMessage;
use crate::services::audit::AuditKind;
use crate::services::claims::{self, ClaimRequest, Membership};
use crate::services::leaderboard;
use crate::services::preferences::{self, PreferencesRejection};
use crate::state::AppState;
use crate::store::StoreError;

/// Every claimed account, richest first.
///
/// # Route
///
/// `GET /users`
pub async fn users(State(state): State<AppState>) -> Result<Json<Vec<PublicAccount>>, AppError> {
    let snapshot = state.accounts().load().await?;
    Ok(Json(leaderboard::project(&snapshot, Utc::now())))
}

/// Graduation year offset, sent as a number or a numeric string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum GradYear {
    Number(i32),
    Text(String),
}

impl GradYear {
    fn offset(&self) -> Option<i32> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().parse().ok(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ClaimBody {
    pub name: Option<String>,
    pub grad_year: Option<GradYear>,
}

/// Claim the caller's account under a full name.
///
/// Guild membership is re-checked against Discord with the stored access
/// token before the claim runs; the fresh guild list replaces the stored
/// snapshot when the claim succeeds.
///
/// # Route
///
/// `POST /leaderboard/claim`
#[instrument(skip_all, fields(account_id = %account.id))]
pub async fn claim(
    State(state): State<AppState>,
    RequireAuth(account): RequireAuth,
    ApiJson(body): ApiJson<ClaimBody>,
) -> Result<Json<ApiMessage>, AppError> {
    let (Some(name), Some(offset)) = (body.name, body.grad_year.as_ref().and_then(GradYear::offset))
    else {
        return Err(AppError::BadRequest("Please include all fields.".to_string()));
    };

    let access_token = account
        .discord_token
        .clone()
        .map(SecretString::from)
        .ok_or(DiscordError::NotLinked)?;
    let guilds = state.discord().fetch_guilds(&access_token).await?;
    let membership = Membership::of(
        state.discord().guild_id(),
        guilds.iter().map(|g| g.id.as_str()),
    );

    let now = Utc::now();
    let denylist = &state.config().name_denylist;
    let (outcome, merged) = state
        .accounts()
        .transaction(|tx| {
            let request = ClaimRequest {
                name: &name,
                grad_year_offset: offset,
                membership,
                denylist,
            };
            let outcome = claims::claim(tx, account.id, &request, now)?;
            let merged = outcome.merged_from.and_then(|id| tx.get(&id).cloned());
            tx.get_mut(&account.id)
                .ok_or_else(|| StoreError::NotFound(format!("account {}", account.id)))?
                .discord_guilds = guilds;
            Ok::<_, AppError>((outcome, merged))
        })
        .await?;

    match merged {
        Some(old) => state.audit().record(
            AuditKind::AccountLinked,
            Some(&account),
            format_args!(
                "claimed as {}, merged account {} ({} Shekels now)",
                outcome.name, old.id, outcome.shekels
            ),
        ),
        None => state.audit().record(
            AuditKind::AccountClaimed,
            Some(&account),
            format_args!("claimed as {}, class of {}", outcome.name, outcome.graduation_year),
        ),
    };

    Ok(ApiMessage::ok("Account claimed successfully."))
}

#[derive(Debug, Deserialize)]
pub struct PreferencesBody {
    pub display_name: Option<String>,
}

/// Change the caller's display name.
///
/// # Route
///
/// `POST /leaderboard/update_prefs`
#[instrument(skip_all, fields(account_id = %account.id))]
pub async fn update_prefs(
    State(state): State<AppState>,
    RequireAuth(account): RequireAuth,
    ApiJson(body): ApiJson<PreferencesBody>,
) -> Result<Json<ApiMessage>, AppError> {
    let display_name = body
        .display_name
        .ok_or(PreferencesRejection::MissingDisplayName)?;
    let config = state.config();

    let stored = state
        .accounts()
        .transaction(|tx| {
            preferences::update_display_name(
                tx,
                account.id,
                &display_name,
                &config.discord.guild_id,
                &config.name_denylist,
            )
            .map_err(AppError::from)
        })
        .await?;

    state.audit().record(
        AuditKind::PreferencesUpdated,
        Some(&account),
        format_args!("display name set to {stored}"),
    );

    Ok(ApiMessage::ok("Account updated successfully."))
}
