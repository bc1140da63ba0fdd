//! Streak kiosk route handler.

use axum::{
    Json,
    extract::{Query, State},
};
use chrono::Utc;
use secrecy::ExposeSecret;
use serde::Deserialize;
use tracing::instrument;

use shekels_core::Email;

use crate::error::AppError;
use crate::routes::ApiMessage;
use crate::services::audit::AuditKind;
use crate::services::notify::Notification;
use crate::services::streaks::{self, BumpOutcome};
use crate::state::AppState;
use crate::store::StoreError;

#[derive(Debug, Deserialize)]
pub struct BumpQuery {
    pub key: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
}

/// Record a visit reported by the kiosk.
///
/// # Route
///
/// `GET /streaks/bump?key=...&name=...&email=...`
#[instrument(skip_all)]
pub async fn bump(
    State(state): State<AppState>,
    Query(query): Query<BumpQuery>,
) -> Result<Json<ApiMessage>, AppError> {
    let key_matches = query
        .key
        .as_deref()
        .is_some_and(|key| key == state.config().bump_key.expose_secret());
    if !key_matches {
        return Err(AppError::Unauthenticated("Invalid key.".to_string()));
    }

    let name = query.name.unwrap_or_default();
    let email = query.email.as_deref().and_then(|e| Email::parse(e).ok());
    let now = Utc::now();

    let (outcome, account) = state
        .accounts()
        .transaction(|tx| {
            let outcome = streaks::bump(tx, &name, email, now)?;
            let id = outcome.account_id();
            let account = tx
                .get(&id)
                .cloned()
                .ok_or_else(|| StoreError::NotFound(format!("account {id}")))?;
            Ok::<_, AppError>((outcome, account))
        })
        .await?;

    let (notification, message) = match &outcome {
        BumpOutcome::Bumped {
            name,
            streak,
            balance,
            ..
        } => (
            Notification::new(
                "Streak Bump",
                format!("{name} bumped their streak to {streak}.\n\nThey now have {balance} Shekels."),
            ),
            "Successfully registered visit.",
        ),
        BumpOutcome::Created { name, balance, .. } => {
            state
                .audit()
                .record(AuditKind::AccountCreated, Some(&account), "via streak kiosk");
            (
                Notification::new(
                    "Streak Bump / New User",
                    format!(
                        "{name} has signed in, and an unlinked account has been created for them.\n\nThey have been given {balance} Shekel."
                    ),
                ),
                "Registered new visitor.",
            )
        }
    };

    state.notifier().notify(notification);
    state
        .audit()
        .record(AuditKind::StreakBumped, Some(&account), format_args!("{outcome:?}"));

    Ok(ApiMessage::ok(message))
}
