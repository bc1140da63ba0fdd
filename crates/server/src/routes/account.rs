//! Account route handlers: profile, owned items, login codes and logout.

use axum::{
    Extension, Json,
    extract::{Query, State},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::instrument;

use shekels_core::LoginCode;

use crate::error::AppError;
use crate::middleware::RequireAuth;
use crate::models::AccountProfile;
use crate::routes::ApiMessage;
use crate::services::audit::AuditKind;
use crate::services::identity::Credential;
use crate::services::sessions::LoginCodeRejection;
use crate::state::AppState;
use crate::store::StoreError;

/// Own profile.
///
/// # Route
///
/// `GET /me` (also `GET /discord/user`)
pub async fn me(RequireAuth(account): RequireAuth) -> Json<AccountProfile> {
    Json(AccountProfile::from(&account))
}

/// Items the caller has bought, including expired ones.
///
/// # Route
///
/// `GET /me/purchases`
pub async fn purchases(RequireAuth(account): RequireAuth) -> Json<Value> {
    Json(json!({
        "success": true,
        "products": account.items,
    }))
}

/// A login code and its remaining lifetime.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginCodeResponse {
    pub success: bool,
    pub logon_code: LoginCode,
    /// Milliseconds until the code expires.
    pub expires_in: i64,
}

/// Issue a login code, or return the live one.
///
/// # Route
///
/// `GET /me/login_code`
#[instrument(skip_all, fields(account_id = %account.id))]
pub async fn login_code(
    State(state): State<AppState>,
    RequireAuth(account): RequireAuth,
) -> Result<Json<LoginCodeResponse>, AppError> {
    let now = Utc::now();
    let issued = state
        .accounts()
        .transaction(|tx| {
            state
                .sessions()
                .issue_or_reuse_login_code(tx, account.id, now)
                .map_err(AppError::from)
        })
        .await?;

    if !issued.reused {
        state
            .audit()
            .record(AuditKind::LoginCodeIssued, Some(&account), "new code");
    }

    Ok(Json(LoginCodeResponse {
        success: true,
        logon_code: issued.code,
        expires_in: issued.ttl.num_milliseconds(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    pub code: Option<String>,
}

/// Session token minted from a login code.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub message: String,
    pub token: String,
}

/// Exchange a login code for a session token.
///
/// # Route
///
/// `POST /me/login?code=...`
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    Query(query): Query<LoginQuery>,
) -> Result<Json<LoginResponse>, AppError> {
    let Some(raw) = query.code.filter(|c| !c.trim().is_empty()) else {
        return Err(AppError::Unauthenticated(
            "No login code provided.".to_string(),
        ));
    };
    let code = LoginCode::parse(raw.trim()).map_err(|_| LoginCodeRejection::InvalidCode)?;
    let now = Utc::now();

    let (account, token) = state
        .accounts()
        .transaction(|tx| {
            let (account_id, token) = state.sessions().exchange_login_code(tx, code, now)?;
            let account = tx
                .get(&account_id)
                .cloned()
                .ok_or_else(|| StoreError::NotFound(format!("account {account_id}")))?;
            Ok::<_, AppError>((account, token))
        })
        .await?;

    state
        .audit()
        .record(AuditKind::CodeLogin, Some(&account), "login code exchanged");

    Ok(Json(LoginResponse {
        success: true,
        message: "Successfully logged in.".to_string(),
        token,
    }))
}

#[derive(Debug, Deserialize)]
pub struct LogoutQuery {
    pub all: Option<String>,
}

/// End the presented session, or every session with `?all=true`.
///
/// # Route
///
/// `POST /me/logout`
#[instrument(skip_all, fields(account_id = %account.id))]
pub async fn logout(
    State(state): State<AppState>,
    RequireAuth(account): RequireAuth,
    Extension(credential): Extension<Credential>,
    Query(query): Query<LogoutQuery>,
) -> Result<Json<ApiMessage>, AppError> {
    let all = query
        .all
        .is_some_and(|value| value.eq_ignore_ascii_case("true"));

    state
        .accounts()
        .transaction(|tx| {
            let stored = tx
                .get_mut(&account.id)
                .ok_or_else(|| StoreError::NotFound(format!("account {}", account.id)))?;
            if all {
                stored.tokens.clear();
            } else {
                stored.tokens.remove(&credential.token);
            }
            Ok::<_, AppError>(())
        })
        .await?;

    let kind = if all {
        AuditKind::LogoutAll
    } else {
        AuditKind::Logout
    };
    state.audit().record(kind, Some(&account), "session ended");

    Ok(ApiMessage::ok("Successfully logged out."))
}
