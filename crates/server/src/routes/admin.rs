//! Officer route handlers.

use axum::{Json, extract::State};
use tracing::instrument;

use crate::error::AppError;
use crate::middleware::{ApiJson, RequireAuth};
use crate::services::admin::{self, AccountUpdate, AdminRejection, UpdateReport};
use crate::services::audit::AuditKind;
use crate::state::AppState;

/// Apply a batch of account updates.
///
/// Non-admin callers are refused and the attempt is audited.
///
/// # Route
///
/// `POST /users/update`
#[instrument(skip_all, fields(account_id = %account.id, rows = updates.len()))]
pub async fn update_users(
    State(state): State<AppState>,
    RequireAuth(account): RequireAuth,
    ApiJson(updates): ApiJson<Vec<AccountUpdate>>,
) -> Result<Json<UpdateReport>, AppError> {
    let result = state
        .accounts()
        .transaction(|tx| admin::apply_updates(tx, account.id, &updates).map_err(AppError::from))
        .await;

    match result {
        Ok(report) => {
            state.audit().record(
                AuditKind::AdminUpdate,
                Some(&account),
                format_args!(
                    "{} updated, {} created",
                    report.updated.len(),
                    report.created.len()
                ),
            );
            Ok(Json(report))
        }
        Err(AppError::Admin(AdminRejection::NotAdmin)) => {
            state.audit().record(
                AuditKind::UnauthorizedAdminAttempt,
                Some(&account),
                "POST /users/update",
            );
            Err(AdminRejection::NotAdmin.into())
        }
        Err(e) => Err(e),
    }
}
