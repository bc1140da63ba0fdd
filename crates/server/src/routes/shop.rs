//! Shop route handlers.

use axum::{Json, extract::State};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::instrument;

use shekels_core::ItemId;

use crate::error::AppError;
use crate::middleware::{ApiJson, RequireAuth};
use crate::routes::ApiMessage;
use crate::services::audit::AuditKind;
use crate::services::notify::Notification;
use crate::services::purchases;
use crate::state::AppState;

/// Items that can still be bought.
///
/// # Route
///
/// `GET /shop/items`
pub async fn items(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    let catalog = state.catalog().load().await?;
    let now = Utc::now();
    let products: Vec<_> = catalog.available(now).collect();
    Ok(Json(json!({
        "success": true,
        "products": products,
    })))
}

#[derive(Debug, Deserialize)]
pub struct PurchaseRequest {
    #[serde(rename = "itemID")]
    pub item_id: ItemId,
}

/// Buy an item.
///
/// The balance change and the owned-item record are committed before the
/// response; the notification and audit event follow the commit.
///
/// # Route
///
/// `POST /shop/purchase`
#[instrument(skip_all, fields(account_id = %account.id, item_id = %request.item_id))]
pub async fn purchase(
    State(state): State<AppState>,
    RequireAuth(account): RequireAuth,
    ApiJson(request): ApiJson<PurchaseRequest>,
) -> Result<Json<ApiMessage>, AppError> {
    let catalog = state.catalog().load().await?;
    let now = Utc::now();
    let debug_account = state.config().debug_account_id;

    let receipt = state
        .accounts()
        .transaction(|tx| {
            purchases::purchase(tx, &catalog, account.id, &request.item_id, debug_account, now)
                .map_err(AppError::from)
        })
        .await?;

    let buyer = account.label().unwrap_or("An unclaimed account");
    state.notifier().notify(
        Notification::new("New Purchase", receipt.notification_body(buyer))
            .with_footer(receipt.owned_footer()),
    );
    state.audit().record(
        AuditKind::Purchase,
        Some(&account),
        format_args!(
            "{} for {} Shekels, {} left",
            receipt.item.id, receipt.item.price, receipt.balance
        ),
    );

    Ok(ApiMessage::ok("Item purchased successfully."))
}
