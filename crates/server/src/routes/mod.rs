//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! # Service
//! GET  /health                   - Liveness check
//! GET  /health/ready             - Readiness check (both stores load)
//! GET  /api/version              - Server version
//!
//! # Auth
//! GET  /login                    - Redirect to Discord OAuth
//! GET  /auth/discord/callback    - Handle OAuth callback, redirect with token
//!
//! # Account (requires auth unless noted)
//! GET  /me                       - Own profile
//! GET  /discord/user             - Alias of /me
//! GET  /me/purchases             - Owned items
//! GET  /me/login_code            - Issue or reuse a login code
//! POST /me/login?code=           - Exchange a login code (no auth, rate limited)
//! POST /me/logout[?all=true]     - Drop this session, or all of them
//!
//! # Shop
//! GET  /shop/items               - Purchasable items (no auth)
//! POST /shop/purchase            - Buy an item
//!
//! # Leaderboard
//! GET  /users                    - Public leaderboard (no auth)
//! POST /leaderboard/claim        - Claim an account under a full name
//! POST /leaderboard/update_prefs - Change display name
//!
//! # Streaks (shared key)
//! GET  /streaks/bump             - Record a kiosk visit
//!
//! # Admin
//! POST /users/update             - Bulk update accounts
//! ```

pub mod account;
pub mod admin;
pub mod auth;
pub mod health;
pub mod leaderboard;
pub mod shop;
pub mod streaks;

use axum::{
    Json, Router, middleware,
    routing::{get, post},
};
use serde::Serialize;

use crate::error::AppError;
use crate::state::AppState;

/// Body of a successful request that only reports a message.
#[derive(Debug, Clone, Serialize)]
pub struct ApiMessage {
    pub success: bool,
    pub message: String,
}

impl ApiMessage {
    pub fn ok(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            success: true,
            message: message.into(),
        })
    }
}

/// Create the account routes router.
pub fn account_routes(state: &AppState) -> Router<AppState> {
    let login = post(account::login).route_layer(middleware::from_fn_with_state(
        state.clone(),
        crate::middleware::login_rate_limit,
    ));

    Router::new()
        .route("/", get(account::me))
        .route("/purchases", get(account::purchases))
        .route("/login_code", get(account::login_code))
        .route("/login", login)
        .route("/logout", post(account::logout))
}

/// Create the leaderboard routes router.
pub fn leaderboard_routes() -> Router<AppState> {
    Router::new()
        .route("/claim", post(leaderboard::claim))
        .route("/update_prefs", post(leaderboard::update_prefs))
}

/// Create the shop routes router.
pub fn shop_routes() -> Router<AppState> {
    Router::new()
        .route("/items", get(shop::items))
        .route("/purchase", post(shop::purchase))
}

/// Create all routes.
pub fn routes(state: &AppState) -> Router<AppState> {
    Router::new()
        // Service
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .route("/api/version", get(health::version))
        // Auth
        .route("/login", get(auth::login))
        .route("/auth/discord/callback", get(auth::discord_callback))
        // Account
        .nest("/me", account_routes(state))
        .route("/discord/user", get(account::me))
        // Shop
        .nest("/shop", shop_routes())
        // Leaderboard
        .route("/users", get(leaderboard::users))
        .route("/users/update", post(admin::update_users))
        .nest("/leaderboard", leaderboard_routes())
        // Streaks
        .route("/streaks/bump", get(streaks::bump))
        .fallback(not_found)
}

async fn not_found() -> AppError {
    AppError::NotFound("The requested resource was not found.".to_string())
}
