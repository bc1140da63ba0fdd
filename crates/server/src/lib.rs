//! Shekels server library.
//!
//! This crate provides the account, session, claim and purchase API as a
//! library, allowing the router to be tested and the stores to be reused by
//! the operator CLI.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod discord;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod store;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use state::AppState;

/// Build the application router.
///
/// Sentry layers are added by the binary; everything else a request passes
/// through is assembled here so tests drive the same stack.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    routes::routes(&state)
        .layer(axum::middleware::from_fn(middleware::extract_credential))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::path::PathBuf;

    use axum::body::{Body, to_bytes};
    use axum::http::{Method, Request, StatusCode, header};
    use secrecy::SecretString;
    use tower::ServiceExt;

    use super::*;
    use crate::config::{DiscordConfig, ServerConfig};
    use crate::models::Catalog;
    use crate::services::notify::Notifier;
    use crate::store::{AccountStore, CatalogStore};

    fn test_app() -> Router {
        let config = ServerConfig {
            host: "127.0.0.1".parse().unwrap(),
            port: 0,
            data_dir: PathBuf::from("unused"),
            signing_key: SecretString::from("Qm7$wV2!pL9@xR4#tY8&uB1^nC5*eD3%"),
            bump_key: SecretString::from("bump"),
            leaderboard_url: "https://club.example/leaderboard".to_string(),
            discord: DiscordConfig {
                client_id: "1234".to_string(),
                client_secret: SecretString::from("discord-client-secret"),
                redirect_uri: "https://api.club.example/auth/discord/callback".to_string(),
                guild_id: "42".to_string(),
                api_base: "http://127.0.0.1:9".to_string(),
            },
            notify_webhook: None,
            debug_account_id: None,
            name_denylist: Vec::new(),
            sentry_dsn: None,
            sentry_environment: None,
        };
        app(AppState::with_stores(
            config,
            AccountStore::memory([]),
            CatalogStore::memory(Catalog::default()),
            Notifier::disabled(),
        ))
    }

    #[tokio::test]
    async fn test_cors_preflight_allows_any_origin() {
        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri("/shop/purchase")
            .header(header::ORIGIN, "https://club.example")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .body(Body::empty())
            .unwrap();

        let response = test_app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "*"
        );
    }

    #[tokio::test]
    async fn test_body_token_is_read_from_json() {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/shop/purchase")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"itemID": "sticker", "token": "stale"}"#))
            .unwrap();

        let response = test_app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["message"], "Invalid token.");
    }
}
