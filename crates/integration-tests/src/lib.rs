//! Integration test support for the Shekels server.
//!
//! Tests drive the real router with `tower::ServiceExt::oneshot` against
//! in-memory stores, so no listener or data directory is needed. Claim and
//! OAuth tests point the Discord client at a local stub of the Discord API.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p shekels-integration-tests
//! ```

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::net::SocketAddr;
use std::path::PathBuf;

use axum::{
    Json, Router,
    body::{Body, to_bytes},
    http::{Method, Request, Response, StatusCode, header},
    routing::{get, post},
};
use chrono::Utc;
use secrecy::SecretString;
use serde_json::{Value, json};
use tower::ServiceExt;

use shekels_core::AccountId;
use shekels_server::config::{DiscordConfig, ServerConfig};
use shekels_server::models::{Account, Catalog};
use shekels_server::services::notify::Notifier;
use shekels_server::state::AppState;
use shekels_server::store::{AccountStore, CatalogStore};

/// Guild members must belong to.
pub const GUILD_ID: &str = "1009284359334924349";

/// Shared key of the streak kiosk.
pub const BUMP_KEY: &str = "kiosk-bump-key";

/// Access token handed out by the Discord stub.
pub const STUB_ACCESS_TOKEN: &str = "stub-access-token";

const SIGNING_KEY: &str = "Qm7$wV2!pL9@xR4#tY8&uB1^nC5*eD3%";

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for tests. `api_base` is where Discord requests go.
#[must_use]
pub fn test_config(api_base: &str) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".parse().unwrap(),
        port: 0,
        data_dir: PathBuf::from("unused"),
        signing_key: SecretString::from(SIGNING_KEY),
        bump_key: SecretString::from(BUMP_KEY),
        leaderboard_url: "https://club.example/leaderboard".to_string(),
        discord: DiscordConfig {
            client_id: "1234".to_string(),
            client_secret: SecretString::from("discord-client-secret"),
            redirect_uri: "https://api.club.example/auth/discord/callback".to_string(),
            guild_id: GUILD_ID.to_string(),
            api_base: api_base.to_string(),
        },
        notify_webhook: None,
        debug_account_id: None,
        name_denylist: vec!["admin".to_string()],
        sentry_dsn: None,
        sentry_environment: None,
    }
}

// =============================================================================
// Test Application
// =============================================================================

/// The router plus its state.
pub struct TestApp {
    pub state: AppState,
    router: Router,
}

impl TestApp {
    /// App over an empty account store and `catalog`, with no Discord.
    #[must_use]
    pub fn new(catalog: Catalog) -> Self {
        Self::from_parts(
            test_config("http://127.0.0.1:9"),
            AccountStore::memory([]),
            CatalogStore::memory(catalog),
        )
    }

    /// App whose Discord client talks to `api_base`.
    #[must_use]
    pub fn with_discord(api_base: &str, catalog: Catalog) -> Self {
        Self::from_parts(
            test_config(api_base),
            AccountStore::memory([]),
            CatalogStore::memory(catalog),
        )
    }

    #[must_use]
    pub fn from_parts(config: ServerConfig, accounts: AccountStore, catalog: CatalogStore) -> Self {
        let state = AppState::with_stores(config, accounts, catalog, Notifier::disabled());
        let router = shekels_server::app(state.clone());
        Self { state, router }
    }

    /// Store `account` with a fresh session token and return the token.
    pub async fn sign_in(&self, mut account: Account) -> String {
        let token = self.state.sessions().issue(account.id, Utc::now()).unwrap();
        account.tokens.insert(token.clone());
        self.state
            .accounts()
            .commit([account])
            .await
            .unwrap();
        token
    }

    /// Store `account` as is.
    pub async fn insert(&self, account: Account) {
        self.state.accounts().commit([account]).await.unwrap();
    }

    /// Current stored state of an account.
    pub async fn account(&self, id: AccountId) -> Account {
        self.state
            .accounts()
            .load()
            .await
            .unwrap()
            .get(&id)
            .cloned()
            .unwrap()
    }

    /// Send a raw request through the full middleware stack.
    pub async fn raw(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// Send a request with an optional `token` header and JSON body.
    ///
    /// Returns the status and the JSON body (`Value::Null` if not JSON).
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("token", token);
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&body).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.raw(request).await;
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, token, Some(body)).await
    }
}

/// An unclaimed account with no Discord link.
#[must_use]
pub fn blank_account() -> Account {
    Account::new(AccountId::generate())
}

/// An account linked to Discord id `discord_id`, as after an OAuth login.
#[must_use]
pub fn discord_account(discord_id: &str, in_guild: bool) -> Account {
    let mut account = blank_account();
    account.discord_id = Some(discord_id.to_string());
    account.discord_token = Some(STUB_ACCESS_TOKEN.to_string());
    if in_guild {
        account.discord_guilds = vec![shekels_server::models::DiscordGuild {
            id: GUILD_ID.to_string(),
            name: Some("StogaCS".to_string()),
        }];
    }
    account
}

// =============================================================================
// Discord Stub
// =============================================================================

/// Serve a minimal Discord API on a local port and return its base URL.
///
/// The member has Discord id `user_id` and belongs to `guilds`. With
/// `guilds = None` the guild endpoint answers 401, as for a revoked token.
pub async fn spawn_discord_stub(user_id: &str, guilds: Option<Vec<&str>>) -> String {
    let profile = json!({
        "id": user_id,
        "username": "ada",
        "discriminator": "0",
        "avatar": null,
        "email": "27alovelace@school.org",
    });
    let guilds: Option<Value> = guilds.map(|ids| {
        ids.into_iter()
            .map(|id| json!({ "id": id, "name": "Guild" }))
            .collect()
    });

    let router = Router::new()
        .route(
            "/oauth2/token",
            post(|| async {
                Json(json!({ "access_token": STUB_ACCESS_TOKEN, "token_type": "Bearer" }))
            }),
        )
        .route("/users/@me", get(move || async move { Json(profile) }))
        .route(
            "/users/@me/guilds",
            get(move || async move {
                guilds.map_or_else(
                    || Err((StatusCode::UNAUTHORIZED, "401: Unauthorized")),
                    |guilds| Ok(Json(guilds)),
                )
            }),
        );

    let listener = tokio::net::TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0)))
        .await
        .unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}
