//! Discord OAuth client.
//!
//! Discord is the identity provider. Members sign in with the authorization
//! code flow; the server exchanges the code for an access token, fetches the
//! member's profile and guild list, and keeps the access token so it can
//! re-check guild membership when the member claims an account.
//!
//! # Flow
//!
//! 1. `GET /login` redirects to [`DiscordClient::authorization_url`]
//! 2. Discord redirects back to `/auth/discord/callback?code=...`
//! 3. [`DiscordClient::exchange_code`] returns the token, profile and guilds
//! 4. [`DiscordClient::fetch_guilds`] re-checks membership at claim time

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::config::DiscordConfig;
use crate::models::{DiscordGuild, DiscordProfile};

/// OAuth scopes requested at login.
pub const SCOPES: &str = "identify email guilds";

/// Errors that can occur when talking to Discord.
#[derive(Debug, Error)]
pub enum DiscordError {
    /// HTTP request failed.
    #[error("Discord request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The authorization code could not be exchanged.
    #[error("Discord token exchange failed: {0}")]
    OAuth(String),

    /// Discord answered with an error status.
    #[error("Discord API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// No Discord access token is stored for the account.
    #[error("No Discord access token on record")]
    NotLinked,
}

/// Result of a completed OAuth login.
#[derive(Debug, Clone)]
pub struct DiscordLogin {
    pub access_token: SecretString,
    pub profile: DiscordProfile,
    pub guilds: Vec<DiscordGuild>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Discord Client
// ─────────────────────────────────────────────────────────────────────────────

/// Client for the Discord OAuth and user APIs.
#[derive(Clone)]
pub struct DiscordClient {
    inner: Arc<DiscordClientInner>,
}

struct DiscordClientInner {
    client: reqwest::Client,
    api_base: String,
    client_id: String,
    client_secret: SecretString,
    redirect_uri: String,
    guild_id: String,
}

impl std::fmt::Debug for DiscordClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscordClient")
            .field("api_base", &self.inner.api_base)
            .field("client_id", &self.inner.client_id)
            .field("client_secret", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl DiscordClient {
    #[must_use]
    pub fn new(config: &DiscordConfig) -> Self {
        Self {
            inner: Arc::new(DiscordClientInner {
                client: reqwest::Client::new(),
                api_base: config.api_base.trim_end_matches('/').to_string(),
                client_id: config.client_id.clone(),
                client_secret: config.client_secret.clone(),
                redirect_uri: config.redirect_uri.clone(),
                guild_id: config.guild_id.clone(),
            }),
        }
    }

    /// Guild a member must belong to before claiming.
    #[must_use]
    pub fn guild_id(&self) -> &str {
        &self.inner.guild_id
    }

    /// URL that starts the Discord login.
    #[must_use]
    pub fn authorization_url(&self) -> String {
        format!(
            "{}/oauth2/authorize?\
            client_id={}&\
            redirect_uri={}&\
            response_type=code&\
            scope={}",
            self.inner.api_base,
            urlencoding::encode(&self.inner.client_id),
            urlencoding::encode(&self.inner.redirect_uri),
            urlencoding::encode(SCOPES)
        )
    }

    /// Exchange an authorization code and fetch the member's profile and guilds.
    ///
    /// # Errors
    ///
    /// Returns `DiscordError` if any of the three requests fails.
    #[instrument(skip(self, code))]
    pub async fn exchange_code(&self, code: &str) -> Result<DiscordLogin, DiscordError> {
        let params = [
            ("client_id", self.inner.client_id.as_str()),
            ("client_secret", self.inner.client_secret.expose_secret()),
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.inner.redirect_uri.as_str()),
        ];

        let response = self
            .inner
            .client
            .post(format!("{}/oauth2/token", self.inner.api_base))
            .form(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(DiscordError::OAuth(text));
        }

        let token: TokenResponse = response.json().await?;
        let access_token = SecretString::from(token.access_token);

        let profile: DiscordProfile = self.get(&access_token, "/users/@me").await?;
        let guilds = self.fetch_guilds(&access_token).await?;

        debug!(discord_id = %profile.id, guilds = guilds.len(), "Discord login complete");

        Ok(DiscordLogin {
            access_token,
            profile,
            guilds,
        })
    }

    /// Fetch the guilds of the member owning `access_token`.
    ///
    /// # Errors
    ///
    /// Returns `DiscordError` if the token is no longer valid or the request fails.
    #[instrument(skip(self, access_token))]
    pub async fn fetch_guilds(
        &self,
        access_token: &SecretString,
    ) -> Result<Vec<DiscordGuild>, DiscordError> {
        self.get(access_token, "/users/@me/guilds").await
    }

    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        access_token: &SecretString,
        path: &str,
    ) -> Result<T, DiscordError> {
        let response = self
            .inner
            .client
            .get(format!("{}{path}", self.inner.api_base))
            .bearer_auth(access_token.expose_secret())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(DiscordError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> DiscordConfig {
        DiscordConfig {
            client_id: "1234".to_string(),
            client_secret: SecretString::from("client-secret-value"),
            redirect_uri: "https://api.club.example/auth/discord/callback".to_string(),
            guild_id: "42".to_string(),
            api_base: "https://discord.com/api/".to_string(),
        }
    }

    #[test]
    fn test_authorization_url() {
        let client = DiscordClient::new(&config());
        let url = client.authorization_url();
        assert!(url.starts_with("https://discord.com/api/oauth2/authorize?client_id=1234&"));
        assert!(url.contains(
            "redirect_uri=https%3A%2F%2Fapi.club.example%2Fauth%2Fdiscord%2Fcallback"
        ));
        assert!(url.ends_with("scope=identify%20email%20guilds"));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let client = DiscordClient::new(&config());
        let output = format!("{client:?}");
        assert!(!output.contains("client-secret-value"));
        assert_eq!(client.guild_id(), "42");
    }
}
