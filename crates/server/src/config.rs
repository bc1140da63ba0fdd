//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `SHEKELS_SIGNING_KEY` - Session token signing key (min 32 chars, high entropy)
//! - `SHEKELS_BUMP_KEY` - Shared key for the streak kiosk
//! - `SHEKELS_LEADERBOARD_URL` - Where the OAuth callback sends members afterwards
//! - `DISCORD_CLIENT_ID` - Discord OAuth client ID
//! - `DISCORD_CLIENT_SECRET` - Discord OAuth client secret
//! - `DISCORD_REDIRECT_URI` - Discord OAuth redirect URI (this server's callback)
//! - `DISCORD_GUILD_ID` - Guild a member must belong to before claiming
//!
//! ## Optional
//! - `SHEKELS_HOST` - Bind address (default: 127.0.0.1)
//! - `SHEKELS_PORT` - Listen port (default: 8080)
//! - `SHEKELS_DATA_DIR` - Directory holding `users.json` and `store.json` (default: data)
//! - `SHEKELS_NOTIFY_WEBHOOK` - Webhook for purchase/streak notifications
//! - `SHEKELS_DEBUG_ACCOUNT_ID` - Account allowed to purchase without enough Shekels
//! - `SHEKELS_NAME_DENYLIST` - Comma-separated substrings that need officer approval
//! - `DISCORD_API_BASE` - Discord API base URL (default: https://discord.com/api)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use secrecy::{ExposeSecret, SecretString};
use shekels_core::AccountId;
use thiserror::Error;

const MIN_SIGNING_KEY_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Discord API base URL used when `DISCORD_API_BASE` is unset.
pub const DEFAULT_DISCORD_API_BASE: &str = "https://discord.com/api";

/// File name of the account store inside the data directory.
pub const ACCOUNTS_FILE: &str = "users.json";

/// File name of the catalog inside the data directory.
pub const CATALOG_FILE: &str = "store.json";

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "password",
    "xxx",
    "todo",
    "insert",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Directory holding the account store and catalog files
    pub data_dir: PathBuf,
    /// HMAC key for session tokens
    pub signing_key: SecretString,
    /// Shared key the streak kiosk presents
    pub bump_key: SecretString,
    /// Leaderboard page the OAuth callback redirects to
    pub leaderboard_url: String,
    /// Discord OAuth and guild settings
    pub discord: DiscordConfig,
    /// Notification webhook (notifications are disabled when absent)
    pub notify_webhook: Option<SecretString>,
    /// Account exempt from the balance check when purchasing
    pub debug_account_id: Option<AccountId>,
    /// Lowercased substrings that block a name until an officer approves it
    pub name_denylist: Vec<String>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g. "production")
    pub sentry_environment: Option<String>,
}

/// Discord OAuth configuration.
///
/// Implements `Debug` manually to redact the client secret.
#[derive(Clone)]
pub struct DiscordConfig {
    /// OAuth client ID
    pub client_id: String,
    /// OAuth client secret
    pub client_secret: SecretString,
    /// Callback URL registered with Discord
    pub redirect_uri: String,
    /// Guild whose members may claim accounts
    pub guild_id: String,
    /// Discord API base URL
    pub api_base: String,
}

impl std::fmt::Debug for DiscordConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscordConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("redirect_uri", &self.redirect_uri)
            .field("guild_id", &self.guild_id)
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if the signing key fails validation (length, placeholder, entropy).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = get_env_or_default("SHEKELS_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("SHEKELS_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("SHEKELS_PORT", "8080")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("SHEKELS_PORT".to_string(), e.to_string()))?;
        let data_dir = PathBuf::from(get_env_or_default("SHEKELS_DATA_DIR", "data"));

        let signing_key = get_validated_secret("SHEKELS_SIGNING_KEY")?;
        validate_key_length(&signing_key, "SHEKELS_SIGNING_KEY")?;
        let bump_key = get_required_secret("SHEKELS_BUMP_KEY")?;
        let leaderboard_url = get_required_env("SHEKELS_LEADERBOARD_URL")?;

        let debug_account_id = get_optional_env("SHEKELS_DEBUG_ACCOUNT_ID")
            .map(|raw| {
                raw.parse::<AccountId>().map_err(|e| {
                    ConfigError::InvalidEnvVar("SHEKELS_DEBUG_ACCOUNT_ID".to_string(), e.to_string())
                })
            })
            .transpose()?;

        Ok(Self {
            host,
            port,
            data_dir,
            signing_key,
            bump_key,
            leaderboard_url,
            discord: DiscordConfig::from_env()?,
            notify_webhook: get_optional_env("SHEKELS_NOTIFY_WEBHOOK").map(SecretString::from),
            debug_account_id,
            name_denylist: parse_denylist(&get_env_or_default("SHEKELS_NAME_DENYLIST", "")),
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Path of the account store file.
    #[must_use]
    pub fn accounts_path(&self) -> PathBuf {
        self.data_dir.join(ACCOUNTS_FILE)
    }

    /// Path of the catalog file.
    #[must_use]
    pub fn catalog_path(&self) -> PathBuf {
        self.data_dir.join(CATALOG_FILE)
    }
}

impl DiscordConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            client_id: get_required_env("DISCORD_CLIENT_ID")?,
            client_secret: get_required_secret("DISCORD_CLIENT_SECRET")?,
            redirect_uri: get_required_env("DISCORD_REDIRECT_URI")?,
            guild_id: get_required_env("DISCORD_GUILD_ID")?,
            api_base: get_env_or_default("DISCORD_API_BASE", DEFAULT_DISCORD_API_BASE)
                .trim_end_matches('/')
                .to_string(),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Split a comma-separated denylist into trimmed, lowercased, non-empty entries.
#[must_use]
pub fn parse_denylist(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|entry| entry.trim().to_lowercase())
        .filter(|entry| !entry.is_empty())
        .collect()
}

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get a required environment variable as a secret.
fn get_required_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    Ok(SecretString::from(value))
}

/// Get an optional environment variable, treating empty values as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Validate that a signing key meets the minimum length.
fn validate_key_length(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let len = secret.expose_secret().len();
    if len < MIN_SIGNING_KEY_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!("must be at least {MIN_SIGNING_KEY_LENGTH} characters (got {len})"),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // Key length will never exceed f64 precision
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)]
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Reject placeholder values and low-entropy secrets.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    if let Some(pattern) = PLACEHOLDER_PATTERNS.iter().find(|p| lower.contains(*p)) {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!("appears to be a placeholder (contains '{pattern}')"),
        ));
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use `shekels-cli secret generate`."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}
