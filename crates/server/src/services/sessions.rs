//! Session tokens and one-time login codes.
//!
//! Session tokens are HS256 JWTs carrying the account id. A token is only
//! honored while it is also present in the account's token set, so logout
//! works by removing it from the set.
//!
//! Login codes move a session to a second device: a signed-in member asks
//! for a six-digit code, types it on the other device, and that device
//! exchanges it for a fresh session token.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use shekels_core::{AccountId, LoginCode};

use crate::models::PendingLoginCode;
use crate::store::Transaction;

/// How long a session token stays valid.
pub const SESSION_VALIDITY: Duration = Duration::days(7);

/// How long a login code stays valid.
pub const LOGIN_CODE_TTL: Duration = Duration::minutes(15);

/// Rejections from the login code flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LoginCodeRejection {
    /// No account holds this code.
    #[error("Invalid Code")]
    InvalidCode,

    /// The code exists but has expired. A new code must be requested.
    #[error("Expired login code.")]
    ExpiredCode,
}

/// Errors from issuing sessions or login codes.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Signing the token failed.
    #[error("failed to sign session token: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),

    /// The login code was rejected.
    #[error(transparent)]
    LoginCode(#[from] LoginCodeRejection),

    /// The account disappeared between resolution and mutation.
    #[error("account {0} not found")]
    UnknownAccount(AccountId),
}

/// Claims embedded in a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Account the token belongs to.
    pub id: AccountId,
    /// Random token id, so two tokens minted in the same second differ.
    pub jti: Uuid,
    pub iat: i64,
    pub exp: i64,
}

/// A login code handed to a member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IssuedLoginCode {
    pub code: LoginCode,
    /// Time left before the code expires.
    pub ttl: Duration,
    /// Whether an outstanding code was returned instead of a new one.
    pub reused: bool,
}

/// Mints and verifies session tokens, and manages login codes.
#[derive(Clone)]
pub struct SessionIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl std::fmt::Debug for SessionIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionIssuer")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

impl SessionIssuer {
    #[must_use]
    pub fn new(signing_key: &SecretString) -> Self {
        let secret = signing_key.expose_secret().as_bytes();
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }

    /// Sign a session token for `account_id`, valid for [`SESSION_VALIDITY`].
    ///
    /// The caller adds the token to the account's token set and commits.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Signing` if encoding fails.
    pub fn issue(&self, account_id: AccountId, now: DateTime<Utc>) -> Result<String, SessionError> {
        let claims = SessionClaims {
            id: account_id,
            jti: Uuid::new_v4(),
            iat: now.timestamp(),
            exp: (now + SESSION_VALIDITY).timestamp(),
        };
        Ok(jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.encoding,
        )?)
    }

    /// Decode and check a token's signature and expiry.
    ///
    /// Returns `None` for anything that is not a valid, unexpired token.
    #[must_use]
    pub fn verify(&self, token: &str) -> Option<SessionClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);
        jsonwebtoken::decode::<SessionClaims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .ok()
    }

    /// Return the account's live login code, or draw and store a new one.
    ///
    /// A new code never collides with another account's live code.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::UnknownAccount` if the account is missing.
    pub fn issue_or_reuse_login_code(
        &self,
        tx: &mut Transaction,
        account_id: AccountId,
        now: DateTime<Utc>,
    ) -> Result<IssuedLoginCode, SessionError> {
        let account = tx
            .get(&account_id)
            .ok_or(SessionError::UnknownAccount(account_id))?;

        if let Some(pending) = account.live_login_code(now) {
            return Ok(IssuedLoginCode {
                code: pending.code,
                ttl: pending.remaining(now),
                reused: true,
            });
        }

        let code = loop {
            let candidate = LoginCode::generate();
            if tx.by_live_code(candidate, now).is_none() {
                break candidate;
            }
        };

        let account = tx
            .get_mut(&account_id)
            .ok_or(SessionError::UnknownAccount(account_id))?;
        account.login_code = Some(PendingLoginCode {
            code,
            expires_at: now + LOGIN_CODE_TTL,
        });

        Ok(IssuedLoginCode {
            code,
            ttl: LOGIN_CODE_TTL,
            reused: false,
        })
    }

    /// Consume `code` and mint a session token for its account.
    ///
    /// On success the code is cleared, so it cannot be used twice.
    ///
    /// # Errors
    ///
    /// Returns `LoginCodeRejection::InvalidCode` if no account holds the
    /// code, `LoginCodeRejection::ExpiredCode` if it has expired, or
    /// `SessionError::Signing` if minting fails.
    pub fn exchange_login_code(
        &self,
        tx: &mut Transaction,
        code: LoginCode,
        now: DateTime<Utc>,
    ) -> Result<(AccountId, String), SessionError> {
        let account_id = match tx.by_live_code(code, now) {
            Some(account) => account.id,
            None if tx.by_any_code(code).is_some() => {
                return Err(LoginCodeRejection::ExpiredCode.into());
            }
            None => return Err(LoginCodeRejection::InvalidCode.into()),
        };

        let token = self.issue(account_id, now)?;

        let account = tx
            .get_mut(&account_id)
            .ok_or(SessionError::UnknownAccount(account_id))?;
        account.login_code = None;
        account.tokens.insert(token.clone());

        Ok((account_id, token))
    }
}
