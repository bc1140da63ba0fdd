//! Resolve a presented credential to an account.
//!
//! A request can carry its credential in several places. They are checked
//! in a fixed order and the first one found wins:
//!
//! 1. `discordAuth` query parameter
//! 2. `discordAuth` field of a JSON body
//! 3. `token` header (or `Authorization: Bearer`)
//! 4. `token` query parameter
//! 5. `token` field of a JSON body
//!
//! Resolution always reloads the account store, so a request sees every
//! write committed before it started.

use serde_json::Value;

use crate::models::Account;
use crate::services::sessions::SessionIssuer;
use crate::store::{AccountStore, StoreError};

/// Where a credential was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    OAuthQuery,
    OAuthBody,
    Header,
    Query,
    Body,
}

/// A credential presented with a request.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub source: CredentialSource,
    pub token: String,
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("source", &self.source)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

/// The places a credential may appear in one request.
#[derive(Debug, Default, Clone, Copy)]
pub struct CredentialSources<'a> {
    pub query_oauth: Option<&'a str>,
    pub body: Option<&'a Value>,
    pub header: Option<&'a str>,
    pub query_token: Option<&'a str>,
}

impl CredentialSources<'_> {
    /// Pick the highest-priority non-empty credential.
    #[must_use]
    pub fn pick(&self) -> Option<Credential> {
        let body_field = |name: &str| {
            self.body
                .and_then(|body| body.get(name))
                .and_then(Value::as_str)
        };

        [
            (CredentialSource::OAuthQuery, self.query_oauth),
            (CredentialSource::OAuthBody, body_field("discordAuth")),
            (CredentialSource::Header, self.header),
            (CredentialSource::Query, self.query_token),
            (CredentialSource::Body, body_field("token")),
        ]
        .into_iter()
        .find_map(|(source, value)| {
            let token = value.map(str::trim).filter(|t| !t.is_empty())?;
            Some(Credential {
                source,
                token: token.to_owned(),
            })
        })
    }
}

/// Outcome of resolving a request's credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The credential belongs to this account.
    Resolved(Box<Account>),
    /// The request carried no credential.
    NoCredential,
    /// A credential was presented but matches no account.
    UnknownCredential,
}

impl Resolution {
    /// The resolved account, if any.
    #[must_use]
    pub fn into_account(self) -> Option<Account> {
        match self {
            Self::Resolved(account) => Some(*account),
            Self::NoCredential | Self::UnknownCredential => None,
        }
    }
}

/// Look up the account holding `credential`.
///
/// The token must verify (signature, expiry) and still be present in the
/// token set of the account it names.
///
/// # Errors
///
/// Returns `StoreError` if the store cannot be loaded. A missing or unknown
/// credential is a [`Resolution`], not an error.
pub async fn resolve(
    store: &AccountStore,
    sessions: &SessionIssuer,
    credential: Option<&Credential>,
) -> Result<Resolution, StoreError> {
    let Some(credential) = credential else {
        return Ok(Resolution::NoCredential);
    };
    let Some(claims) = sessions.verify(&credential.token) else {
        return Ok(Resolution::UnknownCredential);
    };

    let snapshot = store.load().await?;
    let resolution = snapshot
        .by_token(&credential.token)
        .filter(|account| account.id == claims.id)
        .map_or(Resolution::UnknownCredential, |account| {
            Resolution::Resolved(Box::new(account.clone()))
        });
    Ok(resolution)
}
