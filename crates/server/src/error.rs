//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures server-side failures to
//! Sentry before responding. All route handlers return `Result<T, AppError>`.
//!
//! Every error response has the body `{"success": false, "message": ...}`.
//! Business-rule rejections carry their own human-readable reason; internal
//! failures are reduced to a generic message.

use std::time::Duration;

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Map, Value, json};
use thiserror::Error;

use crate::discord::DiscordError;
use crate::services::admin::AdminRejection;
use crate::services::claims::ClaimRejection;
use crate::services::preferences::PreferencesRejection;
use crate::services::purchases::PurchaseRejection;
use crate::services::sessions::{LoginCodeRejection, SessionError};
use crate::services::streaks::StreakRejection;
use crate::store::StoreError;

const INTERNAL_MESSAGE: &str = "An internal server error occurred, please try again later.";
const UPSTREAM_MESSAGE: &str = "Unable to verify your Discord account. Try signing out and back in via Discord or contact a club officer.";
const RATE_LIMITED_MESSAGE: &str =
    "You've sent too many requests to this endpoint. Please try again later.";

/// Application-level error type for the server.
#[derive(Debug, Error)]
pub enum AppError {
    /// No credential, or one that matches no account.
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed request.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Too many requests from this client.
    #[error("Rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    /// Discord could not be reached or rejected the stored token.
    #[error("Discord error: {0}")]
    Upstream(#[from] DiscordError),

    /// Store operation failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Session or login code operation failed.
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error(transparent)]
    Purchase(#[from] PurchaseRejection),

    #[error(transparent)]
    Claim(#[from] ClaimRejection),

    #[error(transparent)]
    Streak(#[from] StreakRejection),

    #[error(transparent)]
    Preferences(#[from] PreferencesRejection),

    #[error(transparent)]
    Admin(#[from] AdminRejection),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<LoginCodeRejection> for AppError {
    fn from(rejection: LoginCodeRejection) -> Self {
        Self::Session(rejection.into())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl AppError {
    /// The missing or unknown credential error.
    #[must_use]
    pub fn invalid_token() -> Self {
        Self::Unauthenticated("Invalid token.".to_string())
    }

    /// The no-credential error.
    #[must_use]
    pub fn no_token() -> Self {
        Self::Unauthenticated("No token provided.".to_string())
    }

    /// Whether this is a server-side failure that should reach Sentry.
    const fn is_internal(&self) -> bool {
        matches!(
            self,
            Self::Store(_)
                | Self::Internal(_)
                | Self::Session(SessionError::Signing(_))
                | Self::Purchase(PurchaseRejection::LifetimeOutOfRange(_))
                | Self::Upstream(_)
        )
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::Store(_)
            | Self::Internal(_)
            | Self::Purchase(PurchaseRejection::LifetimeOutOfRange(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::Session(err) => match err {
                SessionError::Signing(_) => StatusCode::INTERNAL_SERVER_ERROR,
                SessionError::LoginCode(LoginCodeRejection::InvalidCode) => StatusCode::NOT_FOUND,
                SessionError::LoginCode(LoginCodeRejection::ExpiredCode) => StatusCode::FORBIDDEN,
                SessionError::UnknownAccount(_) => StatusCode::UNAUTHORIZED,
            },
            Self::Purchase(PurchaseRejection::ItemNotFound(_)) => StatusCode::NOT_FOUND,
            Self::Purchase(PurchaseRejection::UnknownAccount(_))
            | Self::Claim(ClaimRejection::UnknownAccount(_))
            | Self::Preferences(PreferencesRejection::UnknownAccount(_)) => {
                StatusCode::UNAUTHORIZED
            }
            Self::Purchase(_)
            | Self::Claim(_)
            | Self::Streak(_)
            | Self::Preferences(_)
            | Self::Admin(_) => StatusCode::FORBIDDEN,
        }
    }

    fn message(&self) -> String {
        match self {
            Self::Store(_)
            | Self::Internal(_)
            | Self::Session(SessionError::Signing(_))
            | Self::Purchase(PurchaseRejection::LifetimeOutOfRange(_)) => {
                INTERNAL_MESSAGE.to_string()
            }
            Self::Upstream(_) => UPSTREAM_MESSAGE.to_string(),
            Self::RateLimited { .. } => RATE_LIMITED_MESSAGE.to_string(),
            Self::Session(SessionError::UnknownAccount(_))
            | Self::Purchase(PurchaseRejection::UnknownAccount(_))
            | Self::Claim(ClaimRejection::UnknownAccount(_))
            | Self::Preferences(PreferencesRejection::UnknownAccount(_)) => {
                "Invalid token.".to_string()
            }
            Self::Unauthenticated(msg) | Self::NotFound(msg) | Self::BadRequest(msg) => {
                msg.clone()
            }
            Self::Session(SessionError::LoginCode(rejection)) => rejection.to_string(),
            Self::Purchase(rejection) => rejection.to_string(),
            Self::Claim(rejection) => rejection.to_string(),
            Self::Streak(rejection) => rejection.to_string(),
            Self::Preferences(rejection) => rejection.to_string(),
            Self::Admin(rejection) => rejection.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if self.is_internal() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let status = self.status();
        let mut body = Map::new();
        body.insert("success".to_string(), Value::Bool(false));
        body.insert("message".to_string(), Value::String(self.message()));

        match &self {
            Self::RateLimited { retry_after } => {
                let millis = u64::try_from(retry_after.as_millis()).unwrap_or(u64::MAX);
                body.insert("retryAfter".to_string(), json!(millis));
            }
            Self::Upstream(_) => {
                body.insert("bad_token".to_string(), Value::Bool(true));
                body.insert("logout".to_string(), Value::Bool(true));
            }
            _ => {}
        }

        (status, Json(Value::Object(body))).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from an account ID.
///
/// Call this after resolving the caller to associate errors with accounts.
pub fn set_sentry_user(account_id: &impl ToString, name: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(account_id.to_string()),
            username: name.map(String::from),
            ..Default::default()
        }));
    });
}

/// Add a breadcrumb for account actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of actions
/// leading up to an error.
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::to_bytes;

    use shekels_core::{ItemId, Shekels};

    use super::*;

    async fn body_of(err: AppError) -> (StatusCode, Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_app_error_status_codes() {
        fn get_status(err: AppError) -> StatusCode {
            err.into_response().status()
        }

        assert_eq!(get_status(AppError::no_token()), StatusCode::UNAUTHORIZED);
        assert_eq!(
            get_status(AppError::NotFound("test".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(PurchaseRejection::ItemNotFound(ItemId::new("x")).into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(PurchaseRejection::ItemExpired.into()),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            get_status(LoginCodeRejection::InvalidCode.into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(LoginCodeRejection::ExpiredCode.into()),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            get_status(ClaimRejection::NotFullName.into()),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            get_status(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_rejection_body_carries_reason() {
        let (status, body) = body_of(
            PurchaseRejection::InsufficientShekels {
                deficit: Shekels::new(5),
            }
            .into(),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["success"], false);
        assert_eq!(
            body["message"],
            "You need 5 more Shekels to purchase this item."
        );
    }

    #[tokio::test]
    async fn test_internal_errors_are_generic() {
        let (_, body) =
            body_of(StoreError::DataCorruption("duplicate account id 42".to_string()).into())
                .await;
        let message = body["message"].as_str().unwrap();
        assert!(!message.contains("duplicate"));
        assert_eq!(message, INTERNAL_MESSAGE);

        let (status, body) =
            body_of(PurchaseRejection::LifetimeOutOfRange(ItemId::new("pass")).into()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], INTERNAL_MESSAGE);
    }

    #[tokio::test]
    async fn test_rate_limited_reports_retry_after_millis() {
        let (status, body) = body_of(AppError::RateLimited {
            retry_after: Duration::from_millis(42_500),
        })
        .await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body["retryAfter"], 42_500);
    }

    #[tokio::test]
    async fn test_upstream_asks_for_logout() {
        let (status, body) =
            body_of(DiscordError::OAuth("invalid_grant".to_string()).into()).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["bad_token"], true);
        assert_eq!(body["logout"], true);
    }
}
