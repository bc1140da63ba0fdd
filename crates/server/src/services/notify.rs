//! Webhook notifications for purchases and streaks.
//!
//! Delivery is best-effort and runs on a spawned task so it never delays a
//! response. A throttled webhook (HTTP 429, or 202 with a `retry_after`
//! body) is retried after the backoff it asks for, up to
//! [`MAX_ATTEMPTS`] times. Every other failure is logged and dropped.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, instrument, warn};

/// Embed color used for all notifications.
pub const EMBED_COLOR: u32 = 7_855_479;

/// Name the webhook posts under.
const SENDER_NAME: &str = "Shekels";

/// Attempts made before a throttled notification is dropped.
pub const MAX_ATTEMPTS: u32 = 3;

/// Backoff used when a throttled response does not say how long to wait.
const DEFAULT_BACKOFF: Duration = Duration::from_secs(5);

/// Longest backoff honored.
const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Errors from delivering a notification.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// HTTP request failed.
    #[error("webhook request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Webhook answered with an error status.
    #[error("webhook returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Still throttled after every attempt.
    #[error("webhook still throttled after {0} attempts")]
    Throttled(u32),
}

/// A notification to deliver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub footer: String,
}

impl Notification {
    #[must_use]
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            footer: String::new(),
        }
    }

    #[must_use]
    pub fn with_footer(mut self, footer: impl Into<String>) -> Self {
        self.footer = footer.into();
        self
    }
}

#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    embeds: [Embed<'a>; 1],
    username: &'a str,
}

#[derive(Debug, Serialize)]
struct Embed<'a> {
    title: &'a str,
    description: &'a str,
    color: u32,
    footer: Footer<'a>,
}

#[derive(Debug, Serialize)]
struct Footer<'a> {
    text: &'a str,
}

impl<'a> WebhookPayload<'a> {
    fn new(notification: &'a Notification) -> Self {
        Self {
            embeds: [Embed {
                title: &notification.title,
                description: &notification.body,
                color: EMBED_COLOR,
                footer: Footer {
                    text: &notification.footer,
                },
            }],
            username: SENDER_NAME,
        }
    }
}

/// Sends notifications to a webhook, or nowhere if none is configured.
#[derive(Clone)]
pub struct Notifier {
    client: Client,
    webhook: Option<SecretString>,
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier")
            .field("webhook", &self.webhook.as_ref().map(|_| "[REDACTED]"))
            .finish_non_exhaustive()
    }
}

impl Notifier {
    #[must_use]
    pub fn new(webhook: Option<SecretString>) -> Self {
        Self {
            client: Client::new(),
            webhook,
        }
    }

    /// A notifier that drops everything.
    #[must_use]
    pub fn disabled() -> Self {
        Self::new(None)
    }

    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.webhook.is_some()
    }

    /// Deliver `notification` in the background.
    pub fn notify(&self, notification: Notification) {
        if !self.is_enabled() {
            debug!(title = %notification.title, "Notifications disabled, dropping");
            return;
        }
        let notifier = self.clone();
        tokio::spawn(async move {
            if let Err(e) = notifier.deliver(&notification).await {
                warn!(error = %e, title = %notification.title, "Notification not delivered");
            }
        });
    }

    /// Deliver `notification` now, honoring throttling backoff.
    ///
    /// # Errors
    ///
    /// Returns `NotifyError` if the request fails, the webhook answers with
    /// an error, or it is still throttled after [`MAX_ATTEMPTS`].
    #[instrument(skip(self, notification), fields(title = %notification.title))]
    pub async fn deliver(&self, notification: &Notification) -> Result<(), NotifyError> {
        let Some(webhook) = &self.webhook else {
            return Ok(());
        };
        let payload = WebhookPayload::new(notification);

        for attempt in 1..=MAX_ATTEMPTS {
            let response = self
                .client
                .post(webhook.expose_secret())
                .json(&payload)
                .send()
                .await?;
            let status = response.status();
            let body = response.text().await.unwrap_or_default();

            if let Some(backoff) = throttle_backoff(status, &body) {
                debug!(attempt, backoff_secs = backoff.as_secs(), "Webhook throttled");
                if attempt < MAX_ATTEMPTS {
                    tokio::time::sleep(backoff).await;
                }
                continue;
            }

            if !status.is_success() {
                return Err(NotifyError::Status {
                    status: status.as_u16(),
                    body,
                });
            }

            debug!(attempt, "Notification delivered");
            return Ok(());
        }

        Err(NotifyError::Throttled(MAX_ATTEMPTS))
    }
}

/// The backoff a throttled response asks for, or `None` if not throttled.
///
/// `retry_after` may be a number of seconds or an object with a
/// `retry-after` field.
fn throttle_backoff(status: StatusCode, body: &str) -> Option<Duration> {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let retry_after = parsed.as_ref().and_then(|v| v.get("retry_after"));

    let throttled = status == StatusCode::TOO_MANY_REQUESTS
        || (status == StatusCode::ACCEPTED && retry_after.is_some());
    if !throttled {
        return None;
    }

    let seconds = retry_after
        .and_then(|v| v.as_f64().or_else(|| v.get("retry-after")?.as_f64()))
        .filter(|s| s.is_finite() && *s > 0.0);
    Some(seconds.map_or(DEFAULT_BACKOFF, |s| {
        Duration::from_secs_f64(s).min(MAX_BACKOFF)
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_throttle_backoff() {
        assert_eq!(throttle_backoff(StatusCode::OK, ""), None);
        assert_eq!(
            throttle_backoff(StatusCode::ACCEPTED, r#"{"queued": true}"#),
            None
        );
        assert_eq!(
            throttle_backoff(StatusCode::TOO_MANY_REQUESTS, r#"{"retry_after": 1.5}"#),
            Some(Duration::from_millis(1_500))
        );
        assert_eq!(
            throttle_backoff(StatusCode::ACCEPTED, r#"{"retry_after": {"retry-after": 2}}"#),
            Some(Duration::from_secs(2))
        );
        assert_eq!(
            throttle_backoff(StatusCode::TOO_MANY_REQUESTS, "slow down"),
            Some(DEFAULT_BACKOFF)
        );
        assert_eq!(
            throttle_backoff(StatusCode::TOO_MANY_REQUESTS, r#"{"retry_after": 9000}"#),
            Some(MAX_BACKOFF)
        );
    }

    #[test]
    fn test_payload_shape() {
        let notification =
            Notification::new("New Purchase", "Ada bought a sticker").with_footer("1 owned.");
        let payload = serde_json::to_value(WebhookPayload::new(&notification)).unwrap();

        assert_eq!(payload["username"], "Shekels");
        assert_eq!(payload["embeds"][0]["title"], "New Purchase");
        assert_eq!(payload["embeds"][0]["color"], EMBED_COLOR);
        assert_eq!(payload["embeds"][0]["footer"]["text"], "1 owned.");
    }

    #[tokio::test]
    async fn test_disabled_notifier_is_noop() {
        let notifier = Notifier::disabled();
        assert!(!notifier.is_enabled());
        notifier.notify(Notification::new("t", "b"));
        notifier.deliver(&Notification::new("t", "b")).await.unwrap();
    }
}
