//! Rate limiting middleware for the login code exchange.
//!
//! Requests are keyed by the real client address, taken from proxy headers
//! when present, and checked against the shared [`RateLimiter`].
//!
//! [`RateLimiter`]: crate::services::rate_limit::RateLimiter

use std::net::{IpAddr, SocketAddr};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

use crate::error::AppError;
use crate::services::rate_limit::RateDecision;
use crate::state::AppState;

/// Key used when no client address can be found.
pub const UNKNOWN_CLIENT: &str = "unknown";

// =============================================================================
// Client Key Extraction
// =============================================================================

/// Find the client address for rate limiting.
///
/// Checks Cloudflare's `CF-Connecting-IP` first, then the first entry of
/// `X-Forwarded-For`, then `X-Real-IP`, then the socket peer.
#[must_use]
pub fn client_key(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    let header_ip = |name: &str, first_only: bool| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| if first_only { s.split(',').next() } else { Some(s) })
            .and_then(|s| s.trim().parse::<IpAddr>().ok())
    };

    header_ip("cf-connecting-ip", false)
        .or_else(|| header_ip("x-forwarded-for", true))
        .or_else(|| header_ip("x-real-ip", false))
        .or_else(|| peer.map(|addr| addr.ip()))
        .map_or_else(|| UNKNOWN_CLIENT.to_string(), |ip| ip.to_string())
}

// =============================================================================
// Middleware
// =============================================================================

/// Reject clients that exceed the login code exchange limit with 429.
///
/// # Errors
///
/// Returns `AppError::RateLimited` with the remaining block time.
pub async fn login_rate_limit(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let key = client_key(request.headers(), peer);

    match state.limiter().check(&key) {
        RateDecision::Allowed => Ok(next.run(request).await),
        RateDecision::Limited { retry_after } => {
            tracing::warn!(client = %key, retry_after_ms = retry_after.as_millis(), "Login rate limited");
            Err(AppError::RateLimited { retry_after })
        }
    }
}
