//! HTTP middleware stack.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layer (capture errors)
//! 2. `TraceLayer` (request tracing)
//! 3. CORS (the leaderboard frontend is served from another origin)
//! 4. Credential extraction (query, header and JSON body tokens)
//! 5. Rate limiting (login code exchange only)

pub mod auth;
pub mod credentials;
pub mod json;
pub mod rate_limit;

pub use auth::RequireAuth;
pub use credentials::extract_credential;
pub use json::ApiJson;
pub use rate_limit::{client_key, login_rate_limit};
