//! Business logic for the Shekels server.
//!
//! # Services
//!
//! - [`sessions`] - Session tokens and one-time login codes
//! - [`identity`] - Resolve a request credential to an account
//! - [`claims`] - Claim an account and merge a matching streak account
//! - [`purchases`] - Spend Shekels on catalog items
//! - [`leaderboard`] - Public, sorted view of claimed accounts
//! - [`streaks`] - Weekly visit streak rewards
//! - [`preferences`] - Member-editable display names
//! - [`admin`] - Officer bulk updates
//! - [`rate_limit`] - Per-client throttle for the login code exchange
//! - [`notify`] - Webhook notifications
//! - [`audit`] - Audit trail of account events
//!
//! Engines that mutate accounts take a [`crate::store::Transaction`] and an
//! explicit `now`, and leave committing to the caller.

pub mod admin;
pub mod audit;
pub mod claims;
pub mod identity;
pub mod leaderboard;
pub mod notify;
pub mod preferences;
pub mod purchases;
pub mod rate_limit;
pub mod sessions;
pub mod streaks;
