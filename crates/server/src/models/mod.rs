//! Domain models for the Shekels server.
//!
//! # Models
//!
//! - [`account`] - Member accounts, owned items and pending login codes
//! - [`catalog`] - Purchasable catalog items
//! - [`public`] - Public projections returned by the API
//! - `record` - Stored account records in the current and legacy layouts

pub mod account;
pub mod catalog;
pub mod public;
mod record;

pub use account::{Account, DiscordGuild, DiscordProfile, OwnedItem, PendingLoginCode, name_key};
pub use catalog::{Catalog, CatalogItem};
pub use public::{AccountProfile, PublicAccount};
