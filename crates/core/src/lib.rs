//! Shekels Core - Shared domain types.
//!
//! This crate provides the types shared by every Shekels component:
//! - `server` - Account, session, claim and purchase API
//! - `cli` - Operator tooling over the same data files
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP, no persistence.
//! Validation that can be done without touching storage lives here so the
//! server and the CLI agree on it.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for ids, balances, emails and login codes

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
