//! Core types for Shekels.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod login_code;
pub mod shekels;

pub use email::{Email, EmailError};
pub use id::*;
pub use login_code::{LoginCode, LoginCodeError};
pub use shekels::{InsufficientShekels, Shekels};
