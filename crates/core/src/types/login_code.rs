//! One-time login codes for moving a session to a second device.

use core::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`LoginCode`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum LoginCodeError {
    /// The input is not a number.
    #[error("login code must be numeric")]
    NotNumeric,
    /// The number is not six digits long.
    #[error("login code must be exactly six digits")]
    OutOfRange,
}

/// A six-digit numeric login code in `100000..=999999`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct LoginCode(u32);

impl LoginCode {
    /// Smallest valid code.
    pub const MIN: u32 = 100_000;
    /// Largest valid code.
    pub const MAX: u32 = 999_999;

    /// Draw a uniformly random code.
    #[must_use]
    pub fn generate() -> Self {
        Self(rand::rng().random_range(Self::MIN..=Self::MAX))
    }

    /// Parse a code typed by a member.
    ///
    /// # Errors
    ///
    /// Returns [`LoginCodeError`] if the input is not a six-digit number.
    pub fn parse(s: &str) -> Result<Self, LoginCodeError> {
        let value: u32 = s.trim().parse().map_err(|_| LoginCodeError::NotNumeric)?;
        Self::try_from(value)
    }

    /// Get the numeric value.
    #[must_use]
    pub const fn value(self) -> u32 {
        self.0
    }
}

impl TryFrom<u32> for LoginCode {
    type Error = LoginCodeError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(LoginCodeError::OutOfRange)
        }
    }
}

impl From<LoginCode> for u32 {
    fn from(code: LoginCode) -> Self {
        code.0
    }
}

impl fmt::Display for LoginCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
