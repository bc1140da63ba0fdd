//! Shekel balances.
//!
//! Balances are whole numbers and can never go below zero. All arithmetic is
//! checked: a debit larger than the balance is an error carrying the deficit.

use core::fmt;

use serde::{Deserialize, Serialize};

/// A non-negative amount of Shekels.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Shekels(u64);

/// Returned when a debit would take a balance below zero.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("{deficit} more Shekels needed")]
pub struct InsufficientShekels {
    /// How many Shekels the balance is short by.
    pub deficit: Shekels,
}

impl Shekels {
    /// Zero Shekels.
    pub const ZERO: Self = Self(0);

    /// Create an amount.
    #[must_use]
    pub const fn new(amount: u64) -> Self {
        Self(amount)
    }

    /// Get the raw amount.
    #[must_use]
    pub const fn amount(self) -> u64 {
        self.0
    }

    /// Add two amounts, saturating at `u64::MAX`.
    #[must_use]
    pub const fn credit(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    /// Subtract `price` from this balance.
    ///
    /// # Errors
    ///
    /// Returns [`InsufficientShekels`] with the missing amount when the
    /// balance is smaller than `price`.
    pub const fn debit(self, price: Self) -> Result<Self, InsufficientShekels> {
        match self.0.checked_sub(price.0) {
            Some(rest) => Ok(Self(rest)),
            None => Err(InsufficientShekels {
                deficit: Self(price.0 - self.0),
            }),
        }
    }

    /// Subtract `price`, flooring at zero.
    #[must_use]
    pub const fn saturating_debit(self, price: Self) -> Self {
        Self(self.0.saturating_sub(price.0))
    }
}

impl fmt::Display for Shekels {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Shekels {
    fn from(amount: u64) -> Self {
        Self(amount)
    }
}

impl From<Shekels> for u64 {
    fn from(amount: Shekels) -> Self {
        amount.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_debit_within_balance() {
        let balance = Shekels::new(12);
        assert_eq!(balance.debit(Shekels::new(10)).unwrap(), Shekels::new(2));
    }

    #[test]
    fn test_debit_exact_balance_leaves_zero() {
        let balance = Shekels::new(10);
        assert_eq!(balance.debit(Shekels::new(10)).unwrap(), Shekels::ZERO);
    }

    #[test]
    fn test_debit_reports_deficit() {
        let err = Shekels::new(5).debit(Shekels::new(10)).unwrap_err();
        assert_eq!(err.deficit, Shekels::new(5));
        assert_eq!(err.to_string(), "5 more Shekels needed");
    }

    #[test]
    fn test_saturating_debit_floors_at_zero() {
        assert_eq!(
            Shekels::new(3).saturating_debit(Shekels::new(10)),
            Shekels::ZERO
        );
    }

    #[test]
    fn test_credit_saturates() {
        assert_eq!(
            Shekels::new(u64::MAX).credit(Shekels::new(1)),
            Shekels::new(u64::MAX)
        );
    }
}
