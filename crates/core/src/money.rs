//! Integer-cent money arithmetic.
//!
//! Purchase prices arrive from the data service as decimal numbers. They
//! are converted to cents once, at the boundary, so running totals add and
//! subtract exactly.
//!
//! Arithmetic is checked: a result outside the `i64` cent range is an
//! error and leaves nothing half-applied, so `add(p)` followed by
//! `subtract(p)` restores the starting value whenever both succeed.

use serde::{Deserialize, Serialize};

/// A sum or difference left the representable cent range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Money amount out of range")]
pub struct MoneyOverflow;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    /// Convert a decimal amount in major units (e.g. `59.99`), rounding to
    /// the nearest cent. Non-finite input is treated as zero.
    pub fn from_major(amount: f64) -> Self {
        if !amount.is_finite() {
            return Self::ZERO;
        }
        Self((amount * 100.0).round() as i64)
    }

    pub fn cents(self) -> i64 {
        self.0
    }

    pub fn as_major(self) -> f64 {
        self.0 as f64 / 100.0
    }

    pub fn checked_add(self, rhs: Money) -> Result<Money, MoneyOverflow> {
        self.0.checked_add(rhs.0).map(Money).ok_or(MoneyOverflow)
    }

    pub fn checked_sub(self, rhs: Money) -> Result<Money, MoneyOverflow> {
        self.0.checked_sub(rhs.0).map(Money).ok_or(MoneyOverflow)
    }

    /// Sum `amounts`, failing on the first overflow.
    pub fn checked_sum(amounts: impl IntoIterator<Item = Money>) -> Result<Money, MoneyOverflow> {
        amounts
            .into_iter()
            .try_fold(Money::ZERO, |acc, amount| acc.checked_add(amount))
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}
