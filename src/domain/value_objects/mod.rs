//! Value Objects for the storefront

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Money value object, always held at two decimal places.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(#[serde(with = "rust_decimal::serde::float")] Decimal);

impl Money {
    pub const SCALE: u32 = 2;

    /// Largest price a `NUMERIC(12, 2)` column holds.
    pub fn max_price() -> Decimal { Decimal::new(999_999_999_999, 2) }

    /// A price: non-negative and at most [`Money::max_price`] once rounded.
    pub fn new(amount: Decimal) -> Result<Self, MoneyError> {
        if amount.is_sign_negative() && !amount.is_zero() { return Err(MoneyError::Negative); }
        let money = Self::rounded(amount);
        if money.0 > Self::max_price() { return Err(MoneyError::TooLarge); }
        Ok(money)
    }

    pub fn zero() -> Self { Self(Decimal::ZERO) }

    /// Half-up rounding to cents.
    pub fn rounded(amount: Decimal) -> Self {
        Self(amount.round_dp_with_strategy(Self::SCALE, RoundingStrategy::MidpointAwayFromZero))
    }

    pub fn amount(&self) -> Decimal { self.0 }

    pub fn times(&self, quantity: i32) -> Result<Money, MoneyError> {
        self.0.checked_mul(Decimal::from(quantity)).map(Money).ok_or(MoneyError::Overflow)
    }

    pub fn checked_add(self, other: Money) -> Result<Money, MoneyError> {
        self.0.checked_add(other.0).map(Money).ok_or(MoneyError::Overflow)
    }
}

impl From<Money> for Decimal {
    fn from(money: Money) -> Decimal { money.0 }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MoneyError {
    #[error("amount must not be negative")]
    Negative,
    #[error("amount must not exceed 9999999999.99")]
    TooLarge,
    #[error("amount is too large to compute")]
    Overflow,
}
