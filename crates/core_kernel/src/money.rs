//! Money types with precise decimal arithmetic
//!
//! This module provides a type-safe representation of monetary values
//! using rust_decimal for precise calculations without floating-point errors.
//! The billing engine is single-currency (EUR, two decimal places); all
//! allocation helpers conserve the original amount to the cent.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};
use thiserror::Error;

/// Number of decimal places for currency amounts
const CURRENCY_DP: u32 = 2;

/// Errors that can occur during money operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoneyError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Total weight is zero")]
    ZeroTotalWeight,
}

/// A monetary amount in the building's currency
///
/// Money uses rust_decimal for precise arithmetic without floating-point
/// errors. Amounts are stored with 4 decimal places internally so that
/// intermediate share calculations do not lose precision; `round_to_cents`
/// produces the 2-decimal value that is actually billed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    /// Creates a new Money value
    pub fn new(amount: Decimal) -> Self {
        Self(amount.round_dp(4))
    }

    /// Creates Money from an integer amount of cents
    pub fn from_cents(cents: i64) -> Self {
        Self(Decimal::new(cents, CURRENCY_DP))
    }

    /// Returns the zero amount
    pub fn zero() -> Self {
        Self(dec!(0))
    }

    /// Returns the raw decimal amount
    pub fn amount(&self) -> Decimal {
        self.0
    }

    /// Returns the amount as a whole number of cents, rounding half away from zero
    pub fn as_cents(&self) -> i64 {
        let scaled = (self.0 * Decimal::new(100, 0))
            .round_dp_with_strategy(0, rust_decimal::RoundingStrategy::MidpointAwayFromZero);
        scaled.try_into().unwrap_or_else(|_| {
            // Amounts far beyond any realistic building expense; saturate.
            if scaled.is_sign_negative() {
                i64::MIN
            } else {
                i64::MAX
            }
        })
    }

    /// Returns true if the amount is zero
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Returns true if the amount is strictly positive
    pub fn is_positive(&self) -> bool {
        self.0.is_sign_positive() && !self.0.is_zero()
    }

    /// Returns true if the amount is negative
    pub fn is_negative(&self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }

    /// Returns the absolute value
    pub fn abs(&self) -> Self {
        Self(self.0.abs())
    }

    /// Clamps negative amounts to zero (used for carry-forward derivation)
    pub fn max_zero(&self) -> Self {
        if self.is_negative() {
            Self::zero()
        } else {
            *self
        }
    }

    /// Rounds to the currency's standard two decimal places
    pub fn round_to_cents(&self) -> Self {
        Self(self.0.round_dp(CURRENCY_DP))
    }

    /// Multiplies by a scalar (e.g., for share calculations)
    pub fn multiply(&self, factor: Decimal) -> Self {
        Self::new(self.0 * factor)
    }

    /// Divides by a scalar
    pub fn checked_div(&self, divisor: Decimal) -> Result<Self, MoneyError> {
        if divisor.is_zero() {
            return Err(MoneyError::DivisionByZero);
        }
        Ok(Self::new(self.0 / divisor))
    }

    /// Allocates the amount into n equal cent-precision parts
    ///
    /// The parts always sum exactly to the original amount. Residual cents
    /// from the division are assigned one each to the first parts, so
    /// €100.00 over three units yields [33.34, 33.33, 33.33].
    pub fn allocate_evenly(&self, n: usize) -> Result<Vec<Money>, MoneyError> {
        if n == 0 {
            return Err(MoneyError::InvalidAmount(
                "Cannot allocate to zero parts".to_string(),
            ));
        }

        let total_cents = self.round_to_cents().as_cents();
        let base = total_cents.div_euclid(n as i64);
        let remainder = total_cents.rem_euclid(n as i64) as usize;

        let mut parts = Vec::with_capacity(n);
        for i in 0..n {
            let cents = if i < remainder { base + 1 } else { base };
            parts.push(Money::from_cents(cents));
        }
        Ok(parts)
    }

    /// Allocates the amount proportionally to the given weights
    ///
    /// Each share is floored to whole cents; the leftover cents are then
    /// handed out one each starting from the first weight, so the parts sum
    /// exactly to the original amount and the residual assignment is
    /// deterministic. Weights must be non-negative with a non-zero total;
    /// callers that want an even-split fallback on zero weights must apply
    /// it before calling.
    pub fn allocate_by_weights(&self, weights: &[Decimal]) -> Result<Vec<Money>, MoneyError> {
        if weights.is_empty() {
            return Err(MoneyError::InvalidAmount("Empty weights".to_string()));
        }
        if weights.iter().any(|w| w.is_sign_negative()) {
            return Err(MoneyError::InvalidAmount(
                "Negative weight in allocation".to_string(),
            ));
        }

        let total_weight: Decimal = weights.iter().sum();
        if total_weight.is_zero() {
            return Err(MoneyError::ZeroTotalWeight);
        }

        let total_cents = self.round_to_cents().as_cents();
        let mut cents: Vec<i64> = weights
            .iter()
            .map(|w| {
                let exact = Decimal::new(total_cents, 0) * w / total_weight;
                exact
                    .round_dp_with_strategy(0, rust_decimal::RoundingStrategy::ToNegativeInfinity)
                    .try_into()
                    .unwrap_or(0)
            })
            .collect();

        let mut leftover = total_cents - cents.iter().sum::<i64>();
        let step = if leftover < 0 { -1 } else { 1 };
        let len = cents.len();
        let mut i = 0;
        while leftover != 0 {
            cents[i % len] += step;
            leftover -= step;
            i += 1;
        }

        Ok(cents.into_iter().map(Money::from_cents).collect())
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "€{:.2}", self.0)
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self::new(self.0 + other.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, other: Self) {
        *self = *self + other;
    }
}

impl Sub for Money {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Self::new(self.0 - other.0)
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, other: Self) {
        *self = *self - other;
    }
}

impl Neg for Money {
    type Output = Self;

    fn neg(self) -> Self {
        Self::new(-self.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

impl From<Decimal> for Money {
    fn from(amount: Decimal) -> Self {
        Self::new(amount)
    }
}

/// A participation share expressed in mills (thousandths)
///
/// Each unit carries an integer weight on the 0-1000 scale expressing its
/// proportional ownership of the building; the sum over a building is
/// conventionally 1000 but is not enforced here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Mills(u32);

impl Mills {
    pub const SCALE: u32 = 1000;

    /// Creates a new share, clamped to the 0-1000 scale
    pub fn new(value: u32) -> Self {
        Self(value.min(Self::SCALE))
    }

    /// Returns the raw mill count
    pub fn value(&self) -> u32 {
        self.0
    }

    /// Returns the share as a decimal weight
    pub fn as_decimal(&self) -> Decimal {
        Decimal::new(self.0 as i64, 0)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Mills {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\u{2030}", self.0)
    }
}
