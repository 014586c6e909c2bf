//! Custom Test Assertions
//!
//! Provides specialized assertion helpers for domain types that give
//! more meaningful error messages than standard assertions.

use rust_decimal::Decimal;

use core_kernel::Money;
use domain_distribution::UnitShare;

/// Asserts that two Money values are equal within a tolerance
///
/// # Panics
///
/// Panics if the amounts differ by more than tolerance
pub fn assert_money_approx_eq(actual: Money, expected: Money, tolerance: Decimal) {
    let diff = (actual - expected).abs();
    assert!(
        diff.amount() <= tolerance,
        "Money values differ by more than tolerance: actual={}, expected={}, diff={}, tolerance={}",
        actual,
        expected,
        diff,
        tolerance
    );
}

/// Asserts that a Money value is zero
pub fn assert_money_zero(money: Money) {
    assert!(money.is_zero(), "Expected zero money, got {money}");
}

/// Asserts that distribution shares sum exactly to the distributed amount
///
/// # Panics
///
/// Panics if the shares do not conserve the amount to the cent
pub fn assert_shares_conserve(shares: &[UnitShare], amount: Money) {
    let total: Money = shares.iter().map(|s| s.amount).sum();
    assert_eq!(
        total, amount,
        "Distribution lost money: shares sum to {total}, expected {amount}"
    );
}
