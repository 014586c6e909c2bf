//! Property-Based Test Generators
//!
//! Provides proptest strategies for generating random test data that
//! maintains domain invariants.

use proptest::prelude::*;

use core_kernel::{Mills, Money, YearMonth};

/// Strategy for amounts in cents, non-negative and bounded
pub fn amount_cents_strategy() -> impl Strategy<Value = i64> {
    0i64..100_000_000i64
}

/// Strategy for non-negative Money values
pub fn money_strategy() -> impl Strategy<Value = Money> {
    amount_cents_strategy().prop_map(Money::from_cents)
}

/// Strategy for participation shares on the mill scale
pub fn mills_strategy() -> impl Strategy<Value = Mills> {
    (0u32..=1000u32).prop_map(Mills::new)
}

/// Strategy for a building's worth of participation shares
pub fn share_vec_strategy() -> impl Strategy<Value = Vec<u32>> {
    proptest::collection::vec(0u32..1000u32, 1..40)
}

/// Strategy for valid year-months in a realistic range
pub fn year_month_strategy() -> impl Strategy<Value = YearMonth> {
    (2015i32..2035i32, 1u32..=12u32)
        .prop_map(|(year, month)| YearMonth::new(year, month).expect("month in range"))
}
