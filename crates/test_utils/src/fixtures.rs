//! Pre-built Test Fixtures
//!
//! Provides ready-to-use test data for common entities across the billing
//! core. These fixtures are designed to be consistent and predictable for
//! unit tests.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use rust_decimal_macros::dec;
use uuid::Uuid;

use core_kernel::{BuildingId, ExpenseId, Money, UnitId, YearMonth};
use domain_property::ReserveFundPlan;

/// Fixture for Money test data
pub struct MoneyFixtures;

impl MoneyFixtures {
    /// A round hundred for distribution scenarios
    pub fn hundred() -> Money {
        Money::new(dec!(100.00))
    }

    /// A typical monthly management fee per unit
    pub fn management_fee() -> Money {
        Money::new(dec!(25.00))
    }

    /// An amount that does not divide evenly by three
    pub fn awkward_third() -> Money {
        Money::new(dec!(100.00))
    }

    /// A typical large repair expense
    pub fn repair_bill() -> Money {
        Money::new(dec!(4850.75))
    }
}

/// Fixture for temporal test data
pub struct TemporalFixtures;

impl TemporalFixtures {
    /// Standard billing start date (Jan 1, 2024)
    pub fn billing_start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    /// A mid-quarter expense date
    pub fn expense_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 10).unwrap()
    }

    /// The month of the standard expense date
    pub fn expense_month() -> YearMonth {
        YearMonth::new(2024, 3).unwrap()
    }

    /// A fixed instant for deterministic clocks
    pub fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap()
    }
}

/// Fixture for identifier test data
pub struct IdFixtures;

impl IdFixtures {
    /// Creates a deterministic building ID for testing
    pub fn building_id() -> BuildingId {
        BuildingId::from_uuid(Uuid::parse_str("550e8400-e29b-41d4-a716-446655440001").unwrap())
    }

    /// Creates a deterministic unit ID for testing
    pub fn unit_id() -> UnitId {
        UnitId::from_uuid(Uuid::parse_str("550e8400-e29b-41d4-a716-446655440002").unwrap())
    }

    /// Creates a deterministic expense ID for testing
    pub fn expense_id() -> ExpenseId {
        ExpenseId::from_uuid(Uuid::parse_str("550e8400-e29b-41d4-a716-446655440003").unwrap())
    }
}

/// Fixture for reserve fund plans
pub struct PlanFixtures;

impl PlanFixtures {
    /// A two-year plan collecting 2400 at 100 per month through 2024-2025
    pub fn two_year_plan() -> ReserveFundPlan {
        ReserveFundPlan::new(
            Money::new(dec!(2400.00)),
            24,
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 12, 31).unwrap(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixtures_are_stable() {
        assert_eq!(IdFixtures::building_id(), IdFixtures::building_id());
        assert_eq!(
            PlanFixtures::two_year_plan().monthly_amount(),
            Money::new(dec!(100.00))
        );
    }
}
