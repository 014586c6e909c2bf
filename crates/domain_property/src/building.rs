//! Building entity and recurring-charge configuration

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::{BuildingId, CoreError, Money, YearMonth};

/// A building whose shared expenses are billed to its units
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Building {
    /// Unique identifier
    pub id: BuildingId,
    /// Building name or address
    pub name: String,
    /// Flat monthly management fee charged to every unit; None or zero disables it
    pub recurring_fee_per_unit: Option<Money>,
    /// Reserve fund savings plan, when one is active
    pub reserve_fund: Option<ReserveFundPlan>,
    /// Earliest month the engine may charge anything; hard floor for
    /// recurring charges and the carry-forward chain
    pub billing_system_start_date: NaiveDate,
    /// Created timestamp
    pub created_at: DateTime<Utc>,
}

impl Building {
    /// Creates a new building with no recurring charges configured
    pub fn new(name: impl Into<String>, billing_system_start_date: NaiveDate) -> Self {
        Self {
            id: BuildingId::new_v7(),
            name: name.into(),
            recurring_fee_per_unit: None,
            reserve_fund: None,
            billing_system_start_date,
            created_at: Utc::now(),
        }
    }

    /// Sets the monthly management fee per unit
    pub fn with_recurring_fee(mut self, fee_per_unit: Money) -> Self {
        self.recurring_fee_per_unit = Some(fee_per_unit);
        self
    }

    /// Sets the reserve fund plan
    pub fn with_reserve_fund(mut self, plan: ReserveFundPlan) -> Self {
        self.reserve_fund = Some(plan);
        self
    }

    /// The first month the engine is allowed to charge
    pub fn billing_start_month(&self) -> YearMonth {
        YearMonth::from_date(self.billing_system_start_date)
    }

    /// Returns the management fee per unit if one is configured and positive
    pub fn active_management_fee(&self) -> Option<Money> {
        self.recurring_fee_per_unit.filter(|fee| fee.is_positive())
    }
}

/// A reserve fund savings plan
///
/// The goal is collected in equal monthly installments over the plan's
/// duration, distributed across units by participation share. The timeline
/// bounds are inclusive at month granularity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReserveFundPlan {
    /// Total amount to collect
    pub goal: Money,
    /// Number of monthly installments
    pub duration_months: u32,
    /// First month of collection (day-of-month ignored)
    pub start_date: NaiveDate,
    /// Last month of collection (day-of-month ignored)
    pub end_date: NaiveDate,
}

impl ReserveFundPlan {
    pub fn new(
        goal: Money,
        duration_months: u32,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Self {
        Self {
            goal,
            duration_months,
            start_date,
            end_date,
        }
    }

    /// Validates the plan configuration
    ///
    /// Invalid plans are skipped by the recurring generator with a logged
    /// configuration error; they never abort a billing run.
    pub fn validate(&self) -> Result<(), CoreError> {
        if !self.goal.is_positive() {
            return Err(CoreError::configuration(
                "reserve fund goal must be positive",
            ));
        }
        if self.duration_months == 0 {
            return Err(CoreError::configuration(
                "reserve fund duration must be at least one month",
            ));
        }
        if self.start_month() > self.end_month() {
            return Err(CoreError::configuration(format!(
                "reserve fund timeline is inverted: {} after {}",
                self.start_month(),
                self.end_month()
            )));
        }
        Ok(())
    }

    pub fn start_month(&self) -> YearMonth {
        YearMonth::from_date(self.start_date)
    }

    pub fn end_month(&self) -> YearMonth {
        YearMonth::from_date(self.end_date)
    }

    /// Returns true if the given month falls within the plan's timeline
    pub fn covers(&self, month: YearMonth) -> bool {
        month >= self.start_month() && month <= self.end_month()
    }

    /// The monthly installment, rounded to cents
    pub fn monthly_amount(&self) -> Money {
        self.goal
            .checked_div(Decimal::new(self.duration_months as i64, 0))
            .unwrap_or_else(|_| Money::zero())
            .round_to_cents()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn plan() -> ReserveFundPlan {
        ReserveFundPlan::new(
            Money::new(dec!(12000)),
            24,
            NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            NaiveDate::from_ymd_opt(2025, 12, 20).unwrap(),
        )
    }

    #[test]
    fn test_monthly_amount() {
        assert_eq!(plan().monthly_amount(), Money::new(dec!(500.00)));
    }

    #[test]
    fn test_covers_is_inclusive_by_month() {
        let plan = plan();
        assert!(plan.covers(YearMonth::new(2024, 1).unwrap()));
        assert!(plan.covers(YearMonth::new(2025, 12).unwrap()));
        assert!(!plan.covers(YearMonth::new(2023, 12).unwrap()));
        assert!(!plan.covers(YearMonth::new(2026, 1).unwrap()));
    }

    #[test]
    fn test_validate_rejects_zero_duration() {
        let mut plan = plan();
        plan.duration_months = 0;
        assert!(plan.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_inverted_timeline() {
        let mut plan = plan();
        plan.end_date = NaiveDate::from_ymd_opt(2023, 6, 1).unwrap();
        assert!(plan.validate().is_err());
    }

    #[test]
    fn test_active_management_fee_ignores_zero() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let building = Building::new("Rue de la Paix 12", start);
        assert!(building.active_management_fee().is_none());

        let building = building.with_recurring_fee(Money::zero());
        assert!(building.active_management_fee().is_none());

        let building = building.with_recurring_fee(Money::new(dec!(25)));
        assert_eq!(building.active_management_fee(), Some(Money::new(dec!(25))));
    }
}
