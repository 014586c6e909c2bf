//! Recurring charge generator
//!
//! Generates the month's management-fee and reserve-fund charges for a
//! building. Generation is idempotent per (building, category, month): the
//! expense store is the idempotency ledger, so a crashed or repeated run
//! never double-charges a unit.

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, warn};

use core_kernel::{Clock, ExpenseId, Money, YearMonth};
use domain_distribution::{DistributionEngine, UnitShare};
use domain_ledger::{
    find_expense_in_month, BalanceCalculator, ChargeCategory, EntryReference, ExpenseRecord,
    LedgerError, LedgerStore, NewLedgerEntry,
};
use domain_property::{Building, PropertyRegistry, Unit};

use crate::error::PeriodError;

/// Outcome of one recurring category for one month
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChargeOutcome {
    /// Charges were generated this call
    Generated {
        expense_id: ExpenseId,
        entry_count: usize,
    },
    /// Nothing generated, for the stated reason
    Skipped(SkipReason),
    /// The building does not configure this category
    NotConfigured,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The (building, category, month) key already has an expense
    AlreadyGenerated,
    /// The month precedes the billing-start floor
    BeforeBillingStart,
    /// The month is outside the reserve fund's inclusive timeline
    OutsideFundTimeline,
    /// The configuration failed validation; logged, never fatal
    InvalidConfiguration,
}

/// Per-category outcomes of one generation run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationResult {
    pub management_fee: ChargeOutcome,
    pub reserve_fund: ChargeOutcome,
}

pub struct RecurringChargeGenerator {
    ledger: Arc<dyn LedgerStore>,
    registry: Arc<dyn PropertyRegistry>,
    distribution: DistributionEngine,
    balances: BalanceCalculator,
    clock: Arc<dyn Clock>,
}

impl RecurringChargeGenerator {
    pub fn new(
        ledger: Arc<dyn LedgerStore>,
        registry: Arc<dyn PropertyRegistry>,
        distribution: DistributionEngine,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let balances = BalanceCalculator::new(Arc::clone(&ledger), Arc::clone(&registry));
        Self {
            ledger,
            registry,
            distribution,
            balances,
            clock,
        }
    }

    /// Generates the month's recurring charges for a building
    ///
    /// Each category reports independently; a second run for the same month
    /// reports `Skipped(AlreadyGenerated)` for whatever the first run fully
    /// wrote and completes any units a contended first run left behind.
    pub fn generate_monthly_charges(
        &self,
        building_id: core_kernel::BuildingId,
        month: YearMonth,
    ) -> Result<GenerationResult, PeriodError> {
        let building = self.registry.building(building_id)?;
        let units = self.registry.units_in_building(building_id)?;

        Ok(GenerationResult {
            management_fee: self.generate_management_fee(&building, &units, month)?,
            reserve_fund: self.generate_reserve_fund(&building, &units, month)?,
        })
    }

    fn generate_management_fee(
        &self,
        building: &Building,
        units: &[Unit],
        month: YearMonth,
    ) -> Result<ChargeOutcome, PeriodError> {
        let Some(fee) = building.active_management_fee() else {
            return Ok(ChargeOutcome::NotConfigured);
        };
        if month < building.billing_start_month() {
            return Ok(ChargeOutcome::Skipped(SkipReason::BeforeBillingStart));
        }
        if units.is_empty() {
            warn!(building_id = %building.id, "management fee configured but the building has no units");
            return Ok(ChargeOutcome::Skipped(SkipReason::InvalidConfiguration));
        }
        let shares = self.distribution.management_fee_shares(units, fee);
        if let Some(existing) = find_expense_in_month(self.ledger.as_ref(), building.id, month, |x| {
            x.category.is_management_fee()
        }) {
            return self.complete_or_skip(
                building,
                existing,
                &shares,
                ChargeCategory::ManagementFee,
                month,
            );
        }

        self.record_and_append(
            building,
            month,
            ChargeCategory::ManagementFee,
            format!("Management fee {month}"),
            &shares,
        )
    }

    fn generate_reserve_fund(
        &self,
        building: &Building,
        units: &[Unit],
        month: YearMonth,
    ) -> Result<ChargeOutcome, PeriodError> {
        let Some(plan) = &building.reserve_fund else {
            return Ok(ChargeOutcome::NotConfigured);
        };
        if let Err(err) = plan.validate() {
            warn!(building_id = %building.id, error = %err, "skipping invalid reserve fund plan");
            return Ok(ChargeOutcome::Skipped(SkipReason::InvalidConfiguration));
        }
        if month < building.billing_start_month() {
            return Ok(ChargeOutcome::Skipped(SkipReason::BeforeBillingStart));
        }
        if !plan.covers(month) {
            return Ok(ChargeOutcome::Skipped(SkipReason::OutsideFundTimeline));
        }
        if units.is_empty() {
            warn!(building_id = %building.id, "reserve fund configured but the building has no units");
            return Ok(ChargeOutcome::Skipped(SkipReason::InvalidConfiguration));
        }
        let shares = self.distribution.reserve_fund_shares(plan, units)?;
        if let Some(existing) = find_expense_in_month(self.ledger.as_ref(), building.id, month, |x| {
            x.category.is_reserve_fund()
        }) {
            return self.complete_or_skip(
                building,
                existing,
                &shares,
                ChargeCategory::ReserveFund,
                month,
            );
        }

        self.record_and_append(
            building,
            month,
            ChargeCategory::ReserveFund,
            format!("Reserve fund installment {month}"),
            &shares,
        )
    }

    /// Finishes a prior run whose expense already exists for the month
    ///
    /// Units left behind by a contended earlier run get their charge and
    /// refresh now; a fully-applied expense reports `AlreadyGenerated`.
    fn complete_or_skip(
        &self,
        building: &Building,
        expense_id: ExpenseId,
        shares: &[UnitShare],
        category: ChargeCategory,
        month: YearMonth,
    ) -> Result<ChargeOutcome, PeriodError> {
        let entry_count =
            self.append_shares(building, shares, category, month.first_day(), expense_id)?;
        if entry_count > 0 {
            debug!(
                building_id = %building.id,
                %month,
                %expense_id,
                entry_count,
                "completed partially applied recurring charge"
            );
            return Ok(ChargeOutcome::Generated {
                expense_id,
                entry_count,
            });
        }
        debug!(building_id = %building.id, %month, %expense_id, "recurring charge already generated");
        Ok(ChargeOutcome::Skipped(SkipReason::AlreadyGenerated))
    }

    /// Records the originating expense, then appends one charge per unit
    ///
    /// Each entry references the expense id, so a partially-applied run is
    /// finished by retrying through the reference rather than regenerating.
    fn record_and_append(
        &self,
        building: &Building,
        month: YearMonth,
        category: ChargeCategory,
        description: String,
        shares: &[UnitShare],
    ) -> Result<ChargeOutcome, PeriodError> {
        let total: Money = shares.iter().map(|s| s.amount).sum();
        let effective_date = month.first_day();
        let expense = ExpenseRecord::new(building.id, total, category.clone(), effective_date, description);
        let expense_id = expense.id;
        self.ledger.record_expense(expense);

        let entry_count = self.append_shares(building, shares, category, effective_date, expense_id)?;
        debug!(
            building_id = %building.id,
            %month,
            %expense_id,
            entry_count,
            %total,
            "generated recurring charges"
        );
        Ok(ChargeOutcome::Generated {
            expense_id,
            entry_count,
        })
    }

    /// Appends one charge per unit, each under that unit's lock
    ///
    /// The lock covers the already-charged check, the append, and the
    /// cached-balance refresh together. A contended unit is skipped whole
    /// and completed by a later run through the expense reference.
    fn append_shares(
        &self,
        building: &Building,
        shares: &[UnitShare],
        category: ChargeCategory,
        effective_date: NaiveDate,
        expense_id: ExpenseId,
    ) -> Result<usize, PeriodError> {
        let now = self.clock.now();
        let reference = EntryReference::Expense(expense_id);
        let mut entry_count = 0;

        for share in shares {
            if share.amount.is_zero() {
                continue;
            }
            let guard = match self.ledger.lock_unit(share.unit_id) {
                Ok(guard) => guard,
                Err(LedgerError::ConcurrentUpdateConflict(unit_id)) => {
                    warn!(%unit_id, %expense_id, "unit locked elsewhere; charge left for the next run");
                    continue;
                }
                Err(err) => return Err(err.into()),
            };

            let charged = self
                .ledger
                .entries_for_reference(reference)
                .iter()
                .any(|e| e.unit_id == share.unit_id);
            if charged {
                continue;
            }

            let entry = NewLedgerEntry::charge(
                share.unit_id,
                building.id,
                share.amount,
                category.clone(),
                effective_date,
                now,
            )?
            .with_reference(reference);
            self.ledger.append(entry)?;
            self.balances.refresh_cached_balance(&guard)?;
            entry_count += 1;
        }
        Ok(entry_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use core_kernel::{BuildingId, FixedClock, Mills};
    use domain_ledger::InMemoryLedgerStore;
    use domain_property::{InMemoryPropertyRegistry, ReserveFundPlan};
    use rust_decimal_macros::dec;

    struct Fixture {
        generator: RecurringChargeGenerator,
        ledger: Arc<InMemoryLedgerStore>,
        registry: Arc<InMemoryPropertyRegistry>,
        building_id: BuildingId,
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn ym(y: i32, m: u32) -> YearMonth {
        YearMonth::new(y, m).unwrap()
    }

    fn fixture(building: Building, unit_shares: &[u32]) -> Fixture {
        let ledger = Arc::new(InMemoryLedgerStore::new());
        let registry = Arc::new(InMemoryPropertyRegistry::new());
        let building_id = building.id;
        registry.insert_building(building);
        for (i, share) in unit_shares.iter().enumerate() {
            registry.insert_unit(Unit::new(building_id, format!("{}", i + 1), Mills::new(*share)));
        }

        let distribution = DistributionEngine::new(
            registry.clone() as Arc<dyn PropertyRegistry>,
            DistributionEngine::DEFAULT_METER_LOOKBACK_DAYS,
        );
        let clock = Arc::new(FixedClock::at(Utc::now()));
        let generator = RecurringChargeGenerator::new(
            ledger.clone(),
            registry.clone(),
            distribution,
            clock,
        );

        Fixture {
            generator,
            ledger,
            registry,
            building_id,
        }
    }

    fn plan_2024_2025() -> ReserveFundPlan {
        ReserveFundPlan::new(
            Money::new(dec!(2400)),
            24,
            date(2024, 1, 1),
            date(2025, 12, 31),
        )
    }

    #[test]
    fn test_nothing_configured() {
        let f = fixture(Building::new("B", date(2024, 1, 1)), &[300, 700]);
        let result = f.generator.generate_monthly_charges(f.building_id, ym(2024, 3)).unwrap();
        assert_eq!(result.management_fee, ChargeOutcome::NotConfigured);
        assert_eq!(result.reserve_fund, ChargeOutcome::NotConfigured);
        assert_eq!(f.ledger.entry_count(), 0);
    }

    #[test]
    fn test_management_fee_flat_per_unit() {
        let building =
            Building::new("B", date(2024, 1, 1)).with_recurring_fee(Money::new(dec!(25)));
        let f = fixture(building, &[300, 700]);

        let result = f.generator.generate_monthly_charges(f.building_id, ym(2024, 3)).unwrap();
        let ChargeOutcome::Generated { entry_count, .. } = result.management_fee else {
            panic!("expected Generated, got {:?}", result.management_fee);
        };
        assert_eq!(entry_count, 2);

        // Each unit owes the flat fee.
        let units = f.registry.units_in_building(f.building_id).unwrap();
        for unit in units {
            assert_eq!(unit.current_balance, Money::new(dec!(25.00)));
        }
    }

    #[test]
    fn test_reserve_fund_by_share() {
        let building = Building::new("B", date(2024, 1, 1)).with_reserve_fund(plan_2024_2025());
        let f = fixture(building, &[300, 700]);

        let result = f.generator.generate_monthly_charges(f.building_id, ym(2024, 3)).unwrap();
        assert!(matches!(result.reserve_fund, ChargeOutcome::Generated { .. }));

        // Monthly amount 100, split 30/70.
        let units = f.registry.units_in_building(f.building_id).unwrap();
        assert_eq!(units[0].current_balance, Money::new(dec!(30.00)));
        assert_eq!(units[1].current_balance, Money::new(dec!(70.00)));
    }

    #[test]
    fn test_second_run_is_idempotent() {
        let building = Building::new("B", date(2024, 1, 1))
            .with_recurring_fee(Money::new(dec!(25)))
            .with_reserve_fund(plan_2024_2025());
        let f = fixture(building, &[300, 700]);

        f.generator.generate_monthly_charges(f.building_id, ym(2024, 3)).unwrap();
        let entries_after_first = f.ledger.entry_count();

        let second = f.generator.generate_monthly_charges(f.building_id, ym(2024, 3)).unwrap();
        assert_eq!(
            second.management_fee,
            ChargeOutcome::Skipped(SkipReason::AlreadyGenerated)
        );
        assert_eq!(
            second.reserve_fund,
            ChargeOutcome::Skipped(SkipReason::AlreadyGenerated)
        );
        assert_eq!(f.ledger.entry_count(), entries_after_first);

        // A different month generates fresh charges.
        let april = f.generator.generate_monthly_charges(f.building_id, ym(2024, 4)).unwrap();
        assert!(matches!(april.management_fee, ChargeOutcome::Generated { .. }));
    }

    #[test]
    fn test_before_billing_start_is_skipped() {
        let building =
            Building::new("B", date(2024, 3, 1)).with_recurring_fee(Money::new(dec!(25)));
        let f = fixture(building, &[300, 700]);

        let result = f.generator.generate_monthly_charges(f.building_id, ym(2024, 2)).unwrap();
        assert_eq!(
            result.management_fee,
            ChargeOutcome::Skipped(SkipReason::BeforeBillingStart)
        );
        assert_eq!(f.ledger.entry_count(), 0);
    }

    #[test]
    fn test_reserve_fund_outside_timeline() {
        let building = Building::new("B", date(2023, 1, 1)).with_reserve_fund(plan_2024_2025());
        let f = fixture(building, &[300, 700]);

        let before = f.generator.generate_monthly_charges(f.building_id, ym(2023, 12)).unwrap();
        assert_eq!(
            before.reserve_fund,
            ChargeOutcome::Skipped(SkipReason::OutsideFundTimeline)
        );

        let after = f.generator.generate_monthly_charges(f.building_id, ym(2026, 1)).unwrap();
        assert_eq!(
            after.reserve_fund,
            ChargeOutcome::Skipped(SkipReason::OutsideFundTimeline)
        );

        // Inclusive bounds: first and last plan months both generate.
        let first = f.generator.generate_monthly_charges(f.building_id, ym(2024, 1)).unwrap();
        assert!(matches!(first.reserve_fund, ChargeOutcome::Generated { .. }));
        let last = f.generator.generate_monthly_charges(f.building_id, ym(2025, 12)).unwrap();
        assert!(matches!(last.reserve_fund, ChargeOutcome::Generated { .. }));
    }

    #[test]
    fn test_invalid_reserve_plan_skipped_not_fatal() {
        let mut plan = plan_2024_2025();
        plan.duration_months = 0;
        let building = Building::new("B", date(2024, 1, 1))
            .with_recurring_fee(Money::new(dec!(25)))
            .with_reserve_fund(plan);
        let f = fixture(building, &[300, 700]);

        let result = f.generator.generate_monthly_charges(f.building_id, ym(2024, 3)).unwrap();
        assert_eq!(
            result.reserve_fund,
            ChargeOutcome::Skipped(SkipReason::InvalidConfiguration)
        );
        // The management fee still generates.
        assert!(matches!(result.management_fee, ChargeOutcome::Generated { .. }));
    }

    #[test]
    fn test_contended_unit_is_completed_by_the_next_run() {
        let building =
            Building::new("B", date(2024, 1, 1)).with_recurring_fee(Money::new(dec!(25)));
        let f = fixture(building, &[300, 700]);
        let units = f.registry.units_in_building(f.building_id).unwrap();

        // A concurrent writer holds the first unit for the whole run.
        let guard = f.ledger.lock_unit(units[0].id).unwrap();
        let first = f.generator.generate_monthly_charges(f.building_id, ym(2024, 3)).unwrap();
        drop(guard);

        // Only the uncontended unit was charged; its cache matches its fold,
        // and the skipped unit has neither entry nor stale cache.
        let ChargeOutcome::Generated { entry_count, .. } = first.management_fee else {
            panic!("expected Generated, got {:?}", first.management_fee);
        };
        assert_eq!(entry_count, 1);
        assert_eq!(f.ledger.entry_count(), 1);
        let units = f.registry.units_in_building(f.building_id).unwrap();
        assert_eq!(units[0].current_balance, Money::zero());
        assert_eq!(units[1].current_balance, Money::new(dec!(25.00)));

        // The next run finishes the skipped unit through the expense
        // reference instead of regenerating the whole month.
        let second = f.generator.generate_monthly_charges(f.building_id, ym(2024, 3)).unwrap();
        let ChargeOutcome::Generated { entry_count, .. } = second.management_fee else {
            panic!("expected Generated, got {:?}", second.management_fee);
        };
        assert_eq!(entry_count, 1);
        assert_eq!(f.ledger.entry_count(), 2);
        let units = f.registry.units_in_building(f.building_id).unwrap();
        assert_eq!(units[0].current_balance, Money::new(dec!(25.00)));
        assert_eq!(units[1].current_balance, Money::new(dec!(25.00)));

        // Fully applied: a further run skips without touching the ledger.
        let third = f.generator.generate_monthly_charges(f.building_id, ym(2024, 3)).unwrap();
        assert_eq!(
            third.management_fee,
            ChargeOutcome::Skipped(SkipReason::AlreadyGenerated)
        );
        assert_eq!(f.ledger.entry_count(), 2);
    }
}
