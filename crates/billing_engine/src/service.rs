//! The billing engine façade
//!
//! One type wiring the domain services behind the operations collaborating
//! systems call. Delivery concerns (HTTP, rendering, notification) live in
//! the consumers of this façade, never here.

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, warn};

use core_kernel::{BuildingId, Clock, CoreError, Money, UnitId, YearMonth};
use domain_distribution::DistributionEngine;
use domain_ledger::{
    find_expense_in_month, BalanceCalculator, ChargeCategory, EntryReference, ExpenseRecord,
    LedgerEntry, LedgerError, LedgerStore, NewLedgerEntry, PaymentMethod, PaymentRecord,
};
use domain_period::{
    BalanceReport, ChainReport, ConsistencyVerifier, GenerationResult, InstallmentSchedule,
    MonthlyBalance, PeriodCloser, RecurringChargeGenerator, SnapshotStore,
};
use domain_property::PropertyRegistry;

use crate::config::EngineConfig;
use crate::error::EngineError;

pub struct BillingEngine {
    registry: Arc<dyn PropertyRegistry>,
    ledger: Arc<dyn LedgerStore>,
    balances: BalanceCalculator,
    distribution: DistributionEngine,
    closer: PeriodCloser,
    generator: RecurringChargeGenerator,
    verifier: ConsistencyVerifier,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
}

impl BillingEngine {
    pub fn new(
        registry: Arc<dyn PropertyRegistry>,
        ledger: Arc<dyn LedgerStore>,
        snapshots: Arc<dyn SnapshotStore>,
        installments: Arc<dyn InstallmentSchedule>,
        clock: Arc<dyn Clock>,
        config: EngineConfig,
    ) -> Self {
        let balances = BalanceCalculator::new(Arc::clone(&ledger), Arc::clone(&registry));
        let distribution =
            DistributionEngine::new(Arc::clone(&registry), config.meter_lookback_days);
        let closer = PeriodCloser::new(
            Arc::clone(&ledger),
            Arc::clone(&registry),
            snapshots,
            installments,
            Arc::clone(&clock),
        );
        let generator = RecurringChargeGenerator::new(
            Arc::clone(&ledger),
            Arc::clone(&registry),
            DistributionEngine::new(Arc::clone(&registry), config.meter_lookback_days),
            Arc::clone(&clock),
        );
        let verifier = ConsistencyVerifier::new(Arc::clone(&ledger), Arc::clone(&registry));

        Self {
            registry,
            ledger,
            balances,
            distribution,
            closer,
            generator,
            verifier,
            clock,
            config,
        }
    }

    /// Records a payment from a unit and refreshes its cached balance
    ///
    /// The append and the refresh happen under the unit's lock; contention
    /// yields a retryable conflict with nothing written.
    pub fn record_payment(
        &self,
        unit_id: UnitId,
        amount: Money,
        paid_at: NaiveDate,
        method: PaymentMethod,
        description: impl Into<String>,
    ) -> Result<LedgerEntry, EngineError> {
        if !amount.is_positive() {
            return Err(CoreError::validation(format!(
                "payment amount must be positive, got {amount}"
            ))
            .into());
        }

        let unit = self.registry.unit(unit_id)?;
        let guard = self.ledger.lock_unit(unit_id)?;

        let payment = PaymentRecord::new(unit_id, unit.building_id, amount, paid_at, description)
            .with_method(method);
        let payment_id = payment.id;

        let entry = NewLedgerEntry::payment(
            unit_id,
            unit.building_id,
            amount,
            paid_at,
            self.clock.now(),
        )?
        .with_reference(EntryReference::Payment(payment_id));
        let appended = self.ledger.append(entry)?;
        // The reporting record follows the durable entry; a failed append
        // leaves no orphan payment behind.
        self.ledger.record_payment(payment);
        self.balances.refresh_cached_balance(&guard)?;

        debug!(%unit_id, %amount, %payment_id, "recorded payment");
        Ok(appended)
    }

    /// Distributes an expense across the building's units as ledger charges
    ///
    /// Each unit's append+refresh is independently atomic. Re-running with
    /// the same expense skips units that already carry an entry referencing
    /// it, so a partially-applied distribution is finished by retrying, never
    /// by re-splitting into fresh entries.
    pub fn record_expense_and_distribute(
        &self,
        expense: ExpenseRecord,
    ) -> Result<Vec<LedgerEntry>, EngineError> {
        let ChargeCategory::Generic(rule) = &expense.category else {
            return Err(EngineError::ReservedCategoryExpense);
        };
        if let Some(responsibility) = &expense.responsibility {
            responsibility.validate()?;
        }

        let units = self.registry.units_in_building(expense.building_id)?;
        let shares =
            self.distribution
                .distribute(expense.amount, rule, &units, expense.effective_date)?;

        let reference = EntryReference::Expense(expense.id);
        let month = YearMonth::from_date(expense.effective_date);
        let already_recorded =
            find_expense_in_month(self.ledger.as_ref(), expense.building_id, month, |x| {
                x.id == expense.id
            })
            .is_some();
        if !already_recorded {
            self.ledger.record_expense(expense.clone());
        }

        let mut appended = Vec::new();
        let mut conflict = None;
        for share in &shares {
            if share.amount.is_zero() {
                continue;
            }

            let guard = match self.ledger.lock_unit(share.unit_id) {
                Ok(guard) => guard,
                Err(err @ LedgerError::ConcurrentUpdateConflict(_)) => {
                    warn!(unit_id = %share.unit_id, expense_id = %expense.id, "unit locked elsewhere; left for retry");
                    conflict.get_or_insert(err);
                    continue;
                }
                Err(err) => return Err(err.into()),
            };

            // Checked under the unit's lock, so a concurrent run of the same
            // expense cannot bill the unit between the check and the append.
            let already_charged = self
                .ledger
                .entries_for_reference(reference)
                .iter()
                .any(|e| e.unit_id == share.unit_id);
            if already_charged {
                debug!(unit_id = %share.unit_id, expense_id = %expense.id, "unit already charged; skipping");
                continue;
            }

            let entry = NewLedgerEntry::charge(
                share.unit_id,
                expense.building_id,
                share.amount,
                expense.category.clone(),
                expense.effective_date,
                self.clock.now(),
            )?
            .with_reference(reference);
            appended.push(self.ledger.append(entry)?);
            self.balances.refresh_cached_balance(&guard)?;
        }

        // Entries appended so far are durable; surfacing the conflict makes
        // the caller retry, and the retry skips them through the reference.
        if let Some(err) = conflict {
            return Err(err.into());
        }

        debug!(
            expense_id = %expense.id,
            building_id = %expense.building_id,
            entries = appended.len(),
            "distributed expense"
        );
        Ok(appended)
    }

    /// The unit's current signed balance, folded from the ledger
    pub fn current_balance(&self, unit_id: UnitId) -> Result<Money, EngineError> {
        self.registry.unit(unit_id)?;
        Ok(self.balances.current_balance(unit_id))
    }

    /// The unit's balance as of a historical date
    pub fn historical_balance(
        &self,
        unit_id: UnitId,
        as_of: NaiveDate,
        include_management_fee: bool,
        include_reserve_fund: bool,
    ) -> Result<Money, EngineError> {
        self.registry.unit(unit_id)?;
        Ok(self.balances.historical_balance(
            unit_id,
            as_of,
            include_management_fee,
            include_reserve_fund,
        ))
    }

    /// Closes a building-month, backfilling missing prior months
    pub fn close_month(
        &self,
        building_id: BuildingId,
        year: i32,
        month: u32,
        recalculate: bool,
    ) -> Result<MonthlyBalance, EngineError> {
        let month = YearMonth::new(year, month).map_err(CoreError::from)?;
        Ok(self.closer.close_or_create(building_id, month, recalculate)?)
    }

    /// Verifies the stored carry-forward chain over an inclusive range
    pub fn verify_chain(
        &self,
        building_id: BuildingId,
        start: YearMonth,
        end: YearMonth,
    ) -> Result<ChainReport, EngineError> {
        Ok(self.closer.verify_chain(building_id, start, end)?)
    }

    /// Generates the month's recurring charges, idempotently
    pub fn generate_monthly_charges(
        &self,
        building_id: BuildingId,
        month: YearMonth,
    ) -> Result<GenerationResult, EngineError> {
        Ok(self.generator.generate_monthly_charges(building_id, month)?)
    }

    /// Checks every cached balance in the building against its ledger fold
    pub fn verify_balances(&self, building_id: BuildingId) -> Result<BalanceReport, EngineError> {
        Ok(self
            .verifier
            .verify_balances(building_id, self.config.balance_tolerance)?)
    }
}
