//! Period closer
//!
//! Closes a building's calendar month into a `MonthlyBalance` snapshot and
//! maintains the carry-forward chain. Missing prior months are backfilled
//! with an explicit forward loop from the billing-start floor; the loop is
//! bounded by the month distance to the floor, so a building with years of
//! history closes without unbounded call depth.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use core_kernel::{BuildingId, Clock, Money, SnapshotId, YearMonth};
use domain_ledger::{BalanceCalculator, EntryKind, LedgerStore};
use domain_property::{Building, PropertyRegistry};

use crate::error::PeriodError;
use crate::monthly_balance::{InstallmentSchedule, MonthlyBalance, SnapshotStore};

/// Exclusive hold on one (building, month) closing computation
///
/// Same try-lock discipline as the ledger's unit lock: contention is an
/// error the caller retries, never a wait.
struct PeriodGuard {
    key: (BuildingId, YearMonth),
    held: Arc<Mutex<HashSet<(BuildingId, YearMonth)>>>,
}

impl PeriodGuard {
    fn acquire(
        held: &Arc<Mutex<HashSet<(BuildingId, YearMonth)>>>,
        building_id: BuildingId,
        month: YearMonth,
    ) -> Result<Self, PeriodError> {
        let key = (building_id, month);
        {
            let mut set = held.lock().expect("period lock table poisoned");
            if !set.insert(key) {
                return Err(PeriodError::ClosingInProgress { building_id, month });
            }
        }
        Ok(Self {
            key,
            held: Arc::clone(held),
        })
    }
}

impl Drop for PeriodGuard {
    fn drop(&mut self) {
        self.held
            .lock()
            .expect("period lock table poisoned")
            .remove(&self.key);
    }
}

/// Closes building-months and maintains the carry-forward chain
pub struct PeriodCloser {
    ledger: Arc<dyn LedgerStore>,
    registry: Arc<dyn PropertyRegistry>,
    snapshots: Arc<dyn SnapshotStore>,
    installments: Arc<dyn InstallmentSchedule>,
    balances: BalanceCalculator,
    clock: Arc<dyn Clock>,
    closing: Arc<Mutex<HashSet<(BuildingId, YearMonth)>>>,
}

impl PeriodCloser {
    pub fn new(
        ledger: Arc<dyn LedgerStore>,
        registry: Arc<dyn PropertyRegistry>,
        snapshots: Arc<dyn SnapshotStore>,
        installments: Arc<dyn InstallmentSchedule>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let balances = BalanceCalculator::new(Arc::clone(&ledger), Arc::clone(&registry));
        Self {
            ledger,
            registry,
            snapshots,
            installments,
            balances,
            clock,
            closing: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Returns the month's snapshot, computing it if absent
    ///
    /// With `recalculate` the stored snapshot is rebuilt from the ledger.
    /// The computation holds the (building, month) critical section;
    /// contention yields `ClosingInProgress` and leaves storage untouched.
    pub fn close_or_create(
        &self,
        building_id: BuildingId,
        month: YearMonth,
        recalculate: bool,
    ) -> Result<MonthlyBalance, PeriodError> {
        if !recalculate {
            if let Some(existing) = self.snapshots.get(building_id, month) {
                debug!(%building_id, %month, "returning stored snapshot");
                return Ok(existing);
            }
        }

        let _guard = PeriodGuard::acquire(&self.closing, building_id, month)?;
        let building = self.registry.building(building_id)?;
        let previous = self.previous_obligations(&building, month)?;
        let snapshot = self.build_snapshot(&building, month, previous);
        self.snapshots.upsert(snapshot.clone());
        debug!(%building_id, %month, carry_forward = %snapshot.carry_forward, "closed month");
        Ok(snapshot)
    }

    /// Verifies the stored carry-forward chain over an inclusive month range
    ///
    /// Read-only: mismatches are reported, never repaired.
    pub fn verify_chain(
        &self,
        building_id: BuildingId,
        start: YearMonth,
        end: YearMonth,
    ) -> Result<ChainReport, PeriodError> {
        let building = self.registry.building(building_id)?;
        let floor = building.billing_start_month();
        let mut mismatches = Vec::new();

        for month in start.range_to(end)? {
            let Some(snapshot) = self.snapshots.get(building_id, month) else {
                mismatches.push(ChainMismatch {
                    month,
                    kind: MismatchKind::MissingSnapshot,
                    expected: Money::zero(),
                    actual: Money::zero(),
                });
                continue;
            };

            let expected_carry = snapshot.expected_carry_forward();
            if snapshot.carry_forward != expected_carry {
                mismatches.push(ChainMismatch {
                    month,
                    kind: MismatchKind::CarryForward,
                    expected: expected_carry,
                    actual: snapshot.carry_forward,
                });
            }

            let expected_previous = if month <= floor {
                Some(Money::zero())
            } else {
                self.snapshots
                    .get(building_id, month.prev())
                    .map(|prior| prior.carry_forward)
            };
            if let Some(expected) = expected_previous {
                if snapshot.previous_obligations != expected {
                    mismatches.push(ChainMismatch {
                        month,
                        kind: MismatchKind::PreviousObligations,
                        expected,
                        actual: snapshot.previous_obligations,
                    });
                }
            }
        }

        Ok(ChainReport {
            building_id,
            start,
            end,
            mismatches,
        })
    }

    /// Debt inherited from the prior month
    ///
    /// Months at or before the billing-start floor inherit nothing. A
    /// missing prior snapshot triggers forward backfill from the floor; if
    /// that fails, the chain self-heals through a direct ledger aggregate.
    fn previous_obligations(
        &self,
        building: &Building,
        month: YearMonth,
    ) -> Result<Money, PeriodError> {
        let floor = building.billing_start_month();
        if month <= floor {
            return Ok(Money::zero());
        }

        let prior = month.prev();
        if let Some(snapshot) = self.snapshots.get(building.id, prior) {
            return Ok(snapshot.carry_forward);
        }

        match self.backfill(building, floor, prior) {
            Ok(carry) => Ok(carry),
            Err(err) => {
                warn!(
                    building_id = %building.id,
                    %month,
                    error = %err,
                    "backfill failed; falling back to direct ledger aggregate"
                );
                Ok(self.direct_aggregate(building, month)?)
            }
        }
    }

    /// Closes every missing month from the floor through `through`, in order
    ///
    /// Bounded by `through.months_since(floor)` iterations. Existing
    /// snapshots are reused, not recomputed.
    fn backfill(
        &self,
        building: &Building,
        floor: YearMonth,
        through: YearMonth,
    ) -> Result<Money, PeriodError> {
        let mut carry = Money::zero();
        for month in floor.range_to(through)? {
            if let Some(existing) = self.snapshots.get(building.id, month) {
                carry = existing.carry_forward;
                continue;
            }
            let _guard = PeriodGuard::acquire(&self.closing, building.id, month)?;
            let snapshot = self.build_snapshot(building, month, carry);
            carry = snapshot.carry_forward;
            self.snapshots.upsert(snapshot);
            debug!(building_id = %building.id, %month, "backfilled month");
        }
        Ok(carry)
    }

    /// Fallback for a broken chain: what the units collectively owed at the
    /// start of the month, straight from the ledger fold
    fn direct_aggregate(
        &self,
        building: &Building,
        month: YearMonth,
    ) -> Result<Money, PeriodError> {
        let units = self.registry.units_in_building(building.id)?;
        let mut total = Money::zero();
        for unit in &units {
            total += self
                .balances
                .historical_balance(unit.id, month.first_day(), true, true);
        }
        Ok(total.max_zero())
    }

    /// Assembles a snapshot from the month's ledger entries
    ///
    /// The ledger is the source of truth for every total; category tags
    /// route charges into their dedicated buckets so generic expenses never
    /// include the recurring categories.
    fn build_snapshot(
        &self,
        building: &Building,
        month: YearMonth,
        previous_obligations: Money,
    ) -> MonthlyBalance {
        let mut total_expenses = Money::zero();
        let mut total_payments = Money::zero();
        let mut management_fee_total = Money::zero();
        let mut reserve_fund_total = Money::zero();

        for entry in self.ledger.entries_for_building_in_month(building.id, month) {
            match entry.kind {
                EntryKind::Charge => match &entry.category {
                    Some(c) if c.is_management_fee() => management_fee_total += entry.amount,
                    Some(c) if c.is_reserve_fund() => reserve_fund_total += entry.amount,
                    _ => total_expenses += entry.amount,
                },
                EntryKind::Payment => total_payments += entry.amount,
                // Manual corrections rewrite unit balances, not month totals.
                EntryKind::Adjustment => {}
            }
        }

        let mut snapshot = MonthlyBalance {
            id: SnapshotId::new_v7(),
            building_id: building.id,
            month,
            total_expenses,
            total_payments,
            previous_obligations,
            management_fee_total,
            reserve_fund_total,
            scheduled_installments_total: self.installments.installments_total(building.id, month),
            carry_forward: Money::zero(),
            computed_at: self.clock.now(),
        };
        snapshot.carry_forward = snapshot.expected_carry_forward();
        snapshot
    }
}

/// What a chain link should have held versus what it holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MismatchKind {
    /// No snapshot stored for the month
    MissingSnapshot,
    /// `previous_obligations` does not equal the prior month's carry-forward
    PreviousObligations,
    /// `carry_forward` does not equal the formula over the stored components
    CarryForward,
}

#[derive(Debug, Clone)]
pub struct ChainMismatch {
    pub month: YearMonth,
    pub kind: MismatchKind,
    pub expected: Money,
    pub actual: Money,
}

/// Result of a read-only carry-forward chain verification
#[derive(Debug, Clone)]
pub struct ChainReport {
    pub building_id: BuildingId,
    pub start: YearMonth,
    pub end: YearMonth,
    pub mismatches: Vec<ChainMismatch>,
}

impl ChainReport {
    pub fn is_consistent(&self) -> bool {
        self.mismatches.is_empty()
    }
}
