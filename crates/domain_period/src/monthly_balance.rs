//! Monthly balance snapshots and their storage port
//!
//! A snapshot is a recomputable cache of one building-month: the ledger
//! remains the source of truth and `close_or_create(recalculate = true)`
//! rebuilds any snapshot from it. Snapshots exist so the carry-forward chain
//! and owner statements read one row instead of re-folding the ledger.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{BuildingId, Money, SnapshotId, YearMonth};

/// Closed-month financial summary for a building
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonthlyBalance {
    pub id: SnapshotId,
    pub building_id: BuildingId,
    pub month: YearMonth,
    /// Generic charges effective in the month
    pub total_expenses: Money,
    /// Payments effective in the month
    pub total_payments: Money,
    /// Prior month's carry-forward; zero at the billing-start floor
    pub previous_obligations: Money,
    /// Management-fee charges effective in the month
    pub management_fee_total: Money,
    /// Reserve-fund charges effective in the month
    pub reserve_fund_total: Money,
    /// Scheduled payment-plan installments due in the month
    pub scheduled_installments_total: Money,
    /// What the building's units still owe at month end, floored at zero
    pub carry_forward: Money,
    pub computed_at: DateTime<Utc>,
}

impl MonthlyBalance {
    /// Everything the units owe for the month, including inherited debt
    pub fn total_obligations(&self) -> Money {
        self.total_expenses
            + self.previous_obligations
            + self.management_fee_total
            + self.reserve_fund_total
            + self.scheduled_installments_total
    }

    /// The carry-forward the stored components imply
    ///
    /// `carry_forward` must always equal this; the chain verifier checks it.
    pub fn expected_carry_forward(&self) -> Money {
        (self.total_obligations() - self.total_payments).max_zero()
    }
}

/// Persistence for monthly snapshots, keyed by (building, month)
pub trait SnapshotStore: Send + Sync {
    /// Inserts or replaces the snapshot for its (building, month) key
    fn upsert(&self, snapshot: MonthlyBalance);

    fn get(&self, building_id: BuildingId, month: YearMonth) -> Option<MonthlyBalance>;

    /// All snapshots for a building, ordered by month
    fn for_building(&self, building_id: BuildingId) -> Vec<MonthlyBalance>;
}

/// In-memory snapshot store
#[derive(Debug, Default)]
pub struct InMemorySnapshotStore {
    snapshots: RwLock<HashMap<(BuildingId, YearMonth), MonthlyBalance>>,
}

impl InMemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnapshotStore for InMemorySnapshotStore {
    fn upsert(&self, snapshot: MonthlyBalance) {
        self.snapshots
            .write()
            .expect("snapshot lock poisoned")
            .insert((snapshot.building_id, snapshot.month), snapshot);
    }

    fn get(&self, building_id: BuildingId, month: YearMonth) -> Option<MonthlyBalance> {
        self.snapshots
            .read()
            .expect("snapshot lock poisoned")
            .get(&(building_id, month))
            .cloned()
    }

    fn for_building(&self, building_id: BuildingId) -> Vec<MonthlyBalance> {
        let mut snapshots: Vec<MonthlyBalance> = self
            .snapshots
            .read()
            .expect("snapshot lock poisoned")
            .values()
            .filter(|s| s.building_id == building_id)
            .cloned()
            .collect();
        snapshots.sort_by_key(|s| s.month);
        snapshots
    }
}

/// Scheduled payment-plan installments due in a month
///
/// Payment plans are negotiated outside the engine; the closer only needs
/// the monthly total, so the whole integration is this one lookup.
pub trait InstallmentSchedule: Send + Sync {
    fn installments_total(&self, building_id: BuildingId, month: YearMonth) -> Money;
}

/// In-memory installment schedule; months without an entry owe zero
#[derive(Debug, Default)]
pub struct InMemoryInstallmentSchedule {
    totals: RwLock<HashMap<(BuildingId, YearMonth), Money>>,
}

impl InMemoryInstallmentSchedule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_total(&self, building_id: BuildingId, month: YearMonth, total: Money) {
        self.totals
            .write()
            .expect("installment lock poisoned")
            .insert((building_id, month), total);
    }
}

impl InstallmentSchedule for InMemoryInstallmentSchedule {
    fn installments_total(&self, building_id: BuildingId, month: YearMonth) -> Money {
        self.totals
            .read()
            .expect("installment lock poisoned")
            .get(&(building_id, month))
            .copied()
            .unwrap_or_else(Money::zero)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn snapshot(building_id: BuildingId, month: YearMonth) -> MonthlyBalance {
        MonthlyBalance {
            id: SnapshotId::new_v7(),
            building_id,
            month,
            total_expenses: Money::new(dec!(100)),
            total_payments: Money::new(dec!(60)),
            previous_obligations: Money::new(dec!(20)),
            management_fee_total: Money::new(dec!(25)),
            reserve_fund_total: Money::new(dec!(50)),
            scheduled_installments_total: Money::zero(),
            carry_forward: Money::zero(),
            computed_at: Utc::now(),
        }
    }

    #[test]
    fn test_expected_carry_forward_formula() {
        let building = BuildingId::new();
        let month = YearMonth::new(2024, 3).unwrap();
        let s = snapshot(building, month);
        // 100 + 20 + 25 + 50 + 0 - 60 = 135
        assert_eq!(s.expected_carry_forward(), Money::new(dec!(135)));
    }

    #[test]
    fn test_expected_carry_forward_floors_at_zero() {
        let building = BuildingId::new();
        let month = YearMonth::new(2024, 3).unwrap();
        let mut s = snapshot(building, month);
        s.total_payments = Money::new(dec!(500));
        assert_eq!(s.expected_carry_forward(), Money::zero());
    }

    #[test]
    fn test_upsert_replaces_by_key() {
        let store = InMemorySnapshotStore::new();
        let building = BuildingId::new();
        let month = YearMonth::new(2024, 3).unwrap();

        store.upsert(snapshot(building, month));
        let mut updated = snapshot(building, month);
        updated.total_expenses = Money::new(dec!(999));
        store.upsert(updated);

        let stored = store.get(building, month).unwrap();
        assert_eq!(stored.total_expenses, Money::new(dec!(999)));
        assert_eq!(store.for_building(building).len(), 1);
    }

    #[test]
    fn test_for_building_ordered_by_month() {
        let store = InMemorySnapshotStore::new();
        let building = BuildingId::new();
        store.upsert(snapshot(building, YearMonth::new(2024, 3).unwrap()));
        store.upsert(snapshot(building, YearMonth::new(2024, 1).unwrap()));
        store.upsert(snapshot(building, YearMonth::new(2024, 2).unwrap()));
        store.upsert(snapshot(BuildingId::new(), YearMonth::new(2024, 1).unwrap()));

        let months: Vec<_> = store
            .for_building(building)
            .iter()
            .map(|s| s.month.month)
            .collect();
        assert_eq!(months, vec![1, 2, 3]);
    }

    #[test]
    fn test_installments_default_to_zero() {
        let schedule = InMemoryInstallmentSchedule::new();
        let building = BuildingId::new();
        let month = YearMonth::new(2024, 3).unwrap();
        assert_eq!(schedule.installments_total(building, month), Money::zero());

        schedule.set_total(building, month, Money::new(dec!(75)));
        assert_eq!(
            schedule.installments_total(building, month),
            Money::new(dec!(75))
        );
    }
}
