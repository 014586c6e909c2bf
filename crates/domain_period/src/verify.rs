//! Consistency verifier
//!
//! Operational tooling, not hot path: recomputes every cached unit balance
//! for a building and collects discrepancies beyond tolerance. Discrepancies
//! are reported, never corrected; silently rewriting money hides the bug
//! that produced the drift.

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::info;

use core_kernel::{BuildingId, Money, UnitId};
use domain_ledger::{BalanceCalculator, LedgerError, LedgerStore};
use domain_property::PropertyRegistry;

use crate::error::PeriodError;

/// A cached balance that drifted from its ledger fold
#[derive(Debug, Clone)]
pub struct BalanceDiscrepancy {
    pub unit_id: UnitId,
    pub cached: Money,
    pub recomputed: Money,
}

/// Result of verifying a building's cached balances
#[derive(Debug, Clone)]
pub struct BalanceReport {
    pub building_id: BuildingId,
    pub units_checked: usize,
    pub discrepancies: Vec<BalanceDiscrepancy>,
}

impl BalanceReport {
    pub fn is_consistent(&self) -> bool {
        self.discrepancies.is_empty()
    }
}

pub struct ConsistencyVerifier {
    registry: Arc<dyn PropertyRegistry>,
    balances: BalanceCalculator,
}

impl ConsistencyVerifier {
    pub fn new(ledger: Arc<dyn LedgerStore>, registry: Arc<dyn PropertyRegistry>) -> Self {
        let balances = BalanceCalculator::new(ledger, Arc::clone(&registry));
        Self { registry, balances }
    }

    /// Checks every unit's cached balance against the recomputed fold
    pub fn verify_balances(
        &self,
        building_id: BuildingId,
        tolerance: Decimal,
    ) -> Result<BalanceReport, PeriodError> {
        let units = self.registry.units_in_building(building_id)?;
        let units_checked = units.len();
        let mut discrepancies = Vec::new();

        for unit in units {
            match self.balances.check_cached_balance(unit.id, tolerance) {
                Ok(()) => {}
                Err(LedgerError::InvariantViolation {
                    unit_id,
                    cached,
                    recomputed,
                }) => discrepancies.push(BalanceDiscrepancy {
                    unit_id,
                    cached,
                    recomputed,
                }),
                Err(err) => return Err(err.into()),
            }
        }

        info!(
            %building_id,
            units_checked,
            discrepancies = discrepancies.len(),
            "verified cached balances"
        );
        Ok(BalanceReport {
            building_id,
            units_checked,
            discrepancies,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use core_kernel::Mills;
    use domain_ledger::{ChargeCategory, DistributionRule, InMemoryLedgerStore, NewLedgerEntry};
    use domain_property::{Building, InMemoryPropertyRegistry, Unit};
    use rust_decimal_macros::dec;

    #[test]
    fn test_reports_drift_without_correcting() {
        let ledger = Arc::new(InMemoryLedgerStore::new());
        let registry = Arc::new(InMemoryPropertyRegistry::new());
        let building = Building::new("B", NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        let building_id = building.id;
        registry.insert_building(building);

        let healthy = Unit::new(building_id, "1", Mills::new(500));
        let drifted = Unit::new(building_id, "2", Mills::new(500));
        let drifted_id = drifted.id;
        registry.insert_unit(healthy);
        registry.insert_unit(drifted);

        // A charge the cached balance never saw.
        ledger
            .append(
                NewLedgerEntry::charge(
                    drifted_id,
                    building_id,
                    Money::new(dec!(80)),
                    ChargeCategory::Generic(DistributionRule::ByShare),
                    NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
                    Utc::now(),
                )
                .unwrap(),
            )
            .unwrap();

        let verifier = ConsistencyVerifier::new(ledger, registry.clone());
        let report = verifier.verify_balances(building_id, dec!(0.01)).unwrap();

        assert_eq!(report.units_checked, 2);
        assert_eq!(report.discrepancies.len(), 1);
        assert_eq!(report.discrepancies[0].unit_id, drifted_id);
        assert_eq!(report.discrepancies[0].recomputed, Money::new(dec!(80)));

        // The cached value is untouched.
        assert_eq!(
            registry.unit(drifted_id).unwrap().current_balance,
            Money::zero()
        );
    }
}
