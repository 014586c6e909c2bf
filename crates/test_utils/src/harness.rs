//! In-memory engine harness
//!
//! A fully wired `BillingEngine` over the in-memory adapters, with the
//! stores exposed for direct inspection. End-to-end tests build one of
//! these instead of repeating the wiring.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use billing_engine::{BillingEngine, EngineConfig};
use core_kernel::FixedClock;
use domain_ledger::InMemoryLedgerStore;
use domain_period::{InMemoryInstallmentSchedule, InMemorySnapshotStore};
use domain_property::{Building, InMemoryPropertyRegistry, Unit};

pub struct EngineHarness {
    pub engine: BillingEngine,
    pub registry: Arc<InMemoryPropertyRegistry>,
    pub ledger: Arc<InMemoryLedgerStore>,
    pub snapshots: Arc<InMemorySnapshotStore>,
    pub installments: Arc<InMemoryInstallmentSchedule>,
}

impl EngineHarness {
    /// Wires an engine around empty in-memory stores and a fixed clock
    pub fn new(now: DateTime<Utc>, config: EngineConfig) -> Self {
        let registry = Arc::new(InMemoryPropertyRegistry::new());
        let ledger = Arc::new(InMemoryLedgerStore::new());
        let snapshots = Arc::new(InMemorySnapshotStore::new());
        let installments = Arc::new(InMemoryInstallmentSchedule::new());

        let engine = BillingEngine::new(
            registry.clone(),
            ledger.clone(),
            snapshots.clone(),
            installments.clone(),
            Arc::new(FixedClock::at(now)),
            config,
        );

        Self {
            engine,
            registry,
            ledger,
            snapshots,
            installments,
        }
    }

    /// Registers a building and its units, returning their ids in order
    pub fn seed(&self, building: Building, units: Vec<Unit>) -> Vec<core_kernel::UnitId> {
        self.registry.insert_building(building);
        let ids = units.iter().map(|u| u.id).collect();
        for unit in units {
            self.registry.insert_unit(unit);
        }
        ids
    }
}

impl Default for EngineHarness {
    fn default() -> Self {
        Self::new(Utc::now(), EngineConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::{TestBuildingBuilder, TestUnitBuilder};
    use core_kernel::Money;

    #[test]
    fn test_harness_wires_a_working_engine() {
        let harness = EngineHarness::default();
        let building = TestBuildingBuilder::new().build();
        let building_id = building.id;
        let unit = TestUnitBuilder::new(building_id).build();
        let ids = harness.seed(building, vec![unit]);

        assert_eq!(
            harness.engine.current_balance(ids[0]).unwrap(),
            Money::zero()
        );
    }
}
