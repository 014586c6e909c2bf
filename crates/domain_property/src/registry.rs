//! Property registry port and in-memory adapter
//!
//! The billing core consumes units and buildings through this read-only
//! port; the single write operation is the cached-balance refresh, which the
//! balance calculator performs under the unit's ledger lock. The in-memory
//! adapter is the reference implementation used by tests and by deployments
//! that load the registry up front.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::NaiveDate;

use core_kernel::{BuildingId, Money, UnitId};

use crate::building::Building;
use crate::error::PropertyError;
use crate::meter::{MeterKind, MeterReading};
use crate::unit::{sort_units, Unit};

/// Read-only lookups of units, buildings, and meter readings
///
/// `units_in_building` returns units in deterministic order (apartment
/// number, then id); distribution residuals depend on that ordering.
pub trait PropertyRegistry: Send + Sync {
    fn unit(&self, id: UnitId) -> Result<Unit, PropertyError>;

    fn units_in_building(&self, building_id: BuildingId) -> Result<Vec<Unit>, PropertyError>;

    fn building(&self, id: BuildingId) -> Result<Building, PropertyError>;

    /// Persists a recomputed cached balance for a unit
    ///
    /// Callers must hold the unit's ledger lock for the append+refresh pair.
    fn update_cached_balance(&self, unit_id: UnitId, balance: Money)
        -> Result<(), PropertyError>;

    /// Meter readings for a unit within an inclusive date window
    fn meter_readings(
        &self,
        unit_id: UnitId,
        kind: MeterKind,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<MeterReading>, PropertyError>;
}

/// In-memory registry adapter
#[derive(Debug, Default)]
pub struct InMemoryPropertyRegistry {
    buildings: RwLock<HashMap<BuildingId, Building>>,
    units: RwLock<HashMap<UnitId, Unit>>,
    readings: RwLock<Vec<MeterReading>>,
}

impl InMemoryPropertyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_building(&self, building: Building) {
        self.buildings
            .write()
            .expect("registry lock poisoned")
            .insert(building.id, building);
    }

    pub fn insert_unit(&self, unit: Unit) {
        self.units
            .write()
            .expect("registry lock poisoned")
            .insert(unit.id, unit);
    }

    pub fn insert_reading(&self, reading: MeterReading) {
        self.readings
            .write()
            .expect("registry lock poisoned")
            .push(reading);
    }
}

impl PropertyRegistry for InMemoryPropertyRegistry {
    fn unit(&self, id: UnitId) -> Result<Unit, PropertyError> {
        self.units
            .read()
            .expect("registry lock poisoned")
            .get(&id)
            .cloned()
            .ok_or(PropertyError::UnitNotFound(id))
    }

    fn units_in_building(&self, building_id: BuildingId) -> Result<Vec<Unit>, PropertyError> {
        let mut units: Vec<Unit> = self
            .units
            .read()
            .expect("registry lock poisoned")
            .values()
            .filter(|u| u.building_id == building_id)
            .cloned()
            .collect();
        sort_units(&mut units);
        Ok(units)
    }

    fn building(&self, id: BuildingId) -> Result<Building, PropertyError> {
        self.buildings
            .read()
            .expect("registry lock poisoned")
            .get(&id)
            .cloned()
            .ok_or(PropertyError::BuildingNotFound(id))
    }

    fn update_cached_balance(
        &self,
        unit_id: UnitId,
        balance: Money,
    ) -> Result<(), PropertyError> {
        let mut units = self.units.write().expect("registry lock poisoned");
        let unit = units
            .get_mut(&unit_id)
            .ok_or(PropertyError::UnitNotFound(unit_id))?;
        unit.current_balance = balance;
        Ok(())
    }

    fn meter_readings(
        &self,
        unit_id: UnitId,
        kind: MeterKind,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<MeterReading>, PropertyError> {
        Ok(self
            .readings
            .read()
            .expect("registry lock poisoned")
            .iter()
            .filter(|r| {
                r.unit_id == unit_id && r.kind == kind && r.read_at >= from && r.read_at <= to
            })
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::Mills;
    use rust_decimal_macros::dec;

    #[test]
    fn test_units_in_building_sorted() {
        let registry = InMemoryPropertyRegistry::new();
        let building = Building::new("Test", NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        let building_id = building.id;
        registry.insert_building(building);

        registry.insert_unit(Unit::new(building_id, "3", Mills::new(400)));
        registry.insert_unit(Unit::new(building_id, "1", Mills::new(300)));
        registry.insert_unit(Unit::new(building_id, "2", Mills::new(300)));

        let units = registry.units_in_building(building_id).unwrap();
        let numbers: Vec<_> = units.iter().map(|u| u.number.as_str()).collect();
        assert_eq!(numbers, vec!["1", "2", "3"]);
    }

    #[test]
    fn test_update_cached_balance() {
        let registry = InMemoryPropertyRegistry::new();
        let unit = Unit::new(BuildingId::new(), "1", Mills::new(300));
        let unit_id = unit.id;
        registry.insert_unit(unit);

        registry
            .update_cached_balance(unit_id, Money::new(dec!(42.50)))
            .unwrap();
        assert_eq!(
            registry.unit(unit_id).unwrap().current_balance,
            Money::new(dec!(42.50))
        );
    }

    #[test]
    fn test_unknown_unit() {
        let registry = InMemoryPropertyRegistry::new();
        assert!(matches!(
            registry.unit(UnitId::new()),
            Err(PropertyError::UnitNotFound(_))
        ));
    }

    #[test]
    fn test_meter_readings_window() {
        let registry = InMemoryPropertyRegistry::new();
        let unit_id = UnitId::new();
        let date = |m, d| NaiveDate::from_ymd_opt(2024, m, d).unwrap();

        registry.insert_reading(MeterReading::new(unit_id, MeterKind::Water, dec!(10), date(1, 5)));
        registry.insert_reading(MeterReading::new(unit_id, MeterKind::Water, dec!(20), date(3, 5)));
        registry.insert_reading(MeterReading::new(unit_id, MeterKind::Heating, dec!(5), date(3, 6)));

        let readings = registry
            .meter_readings(unit_id, MeterKind::Water, date(2, 1), date(3, 31))
            .unwrap();
        assert_eq!(readings.len(), 1);
        assert_eq!(readings[0].value, dec!(20));
    }
}
