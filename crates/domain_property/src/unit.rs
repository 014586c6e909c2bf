//! Unit (apartment) entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{BuildingId, Mills, Money, UnitId};

/// An apartment in a building
///
/// `current_balance` is a materialized projection of the unit's ledger fold.
/// It is never an independent source of truth: the only write path is
/// `PropertyRegistry::update_cached_balance`, invoked by the balance
/// calculator after a ledger append, and the consistency verifier checks it
/// against the recomputed fold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Unit {
    /// Unique identifier
    pub id: UnitId,
    /// Owning building
    pub building_id: BuildingId,
    /// Apartment number/label; sort key for deterministic distribution order
    pub number: String,
    /// Ownership share on the 0-1000 mill scale, the default cost-sharing weight
    pub participation_share: Mills,
    /// Dedicated heating share, when the building meters heating separately
    pub heating_share: Option<Mills>,
    /// Dedicated elevator share
    pub elevator_share: Option<Mills>,
    /// Cached signed balance; must always equal the ledger fold
    pub current_balance: Money,
    /// Created timestamp
    pub created_at: DateTime<Utc>,
}

impl Unit {
    /// Creates a new unit with a zero balance
    pub fn new(
        building_id: BuildingId,
        number: impl Into<String>,
        participation_share: Mills,
    ) -> Self {
        Self {
            id: UnitId::new_v7(),
            building_id,
            number: number.into(),
            participation_share,
            heating_share: None,
            elevator_share: None,
            current_balance: Money::zero(),
            created_at: Utc::now(),
        }
    }

    /// Sets the heating share
    pub fn with_heating_share(mut self, share: Mills) -> Self {
        self.heating_share = Some(share);
        self
    }

    /// Sets the elevator share
    pub fn with_elevator_share(mut self, share: Mills) -> Self {
        self.elevator_share = Some(share);
        self
    }

    /// Returns the heating share, falling back to the participation share
    pub fn effective_heating_share(&self) -> Mills {
        self.heating_share.unwrap_or(self.participation_share)
    }

    /// Returns the elevator share, falling back to the participation share
    pub fn effective_elevator_share(&self) -> Mills {
        self.elevator_share.unwrap_or(self.participation_share)
    }
}

/// Sorts units deterministically: by apartment number, then by id
///
/// Residual cents from distribution rounding always land on the first unit
/// of this ordering, so it must be stable across invocations.
pub fn sort_units(units: &mut [Unit]) {
    units.sort_by(|a, b| a.number.cmp(&b.number).then(a.id.cmp(&b.id)));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_new_starts_at_zero() {
        let unit = Unit::new(BuildingId::new(), "A1", Mills::new(300));
        assert_eq!(unit.current_balance, Money::zero());
        assert_eq!(unit.participation_share, Mills::new(300));
    }

    #[test]
    fn test_effective_shares_fall_back_to_participation() {
        let unit = Unit::new(BuildingId::new(), "A1", Mills::new(250));
        assert_eq!(unit.effective_heating_share(), Mills::new(250));

        let unit = unit.with_heating_share(Mills::new(400));
        assert_eq!(unit.effective_heating_share(), Mills::new(400));
        assert_eq!(unit.effective_elevator_share(), Mills::new(250));
    }

    #[test]
    fn test_sort_units_by_number() {
        let building = BuildingId::new();
        let mut units = vec![
            Unit::new(building, "B2", Mills::new(100)),
            Unit::new(building, "A1", Mills::new(100)),
            Unit::new(building, "A2", Mills::new(100)),
        ];
        sort_units(&mut units);
        let numbers: Vec<_> = units.iter().map(|u| u.number.as_str()).collect();
        assert_eq!(numbers, vec!["A1", "A2", "B2"]);
    }
}
