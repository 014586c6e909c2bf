//! Test Data Builders
//!
//! Provides builder patterns for constructing test data with sensible
//! defaults. Tests specify only the relevant fields and take defaults for
//! everything else.

use chrono::NaiveDate;
use fake::faker::address::en::StreetName;
use fake::Fake;

use core_kernel::{BuildingId, Mills, Money};
use domain_property::{Building, ReserveFundPlan, Unit};

use crate::fixtures::TemporalFixtures;

/// Builder for test buildings
pub struct TestBuildingBuilder {
    name: String,
    billing_start: NaiveDate,
    recurring_fee: Option<Money>,
    reserve_fund: Option<ReserveFundPlan>,
}

impl Default for TestBuildingBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestBuildingBuilder {
    /// Creates a new builder with default values
    pub fn new() -> Self {
        Self {
            name: StreetName().fake(),
            billing_start: TemporalFixtures::billing_start(),
            recurring_fee: None,
            reserve_fund: None,
        }
    }

    /// Sets the building name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the billing-start floor
    pub fn with_billing_start(mut self, date: NaiveDate) -> Self {
        self.billing_start = date;
        self
    }

    /// Sets the monthly management fee per unit
    pub fn with_recurring_fee(mut self, fee: Money) -> Self {
        self.recurring_fee = Some(fee);
        self
    }

    /// Sets the reserve fund plan
    pub fn with_reserve_fund(mut self, plan: ReserveFundPlan) -> Self {
        self.reserve_fund = Some(plan);
        self
    }

    /// Builds the building
    pub fn build(self) -> Building {
        let mut building = Building::new(self.name, self.billing_start);
        if let Some(fee) = self.recurring_fee {
            building = building.with_recurring_fee(fee);
        }
        if let Some(plan) = self.reserve_fund {
            building = building.with_reserve_fund(plan);
        }
        building
    }
}

/// Builder for test units
pub struct TestUnitBuilder {
    building_id: BuildingId,
    number: String,
    participation_share: Mills,
    heating_share: Option<Mills>,
    elevator_share: Option<Mills>,
}

impl TestUnitBuilder {
    /// Creates a new builder for a unit in the given building
    pub fn new(building_id: BuildingId) -> Self {
        Self {
            building_id,
            number: "1".to_string(),
            participation_share: Mills::new(500),
            heating_share: None,
            elevator_share: None,
        }
    }

    /// Sets the apartment number
    pub fn with_number(mut self, number: impl Into<String>) -> Self {
        self.number = number.into();
        self
    }

    /// Sets the participation share in mills
    pub fn with_share(mut self, mills: u32) -> Self {
        self.participation_share = Mills::new(mills);
        self
    }

    /// Sets a dedicated heating share in mills
    pub fn with_heating_share(mut self, mills: u32) -> Self {
        self.heating_share = Some(Mills::new(mills));
        self
    }

    /// Sets a dedicated elevator share in mills
    pub fn with_elevator_share(mut self, mills: u32) -> Self {
        self.elevator_share = Some(Mills::new(mills));
        self
    }

    /// Builds the unit
    pub fn build(self) -> Unit {
        let mut unit = Unit::new(self.building_id, self.number, self.participation_share);
        if let Some(share) = self.heating_share {
            unit = unit.with_heating_share(share);
        }
        if let Some(share) = self.elevator_share {
            unit = unit.with_elevator_share(share);
        }
        unit
    }
}
