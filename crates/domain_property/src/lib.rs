//! Property Domain - Units, Buildings, and Meter Readings
//!
//! This crate holds the building registry side of the billing core: the
//! apartment units with their participation shares, the buildings with their
//! recurring-charge configuration, and the metered consumption readings used
//! by meter-based expense distribution.
//!
//! The registry is consumed read-only by the rest of the engine, except for
//! the cached-balance refresh performed by the balance calculator.

pub mod building;
pub mod error;
pub mod meter;
pub mod registry;
pub mod unit;

pub use building::{Building, ReserveFundPlan};
pub use error::PropertyError;
pub use meter::{consumption_delta, MeterKind, MeterReading};
pub use registry::{InMemoryPropertyRegistry, PropertyRegistry};
pub use unit::{sort_units, Unit};
