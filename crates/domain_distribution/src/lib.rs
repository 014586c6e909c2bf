//! Distribution Domain - Splitting Shared Expenses Across Units
//!
//! Implements the four generic distribution rules plus the dedicated splits
//! for the reserved recurring categories. Every split conserves the expense
//! amount to the cent; residual cents go to the first units of the
//! deterministic sort order.

pub mod engine;
pub mod error;

pub use engine::{DistributionEngine, ShareBasis, UnitShare};
pub use error::DistributionError;
