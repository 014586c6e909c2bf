//! Core Kernel - Foundational types and utilities for the billing engine
//!
//! This crate provides the fundamental building blocks used across all domain
//! modules:
//! - Money types with precise decimal arithmetic and cent-conserving allocation
//! - Calendar-month temporal types for period closing
//! - Common identifiers and value objects
//! - The clock abstraction injected into every time-dependent component

pub mod clock;
pub mod error;
pub mod identifiers;
pub mod money;
pub mod temporal;

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::CoreError;
pub use identifiers::{
    BuildingId, ExpenseId, LedgerEntryId, MeterReadingId, PaymentId, SnapshotId, UnitId,
};
pub use money::{Mills, Money, MoneyError};
pub use temporal::{MonthRange, TemporalError, YearMonth};
