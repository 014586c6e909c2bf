//! Billing Engine - Shared-Building Expense Billing Core
//!
//! The façade crate: wires the property, ledger, distribution, and period
//! domains into the operation surface that collaborating systems consume.

pub mod config;
pub mod error;
pub mod service;

pub use config::EngineConfig;
pub use error::EngineError;
pub use service::BillingEngine;
