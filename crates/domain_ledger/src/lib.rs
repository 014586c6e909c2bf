//! Ledger Domain - Append-Only Transaction Ledger and Balance Calculator
//!
//! This crate implements the source of truth of the billing core: an
//! ordered, append-only ledger of per-unit charges, payments, and manual
//! adjustments, together with the single balance-folding implementation.
//!
//! # Invariants
//!
//! - Entries are immutable once appended; corrections append new entries
//! - Entries sharing an effective date fold in append order
//! - A unit's cached `current_balance` always equals the ledger fold; the
//!   consistency verifier reports drift beyond tolerance instead of fixing it
//! - Management-fee and reserve-fund charges are excluded from generic
//!   aggregates by their category tag, never by runtime filtering of strings

pub mod balance;
pub mod entry;
pub mod error;
pub mod expense;
pub mod store;

pub use balance::BalanceCalculator;
pub use entry::{EntryKind, EntryReference, LedgerEntry, NewLedgerEntry};
pub use error::LedgerError;
pub use expense::{
    ChargeCategory, DistributionRule, ExpenseRecord, PayerResponsibility, PaymentMethod,
    PaymentRecord,
};
pub use store::{find_expense_in_month, InMemoryLedgerStore, LedgerStore, UnitLockGuard};
