//! Period Domain - Monthly Closing and Recurring Charges
//!
//! Turns the ledger's raw entries into closed calendar months: snapshot
//! computation with an iterative carry-forward chain, idempotent recurring
//! charge generation, and the read-only consistency checks that guard both.

pub mod closer;
pub mod error;
pub mod monthly_balance;
pub mod recurring;
pub mod verify;

pub use closer::{ChainMismatch, ChainReport, MismatchKind, PeriodCloser};
pub use error::PeriodError;
pub use monthly_balance::{
    InMemoryInstallmentSchedule, InMemorySnapshotStore, InstallmentSchedule, MonthlyBalance,
    SnapshotStore,
};
pub use recurring::{ChargeOutcome, GenerationResult, RecurringChargeGenerator, SkipReason};
pub use verify::{BalanceDiscrepancy, BalanceReport, ConsistencyVerifier};
