//! Ledger domain errors

use core_kernel::{Money, MoneyError, UnitId};
use domain_property::PropertyError;
use thiserror::Error;

/// Errors that can occur in the ledger domain
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Entry fails the kind/field invariants
    #[error("Invalid ledger entry: {0}")]
    InvalidEntry(String),

    /// Another operation holds the unit's append+refresh lock
    ///
    /// Retryable: the caller should re-run the whole append+refresh.
    #[error("Concurrent update conflict on unit {0}")]
    ConcurrentUpdateConflict(UnitId),

    /// Cached balance disagrees with the recomputed fold beyond tolerance
    ///
    /// Surfaced to operators via the consistency verifier; never silently
    /// corrected in the hot path.
    #[error("Invariant violation on unit {unit_id}: cached {cached}, recomputed {recomputed}")]
    InvariantViolation {
        unit_id: UnitId,
        cached: Money,
        recomputed: Money,
    },

    /// Property registry failure
    #[error(transparent)]
    Property(#[from] PropertyError),

    /// Money arithmetic failure
    #[error(transparent)]
    Money(#[from] MoneyError),
}

impl LedgerError {
    /// True for errors the caller should retry rather than surface
    pub fn is_retryable(&self) -> bool {
        matches!(self, LedgerError::ConcurrentUpdateConflict(_))
    }
}
