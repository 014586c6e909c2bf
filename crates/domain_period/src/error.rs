use thiserror::Error;

use core_kernel::{BuildingId, CoreError, TemporalError, YearMonth};
use domain_distribution::DistributionError;
use domain_ledger::LedgerError;
use domain_property::PropertyError;

#[derive(Error, Debug)]
pub enum PeriodError {
    /// Another closer holds the (building, month) critical section. The
    /// stored snapshot is untouched; callers retry.
    #[error("closing already in progress for building {building_id}, month {month}")]
    ClosingInProgress {
        building_id: BuildingId,
        month: YearMonth,
    },

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Property(#[from] PropertyError),

    #[error(transparent)]
    Distribution(#[from] DistributionError),

    #[error(transparent)]
    Temporal(#[from] TemporalError),

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl PeriodError {
    /// Transient errors the caller should retry rather than surface
    pub fn is_retryable(&self) -> bool {
        match self {
            PeriodError::ClosingInProgress { .. } => true,
            PeriodError::Ledger(err) => err.is_retryable(),
            _ => false,
        }
    }
}
