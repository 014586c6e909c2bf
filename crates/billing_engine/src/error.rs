use thiserror::Error;

use core_kernel::CoreError;
use domain_distribution::DistributionError;
use domain_ledger::LedgerError;
use domain_period::PeriodError;
use domain_property::PropertyError;

#[derive(Error, Debug)]
pub enum EngineError {
    /// Management-fee and reserve-fund expenses come only from the recurring
    /// generator; recording one directly would double-charge the category.
    #[error("recurring categories are generated by the engine, not recorded as expenses")]
    ReservedCategoryExpense,

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Property(#[from] PropertyError),

    #[error(transparent)]
    Distribution(#[from] DistributionError),

    #[error(transparent)]
    Period(#[from] PeriodError),
}

impl EngineError {
    /// Transient contention the caller should retry; everything else is
    /// operator-facing
    pub fn is_retryable(&self) -> bool {
        match self {
            EngineError::Ledger(err) => err.is_retryable(),
            EngineError::Period(err) => err.is_retryable(),
            _ => false,
        }
    }
}
