use thiserror::Error;

use core_kernel::{MoneyError, UnitId};
use domain_property::PropertyError;

#[derive(Error, Debug)]
pub enum DistributionError {
    #[error("cannot distribute over an empty unit set")]
    EmptyUnitSet,

    #[error("unknown unit in distribution target set: {0}")]
    UnknownUnit(UnitId),

    #[error(transparent)]
    Money(#[from] MoneyError),

    #[error(transparent)]
    Property(#[from] PropertyError),
}
