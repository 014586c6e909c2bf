//! Property domain errors

use core_kernel::{BuildingId, CoreError, UnitId};
use thiserror::Error;

/// Errors that can occur in the property domain
#[derive(Debug, Error)]
pub enum PropertyError {
    /// Unit not found
    #[error("Unit not found: {0}")]
    UnitNotFound(UnitId),

    /// Building not found
    #[error("Building not found: {0}")]
    BuildingNotFound(BuildingId),

    /// Configuration problem (e.g., invalid reserve fund plan)
    #[error(transparent)]
    Core(#[from] CoreError),
}
