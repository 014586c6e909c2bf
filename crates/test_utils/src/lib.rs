//! Test Utilities Crate
//!
//! Provides shared test infrastructure, fixtures, and helpers for the
//! billing core test suite.
//!
//! # Modules
//!
//! - `fixtures`: Pre-built test data for common entities
//! - `builders`: Builder patterns for test data construction
//! - `harness`: A fully wired in-memory engine for end-to-end tests
//! - `assertions`: Custom assertion helpers for domain types
//! - `generators`: Property-based test data generators

use once_cell::sync::OnceCell;
use tracing_subscriber::EnvFilter;

pub mod assertions;
pub mod builders;
pub mod fixtures;
pub mod generators;
pub mod harness;

pub use assertions::*;
pub use builders::*;
pub use fixtures::*;
pub use generators::*;
pub use harness::*;

static TRACING: OnceCell<()> = OnceCell::new();

/// Initializes a test tracing subscriber once per process
///
/// Honors `RUST_LOG`; defaults to warnings only so test output stays
/// readable. Safe to call from every test.
pub fn init_test_tracing() {
    TRACING.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}
