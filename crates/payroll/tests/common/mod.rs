//! Shared test utilities for payroll integration tests.
//!
//! This module provides:
//! - `PayrollBuilder` for assembling in-memory snapshots
//! - `BatchBuilder` for standardized import batches
//! - `TestHarness` for a file-backed database in a temp directory

pub mod builders;
pub mod harness;

pub use builders::*;
pub use harness::TestHarness;
