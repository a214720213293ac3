//! Errors from the payroll store.

use std::path::PathBuf;
use thiserror::Error;

use crate::error::ValidationError;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Cannot prepare database directory '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Migration {version} failed: {reason}")]
    Migration { version: u32, reason: String },

    /// A write was refused before any SQL ran.
    #[error("Rejected row: {0}")]
    Validation(#[from] ValidationError),

    /// A stored row breaks an invariant of the in-memory payroll, e.g. one
    /// written before a rule existed.
    #[error("Stored {table} row {id} cannot be loaded: {source}")]
    Snapshot {
        table: &'static str,
        id: i64,
        #[source]
        source: ValidationError,
    },

    #[error("Database lock poisoned")]
    LockPoisoned,
}

impl DatabaseError {
    pub(crate) fn snapshot(table: &'static str, id: i64) -> impl FnOnce(ValidationError) -> Self {
        move |source| DatabaseError::Snapshot { table, id, source }
    }
}
