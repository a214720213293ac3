use std::path::PathBuf;
use thiserror::Error;

use crate::model::{EmployerId, JobId, Money, SalaryId, VintageId};

#[derive(Error, Debug)]
pub enum PayrollError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Percentile error: {0}")]
    Percentile(#[from] PercentileError),

    #[error("Import error: {0}")]
    Import(#[from] ImportError),

    #[error("Database error: {0}")]
    Database(#[from] crate::db::DatabaseError),

    #[error("Logging error: {0}")]
    Logging(#[from] LoggingError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: i64 },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Schema validation failed: {errors}")]
    SchemaValidation { errors: String },
}

/// Write-time invariant violations. Rows that fail these checks are never
/// stored.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Department '{name}' cannot have a taxonomy")]
    DepartmentWithTaxonomy { name: String },

    #[error("Unit '{name}' cannot have a universe")]
    UnitWithUniverse { name: String },

    #[error("Department '{name}' cannot belong to department {parent_id}")]
    NestedDepartment { name: String, parent_id: EmployerId },

    #[error("A unit named '{name}' already exists")]
    DuplicateUnit { name: String },

    #[error("Unit {parent_id} already has a department named '{name}'")]
    DuplicateDepartment { name: String, parent_id: EmployerId },

    #[error("Employer {employer_id} already has a position titled '{title}'")]
    DuplicatePosition {
        title: String,
        employer_id: EmployerId,
    },

    #[error("Employer {employer_id} already has a population reading for {data_year}")]
    DuplicatePopulation {
        employer_id: EmployerId,
        data_year: i32,
    },

    #[error("Salary for job {job_id} needs an amount or extra pay")]
    MissingPay { job_id: JobId },

    #[error("Salary for job {job_id} has an out-of-range amount {amount}")]
    PayOutOfRange { job_id: JobId, amount: Money },

    #[error("Unknown {kind} {id}")]
    UnknownReference { kind: &'static str, id: i64 },

    #[error("Cannot move standardized file from '{from}' to '{to}'")]
    InvalidTransition { from: String, to: String },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PercentileError {
    #[error("No salaries to rank against in {year}")]
    EmptyPopulation { year: i32 },

    #[error("Unknown salary {0}")]
    UnknownSalary(SalaryId),

    #[error("Unknown employer {0}")]
    UnknownEmployer(EmployerId),

    #[error("Vintage {0} has no reporting year")]
    UnknownVintage(VintageId),
}

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("Failed to read import file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse import JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Record {index}: {reason}")]
    InvalidRecord { index: usize, reason: String },

    #[error("Database error during import: {0}")]
    Database(#[from] crate::db::DatabaseError),
}

#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("Invalid log filter '{filter}': {reason}")]
    Filter { filter: String, reason: String },

    #[error("Failed to bridge log records: {0}")]
    Bridge(#[from] log::SetLoggerError),

    #[error("Failed to install tracing subscriber: {0}")]
    Subscriber(#[from] tracing::subscriber::SetGlobalDefaultError),
}

pub type Result<T> = std::result::Result<T, PayrollError>;
