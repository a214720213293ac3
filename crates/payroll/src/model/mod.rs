//! Row types for employers, compensation records and import vintages.
//!
//! Identifiers are SQLite row ids. Jobs and salaries are per-year facts tied
//! to the vintage (upload) they were imported with.

pub mod compensation;
pub mod employer;
pub mod money;
pub mod vintage;

pub type VintageId = i64;
pub type TaxonomyId = i64;
pub type UniverseId = i64;
pub type EmployerId = i64;
pub type PersonId = i64;
pub type PositionId = i64;
pub type JobId = i64;
pub type SalaryId = i64;

pub use compensation::{
    total_pay, validate_pay, Job, Person, Position, Salary, MAX_PAY, WAGE_THRESHOLD,
};
pub use employer::{
    closest_population, Employer, EmployerPopulation, EmployerTaxonomy, EmployerUniverse,
    NewEmployer,
};
pub use money::Money;
pub use vintage::{FileStatus, RespondingAgency, SourceFile, StandardizedFile, Upload};
