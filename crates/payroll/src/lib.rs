pub mod classification;
pub mod comparison;
pub mod config;
pub mod db;
pub mod display;
pub mod error;
pub mod ingest;
pub mod logging;
pub mod model;
pub mod payroll;
pub mod percentile;
pub mod service;

pub use classification::{size_class, EntityType, SizeBounds, SizeClass};
pub use comparison::{Comparability, ComparisonGroup, ComparisonIndex};
pub use config::{load_config, Config};
pub use db::{Database, DatabaseError};
pub use error::{
    ConfigError, ImportError, LoggingError, PayrollError, PercentileError, Result,
    ValidationError,
};
pub use ingest::{import_batch, load_batch, ImportSummary, StandardizedBatch, StandardizedRecord};
pub use model::Money;
pub use payroll::Payroll;
pub use percentile::{Percentile, PercentileEngine, RankedPopulation, SalaryPercentiles};
pub use service::{EmployerProfile, PayrollService, YearSummary};
