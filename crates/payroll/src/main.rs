use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde::Serialize;

use payroll::config::{load_config_or_default, Config};
use payroll::db::Database;
use payroll::error::{ConfigError, PayrollError, Result};
use payroll::ingest::load_batch;
use payroll::logging::init_logging;
use payroll::service::PayrollService;

#[derive(Parser, Debug)]
#[command(name = "payroll", version)]
#[command(about = "Query public-sector payroll data and salary percentiles")]
struct Cli {
    /// Config file (defaults to ~/.payroll/config.json when present)
    #[arg(short, long, env = "PAYROLL_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Database file, overriding the config
    #[arg(short, long, env = "PAYROLL_DATABASE", value_name = "FILE")]
    database: Option<PathBuf>,

    /// Emit logs as JSON lines on stderr
    #[arg(long)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create or upgrade the database schema
    Migrate,
    /// Import a standardized payroll batch (JSON)
    Import { file: PathBuf },
    /// Reporting years with salary data
    Years,
    /// Employer profile for a year
    Employer {
        id: i64,
        #[arg(short, long)]
        year: Option<i32>,
    },
    /// Highest-paid jobs at an employer
    Jobs {
        id: i64,
        #[arg(short, long)]
        year: Option<i32>,
        #[arg(short, long, default_value = "25")]
        limit: usize,
    },
    /// Employer and peer-group percentiles of a salary
    Salary { id: i64 },
    /// Totals for a reporting year
    Summary {
        #[arg(short, long)]
        year: Option<i32>,
    },
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn open_database(cli: &Cli, config: &Config) -> Result<Database> {
    let path = cli
        .database
        .clone()
        .or_else(|| config.resolved_database_path())
        .ok_or_else(|| ConfigError::Validation {
            message: "Cannot determine database path: no home directory".to_string(),
        })?;
    Ok(Database::open(&path)?)
}

/// `year`, else the configured default, else the latest year with salaries.
fn resolve_year(service: &PayrollService, config: &Config, year: Option<i32>) -> Result<i32> {
    if let Some(year) = year.or(config.default_year) {
        return Ok(year);
    }
    service
        .years()?
        .first()
        .copied()
        .ok_or_else(|| {
            ConfigError::Validation {
                message: "No salary data imported yet; pass --year".to_string(),
            }
            .into()
        })
}

fn run(cli: Cli) -> Result<()> {
    let config = load_config_or_default(cli.config.as_deref())?;
    init_logging(&config.log_filter, cli.log_json)?;

    let db = open_database(&cli, &config)?;
    let service = PayrollService::new(db);

    match cli.command {
        Command::Migrate => {
            // Opening the database already applied pending migrations.
            log::info!("Database schema is up to date");
            Ok(())
        }
        Command::Import { file } => {
            let batch = load_batch(&file)?;
            print_json(&service.import(&batch)?)
        }
        Command::Years => print_json(&service.years()?),
        Command::Employer { id, year } => {
            let year = year.or(config.default_year);
            print_json(&service.employer_profile(id, year)?)
        }
        Command::Jobs { id, year, limit } => {
            let year = resolve_year(&service, &config, year)?;
            print_json(&service.jobs_of_employer(id, year, limit)?)
        }
        Command::Salary { id } => print_json(&service.salary_percentiles(id)?),
        Command::Summary { year } => {
            let year = resolve_year(&service, &config, year)?;
            print_json(&service.year_summary(year)?)
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            eprintln!("Error: {}", e);
            if matches!(e, PayrollError::NotFound { .. }) {
                ExitCode::from(2)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}
