//! Process-wide logging setup for the `payroll` binary.
//!
//! The library logs through the `log` facade and opens `tracing` spans;
//! [`init_logging`] routes both into one `tracing-subscriber` pipeline.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter, Registry};

use crate::error::LoggingError;

/// Builds the filter from `RUST_LOG` when set, else from `directives`.
pub fn env_filter(directives: &str) -> Result<EnvFilter, LoggingError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(directives).map_err(|e| LoggingError::Filter {
            filter: directives.to_string(),
            reason: e.to_string(),
        }),
    }
}

/// Installs the global subscriber and the `log` bridge. Output goes to
/// stderr so command output on stdout stays machine-readable.
pub fn init_logging(directives: &str, json: bool) -> Result<(), LoggingError> {
    let filter = env_filter(directives)?;

    if json {
        let subscriber = Registry::default()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr));
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let subscriber = Registry::default()
            .with(filter)
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr));
        tracing::subscriber::set_global_default(subscriber)?;
    }

    tracing_log::LogTracer::init()?;
    Ok(())
}
