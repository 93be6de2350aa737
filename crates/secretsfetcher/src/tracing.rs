//! Tracing configuration for the secretsfetcher CLI
//!
//! Logs always go to stderr. JSON is the default so the tool can run
//! unattended in containers; `pretty` and `compact` are for local use.

use crate::cli::CliError;
use std::io;
pub use tracing::Level;
use tracing_subscriber::{filter::EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Crates whose events pass the level filter when `RUST_LOG` is unset
const LOG_TARGETS: [&str; 3] = [
    "secretsfetcher",
    "secretsfetcher_secrets",
    "secretsfetcher_aws",
];

/// Tracing output format options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum TracingFormat {
    /// Structured JSON, one object per line
    #[default]
    Json,
    /// Pretty-printed human-readable format
    Pretty,
    /// Compact single-line format
    Compact,
}

/// Log level options for CLI
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogLevel {
    /// Show all logs (trace level)
    Trace,
    /// Show debug and above
    Debug,
    /// Show info and above (default)
    #[default]
    Info,
    /// Show warnings and above
    Warn,
    /// Show errors only
    Error,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Self::TRACE,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Info => Self::INFO,
            LogLevel::Warn => Self::WARN,
            LogLevel::Error => Self::ERROR,
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = CliError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        <Self as clap::ValueEnum>::from_str(s.trim(), true).map_err(|_| {
            CliError::config_with_help(
                format!("Unknown log level: {s}"),
                "Use one of trace, debug, info, warn, error",
            )
        })
    }
}

/// Tracing configuration
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingConfig {
    /// Output format
    pub format: TracingFormat,
    /// Minimum level for this tool's own crates
    pub level: LogLevel,
}

fn default_filter(level: Level) -> String {
    let level = level.as_str().to_lowercase();
    LOG_TARGETS
        .iter()
        .map(|target| format!("{target}={level}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Initialize tracing with the given configuration.
///
/// `RUST_LOG` takes precedence over the configured level.
///
/// # Errors
/// Returns [`CliError::Config`] if the filter is invalid or a subscriber is
/// already installed.
pub fn init_tracing(config: TracingConfig) -> Result<(), CliError> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter(config.level.into())))
        .map_err(|e| CliError::config(format!("Failed to create tracing filter: {e}")))?;

    let registry = tracing_subscriber::registry().with(env_filter);

    let result = match config.format {
        TracingFormat::Json => {
            let layer = tracing_subscriber::fmt::layer()
                .json()
                .with_writer(io::stderr)
                .with_current_span(true)
                .with_span_list(false);

            registry.with(layer).try_init()
        }
        TracingFormat::Pretty => {
            let layer = tracing_subscriber::fmt::layer()
                .pretty()
                .with_writer(io::stderr)
                .with_target(true);

            registry.with(layer).try_init()
        }
        TracingFormat::Compact => {
            let layer = tracing_subscriber::fmt::layer()
                .compact()
                .with_writer(io::stderr)
                .with_target(false)
                .with_thread_ids(false);

            registry.with(layer).try_init()
        }
    };
    result.map_err(|e| CliError::config(format!("Failed to initialize tracing: {e}")))?;

    tracing::debug!(
        version = env!("CARGO_PKG_VERSION"),
        format = ?config.format,
        level = ?config.level,
        "Tracing initialized"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_parsing() {
        assert_eq!("debug".parse::<LogLevel>().unwrap(), LogLevel::Debug);
        assert_eq!("WARN".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert_eq!(" info ".parse::<LogLevel>().unwrap(), LogLevel::Info);
        assert!("verbose".parse::<LogLevel>().is_err());
    }

    #[test]
    fn test_default_filter_covers_every_crate() {
        let filter = default_filter(Level::WARN);
        assert_eq!(
            filter,
            "secretsfetcher=warn,secretsfetcher_secrets=warn,secretsfetcher_aws=warn"
        );
        assert!(EnvFilter::try_new(filter).is_ok());
    }

    #[test]
    fn test_defaults() {
        let config = TracingConfig::default();
        assert_eq!(config.format, TracingFormat::Json);
        assert_eq!(config.level, LogLevel::Info);
        assert_eq!(Level::from(LogLevel::Error), Level::ERROR);
    }
}
