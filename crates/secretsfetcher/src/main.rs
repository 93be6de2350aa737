//! secretsfetcher CLI entry point

use secretsfetcher::cli::{self, Cli, CliError, EXIT_OK, exit_code_for, render_error};
use secretsfetcher::commands;
use secretsfetcher::config::FileConfig;
use secretsfetcher::tracing::{self, TracingConfig};

#[tokio::main]
async fn main() {
    // NOTE: eprintln! is intentional, tracing may not be usable during a panic
    #[allow(clippy::print_stderr)]
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("Application panicked: {panic_info}");
        eprintln!("Internal error occurred. Run with RUST_LOG=debug for more information.");
    }));

    let exit_code = match run(cli::parse()).await {
        Ok(()) => EXIT_OK,
        Err(err) => {
            render_error(&err);
            exit_code_for(&err)
        }
    };
    std::process::exit(exit_code);
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config = FileConfig::load(cli.config.as_deref())?;
    let level = match cli.level {
        Some(level) => level,
        None => config.log_level()?.unwrap_or_default(),
    };

    tracing::init_tracing(TracingConfig {
        format: cli.log_format,
        level,
    })?;

    commands::execute(cli.command, &config).await
}
