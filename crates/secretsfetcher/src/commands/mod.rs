//! Command implementations

pub mod fetch;
pub mod version;

use crate::cli::{CliError, Commands};
use crate::config::FileConfig;

/// Run a parsed subcommand
///
/// # Errors
/// Returns the command's [`CliError`].
pub async fn execute(command: Commands, config: &FileConfig) -> Result<(), CliError> {
    match command {
        Commands::Version => {
            version::execute_version();
            Ok(())
        }
        Commands::Fetch(args) => fetch::execute_fetch(&args, config).await.map(|_| ()),
    }
}
