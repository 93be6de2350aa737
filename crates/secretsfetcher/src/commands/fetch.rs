//! The `fetch` command: retrieve secrets and write them to files

use crate::cli::{CliError, FetchArgs};
use crate::config::{FetchSettings, FetchSource, FileConfig};
use secretsfetcher_aws::AwsSecretStore;
use secretsfetcher_secrets::{
    DiscoveryFetcher, FileSecretWriter, ManifestFetcher, SecretStoreClient, SecretsFetcher,
    SecretsProvider,
};
use std::sync::Arc;

/// Summary of a completed fetch run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchReport {
    /// Secrets written to files
    pub written: usize,
    /// Secrets that could not be fetched and were skipped
    pub skipped: usize,
}

/// Resolve settings, connect to AWS Secrets Manager and run the fetch.
///
/// # Errors
/// Returns a [`CliError`] for invalid configuration, listing failures,
/// write failures, or any fetch failure in strict mode.
pub async fn execute_fetch(args: &FetchArgs, config: &FileConfig) -> Result<FetchReport, CliError> {
    let settings = FetchSettings::resolve(args, config)?;

    let store = AwsSecretStore::connect(settings.region.as_deref()).await;
    let region = store.region().map(str::to_string);
    let client: Arc<dyn SecretStoreClient> = Arc::new(store);

    run_fetch(
        &FetchSettings {
            region,
            ..settings
        },
        client,
    )
    .await
}

/// Fetch secrets through `client` and write them as configured.
///
/// # Errors
/// See [`execute_fetch`].
pub async fn run_fetch(
    settings: &FetchSettings,
    client: Arc<dyn SecretStoreClient>,
) -> Result<FetchReport, CliError> {
    let provider = SecretsProvider::new(client, settings.region.clone());

    tracing::info!(
        store = provider.store_name(),
        region = provider.region().unwrap_or_default(),
        output_dir = %settings.output_dir.display(),
        "Fetching secrets"
    );

    let fetcher = match &settings.source {
        FetchSource::Manifest(manifest) => {
            SecretsFetcher::Manifest(ManifestFetcher::from_manifest(&provider, manifest))
        }
        FetchSource::Discovery(filter) => {
            SecretsFetcher::Discovery(DiscoveryFetcher::new(&provider, filter.clone()))
        }
    };

    let outcome = fetcher.fetch().await?;
    let skipped = outcome.failures.len();
    let secrets = if settings.strict {
        outcome.into_strict()?
    } else {
        outcome.into_secrets()
    };

    FileSecretWriter::new(&settings.output_dir)
        .with_translation(settings.path_translation)
        .with_mode(settings.write_mode)
        .write_secrets(&secrets)?;

    tracing::info!(
        secret_count = secrets.len(),
        skipped,
        output_dir = %settings.output_dir.display(),
        "Secrets written"
    );

    Ok(FetchReport {
        written: secrets.len(),
        skipped,
    })
}
