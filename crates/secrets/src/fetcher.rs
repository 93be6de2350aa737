//! Fetch strategies
//!
//! A [`ManifestFetcher`] retrieves an explicit list of references; a
//! [`DiscoveryFetcher`] lists secrets by prefix and tags first. Both borrow a
//! [`SecretsProvider`] and produce a [`FetchOutcome`].

use crate::{FilterSpec, Manifest, Secret, SecretError, SecretReference, SecretsProvider};

/// A reference that could not be fetched
#[derive(Debug)]
pub struct FetchFailure {
    /// The reference that was requested
    pub reference: SecretReference,
    /// Why it failed
    pub error: SecretError,
}

/// Result of a best-effort fetch: the secrets retrieved, in request order,
/// and every reference that failed.
#[derive(Debug, Default)]
pub struct FetchOutcome {
    /// Retrieved secrets
    pub secrets: Vec<Secret>,
    /// References that could not be retrieved
    pub failures: Vec<FetchFailure>,
}

impl FetchOutcome {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            secrets: Vec::with_capacity(capacity),
            failures: Vec::new(),
        }
    }

    /// Whether every requested secret was retrieved
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Number of references requested
    #[must_use]
    pub fn requested(&self) -> usize {
        self.secrets.len() + self.failures.len()
    }

    /// Retrieved secrets, dropping the failures
    #[must_use]
    pub fn into_secrets(self) -> Vec<Secret> {
        self.secrets
    }

    /// Retrieved secrets, or an error if anything failed.
    ///
    /// # Errors
    /// [`SecretError::IncompleteFetch`] when any reference failed.
    pub fn into_strict(self) -> Result<Vec<Secret>, SecretError> {
        if self.is_complete() {
            Ok(self.secrets)
        } else {
            Err(SecretError::IncompleteFetch {
                failed: self.failures.len(),
                requested: self.requested(),
            })
        }
    }
}

/// Fetches a fixed list of references in order
#[derive(Debug, Clone)]
pub struct ManifestFetcher<'a> {
    provider: &'a SecretsProvider,
    references: Vec<SecretReference>,
}

impl<'a> ManifestFetcher<'a> {
    /// Fetcher for `references`
    #[must_use]
    pub fn new(provider: &'a SecretsProvider, references: Vec<SecretReference>) -> Self {
        Self {
            provider,
            references,
        }
    }

    /// Fetcher for the `SecretObjects` of a manifest
    #[must_use]
    pub fn from_manifest(provider: &'a SecretsProvider, manifest: &Manifest) -> Self {
        Self::new(provider, manifest.secret_objects.clone())
    }

    /// References this fetcher requests
    #[must_use]
    pub fn references(&self) -> &[SecretReference] {
        &self.references
    }

    /// Retrieve every reference once, in list order. Per-reference failures
    /// are recorded in the outcome.
    pub async fn fetch(&self) -> FetchOutcome {
        tracing::info!(
            secret_count = self.references.len(),
            "Fetching secrets from manifest"
        );
        self.provider.fetch_all(&self.references).await
    }
}

/// Lists secrets by prefix and tags, then fetches each one
#[derive(Debug, Clone)]
pub struct DiscoveryFetcher<'a> {
    provider: &'a SecretsProvider,
    filter: FilterSpec,
}

impl<'a> DiscoveryFetcher<'a> {
    /// Fetcher for secrets matching `filter`
    #[must_use]
    pub fn new(provider: &'a SecretsProvider, filter: FilterSpec) -> Self {
        Self { provider, filter }
    }

    /// Filter this fetcher lists with
    #[must_use]
    pub fn filter(&self) -> &FilterSpec {
        &self.filter
    }

    /// List matching secrets and retrieve each one.
    ///
    /// # Errors
    /// [`SecretError::Validation`] for a blank prefix, before any listing.
    /// [`SecretError::Listing`] when listing fails.
    pub async fn fetch(&self) -> Result<FetchOutcome, SecretError> {
        self.filter.validate()?;

        let references = self.provider.list_secrets(&self.filter).await?;
        tracing::info!(
            prefix = %self.filter.name_prefix,
            secret_count = references.len(),
            "Discovered secrets"
        );

        Ok(self.provider.fetch_all(&references).await)
    }
}

/// Fetch strategy
#[derive(Debug, Clone)]
pub enum SecretsFetcher<'a> {
    /// Explicit references
    Manifest(ManifestFetcher<'a>),
    /// Prefix and tag discovery
    Discovery(DiscoveryFetcher<'a>),
}

impl SecretsFetcher<'_> {
    /// Run the strategy.
    ///
    /// # Errors
    /// Only discovery fails as a whole; see [`DiscoveryFetcher::fetch`].
    pub async fn fetch(&self) -> Result<FetchOutcome, SecretError> {
        match self {
            Self::Manifest(fetcher) => Ok(fetcher.fetch().await),
            Self::Discovery(fetcher) => fetcher.fetch().await,
        }
    }
}
