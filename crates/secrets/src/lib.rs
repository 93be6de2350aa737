//! Secret retrieval and materialization for secretsfetcher
//!
//! Fetches secrets from a remote secret store, either from an explicit
//! manifest of references or by discovering them through a name prefix and
//! tag filters, and writes them to files under an output directory.
//!
//! # Pipeline
//!
//! ```ignore
//! use secretsfetcher_secrets::{
//!     DiscoveryFetcher, FileSecretWriter, FilterSpec, SecretsFetcher, SecretsProvider,
//! };
//!
//! let provider = SecretsProvider::new(client, Some("eu-west-1".to_string()));
//! let fetcher = SecretsFetcher::Discovery(DiscoveryFetcher::new(
//!     &provider,
//!     FilterSpec::new("api-verifier/").with_tag_key_prefixes(["app"]),
//! ));
//!
//! // Listing failures are fatal, individual secrets are best effort
//! let outcome = fetcher.fetch().await?;
//!
//! FileSecretWriter::new("/run/secrets").write_secrets(&outcome.secrets)?;
//! ```
//!
//! Every step is sequential: listing pages, secret retrieval and file writes
//! happen one at a time, in order.

mod client;
mod fetcher;
mod memory;
mod provider;
mod types;
mod writer;

pub use client::{
    FilterKind, GetSecretValueRequest, LIST_PAGE_SIZE, ListFilter, ListSecretsPage,
    ListSecretsRequest, SecretListEntry, SecretPayload, SecretStoreClient, SecretTag, SecretValue,
    StoreError, StoreErrorKind,
};
pub use fetcher::{DiscoveryFetcher, FetchFailure, FetchOutcome, ManifestFetcher, SecretsFetcher};
pub use memory::{InMemorySecretStore, StoredSecret};
pub use provider::SecretsProvider;
pub use types::{FilterSpec, Manifest, SUPPORTED_PROVIDER, Secret, SecretReference};
pub use writer::{
    DEFAULT_PATH_TRANSLATION, FileSecretWriter, PATH_TRANSLATION_DISABLED, PathTranslation,
    WriteFailure, WriteMode,
};

use thiserror::Error;

/// Error types for secret retrieval and materialization
#[derive(Debug, Error)]
pub enum SecretError {
    /// Required input is missing or malformed; raised before any remote call
    #[error("Invalid secrets configuration: {message}")]
    Validation {
        /// What was wrong with the input
        message: String,
    },

    /// The identifier did not resolve to a secret
    #[error("Secret '{object_name}' not found: {source}")]
    NotFound {
        /// Identifier that was requested
        object_name: String,
        /// Error reported by the store
        #[source]
        source: StoreError,
    },

    /// The caller is not authorized to read the secret
    #[error("Access denied to secret '{object_name}': {source}")]
    AccessDenied {
        /// Identifier that was requested
        object_name: String,
        /// Error reported by the store
        #[source]
        source: StoreError,
    },

    /// A retryable network or service failure; not retried here
    #[error("Transient failure fetching secret '{object_name}': {source}")]
    Transient {
        /// Identifier that was requested
        object_name: String,
        /// Error reported by the store
        #[source]
        source: StoreError,
    },

    /// Any other rejection from the store
    #[error("Secret store failed to return '{object_name}': {source}")]
    Store {
        /// Identifier that was requested
        object_name: String,
        /// Error reported by the store
        #[source]
        source: StoreError,
    },

    /// A binary secret value was not valid standard base64
    #[error("Failed to decode binary secret '{object_name}': {source}")]
    Decode {
        /// Identifier that was requested
        object_name: String,
        /// Decoder error
        #[source]
        source: base64::DecodeError,
    },

    /// A listing page failed; no partial results are returned
    #[error("Failed to list secrets with prefix '{prefix}' (page {page}): {source}")]
    Listing {
        /// Name prefix of the failed listing
        prefix: String,
        /// 1-based page that failed
        page: usize,
        /// Error reported by the store
        #[source]
        source: StoreError,
    },

    /// A single secret file could not be written
    #[error(transparent)]
    WriteFailed(#[from] WriteFailure),

    /// One or more secret files could not be written in continue mode
    #[error("{} secret file(s) failed to write", failures.len())]
    AggregateWrite {
        /// Every failed write, in batch order
        failures: Vec<WriteFailure>,
    },

    /// Some requested secrets could not be fetched and partial loss is not tolerated
    #[error("{failed} of {requested} secret(s) could not be fetched")]
    IncompleteFetch {
        /// Number of references that failed
        failed: usize,
        /// Number of references that were requested
        requested: usize,
    },
}

impl SecretError {
    /// Create a validation error
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Classify a store error raised while fetching `object_name`
    #[must_use]
    pub fn from_store(object_name: impl Into<String>, source: StoreError) -> Self {
        let object_name = object_name.into();
        match source.kind() {
            StoreErrorKind::NotFound => Self::NotFound {
                object_name,
                source,
            },
            StoreErrorKind::AccessDenied => Self::AccessDenied {
                object_name,
                source,
            },
            StoreErrorKind::Transient => Self::Transient {
                object_name,
                source,
            },
            StoreErrorKind::InvalidRequest
            | StoreErrorKind::InvalidResponse
            | StoreErrorKind::Other => Self::Store {
                object_name,
                source,
            },
        }
    }

    /// Whether this error aborts a whole run rather than a single secret
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Validation { .. }
                | Self::Listing { .. }
                | Self::WriteFailed(_)
                | Self::AggregateWrite { .. }
                | Self::IncompleteFetch { .. }
        )
    }
}
