//! Secret retrieval over a [`SecretStoreClient`]

use crate::client::{
    GetSecretValueRequest, LIST_PAGE_SIZE, ListSecretsRequest, SecretPayload, SecretStoreClient,
    StoreError, StoreErrorKind,
};
use crate::fetcher::{FetchFailure, FetchOutcome};
use crate::{FilterSpec, Secret, SecretError, SecretReference};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::sync::Arc;

/// Progress of a paginated listing
#[derive(Debug, Clone, PartialEq, Eq)]
enum ListingState {
    /// Another page must be requested, with `token` when it is not the first
    HasMore { token: Option<String> },
    /// The store returned no continuation token
    Done,
}

impl ListingState {
    /// State following a page that returned `next_token`
    fn after_page(next_token: Option<String>) -> Self {
        match next_token.filter(|token| !token.is_empty()) {
            Some(token) => Self::HasMore { token: Some(token) },
            None => Self::Done,
        }
    }
}

/// Provider over a remote secret store.
///
/// Owns the client handle and the region the client was built for. Every
/// operation is sequential: one request in flight at a time.
#[derive(Clone)]
pub struct SecretsProvider {
    client: Arc<dyn SecretStoreClient>,
    region: Option<String>,
}

impl std::fmt::Debug for SecretsProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretsProvider")
            .field("store", &self.client.store_name())
            .field("region", &self.region)
            .finish()
    }
}

impl SecretsProvider {
    /// Create a provider over `client`
    #[must_use]
    pub fn new(client: Arc<dyn SecretStoreClient>, region: Option<String>) -> Self {
        Self { client, region }
    }

    /// Region the client targets, if one was resolved
    #[must_use]
    pub fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }

    /// Name of the underlying store
    #[must_use]
    pub fn store_name(&self) -> &'static str {
        self.client.store_name()
    }

    /// Retrieve one secret.
    ///
    /// Binary payloads are decoded from standard base64. The secret is named
    /// after the name the store reports, or `object_name` when it reports none.
    ///
    /// # Errors
    /// [`SecretError::Validation`] for a blank `object_name`, otherwise the
    /// classified store error or [`SecretError::Decode`].
    pub async fn get_secret(&self, reference: &SecretReference) -> Result<Secret, SecretError> {
        reference.validate()?;

        let request = GetSecretValueRequest::from(reference);
        let value = match self.client.get_secret_value(&request).await {
            Ok(value) => value,
            Err(e) => {
                tracing::error!(
                    store = self.store_name(),
                    object_name = %reference.object_name,
                    object_version = reference.version().unwrap_or_default(),
                    object_version_label = reference.version_label().unwrap_or_default(),
                    error_code = e.code().unwrap_or_default(),
                    fault = ?e.kind(),
                    error = %e.message(),
                    "Failed to get secret value"
                );
                return Err(SecretError::from_store(&reference.object_name, e));
            }
        };

        let content = match value.payload {
            SecretPayload::Text(text) => text.into_bytes(),
            SecretPayload::Binary(encoded) => {
                STANDARD
                    .decode(&encoded)
                    .map_err(|source| SecretError::Decode {
                        object_name: reference.object_name.clone(),
                        source,
                    })?
            }
        };

        let name = value
            .name
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| reference.object_name.clone());

        tracing::debug!(
            object_name = %reference.object_name,
            secret_name = %name,
            secret_arn = value.arn.as_deref().unwrap_or_default(),
            "Fetched secret"
        );

        Ok(Secret::new(name, content))
    }

    /// List every secret matching `filter`, across all pages.
    ///
    /// The returned references carry only the ARN of each secret.
    ///
    /// # Errors
    /// [`SecretError::Validation`] before any remote call for a blank prefix.
    /// [`SecretError::Listing`] if any page fails or any entry has no ARN;
    /// nothing accumulated so far is returned in that case.
    pub async fn list_secrets(
        &self,
        filter: &FilterSpec,
    ) -> Result<Vec<SecretReference>, SecretError> {
        filter.validate()?;

        let filters = filter.to_list_filters();

        let listing_error = |page: usize, source: StoreError| SecretError::Listing {
            prefix: filter.name_prefix.clone(),
            page,
            source,
        };

        let mut references = Vec::new();
        let mut page = 0;
        let mut state = ListingState::HasMore { token: None };

        while let ListingState::HasMore { token } = state {
            page += 1;
            let request = ListSecretsRequest {
                filters: filters.clone(),
                max_results: LIST_PAGE_SIZE,
                next_token: token,
            };

            let result = match self.client.list_secrets(&request).await {
                Ok(result) => result,
                Err(e) => {
                    tracing::error!(
                        store = self.store_name(),
                        prefix = %filter.name_prefix,
                        page,
                        error_code = e.code().unwrap_or_default(),
                        fault = ?e.kind(),
                        error = %e.message(),
                        "Failed to list secrets"
                    );
                    return Err(listing_error(page, e));
                }
            };

            for entry in result.entries {
                let Some(arn) = entry.arn.filter(|arn| !arn.is_empty()) else {
                    tracing::error!(
                        prefix = %filter.name_prefix,
                        page,
                        secret_name = entry.name.as_deref().unwrap_or_default(),
                        "Listing returned a secret without an ARN"
                    );
                    return Err(listing_error(
                        page,
                        StoreError::new(StoreErrorKind::InvalidResponse, "received empty ARN"),
                    ));
                };
                references.push(SecretReference::new(arn));
            }

            state = ListingState::after_page(result.next_token);
        }

        tracing::debug!(
            prefix = %filter.name_prefix,
            pages = page,
            secret_count = references.len(),
            "Listed secrets"
        );

        Ok(references)
    }

    /// Retrieve every reference in order, recording failures instead of
    /// stopping at them
    pub async fn fetch_all(&self, references: &[SecretReference]) -> FetchOutcome {
        let mut outcome = FetchOutcome::with_capacity(references.len());

        for reference in references {
            match self.get_secret(reference).await {
                Ok(secret) => outcome.secrets.push(secret),
                Err(error) => {
                    tracing::warn!(
                        object_name = %reference.object_name,
                        error = %error,
                        "Skipping secret that could not be fetched"
                    );
                    outcome.failures.push(FetchFailure {
                        reference: reference.clone(),
                        error,
                    });
                }
            }
        }

        outcome
    }
}
