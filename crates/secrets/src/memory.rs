//! In-process secret store
//!
//! [`InMemorySecretStore`] implements [`SecretStoreClient`] with the same
//! prefix filter and paging semantics as AWS Secrets Manager. It backs tests
//! and local dry runs, and can inject failures on individual secrets or
//! listing pages.

use crate::client::{
    FilterKind, GetSecretValueRequest, ListFilter, ListSecretsPage, ListSecretsRequest,
    SecretListEntry, SecretPayload, SecretStoreClient, SecretTag, SecretValue, StoreError,
    StoreErrorKind,
};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};

const CURRENT_STAGE: &str = "AWSCURRENT";

/// A secret held by [`InMemorySecretStore`]
#[derive(Debug, Clone)]
pub struct StoredSecret {
    name: String,
    arn: Option<String>,
    payload: SecretPayload,
    tags: Vec<SecretTag>,
    version_id: String,
    stages: Vec<String>,
}

impl StoredSecret {
    /// A string secret
    #[must_use]
    pub fn text(name: impl Into<String>, arn: impl Into<String>, value: impl Into<String>) -> Self {
        Self::with_payload(name, arn, SecretPayload::Text(value.into()))
    }

    /// A binary secret; `encoded` is the base64 text the store holds
    #[must_use]
    pub fn binary(
        name: impl Into<String>,
        arn: impl Into<String>,
        encoded: impl Into<Vec<u8>>,
    ) -> Self {
        Self::with_payload(name, arn, SecretPayload::Binary(encoded.into()))
    }

    fn with_payload(name: impl Into<String>, arn: impl Into<String>, payload: SecretPayload) -> Self {
        Self {
            name: name.into(),
            arn: Some(arn.into()),
            payload,
            tags: Vec::new(),
            version_id: "1".to_string(),
            stages: vec![CURRENT_STAGE.to_string()],
        }
    }

    /// Add a tag
    #[must_use]
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.push(SecretTag::new(key, value));
        self
    }

    /// Set the version ID and the stage labels attached to it
    #[must_use]
    pub fn with_version<I, S>(mut self, version_id: impl Into<String>, stages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.version_id = version_id.into();
        self.stages = stages.into_iter().map(Into::into).collect();
        self
    }

    /// Drop the ARN, as a misbehaving store might
    #[must_use]
    pub fn without_arn(mut self) -> Self {
        self.arn = None;
        self
    }

    fn matches(&self, filters: &[ListFilter]) -> Result<bool, StoreError> {
        for filter in filters {
            let prefix = filter.value().ok_or_else(|| {
                StoreError::new(
                    StoreErrorKind::InvalidRequest,
                    format!("only one filter value is allowed for {}", filter.kind),
                )
                .with_code("InvalidParameterException")
            })?;

            let matched = match filter.kind {
                FilterKind::Name => self.name.starts_with(prefix),
                FilterKind::TagKey => self.tags.iter().any(|tag| tag.key.starts_with(prefix)),
                FilterKind::TagValue => self.tags.iter().any(|tag| tag.value.starts_with(prefix)),
            };
            if !matched {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

/// Deterministic in-memory [`SecretStoreClient`].
///
/// Secrets are listed in name order. Continuation tokens are opaque offsets.
#[derive(Debug, Default)]
pub struct InMemorySecretStore {
    secrets: BTreeMap<String, StoredSecret>,
    page_size: Option<usize>,
    get_failures: HashMap<String, StoreErrorKind>,
    list_failure_page: Option<usize>,
    get_calls: AtomicUsize,
    list_calls: AtomicUsize,
}

impl InMemorySecretStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a secret, replacing any secret with the same name
    #[must_use]
    pub fn with_secret(mut self, secret: StoredSecret) -> Self {
        self.secrets.insert(secret.name.clone(), secret);
        self
    }

    /// Serve at most `page_size` entries per page, below the requested maximum
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = Some(page_size.max(1));
        self
    }

    /// Fail every fetch of `secret_id` (name or ARN) with `kind`
    #[must_use]
    pub fn with_get_failure(mut self, secret_id: impl Into<String>, kind: StoreErrorKind) -> Self {
        self.get_failures.insert(secret_id.into(), kind);
        self
    }

    /// Fail the listing request for the given 1-based page
    #[must_use]
    pub fn with_list_failure_on_page(mut self, page: usize) -> Self {
        self.list_failure_page = Some(page);
        self
    }

    /// Number of `get_secret_value` calls received
    #[must_use]
    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    /// Number of `list_secrets` calls received
    #[must_use]
    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    fn find(&self, secret_id: &str) -> Option<&StoredSecret> {
        self.secrets.get(secret_id).or_else(|| {
            self.secrets
                .values()
                .find(|secret| secret.arn.as_deref() == Some(secret_id))
        })
    }
}

fn not_found(secret_id: &str) -> StoreError {
    StoreError::new(
        StoreErrorKind::NotFound,
        format!("Secrets Manager can't find the specified secret '{secret_id}'"),
    )
    .with_code("ResourceNotFoundException")
}

fn injected(kind: StoreErrorKind, secret_id: &str) -> StoreError {
    let code = match kind {
        StoreErrorKind::NotFound => return not_found(secret_id),
        StoreErrorKind::AccessDenied => "AccessDeniedException",
        StoreErrorKind::Transient => "ThrottlingException",
        StoreErrorKind::InvalidRequest => "InvalidRequestException",
        StoreErrorKind::InvalidResponse | StoreErrorKind::Other => "InternalFailure",
    };
    StoreError::new(kind, format!("injected failure for '{secret_id}'")).with_code(code)
}

#[async_trait]
impl SecretStoreClient for InMemorySecretStore {
    fn store_name(&self) -> &'static str {
        "memory"
    }

    async fn get_secret_value(
        &self,
        request: &GetSecretValueRequest,
    ) -> Result<SecretValue, StoreError> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(kind) = self.get_failures.get(&request.secret_id) {
            return Err(injected(*kind, &request.secret_id));
        }

        let secret = self
            .find(&request.secret_id)
            .ok_or_else(|| not_found(&request.secret_id))?;

        if request
            .version_id
            .as_ref()
            .is_some_and(|version_id| *version_id != secret.version_id)
        {
            return Err(not_found(&request.secret_id));
        }
        let stage = request.version_stage.as_deref().unwrap_or(CURRENT_STAGE);
        if !secret.stages.iter().any(|s| s == stage) {
            return Err(not_found(&request.secret_id));
        }

        Ok(SecretValue {
            name: Some(secret.name.clone()),
            arn: secret.arn.clone(),
            payload: secret.payload.clone(),
        })
    }

    async fn list_secrets(
        &self,
        request: &ListSecretsRequest,
    ) -> Result<ListSecretsPage, StoreError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);

        let max_results = usize::try_from(request.max_results)
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| {
                StoreError::new(
                    StoreErrorKind::InvalidRequest,
                    format!("invalid MaxResults {}", request.max_results),
                )
            })?;
        let page_len = self.page_size.map_or(max_results, |size| size.min(max_results));

        let offset = match request.next_token.as_deref() {
            None => 0,
            Some(token) => token.parse::<usize>().map_err(|_| {
                StoreError::new(StoreErrorKind::InvalidRequest, "invalid NextToken")
                    .with_code("InvalidNextTokenException")
            })?,
        };

        if self.list_failure_page == Some(offset / page_len + 1) {
            return Err(StoreError::new(
                StoreErrorKind::Transient,
                "injected listing failure",
            )
            .with_code("InternalServiceError"));
        }

        let mut matched = Vec::new();
        for secret in self.secrets.values() {
            if secret.matches(&request.filters)? {
                matched.push(secret);
            }
        }

        let entries = matched
            .iter()
            .skip(offset)
            .take(page_len)
            .map(|secret| SecretListEntry {
                arn: secret.arn.clone(),
                name: Some(secret.name.clone()),
                tags: secret.tags.clone(),
            })
            .collect();

        let next_offset = offset + page_len;
        let next_token = (next_offset < matched.len()).then(|| next_offset.to_string());

        Ok(ListSecretsPage {
            entries,
            next_token,
        })
    }
}
