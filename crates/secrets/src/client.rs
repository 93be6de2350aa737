//! Remote secret store abstraction
//!
//! [`SecretStoreClient`] is the seam between the pipeline and a concrete
//! secret store. It mirrors the two store operations the pipeline needs:
//! fetching one secret value and listing secrets page by page.

use crate::SecretReference;
use async_trait::async_trait;
use std::fmt;

/// Page size requested from the store when listing secrets
pub const LIST_PAGE_SIZE: i32 = 50;

/// Field a listing filter applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterKind {
    /// Secret name prefix
    Name,
    /// Prefix of any tag key on the secret
    TagKey,
    /// Prefix of any tag value on the secret
    TagValue,
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Name => "name",
            Self::TagKey => "tag-key",
            Self::TagValue => "tag-value",
        })
    }
}

/// One listing filter entry.
///
/// The store contract allows exactly one value per entry; entries built with
/// [`ListFilter::new`] always satisfy it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListFilter {
    /// Field the filter applies to
    pub kind: FilterKind,
    /// Prefix values
    pub values: Vec<String>,
}

impl ListFilter {
    /// Create a single-valued filter entry
    #[must_use]
    pub fn new(kind: FilterKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            values: vec![value.into()],
        }
    }

    /// The single prefix value, or `None` if the entry is multi-valued or empty
    #[must_use]
    pub fn value(&self) -> Option<&str> {
        match self.values.as_slice() {
            [value] => Some(value.as_str()),
            _ => None,
        }
    }
}

/// Request for a single secret value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetSecretValueRequest {
    /// Secret name or ARN
    pub secret_id: String,
    /// Specific version ID
    pub version_id: Option<String>,
    /// Version stage label; the store's current version when absent
    pub version_stage: Option<String>,
}

impl From<&SecretReference> for GetSecretValueRequest {
    fn from(reference: &SecretReference) -> Self {
        Self {
            secret_id: reference.object_name.clone(),
            version_id: reference.version().map(str::to_string),
            version_stage: reference.version_label().map(str::to_string),
        }
    }
}

/// Raw value returned by the store
#[derive(Clone, PartialEq, Eq)]
pub enum SecretPayload {
    /// UTF-8 secret string
    Text(String),
    /// Binary secret, base64 encoded
    Binary(Vec<u8>),
}

impl fmt::Debug for SecretPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(_) => f.write_str("Text([REDACTED])"),
            Self::Binary(bytes) => write!(f, "Binary([REDACTED; {} bytes])", bytes.len()),
        }
    }
}

/// Secret value returned by the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretValue {
    /// Friendly name of the secret
    pub name: Option<String>,
    /// Canonical identifier of the secret
    pub arn: Option<String>,
    /// Secret contents
    pub payload: SecretPayload,
}

/// Request for one page of a filtered listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListSecretsRequest {
    /// Filters, all of which must match
    pub filters: Vec<ListFilter>,
    /// Maximum number of entries per page
    pub max_results: i32,
    /// Continuation token from the previous page
    pub next_token: Option<String>,
}

/// Tag attached to a secret
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretTag {
    /// Tag key
    pub key: String,
    /// Tag value
    pub value: String,
}

impl SecretTag {
    /// Create a tag
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Secret metadata returned by a listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretListEntry {
    /// Canonical identifier
    pub arn: Option<String>,
    /// Friendly name
    pub name: Option<String>,
    /// Tags on the secret
    pub tags: Vec<SecretTag>,
}

/// One page of listing results
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListSecretsPage {
    /// Matching entries on this page
    pub entries: Vec<SecretListEntry>,
    /// Token for the next page; absent or empty when there are no more pages
    pub next_token: Option<String>,
}

/// Classification of a store failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreErrorKind {
    /// The identifier does not resolve
    NotFound,
    /// Authorization failure
    AccessDenied,
    /// Throttling, timeouts, dispatch or internal service failures
    Transient,
    /// The store rejected the request parameters
    InvalidRequest,
    /// The store answered with something unusable
    InvalidResponse,
    /// Anything else
    Other,
}

/// Error reported by a [`SecretStoreClient`]
#[derive(Debug)]
pub struct StoreError {
    kind: StoreErrorKind,
    code: Option<String>,
    message: String,
}

impl StoreError {
    /// Create an error without a service error code
    #[must_use]
    pub fn new(kind: StoreErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            code: None,
            message: message.into(),
        }
    }

    /// Attach the service error code (e.g. `ResourceNotFoundException`)
    #[must_use]
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Failure classification
    #[must_use]
    pub const fn kind(&self) -> StoreErrorKind {
        self.kind
    }

    /// Service error code, if the store reported one
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    /// Human readable message
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.code {
            Some(code) => write!(f, "{code}: {}", self.message),
            None => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for StoreError {}

/// Client for a remote secret store.
///
/// Implementations translate these calls to the store's wire protocol and
/// classify failures into [`StoreErrorKind`]s. They must not retry or page
/// on their own; the provider drives pagination.
#[async_trait]
pub trait SecretStoreClient: Send + Sync {
    /// Store identifier used in logs. Examples: `"aws"`, `"memory"`
    fn store_name(&self) -> &'static str;

    /// Fetch one secret value
    async fn get_secret_value(
        &self,
        request: &GetSecretValueRequest,
    ) -> Result<SecretValue, StoreError>;

    /// Fetch one page of secrets matching every filter in the request
    async fn list_secrets(&self, request: &ListSecretsRequest)
    -> Result<ListSecretsPage, StoreError>;
}
