//! AWS Secrets Manager store client

use async_trait::async_trait;
use aws_sdk_secretsmanager::Client;
use aws_sdk_secretsmanager::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_secretsmanager::types::{Filter, FilterNameStringType};
use aws_smithy_http_client::{Builder, tls};
use secretsfetcher_secrets::{
    FilterKind, GetSecretValueRequest, ListFilter, ListSecretsPage, ListSecretsRequest,
    SecretListEntry, SecretPayload, SecretStoreClient, SecretTag, SecretValue, StoreError,
    StoreErrorKind,
};

/// [`SecretStoreClient`] backed by AWS Secrets Manager.
///
/// Credentials come from the default provider chain (environment, shared
/// profile, web identity, container or instance metadata).
pub struct AwsSecretStore {
    client: Client,
    region: Option<String>,
}

impl std::fmt::Debug for AwsSecretStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsSecretStore")
            .field("region", &self.region)
            .finish_non_exhaustive()
    }
}

impl AwsSecretStore {
    /// Load the AWS configuration and build a client.
    ///
    /// `region` overrides the region from the environment and shared config
    /// when set.
    pub async fn connect(region: Option<&str>) -> Self {
        let http_client = Builder::new()
            .tls_provider(tls::Provider::Rustls(
                tls::rustls_provider::CryptoMode::Ring,
            ))
            .build_https();

        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .http_client(http_client);
        if let Some(region) = region {
            loader = loader.region(aws_config::Region::new(region.to_string()));
        }
        let config = loader.load().await;

        let region = config.region().map(ToString::to_string);
        tracing::debug!(region = ?region, "Created AWS Secrets Manager client");

        Self {
            client: Client::new(&config),
            region,
        }
    }

    /// Wrap an existing SDK client
    #[must_use]
    pub fn from_client(client: Client) -> Self {
        let region = client.config().region().map(ToString::to_string);
        Self { client, region }
    }

    /// Region the client resolved, if any
    #[must_use]
    pub fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }
}

/// Classify a Secrets Manager error code
#[must_use]
pub fn classify_code(code: &str) -> StoreErrorKind {
    match code {
        "ResourceNotFoundException" => StoreErrorKind::NotFound,
        "AccessDeniedException"
        | "AccessDenied"
        | "UnrecognizedClientException"
        | "InvalidSignatureException"
        | "ExpiredTokenException"
        | "DecryptionFailure" => StoreErrorKind::AccessDenied,
        "ThrottlingException"
        | "Throttling"
        | "TooManyRequestsException"
        | "RequestLimitExceeded"
        | "InternalServiceError"
        | "InternalFailure"
        | "ServiceUnavailable" => StoreErrorKind::Transient,
        "InvalidParameterException"
        | "InvalidRequestException"
        | "InvalidNextTokenException"
        | "ValidationException" => StoreErrorKind::InvalidRequest,
        _ => StoreErrorKind::Other,
    }
}

fn store_error<E, R>(err: SdkError<E, R>) -> StoreError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    let message = DisplayErrorContext(&err).to_string();
    match &err {
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) | SdkError::ResponseError(_) => {
            StoreError::new(StoreErrorKind::Transient, message)
        }
        SdkError::ConstructionFailure(_) => {
            StoreError::new(StoreErrorKind::InvalidRequest, message)
        }
        _ => match err.code() {
            Some(code) => StoreError::new(classify_code(code), message).with_code(code),
            None => StoreError::new(StoreErrorKind::Other, message),
        },
    }
}

fn sdk_filter(filter: &ListFilter) -> Filter {
    let key = match filter.kind {
        FilterKind::Name => FilterNameStringType::Name,
        FilterKind::TagKey => FilterNameStringType::TagKey,
        FilterKind::TagValue => FilterNameStringType::TagValue,
    };
    Filter::builder()
        .key(key)
        .set_values(Some(filter.values.clone()))
        .build()
}

#[async_trait]
impl SecretStoreClient for AwsSecretStore {
    fn store_name(&self) -> &'static str {
        "aws"
    }

    async fn get_secret_value(
        &self,
        request: &GetSecretValueRequest,
    ) -> Result<SecretValue, StoreError> {
        let response = self
            .client
            .get_secret_value()
            .secret_id(&request.secret_id)
            .set_version_id(request.version_id.clone())
            .set_version_stage(request.version_stage.clone())
            .send()
            .await
            .map_err(store_error)?;

        let payload = if let Some(text) = response.secret_string() {
            SecretPayload::Text(text.to_string())
        } else if let Some(blob) = response.secret_binary() {
            SecretPayload::Binary(blob.as_ref().to_vec())
        } else {
            return Err(StoreError::new(
                StoreErrorKind::InvalidResponse,
                format!("secret '{}' has neither a string nor a binary value", request.secret_id),
            ));
        };

        Ok(SecretValue {
            name: response.name().map(str::to_string),
            arn: response.arn().map(str::to_string),
            payload,
        })
    }

    async fn list_secrets(
        &self,
        request: &ListSecretsRequest,
    ) -> Result<ListSecretsPage, StoreError> {
        let response = self
            .client
            .list_secrets()
            .set_filters(Some(request.filters.iter().map(sdk_filter).collect()))
            .max_results(request.max_results)
            .set_next_token(request.next_token.clone())
            .send()
            .await
            .map_err(store_error)?;

        let entries = response
            .secret_list()
            .iter()
            .map(|entry| SecretListEntry {
                arn: entry.arn().map(str::to_string),
                name: entry.name().map(str::to_string),
                tags: entry
                    .tags()
                    .iter()
                    .map(|tag| {
                        SecretTag::new(
                            tag.key().unwrap_or_default(),
                            tag.value().unwrap_or_default(),
                        )
                    })
                    .collect(),
            })
            .collect();

        Ok(ListSecretsPage {
            entries,
            next_token: response.next_token().map(str::to_string),
        })
    }
}
