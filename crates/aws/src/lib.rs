//! AWS integration for secretsfetcher
//!
//! Provides [`AwsSecretStore`], the AWS Secrets Manager implementation of
//! [`secretsfetcher_secrets::SecretStoreClient`].

pub mod secrets;

pub use secrets::{AwsSecretStore, classify_code};
