//! Secret data model
//!
//! - [`Secret`]: a fetched secret; contents are zeroed on drop and never printed
//! - [`SecretReference`]: identifies one secret value in the store
//! - [`FilterSpec`]: name prefix and tag prefixes used for discovery
//! - [`Manifest`]: an explicit list of references plus output options

use crate::client::{FilterKind, ListFilter};
use crate::writer::PathTranslation;
use crate::SecretError;
use secrecy::{ExposeSecret, SecretSlice};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The only store a manifest may name in its `Provider` field
pub const SUPPORTED_PROVIDER: &str = "aws";

/// A fetched secret with automatic memory zeroing on drop.
///
/// Debug output shows the name and length but never the contents; call
/// [`Secret::expose_content`] to read the bytes.
pub struct Secret {
    name: String,
    content: SecretSlice<u8>,
}

impl Secret {
    /// Create a secret from its name and raw contents
    #[must_use]
    pub fn new(name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            content: SecretSlice::from(content.into()),
        }
    }

    /// Name reported by the store
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Expose the raw contents.
    ///
    /// The caller must not log the returned bytes.
    #[must_use]
    pub fn expose_content(&self) -> &[u8] {
        self.content.expose_secret()
    }

    /// Length of the contents in bytes
    #[must_use]
    pub fn len(&self) -> usize {
        self.content.expose_secret().len()
    }

    /// Whether the contents are empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.content.expose_secret().is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Secret")
            .field("name", &self.name)
            .field("content", &"[REDACTED]")
            .field("len", &self.len())
            .finish()
    }
}

/// Identifies a specific secret value to retrieve.
///
/// Field names follow the manifest format (`ObjectName`, `ObjectVersion`,
/// `ObjectVersionLabel`); camelCase spellings are accepted as well.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SecretReference {
    /// Secret name or full ARN
    #[serde(alias = "objectName")]
    pub object_name: String,

    /// Version ID
    #[serde(default, alias = "objectVersion", skip_serializing_if = "Option::is_none")]
    pub object_version: Option<String>,

    /// Version stage; the current version when absent
    #[serde(
        default,
        alias = "objectVersionLabel",
        skip_serializing_if = "Option::is_none"
    )]
    pub object_version_label: Option<String>,
}

impl SecretReference {
    /// Reference the current version of a secret
    #[must_use]
    pub fn new(object_name: impl Into<String>) -> Self {
        Self {
            object_name: object_name.into(),
            object_version: None,
            object_version_label: None,
        }
    }

    /// Pin a version ID
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.object_version = Some(version.into());
        self
    }

    /// Pin a version stage label
    #[must_use]
    pub fn with_version_label(mut self, label: impl Into<String>) -> Self {
        self.object_version_label = Some(label.into());
        self
    }

    /// Version ID, ignoring empty strings
    #[must_use]
    pub fn version(&self) -> Option<&str> {
        self.object_version.as_deref().filter(|v| !v.is_empty())
    }

    /// Version stage label, ignoring empty strings
    #[must_use]
    pub fn version_label(&self) -> Option<&str> {
        self.object_version_label
            .as_deref()
            .filter(|v| !v.is_empty())
    }

    /// Check that the reference names a secret.
    ///
    /// # Errors
    /// Returns [`SecretError::Validation`] if `object_name` is blank.
    pub fn validate(&self) -> Result<(), SecretError> {
        if self.object_name.trim().is_empty() {
            return Err(SecretError::validation("secret ObjectName cannot be empty"));
        }
        Ok(())
    }
}

impl fmt::Display for SecretReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.object_name)?;
        if let Some(version) = self.version() {
            write!(f, "@{version}")?;
        }
        if let Some(label) = self.version_label() {
            write!(f, ":{label}")?;
        }
        Ok(())
    }
}

/// Discovery filter: a mandatory name prefix plus optional tag prefixes.
///
/// Tag key and tag value prefixes are independent constraints: each must
/// match some tag on the secret, not necessarily the same one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSpec {
    /// Required secret name prefix
    pub name_prefix: String,
    /// Every entry must prefix at least one tag key
    pub tag_key_prefixes: Vec<String>,
    /// Every entry must prefix at least one tag value
    pub tag_value_prefixes: Vec<String>,
}

impl FilterSpec {
    /// Create a filter on a name prefix
    #[must_use]
    pub fn new(name_prefix: impl Into<String>) -> Self {
        Self {
            name_prefix: name_prefix.into(),
            ..Self::default()
        }
    }

    /// Require tag keys starting with each of `prefixes`
    #[must_use]
    pub fn with_tag_key_prefixes<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tag_key_prefixes = prefixes.into_iter().map(Into::into).collect();
        self
    }

    /// Require tag values starting with each of `prefixes`
    #[must_use]
    pub fn with_tag_value_prefixes<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tag_value_prefixes = prefixes.into_iter().map(Into::into).collect();
        self
    }

    /// Check that the name prefix is usable.
    ///
    /// # Errors
    /// Returns [`SecretError::Validation`] if the name prefix is empty or
    /// whitespace only.
    pub fn validate(&self) -> Result<(), SecretError> {
        if self.name_prefix.trim().is_empty() {
            return Err(SecretError::validation("secret name prefix cannot be empty"));
        }
        Ok(())
    }

    /// Store filter entries: the name prefix, then tag keys, then tag values
    #[must_use]
    pub fn to_list_filters(&self) -> Vec<ListFilter> {
        let mut filters = Vec::with_capacity(
            1 + self.tag_key_prefixes.len() + self.tag_value_prefixes.len(),
        );
        filters.push(ListFilter::new(FilterKind::Name, self.name_prefix.clone()));
        filters.extend(
            self.tag_key_prefixes
                .iter()
                .map(|prefix| ListFilter::new(FilterKind::TagKey, prefix.clone())),
        );
        filters.extend(
            self.tag_value_prefixes
                .iter()
                .map(|prefix| ListFilter::new(FilterKind::TagValue, prefix.clone())),
        );
        filters
    }
}

/// Explicit list of secrets to fetch, with output options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Manifest {
    /// Store the manifest targets; must be `aws` when set
    #[serde(default, alias = "provider", skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,

    /// Region of the store; overrides the configured region
    #[serde(default, alias = "region", skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    /// Secrets to fetch, in order
    #[serde(default, alias = "secretObjects")]
    pub secret_objects: Vec<SecretReference>,

    /// Substitute for `/` in output file names: empty for `_`, `False` to
    /// keep names unchanged, or a single character
    #[serde(
        default,
        alias = "pathTranslation",
        skip_serializing_if = "Option::is_none"
    )]
    pub path_translation: Option<String>,
}

impl Manifest {
    /// Region, ignoring empty strings
    #[must_use]
    pub fn region(&self) -> Option<&str> {
        self.region.as_deref().filter(|r| !r.trim().is_empty())
    }

    /// Parsed path translation; the default substitution when unset
    ///
    /// # Errors
    /// Returns [`SecretError::Validation`] for values other than empty,
    /// `False`, or a single character.
    pub fn path_translation(&self) -> Result<PathTranslation, SecretError> {
        self.path_translation
            .as_deref()
            .map_or(Ok(PathTranslation::Default), str::parse)
    }

    /// Validate provider, references and path translation.
    ///
    /// # Errors
    /// Returns [`SecretError::Validation`] describing the first problem found.
    pub fn validate(&self) -> Result<(), SecretError> {
        if let Some(provider) = self
            .provider
            .as_deref()
            .filter(|p| !p.is_empty() && !p.eq_ignore_ascii_case(SUPPORTED_PROVIDER))
        {
            return Err(SecretError::validation(format!(
                "provider '{provider}' is not supported, must be '{SUPPORTED_PROVIDER}'"
            )));
        }

        for (index, reference) in self.secret_objects.iter().enumerate() {
            reference.validate().map_err(|_| {
                SecretError::validation(format!("SecretObjects[{index}] has an empty ObjectName"))
            })?;
        }

        self.path_translation()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secret_debug_is_redacted() {
        let secret = Secret::new("db/password", "my-super-secret-password");
        let debug = format!("{secret:?}");
        assert!(debug.contains("db/password"));
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("super-secret"));
    }

    #[test]
    fn secret_exposes_raw_bytes() {
        let secret = Secret::new("blob", vec![0u8, 159, 146, 150]);
        assert_eq!(secret.expose_content(), &[0u8, 159, 146, 150]);
        assert_eq!(secret.len(), 4);
        assert!(!secret.is_empty());
        assert!(Secret::new("empty", Vec::new()).is_empty());
    }

    #[test]
    fn reference_validation() {
        assert!(SecretReference::new("prod/api-key").validate().is_ok());
        assert!(SecretReference::new("").validate().is_err());
        assert!(SecretReference::new("   ").validate().is_err());
    }

    #[test]
    fn reference_display() {
        let reference = SecretReference::new("prod/db")
            .with_version("v-123")
            .with_version_label("AWSCURRENT");
        assert_eq!(reference.to_string(), "prod/db@v-123:AWSCURRENT");
        assert_eq!(SecretReference::new("plain").to_string(), "plain");
    }

    #[test]
    fn filter_spec_rejects_blank_prefix() {
        assert!(FilterSpec::new("").validate().is_err());
        assert!(FilterSpec::new(" \t").validate().is_err());
        assert!(
            FilterSpec::new("")
                .with_tag_key_prefixes(["app"])
                .validate()
                .is_err()
        );
        assert!(FilterSpec::new("api/").validate().is_ok());
    }

    #[test]
    fn filter_spec_builds_one_entry_per_prefix() {
        let spec = FilterSpec::new("api/")
            .with_tag_key_prefixes(["team", "app"])
            .with_tag_value_prefixes(["prod"]);
        let filters = spec.to_list_filters();

        assert_eq!(
            filters,
            vec![
                ListFilter::new(FilterKind::Name, "api/"),
                ListFilter::new(FilterKind::TagKey, "team"),
                ListFilter::new(FilterKind::TagKey, "app"),
                ListFilter::new(FilterKind::TagValue, "prod"),
            ]
        );
        assert!(filters.iter().all(|f| f.value().is_some()));
    }

    #[test]
    fn manifest_deserializes_pascal_case_yaml() {
        let yaml = r"
Provider: aws
Region: eu-west-1
PathTranslation: '-'
SecretObjects:
  - ObjectName: prod/db/password
  - ObjectName: arn:aws:secretsmanager:eu-west-1:123456789012:secret:api-key
    ObjectVersion: 01234567-89ab
    ObjectVersionLabel: AWSPREVIOUS
";
        let manifest: Manifest = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(manifest.region(), Some("eu-west-1"));
        assert_eq!(manifest.secret_objects.len(), 2);
        assert_eq!(manifest.secret_objects[0].object_name, "prod/db/password");
        assert_eq!(manifest.secret_objects[1].version(), Some("01234567-89ab"));
        assert_eq!(
            manifest.secret_objects[1].version_label(),
            Some("AWSPREVIOUS")
        );
        assert_eq!(
            manifest.path_translation().unwrap(),
            PathTranslation::Char('-')
        );
        assert!(manifest.validate().is_ok());
    }

    #[test]
    fn manifest_accepts_camel_case_json() {
        let json = r#"{
            "region": "us-east-1",
            "pathTranslation": "False",
            "secretObjects": [{"objectName": "a/b/c", "objectVersionLabel": ""}]
        }"#;
        let manifest: Manifest = serde_json::from_str(json).unwrap();
        assert_eq!(manifest.secret_objects[0].object_name, "a/b/c");
        assert_eq!(manifest.secret_objects[0].version_label(), None);
        assert_eq!(
            manifest.path_translation().unwrap(),
            PathTranslation::Disabled
        );
    }

    #[test]
    fn manifest_validation_failures() {
        let wrong_provider = Manifest {
            provider: Some("gcp".to_string()),
            ..Manifest::default()
        };
        assert!(wrong_provider.validate().is_err());

        let empty_name = Manifest {
            secret_objects: vec![SecretReference::new("ok"), SecretReference::new("")],
            ..Manifest::default()
        };
        let err = empty_name.validate().unwrap_err();
        assert!(err.to_string().contains("SecretObjects[1]"));

        let bad_translation = Manifest {
            path_translation: Some("__".to_string()),
            ..Manifest::default()
        };
        assert!(bad_translation.validate().is_err());
    }

    #[test]
    fn manifest_defaults() {
        let manifest = Manifest::default();
        assert_eq!(manifest.region(), None);
        assert_eq!(
            manifest.path_translation().unwrap(),
            PathTranslation::Default
        );
        assert!(manifest.validate().is_ok());
    }
}
