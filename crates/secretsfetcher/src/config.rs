//! Layered configuration
//!
//! Precedence, highest first: command-line flags, `SECRETSFETCHER_*`
//! environment variables (both handled by clap), the config file, then
//! built-in defaults. When a manifest is used, its `Region` and
//! `PathTranslation` override the config file.

use crate::cli::{CliError, FetchArgs};
use crate::tracing::LogLevel;
use secretsfetcher_secrets::{FilterSpec, Manifest, PathTranslation, WriteMode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

/// Config file read when `--config` is not given, if it exists
pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";

/// Contents of the config file
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct FileConfig {
    /// Log level used when none is given on the command line
    #[serde(alias = "logLevel", alias = "loglevel")]
    pub log_level: Option<String>,

    /// AWS Secrets Manager settings
    #[serde(alias = "aws")]
    pub aws: AwsFileConfig,
}

/// `Aws` section of the config file
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct AwsFileConfig {
    /// Secret name prefix for discovery
    #[serde(alias = "prefixFilter")]
    pub prefix_filter: Option<String>,
    /// Tag key prefixes for discovery
    #[serde(alias = "tagKeyFilters")]
    pub tag_key_filters: Vec<String>,
    /// Tag value prefixes for discovery
    #[serde(alias = "tagValueFilters")]
    pub tag_value_filters: Vec<String>,
    /// AWS region
    #[serde(alias = "region")]
    pub region: Option<String>,
    /// Substitute for `/` in file names
    #[serde(alias = "pathTranslation")]
    pub path_translation: Option<String>,
}

impl FileConfig {
    /// Load the config file.
    ///
    /// An explicit `path` must exist. Without one, [`DEFAULT_CONFIG_FILE`] is
    /// read from the current directory if present, otherwise defaults apply.
    ///
    /// # Errors
    /// Returns [`CliError::Config`] if the file cannot be read or parsed.
    pub fn load(path: Option<&Path>) -> Result<Self, CliError> {
        match path {
            Some(path) => load_document(path),
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.is_file() {
                    load_document(default_path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Configured log level, if any
    ///
    /// # Errors
    /// Returns [`CliError::Config`] for an unknown level.
    pub fn log_level(&self) -> Result<Option<LogLevel>, CliError> {
        self.log_level
            .as_deref()
            .filter(|level| !level.trim().is_empty())
            .map(str::parse)
            .transpose()
    }
}

/// Parse a YAML, JSON or TOML document, chosen by file extension.
///
/// Files without a recognized extension are read as YAML.
///
/// # Errors
/// Returns [`CliError::Config`] if the file cannot be read or parsed.
pub fn load_document<T: DeserializeOwned>(path: &Path) -> Result<T, CliError> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        CliError::config_with_help(
            format!("Failed to read {}: {e}", path.display()),
            "Check that the file exists and is readable",
        )
    })?;

    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    let parsed = match extension.as_deref() {
        Some("json") => serde_json::from_str(&contents).map_err(|e| e.to_string()),
        Some("toml") => toml::from_str(&contents).map_err(|e| e.to_string()),
        _ => serde_yaml::from_str(&contents).map_err(|e| e.to_string()),
    };

    parsed.map_err(|e| CliError::config(format!("Failed to parse {}: {e}", path.display())))
}

/// Where the secrets to fetch come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchSource {
    /// Explicit references from a manifest file
    Manifest(Manifest),
    /// Prefix and tag discovery
    Discovery(FilterSpec),
}

/// Fully resolved settings for one fetch run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchSettings {
    /// Secrets to fetch
    pub source: FetchSource,
    /// AWS region; the SDK default chain decides when absent
    pub region: Option<String>,
    /// Output directory
    pub output_dir: PathBuf,
    /// Name translation for output files
    pub path_translation: PathTranslation,
    /// Write error policy
    pub write_mode: WriteMode,
    /// Treat any secret that cannot be fetched as fatal
    pub strict: bool,
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

impl FetchSettings {
    /// Merge command-line arguments, the config file and the manifest.
    ///
    /// The manifest and discovery filter are validated here, so invalid
    /// input is rejected before any client is built.
    ///
    /// # Errors
    /// Returns [`CliError::Config`] for an unreadable or invalid manifest, a
    /// blank discovery prefix or an invalid path translation.
    pub fn resolve(args: &FetchArgs, config: &FileConfig) -> Result<Self, CliError> {
        let (source, manifest_region, manifest_translation) = match &args.manifest {
            Some(path) => {
                let manifest: Manifest = load_document(path)?;
                manifest.validate().map_err(|e| {
                    CliError::config_with_help(
                        format!("Invalid manifest {}: {e}", path.display()),
                        "See SecretObjects, Provider and PathTranslation in the manifest",
                    )
                })?;
                let region = manifest.region().map(str::to_string);
                let translation = manifest.path_translation.clone();
                (FetchSource::Manifest(manifest), region, translation)
            }
            None => {
                let prefix = args
                    .prefix
                    .clone()
                    .or_else(|| config.aws.prefix_filter.clone())
                    .unwrap_or_default();
                let tag_keys = if args.tag_keys.is_empty() {
                    config.aws.tag_key_filters.clone()
                } else {
                    args.tag_keys.clone()
                };
                let tag_values = if args.tag_values.is_empty() {
                    config.aws.tag_value_filters.clone()
                } else {
                    args.tag_values.clone()
                };

                let filter = FilterSpec::new(prefix)
                    .with_tag_key_prefixes(tag_keys)
                    .with_tag_value_prefixes(tag_values);
                filter.validate().map_err(|e| {
                    CliError::config_with_help(
                        e.to_string(),
                        "Pass --manifest, or a name prefix with --prefix or Aws.PrefixFilter",
                    )
                })?;
                (FetchSource::Discovery(filter), None, None)
            }
        };

        let region = non_empty(args.region.as_deref())
            .or(manifest_region)
            .or_else(|| non_empty(config.aws.region.as_deref()));

        let path_translation = args
            .path_translation
            .clone()
            .or(manifest_translation)
            .or_else(|| config.aws.path_translation.clone())
            .map_or(Ok(PathTranslation::Default), |value| value.parse())
            .map_err(CliError::from)?;

        Ok(Self {
            source,
            region,
            output_dir: args.output.clone(),
            path_translation,
            write_mode: if args.stop_on_error {
                WriteMode::StopOnError
            } else {
                WriteMode::Continue
            },
            strict: args.strict,
        })
    }
}
