use crate::tracing::{LogLevel, TracingFormat};
use clap::{Args, Parser, Subcommand};
use miette::{Diagnostic, Report};
use secretsfetcher_secrets::SecretError;
use std::path::PathBuf;
use thiserror::Error;

/// Exit codes for the CLI application
pub const EXIT_OK: i32 = 0;
/// Exit code for every fatal error
pub const EXIT_ERROR: i32 = 1;

/// CLI-specific error types
#[derive(Error, Debug, Clone, Diagnostic)]
pub enum CliError {
    /// Invalid flags, configuration file or manifest
    #[error("Configuration error: {message}")]
    #[diagnostic(code(secretsfetcher::cli::config))]
    Config {
        /// The error message
        message: String,
        /// Optional help text
        #[help]
        help: Option<String>,
    },
    /// Secrets could not be listed, or strict mode saw a partial fetch
    #[error("Fetch failed: {message}")]
    #[diagnostic(code(secretsfetcher::cli::fetch))]
    Fetch {
        /// The error message
        message: String,
        /// Optional help text
        #[help]
        help: Option<String>,
    },
    /// One or more secret files could not be written
    #[error("Write failed: {message}")]
    #[diagnostic(code(secretsfetcher::cli::write))]
    Write {
        /// The error message
        message: String,
        /// Optional help text
        #[help]
        help: Option<String>,
    },
}

impl CliError {
    /// Create a new configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            help: None,
        }
    }

    /// Create a new configuration error with help text
    #[must_use]
    pub fn config_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    /// Create a new fetch error with help text
    #[must_use]
    pub fn fetch_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Fetch {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    /// Create a new write error with help text
    #[must_use]
    pub fn write_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Write {
            message: message.into(),
            help: Some(help.into()),
        }
    }
}

/// Convert [`SecretError`] to the matching `CliError` category.
impl From<SecretError> for CliError {
    fn from(err: SecretError) -> Self {
        match err {
            SecretError::Validation { message } => Self::config(message),
            SecretError::Listing { .. } => Self::fetch_with_help(
                err.to_string(),
                "Check the region, credentials and secretsmanager:ListSecrets permission",
            ),
            SecretError::IncompleteFetch { .. } => Self::fetch_with_help(
                err.to_string(),
                "Run without --strict to write the secrets that could be fetched",
            ),
            SecretError::WriteFailed(failure) => Self::write_with_help(
                failure.to_string(),
                "Check that the output directory exists and is writable",
            ),
            SecretError::AggregateWrite { failures } => {
                let details = failures
                    .iter()
                    .map(|failure| format!("  - {failure}"))
                    .collect::<Vec<_>>()
                    .join("\n");
                Self::write_with_help(
                    format!("{} secret file(s) failed to write:\n{details}", failures.len()),
                    "Check that the output directory exists and is writable",
                )
            }
            SecretError::NotFound { .. }
            | SecretError::AccessDenied { .. }
            | SecretError::Transient { .. }
            | SecretError::Store { .. }
            | SecretError::Decode { .. } => Self::Fetch {
                message: err.to_string(),
                help: None,
            },
        }
    }
}

/// Map CLI error to its exit code
#[must_use]
pub const fn exit_code_for(err: &CliError) -> i32 {
    match err {
        CliError::Config { .. } | CliError::Fetch { .. } | CliError::Write { .. } => EXIT_ERROR,
    }
}

/// Render an error to stderr with miette's report handler
#[allow(clippy::print_stderr)]
pub fn render_error(err: &CliError) {
    eprintln!("{:?}", Report::new(err.clone()));
}

/// Top-level command line
#[derive(Parser, Debug)]
#[command(name = "secretsfetcher")]
#[command(about = "Fetch secrets from AWS Secrets Manager into local files")]
#[command(long_about = None)]
#[command(version)]
pub struct Cli {
    /// Command to run
    #[command(subcommand)]
    pub command: Commands,

    /// Explicit config file path
    #[arg(
        long,
        global = true,
        env = "SECRETSFETCHER_CONFIG",
        help = "Config file (YAML, JSON or TOML) [default: ./config.yaml if present]"
    )]
    pub config: Option<PathBuf>,

    /// Log level override
    #[arg(
        short = 'l',
        long,
        global = true,
        env = "SECRETSFETCHER_LOG_LEVEL",
        help = "Set logging level [default: LogLevel from the config file, else info]",
        value_enum
    )]
    pub level: Option<LogLevel>,

    /// Log output format
    #[arg(
        long,
        global = true,
        env = "SECRETSFETCHER_LOG_FORMAT",
        help = "Log output format",
        default_value = "json",
        value_enum
    )]
    pub log_format: TracingFormat,
}

/// Subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the tool name and version
    #[command(about = "Show version information")]
    Version,
    /// Fetch secrets and write one file per secret
    #[command(
        visible_alias = "aws",
        about = "Fetch secrets from AWS Secrets Manager and write them to files"
    )]
    Fetch(FetchArgs),
}

/// Arguments of the `fetch` command
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchArgs {
    /// Manifest listing the secrets to fetch
    #[arg(
        short = 'm',
        long,
        env = "SECRETSFETCHER_MANIFEST",
        help = "Secrets manifest file; discovery filters are used when omitted"
    )]
    pub manifest: Option<PathBuf>,

    /// Directory the secret files are written to
    #[arg(
        short = 'o',
        long,
        env = "SECRETSFETCHER_OUTPUT",
        help = "Output directory",
        default_value = "."
    )]
    pub output: PathBuf,

    /// Name prefix for discovery
    #[arg(long, env = "SECRETSFETCHER_PREFIX", help = "Secret name prefix to discover")]
    pub prefix: Option<String>,

    /// Tag key prefixes for discovery
    #[arg(
        long = "tag-key",
        env = "SECRETSFETCHER_TAG_KEYS",
        value_delimiter = ',',
        help = "Tag key prefix every discovered secret must carry (repeatable)"
    )]
    pub tag_keys: Vec<String>,

    /// Tag value prefixes for discovery
    #[arg(
        long = "tag-value",
        env = "SECRETSFETCHER_TAG_VALUES",
        value_delimiter = ',',
        help = "Tag value prefix every discovered secret must carry (repeatable)"
    )]
    pub tag_values: Vec<String>,

    /// Region override
    #[arg(long, env = "SECRETSFETCHER_REGION", help = "AWS region")]
    pub region: Option<String>,

    /// Raw `PathTranslation` value
    #[arg(
        long,
        env = "SECRETSFETCHER_PATH_TRANSLATION",
        help = "Substitute for '/' in file names: a single character, or 'False' to keep names"
    )]
    pub path_translation: Option<String>,

    /// Stop at the first write failure
    #[arg(
        long,
        env = "SECRETSFETCHER_STOP_ON_ERROR",
        help = "Stop at the first file that cannot be written"
    )]
    pub stop_on_error: bool,

    /// Require every secret to be fetched
    #[arg(
        long,
        env = "SECRETSFETCHER_STRICT",
        help = "Fail without writing anything if any secret cannot be fetched"
    )]
    pub strict: bool,
}

/// Parse the process arguments, exiting on invalid input
#[must_use]
pub fn parse() -> Cli {
    Cli::parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use secretsfetcher_secrets::{StoreError, StoreErrorKind, WriteFailure};

    fn parse_clean(args: &[&str]) -> Result<Cli, clap::Error> {
        temp_env::with_vars_unset(
            [
                "SECRETSFETCHER_CONFIG",
                "SECRETSFETCHER_LOG_LEVEL",
                "SECRETSFETCHER_LOG_FORMAT",
                "SECRETSFETCHER_MANIFEST",
                "SECRETSFETCHER_OUTPUT",
                "SECRETSFETCHER_PREFIX",
                "SECRETSFETCHER_TAG_KEYS",
                "SECRETSFETCHER_TAG_VALUES",
                "SECRETSFETCHER_REGION",
                "SECRETSFETCHER_PATH_TRANSLATION",
                "SECRETSFETCHER_STOP_ON_ERROR",
                "SECRETSFETCHER_STRICT",
            ],
            || Cli::try_parse_from(args),
        )
    }

    #[test]
    fn test_cli_definition_is_consistent() {
        use clap::CommandFactory;

        let mut command = Cli::command();
        command.build();
        command.clone().debug_assert();

        let fetch = command.find_subcommand("fetch").unwrap();
        let prefix = fetch
            .get_arguments()
            .find(|arg| arg.get_id() == "prefix")
            .unwrap();
        assert_eq!(
            prefix.get_help().map(ToString::to_string).as_deref(),
            Some("Secret name prefix to discover")
        );
    }

    #[test]
    fn test_cli_default_values() {
        let cli = parse_clean(&["secretsfetcher", "version"]).unwrap();

        assert_eq!(cli.level, None);
        assert_eq!(cli.log_format, TracingFormat::Json);
        assert_eq!(cli.config, None);
        assert!(matches!(cli.command, Commands::Version));
    }

    #[test]
    fn test_cli_log_level_parsing() {
        for (arg, level) in [
            ("trace", LogLevel::Trace),
            ("debug", LogLevel::Debug),
            ("info", LogLevel::Info),
            ("warn", LogLevel::Warn),
            ("error", LogLevel::Error),
        ] {
            let cli = parse_clean(&["secretsfetcher", "-l", arg, "version"]).unwrap();
            assert_eq!(cli.level, Some(level));
        }
        assert!(parse_clean(&["secretsfetcher", "--level", "loud", "version"]).is_err());
    }

    #[test]
    fn test_fetch_args() {
        let cli = parse_clean(&[
            "secretsfetcher",
            "fetch",
            "-m",
            "manifest.yaml",
            "-o",
            "/run/secrets",
            "--region",
            "eu-west-1",
            "--path-translation",
            "-",
            "--stop-on-error",
        ])
        .unwrap();

        let Commands::Fetch(args) = cli.command else {
            panic!("expected fetch command");
        };
        assert_eq!(args.manifest, Some(PathBuf::from("manifest.yaml")));
        assert_eq!(args.output, PathBuf::from("/run/secrets"));
        assert_eq!(args.region.as_deref(), Some("eu-west-1"));
        assert_eq!(args.path_translation.as_deref(), Some("-"));
        assert!(args.stop_on_error);
        assert!(!args.strict);
    }

    #[test]
    fn test_aws_alias_and_tag_lists() {
        let cli = parse_clean(&[
            "secretsfetcher",
            "aws",
            "--prefix",
            "api/",
            "--tag-key",
            "team,app",
            "--tag-key",
            "env",
            "--tag-value",
            "prod",
        ])
        .unwrap();

        let Commands::Fetch(args) = cli.command else {
            panic!("expected fetch command");
        };
        assert_eq!(args.prefix.as_deref(), Some("api/"));
        assert_eq!(args.tag_keys, vec!["team", "app", "env"]);
        assert_eq!(args.tag_values, vec!["prod"]);
        assert_eq!(args.output, PathBuf::from("."));
    }

    #[test]
    fn test_env_layer() {
        let cli = temp_env::with_vars(
            [
                ("SECRETSFETCHER_PREFIX", Some("from-env/")),
                ("SECRETSFETCHER_LOG_FORMAT", Some("compact")),
                ("SECRETSFETCHER_MANIFEST", None),
            ],
            || Cli::try_parse_from(["secretsfetcher", "fetch"]),
        )
        .unwrap();

        assert_eq!(cli.log_format, TracingFormat::Compact);
        let Commands::Fetch(args) = cli.command else {
            panic!("expected fetch command");
        };
        assert_eq!(args.prefix.as_deref(), Some("from-env/"));
    }

    #[test]
    fn test_secret_error_conversion() {
        let err = CliError::from(SecretError::validation("secret name prefix cannot be empty"));
        assert!(matches!(err, CliError::Config { .. }));
        assert_eq!(exit_code_for(&err), EXIT_ERROR);

        let err = CliError::from(SecretError::Listing {
            prefix: "app/".to_string(),
            page: 1,
            source: StoreError::new(StoreErrorKind::AccessDenied, "denied"),
        });
        assert!(matches!(err, CliError::Fetch { help: Some(_), .. }));

        let err = CliError::from(SecretError::AggregateWrite {
            failures: vec![WriteFailure {
                secret_name: "a/b".to_string(),
                path: PathBuf::from("/out/a/b"),
                operation: "create",
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            }],
        });
        let message = err.to_string();
        assert!(message.contains("1 secret file(s) failed to write"));
        assert!(message.contains("a/b"));
        assert!(matches!(err, CliError::Write { .. }));
    }
}
