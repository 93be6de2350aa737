//! Materialize fetched secrets as files
//!
//! One file per secret, named after the secret with `/` translated so that
//! hierarchical names like `prod/db/password` land directly in the output
//! directory. Each file is written to a uniquely named temporary file in the
//! same directory and renamed into place, so a target is either fully
//! replaced or left untouched.

use crate::{Secret, SecretError};
use std::collections::HashSet;
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;
use tempfile::NamedTempFile;
use thiserror::Error;

/// Substitute used for `/` when no translation is configured
pub const DEFAULT_PATH_TRANSLATION: char = '_';

/// Translation value that keeps secret names unchanged
pub const PATH_TRANSLATION_DISABLED: &str = "False";

/// Separator replaced in secret names
const PATH_SEPARATOR: char = '/';

#[cfg(unix)]
const SECRET_FILE_MODE: u32 = 0o644;

/// How `/` in a secret name maps to the output file name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PathTranslation {
    /// Replace with [`DEFAULT_PATH_TRANSLATION`]
    #[default]
    Default,
    /// Keep names unchanged; a name with `/` needs its directories to exist
    Disabled,
    /// Replace with the given character
    Char(char),
}

impl PathTranslation {
    /// Output file name for a secret name
    #[must_use]
    pub fn translate(&self, name: &str) -> String {
        match self {
            Self::Default => Self::Char(DEFAULT_PATH_TRANSLATION).translate(name),
            Self::Disabled => name.to_string(),
            Self::Char(c) => name.replace(PATH_SEPARATOR, &c.to_string()),
        }
    }
}

impl FromStr for PathTranslation {
    type Err = SecretError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Ok(Self::Default);
        }
        if s.eq_ignore_ascii_case(PATH_TRANSLATION_DISABLED) {
            return Ok(Self::Disabled);
        }

        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(Self::Char(c)),
            _ => Err(SecretError::validation(format!(
                "path translation must be empty, '{PATH_TRANSLATION_DISABLED}' or a single character, got '{s}'"
            ))),
        }
    }
}

/// What to do when a file cannot be written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteMode {
    /// Log the failure, keep writing, and report every failure at the end
    #[default]
    Continue,
    /// Return the first failure and leave the remaining secrets unwritten
    StopOnError,
}

/// Failure to write one secret file
#[derive(Debug, Error)]
#[error("Failed to {operation} '{}' for secret '{secret_name}': {source}", path.display())]
pub struct WriteFailure {
    /// Name of the secret that was being written
    pub secret_name: String,
    /// Target file
    pub path: PathBuf,
    /// Filesystem operation that failed
    pub operation: &'static str,
    /// Underlying I/O error
    #[source]
    pub source: io::Error,
}

/// Writes secrets as files under an output directory
#[derive(Debug, Clone)]
pub struct FileSecretWriter {
    output_dir: PathBuf,
    translation: PathTranslation,
    mode: WriteMode,
}

impl FileSecretWriter {
    /// Writer with default translation in [`WriteMode::Continue`]
    #[must_use]
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            translation: PathTranslation::Default,
            mode: WriteMode::Continue,
        }
    }

    /// Use the given path translation
    #[must_use]
    pub fn with_translation(mut self, translation: PathTranslation) -> Self {
        self.translation = translation;
        self
    }

    /// Use the given error policy
    #[must_use]
    pub fn with_mode(mut self, mode: WriteMode) -> Self {
        self.mode = mode;
        self
    }

    /// Stop at the first write failure
    #[must_use]
    pub fn stop_on_error(self) -> Self {
        self.with_mode(WriteMode::StopOnError)
    }

    /// Output directory
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Configured translation
    #[must_use]
    pub const fn translation(&self) -> PathTranslation {
        self.translation
    }

    /// Configured error policy
    #[must_use]
    pub const fn mode(&self) -> WriteMode {
        self.mode
    }

    /// Target path for a secret, always inside the output directory.
    ///
    /// Root and `.` components of the translated name are dropped, so
    /// `/etc/job` becomes `<output_dir>/etc/job`.
    ///
    /// # Errors
    /// [`io::ErrorKind::InvalidInput`] if the translated name contains `..`
    /// or has no file name component.
    pub fn output_path(&self, secret_name: &str) -> io::Result<PathBuf> {
        let translated = self.translation.translate(secret_name);
        let mut path = self.output_dir.clone();
        let mut has_name = false;

        for component in Path::new(&translated).components() {
            match component {
                Component::Normal(part) => {
                    path.push(part);
                    has_name = true;
                }
                Component::RootDir | Component::Prefix(_) | Component::CurDir => {}
                Component::ParentDir => {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidInput,
                        format!("file name '{translated}' leaves the output directory"),
                    ));
                }
            }
        }

        if has_name {
            Ok(path)
        } else {
            Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("file name '{translated}' is empty"),
            ))
        }
    }

    /// Write every secret to its file, in order.
    ///
    /// Existing files are replaced. When two secrets translate to the same
    /// file name, the first one is written and the later one is a failure.
    ///
    /// # Errors
    /// In [`WriteMode::StopOnError`], the first failure as
    /// [`SecretError::WriteFailed`]. In [`WriteMode::Continue`],
    /// [`SecretError::AggregateWrite`] listing every failure.
    pub fn write_secrets(&self, secrets: &[Secret]) -> Result<(), SecretError> {
        let mut failures = Vec::new();
        let mut claimed = HashSet::with_capacity(secrets.len());

        for secret in secrets {
            let result = match self.output_path(secret.name()) {
                Ok(path) => {
                    tracing::info!(
                        file_path = %path.display(),
                        secret_name = %secret.name(),
                        "Writing secret to file"
                    );

                    if claimed.insert(path.clone()) {
                        write_file(&path, secret)
                    } else {
                        Err(WriteFailure {
                            secret_name: secret.name().to_string(),
                            path,
                            operation: "claim",
                            source: io::Error::new(
                                io::ErrorKind::AlreadyExists,
                                "another secret in this batch already translated to this file name",
                            ),
                        })
                    }
                }
                Err(source) => Err(WriteFailure {
                    secret_name: secret.name().to_string(),
                    path: self.output_dir.clone(),
                    operation: "resolve",
                    source,
                }),
            };

            if let Err(failure) = result {
                tracing::error!(
                    file_path = %failure.path.display(),
                    secret_name = %failure.secret_name,
                    error = %failure.source,
                    "Failed to write secret file"
                );

                if self.mode == WriteMode::StopOnError {
                    return Err(SecretError::WriteFailed(failure));
                }
                failures.push(failure);
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(SecretError::AggregateWrite { failures })
        }
    }
}

fn write_file(path: &Path, secret: &Secret) -> Result<(), WriteFailure> {
    let failure = |operation: &'static str, source: io::Error| WriteFailure {
        secret_name: secret.name().to_string(),
        path: path.to_path_buf(),
        operation,
        source,
    };

    let dir = path.parent().unwrap_or_else(|| Path::new("."));

    // Dropped (and removed) on any early return, the target is untouched
    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| failure("create", e))?;
    tmp.write_all(secret.expose_content())
        .map_err(|e| failure("write", e))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tmp.as_file()
            .set_permissions(std::fs::Permissions::from_mode(SECRET_FILE_MODE))
            .map_err(|e| failure("chmod", e))?;
    }

    tmp.as_file().sync_all().map_err(|e| failure("sync", e))?;
    tmp.persist(path).map_err(|e| failure("rename", e.error))?;
    Ok(())
}
