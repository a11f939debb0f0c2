//! Error type for block-file access and the file helpers.
//!
//! One enum covers the whole crate because every failure originates from the
//! same place: the handle behind a [`BlockFile`](crate::BlockFile) or one of
//! the standalone path helpers. The enum is `#[non_exhaustive]`; consumers
//! should include a fallback match arm.
//!
//! # Design Notes
//! - I/O errors preserve their source and, when known, the path they came from.
//! - `ErrorKind::Interrupted` is always surfaced as [`Error::Interrupted`] and
//!   is never folded into `Io`, so a caller can distinguish a user abort from
//!   a genuine device failure.
//! - Evaluator failures are not errors; see [`crate::math_expr`].

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use crate::config::ConfigError;

/// Crate result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors from opening, sizing, reading or writing a file.
#[derive(Debug)]
#[non_exhaustive]
pub enum Error {
    /// I/O error on a handle with no associated path.
    Io(io::Error),
    /// I/O error while opening or accessing `path`.
    File { path: PathBuf, source: io::Error },
    /// The size of `path` could not be determined.
    SizeQuery { path: PathBuf, source: io::Error },
    /// The operation was interrupted before it completed.
    Interrupted,
    /// The configuration failed validation.
    InvalidConfig(ConfigError),
    /// The handle was opened without the access the operation needs.
    AccessDenied { op: &'static str },
}

impl Error {
    /// Wraps an I/O error, promoting `Interrupted` to [`Error::Interrupted`].
    #[inline]
    pub fn io(err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::Interrupted {
            return Self::Interrupted;
        }
        Self::Io(err)
    }

    /// Wraps an I/O error raised while working on `path`.
    #[inline]
    pub fn file(path: &Path, err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::Interrupted {
            return Self::Interrupted;
        }
        Self::File {
            path: path.to_path_buf(),
            source: err,
        }
    }

    /// Wraps a failed size query for `path`.
    #[inline]
    pub fn size_query(path: &Path, err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::Interrupted {
            return Self::Interrupted;
        }
        Self::SizeQuery {
            path: path.to_path_buf(),
            source: err,
        }
    }

    /// Returns true if this error came from an interruption.
    pub fn is_interrupted(&self) -> bool {
        matches!(self, Self::Interrupted)
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Self::io(err)
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Self::InvalidConfig(err)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "I/O error: {err}"),
            Self::File { path, source } => {
                write!(f, "I/O error on '{}': {source}", path.display())
            }
            Self::SizeQuery { path, source } => {
                write!(
                    f,
                    "failed to obtain the size of '{}': {source}",
                    path.display()
                )
            }
            Self::Interrupted => write!(f, "operation interrupted"),
            Self::InvalidConfig(err) => write!(f, "invalid configuration: {err}"),
            Self::AccessDenied { op } => {
                write!(f, "{op} not permitted by the mode the file was opened with")
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::File { source, .. } | Self::SizeQuery { source, .. } => Some(source),
            Self::InvalidConfig(err) => Some(err),
            _ => None,
        }
    }
}
