//! Error types for format operations
//!
//! Every variant here is hop-fatal: the parse or export that produced it is
//! aborted and nothing it wrote is treated as valid. Problems a conversion can
//! survive are reported as [`crate::diagnostics::Warning`]s instead.

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur during format operations
#[derive(Debug, Error)]
pub enum FormatError {
    /// Format not found in registry
    #[error("Format '{0}' not found")]
    FormatNotFound(String),

    /// The input could not be parsed at all
    #[error("Parse error: {0}")]
    ParseError(String),

    /// The structured document declares a schema version we do not understand
    #[error("Unsupported schema version: {0}")]
    UnsupportedVersion(String),

    /// Error while producing the physical export
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Format does not support the requested direction
    #[error("Operation not supported: {0}")]
    NotSupported(String),

    /// A required file or directory could not be read or written
    #[error("I/O error at '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl FormatError {
    pub fn io(path: impl AsRef<Path>, source: io::Error) -> Self {
        FormatError::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

/// Shorthand used by the filesystem helpers.
pub trait IoResultExt<T> {
    fn at_path(self, path: impl AsRef<Path>) -> Result<T, FormatError>;
}

impl<T> IoResultExt<T> for Result<T, io::Error> {
    fn at_path(self, path: impl AsRef<Path>) -> Result<T, FormatError> {
        self.map_err(|e| FormatError::io(path, e))
    }
}
