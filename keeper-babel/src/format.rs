//! Format trait definition
//!
//! This module defines the core Format trait that all format implementations must implement.
//! The trait provides a uniform interface for parsing physical exports into the canonical
//! model and for writing the model back out.

use crate::diagnostics::Outcome;
use crate::error::FormatError;
use crate::model::ConversionData;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Trait for knowledge-base export formats
///
/// Implementors read a physical export (a file or a directory tree) into a [`ConversionData`]
/// snapshot and write snapshots back out. Formats can support parsing, exporting, or both.
///
/// # Examples
///
/// ```ignore
/// struct MyFormat;
///
/// impl Format for MyFormat {
///     fn name(&self) -> &str {
///         "my-format"
///     }
///
///     fn supports_parsing(&self) -> bool {
///         true
///     }
///
///     fn parse(&self, path: &Path) -> Result<Outcome<ConversionData>, FormatError> {
///         // Read the export at `path`
///         todo!()
///     }
/// }
/// ```
pub trait Format: Send + Sync {
    /// The name of this format, also its chain stage name (e.g. "notion", "lk-json")
    fn name(&self) -> &str;

    /// Optional description of this format
    fn description(&self) -> &str {
        ""
    }

    /// File extensions of single-file exports, without the leading dot.
    /// Directory formats return an empty slice.
    fn file_extensions(&self) -> &[&str] {
        &[]
    }

    /// Whether this format supports parsing (export on disk → model)
    fn supports_parsing(&self) -> bool {
        false
    }

    /// Whether this format supports exporting (model → export on disk)
    fn supports_export(&self) -> bool {
        false
    }

    /// How confidently `path` looks like an export of this format.
    ///
    /// `None` means it does not; among formats that answer, the highest score wins.
    fn detect(&self, _path: &Path) -> Option<u8> {
        None
    }

    /// Parse the export at `path`
    ///
    /// Default implementation returns NotSupported error.
    /// Formats that support parsing should override this method.
    fn parse(&self, _path: &Path) -> Result<Outcome<ConversionData>, FormatError> {
        Err(FormatError::NotSupported(format!(
            "Format '{}' does not support parsing",
            self.name()
        )))
    }

    /// Write `data` below the directory `dest` and return the path of the
    /// written export, which is what [`Format::parse`] reads back.
    ///
    /// Default implementation returns NotSupported error.
    /// Formats that support exporting should override this method.
    fn export(&self, _data: &ConversionData, _dest: &Path) -> Result<Outcome<PathBuf>, FormatError> {
        Err(FormatError::NotSupported(format!(
            "Format '{}' does not support export",
            self.name()
        )))
    }

    /// Export, optionally using extra parameters.
    ///
    /// Formats without options can rely on the default implementation, which
    /// delegates to [`Format::export`] and rejects any parameter.
    fn export_with_options(
        &self,
        data: &ConversionData,
        dest: &Path,
        options: &HashMap<String, String>,
    ) -> Result<Outcome<PathBuf>, FormatError> {
        if options.is_empty() {
            self.export(data, dest)
        } else {
            Err(FormatError::NotSupported(format!(
                "Format '{}' does not support extra parameters",
                self.name()
            )))
        }
    }
}
