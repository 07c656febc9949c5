//! Format registry for format discovery and selection
//!
//! This module provides a centralized registry for all available formats.
//! Formats can be registered and retrieved by name, or picked by looking at
//! an export on disk.

use crate::diagnostics::Outcome;
use crate::error::FormatError;
use crate::format::Format;
use crate::model::ConversionData;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Registry of export formats
///
/// # Examples
///
/// ```ignore
/// let registry = FormatRegistry::default();
/// let format = registry.detect_format_from_path(Path::new("Realms.json"));
/// assert_eq!(format.as_deref(), Some("lk-json"));
/// ```
pub struct FormatRegistry {
    formats: HashMap<String, Box<dyn Format>>,
}

impl FormatRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        FormatRegistry {
            formats: HashMap::new(),
        }
    }

    /// Register a format
    ///
    /// If a format with the same name already exists, it will be replaced.
    pub fn register<F: Format + 'static>(&mut self, format: F) {
        self.formats
            .insert(format.name().to_string(), Box::new(format));
    }

    /// Get a format by name
    pub fn get(&self, name: &str) -> Result<&dyn Format, FormatError> {
        self.formats
            .get(name)
            .map(|f| f.as_ref())
            .ok_or_else(|| FormatError::FormatNotFound(name.to_string()))
    }

    /// Check if a format exists
    pub fn has(&self, name: &str) -> bool {
        self.formats.contains_key(name)
    }

    /// List all available format names (sorted)
    pub fn list_formats(&self) -> Vec<String> {
        let mut names: Vec<_> = self.formats.keys().cloned().collect();
        names.sort();
        names
    }

    /// Detect the format of an export on disk
    ///
    /// Every format scores the path; the highest score wins, ties go to the
    /// alphabetically first name. Returns `None` when no format recognizes it.
    pub fn detect_format_from_path(&self, path: &Path) -> Option<String> {
        let mut best: Option<(u8, &str)> = None;
        for name in self.list_formats_ref() {
            let Some(score) = self.formats.get(name).and_then(|f| f.detect(path)) else {
                continue;
            };
            if best.map_or(true, |(top, _)| score > top) {
                best = Some((score, name));
            }
        }
        best.map(|(_, name)| name.to_string())
    }

    fn list_formats_ref(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.formats.keys().map(String::as_str).collect();
        names.sort();
        names
    }

    /// Parse the export at `path` using the specified format
    pub fn parse(&self, path: &Path, format: &str) -> Result<Outcome<ConversionData>, FormatError> {
        let fmt = self.get(format)?;
        if !fmt.supports_parsing() {
            return Err(FormatError::NotSupported(format!(
                "Format '{format}' does not support parsing"
            )));
        }
        fmt.parse(path)
    }

    /// Export a snapshot below `dest` using the specified format
    pub fn export(
        &self,
        data: &ConversionData,
        dest: &Path,
        format: &str,
    ) -> Result<Outcome<PathBuf>, FormatError> {
        self.export_with_options(data, dest, format, &HashMap::new())
    }

    /// Export a snapshot using the specified format and options
    pub fn export_with_options(
        &self,
        data: &ConversionData,
        dest: &Path,
        format: &str,
        options: &HashMap<String, String>,
    ) -> Result<Outcome<PathBuf>, FormatError> {
        let fmt = self.get(format)?;
        if !fmt.supports_export() {
            return Err(FormatError::NotSupported(format!(
                "Format '{format}' does not support export"
            )));
        }
        fmt.export_with_options(data, dest, options)
    }

    /// Create a registry with default formats
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();

        // Register built-in formats
        registry.register(crate::formats::notion::NotionFormat);
        registry.register(crate::formats::lk_json::LkJsonFormat::default());
        registry.register(crate::formats::lk_md::LkMarkdownFormat);

        registry
    }
}

impl Default for FormatRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
