//! Structured JSON export format
//!
//! A whole knowledge base in one `.json` file: a versioned envelope holding
//! the resources, their rich-text documents as typed nodes, and optional
//! database tables. Attachments live next to the file under
//! `assets/<resource id>/`.
//!
//! # Export options
//!
//! - `schema-version`: `1` (flat list with `parentId`, default) or `2` (nested)
//! - `pretty`: indent the output, `true` by default

pub mod exporter;
pub mod nodes;
pub mod parser;

pub use exporter::ExportOptions;

use crate::diagnostics::Outcome;
use crate::error::{FormatError, IoResultExt};
use crate::format::Format;
use crate::model::ConversionData;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const FORMAT_NAME: &str = "lk-json";

/// Format implementation for the structured JSON export
#[derive(Debug, Default, Clone)]
pub struct LkJsonFormat {
    options: ExportOptions,
}

impl LkJsonFormat {
    pub fn new(options: ExportOptions) -> Self {
        Self { options }
    }
}

impl Format for LkJsonFormat {
    fn name(&self) -> &str {
        FORMAT_NAME
    }

    fn description(&self) -> &str {
        "Single-file JSON export with typed rich-text documents"
    }

    fn file_extensions(&self) -> &[&str] {
        &["json"]
    }

    fn supports_parsing(&self) -> bool {
        true
    }

    fn supports_export(&self) -> bool {
        true
    }

    fn detect(&self, path: &Path) -> Option<u8> {
        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));
        (is_json && path.is_file()).then_some(2)
    }

    fn parse(&self, path: &Path) -> Result<Outcome<ConversionData>, FormatError> {
        let source = fs::read_to_string(path).at_path(path)?;
        parser::parse_document(&source, path)
    }

    fn export(&self, data: &ConversionData, dest: &Path) -> Result<Outcome<PathBuf>, FormatError> {
        exporter::export_document(data, dest, self.options)
    }

    fn export_with_options(
        &self,
        data: &ConversionData,
        dest: &Path,
        options: &HashMap<String, String>,
    ) -> Result<Outcome<PathBuf>, FormatError> {
        let mut merged = self.options;
        let overrides = ExportOptions::from_map(options)?;
        if options.contains_key("schema-version") {
            merged.schema_version = overrides.schema_version;
        }
        if options.contains_key("pretty") {
            merged.pretty = overrides.pretty;
        }
        exporter::export_document(data, dest, merged)
    }
}
