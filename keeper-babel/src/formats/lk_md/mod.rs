//! Folder-markdown export
//!
//! Plain markdown files named after their page, with children in the
//! directory of the same name. Optional YAML frontmatter keeps what a file
//! name cannot: the exact title, tags, aliases, icon, page appearance,
//! properties and the order of the children. Root order and the source
//! envelope go in the workspace manifest. Every CSV file is one table.

pub mod exporter;
pub mod frontmatter;
pub mod parser;

use crate::diagnostics::Outcome;
use crate::error::FormatError;
use crate::format::Format;
use crate::model::ConversionData;
use std::path::{Path, PathBuf};

pub const FORMAT_NAME: &str = "lk-md";

/// Format implementation for folder-markdown exports
#[derive(Debug, Default, Clone, Copy)]
pub struct LkMarkdownFormat;

impl Format for LkMarkdownFormat {
    fn name(&self) -> &str {
        FORMAT_NAME
    }

    fn description(&self) -> &str {
        "Markdown folder tree with YAML frontmatter"
    }

    fn supports_parsing(&self) -> bool {
        true
    }

    fn supports_export(&self) -> bool {
        true
    }

    /// Any directory qualifies, with the lowest confidence.
    fn detect(&self, path: &Path) -> Option<u8> {
        path.is_dir().then_some(1)
    }

    fn parse(&self, path: &Path) -> Result<Outcome<ConversionData>, FormatError> {
        parser::parse_folder(path)
    }

    fn export(&self, data: &ConversionData, dest: &Path) -> Result<Outcome<PathBuf>, FormatError> {
        exporter::export_folder(data, dest)
    }
}
