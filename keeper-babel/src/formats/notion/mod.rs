//! Notion-style markdown/CSV tree export
//!
//! Each page is a markdown file named `<Display Name> <32-hex id>.md`. Its
//! children and attachments live in the directory with the same stem. Pages
//! carry their exact name in an H1 title and their properties in a
//! `Key: value` block below it (see [`page`]). Databases are exported as a
//! `Name.csv` / `Name_all.csv` pair at the root.

pub mod exporter;
pub mod page;
pub mod parser;

use crate::common::names::has_notion_id;
use crate::common::tree_walk::{file_stem, list_dir};
use crate::diagnostics::Outcome;
use crate::error::FormatError;
use crate::format::Format;
use crate::model::ConversionData;
use std::path::{Path, PathBuf};

pub const FORMAT_NAME: &str = "notion";

/// Format implementation for Notion markdown exports
#[derive(Debug, Default, Clone, Copy)]
pub struct NotionFormat;

impl Format for NotionFormat {
    fn name(&self) -> &str {
        FORMAT_NAME
    }

    fn description(&self) -> &str {
        "Notion markdown/CSV tree with ids in file names"
    }

    fn supports_parsing(&self) -> bool {
        true
    }

    fn supports_export(&self) -> bool {
        true
    }

    /// A directory whose first top-level page carries an id in its name.
    fn detect(&self, path: &Path) -> Option<u8> {
        if !path.is_dir() {
            return None;
        }
        let listing = list_dir(path).ok()?;
        let first = listing.pages.first()?;
        has_notion_id(&file_stem(first)).then_some(2)
    }

    fn parse(&self, path: &Path) -> Result<Outcome<ConversionData>, FormatError> {
        parser::parse_tree(path)
    }

    fn export(&self, data: &ConversionData, dest: &Path) -> Result<Outcome<PathBuf>, FormatError> {
        exporter::export_tree(data, dest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn detects_trees_with_page_ids() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(NotionFormat.detect(dir.path()), None);
        fs::write(
            dir.path().join("Realms 0123456789abcdef0123456789abcdef.md"),
            "# Realms\n",
        )
        .unwrap();
        assert_eq!(NotionFormat.detect(dir.path()), Some(2));
    }

    #[test]
    fn plain_trees_are_not_notion() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("Realms.md"), "# Realms\n").unwrap();
        assert_eq!(NotionFormat.detect(dir.path()), None);
    }
}
