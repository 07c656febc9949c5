//! Reading a folder-markdown tree
//!
//! Ids are derived from each page's path relative to the root, so the same
//! tree always parses to the same ids.

use super::frontmatter::Frontmatter;
use super::FORMAT_NAME;
use crate::common::csv_tables::{merge_tables, read_csv};
use crate::common::links::{is_external, resolve_relative};
use crate::common::manifest::Manifest;
use crate::common::names::derived_id;
use crate::common::tree_walk::{file_name, file_stem, list_dir, relative_to, slash_path};
use crate::diagnostics::{Diagnostics, Outcome, WarningKind};
use crate::error::{FormatError, IoResultExt};
use crate::formats::markdown::{parse_markdown, ParseContext};
use crate::model::{Asset, ConversionData, Resource, ResourceId, WorkspaceBuilder};
use std::fs;
use std::path::{Path, PathBuf};

/// Id of the page stored at `rel`, a root-relative `.md` path.
pub fn page_id(rel: &Path) -> ResourceId {
    derived_id(&slash_path(rel))
}

pub fn parse_folder(root: &Path) -> Result<Outcome<ConversionData>, FormatError> {
    if !root.is_dir() {
        return Err(FormatError::ParseError(format!(
            "'{}' is not a directory",
            root.display()
        )));
    }
    let mut reader = FolderReader {
        root,
        builder: WorkspaceBuilder::new(),
        diagnostics: Diagnostics::new(),
    };
    reader.directory(root, None)?;

    let FolderReader {
        mut builder,
        mut diagnostics,
        ..
    } = reader;
    let manifest = Manifest::read(root, &mut diagnostics)?;
    builder.order_roots(manifest.root_order(|name| Some(page_id(Path::new(name)))));
    for (key, value) in manifest.envelope {
        builder.set_metadata(key, value);
    }
    builder.set_metadata("format", FORMAT_NAME);
    builder.set_metadata("source", root.display().to_string());
    let mut outcome = builder.build();
    let mut warnings = diagnostics.into_warnings();
    warnings.append(&mut outcome.warnings);
    outcome.warnings = warnings;
    Ok(outcome)
}

struct FolderReader<'r> {
    root: &'r Path,
    builder: WorkspaceBuilder,
    diagnostics: Diagnostics,
}

impl FolderReader<'_> {
    fn directory(&mut self, dir: &Path, parent: Option<&ResourceId>) -> Result<(), FormatError> {
        let listing = list_dir(dir)?;

        for table in &listing.tables {
            let csv = read_csv(table)?;
            self.builder
                .add_table(merge_tables(&file_stem(table), Some(&csv), None));
        }

        for page in &listing.pages {
            let paired = listing.paired_dir(page).cloned();
            let id = self.page(page, paired.as_deref(), parent)?;
            if let Some(paired) = paired {
                self.directory(&paired, Some(&id))?;
            }
        }

        for dir in listing.unpaired_dirs() {
            let rel = PathBuf::from(format!("{}.md", slash_path(&relative_to(self.root, dir))));
            let resource = Resource::new(page_id(&rel), file_name(dir)).with_parent(parent.cloned());
            let id = self.builder.add(resource);
            self.directory(dir, Some(&id))?;
        }
        Ok(())
    }

    fn page(
        &mut self,
        path: &Path,
        paired: Option<&Path>,
        parent: Option<&ResourceId>,
    ) -> Result<ResourceId, FormatError> {
        let rel = relative_to(self.root, path);
        let id = page_id(&rel);
        tracing::debug!(page = %rel.display(), "reading lk-md page");
        let source = fs::read_to_string(path).at_path(path)?;

        let paired_rel = paired.map(|dir| relative_to(self.root, dir));
        let internal_link = |href: &str| -> Option<String> {
            if is_external(href) {
                return None;
            }
            let target = resolve_relative(&rel, href)?;
            let is_page = target
                .extension()
                .is_some_and(|e| e.eq_ignore_ascii_case("md"));
            is_page.then(|| page_id(&target))
        };
        let asset = |src: &str| -> Option<String> {
            if is_external(src) {
                return None;
            }
            let target = resolve_relative(&rel, src)?;
            (target.parent() == paired_rel.as_deref()).then(|| file_name(&target))
        };
        let ctx = ParseContext {
            subject: &id,
            internal_link: &internal_link,
            asset: &asset,
        };
        let (parsed, warnings) = parse_markdown(&source, &ctx).into_parts();
        self.diagnostics.extend(warnings);

        let frontmatter = match parsed.frontmatter.as_deref().map(Frontmatter::parse) {
            Some(Ok(frontmatter)) => frontmatter,
            Some(Err(err)) => {
                self.diagnostics.warn(
                    WarningKind::MissingOptional,
                    slash_path(&rel),
                    format!("frontmatter ignored: {err}"),
                );
                Frontmatter::default()
            }
            None => Frontmatter::default(),
        };

        let name = frontmatter.title.clone().unwrap_or_else(|| file_stem(path));
        let mut resource = Resource::new(id, name)
            .with_parent(parent.cloned())
            .with_content(parsed.document);
        resource.tags = frontmatter.tags.items().into_iter().collect();
        resource.aliases = frontmatter.aliases.items().into_iter().collect();
        resource.icon = frontmatter.icon.clone().filter(|icon| !icon.is_empty());
        resource.properties = frontmatter.property_strings();
        resource.appearance = frontmatter.appearance();
        if let Some(dir) = paired {
            resource.attachments = list_dir(dir)?
                .assets
                .into_iter()
                .map(|asset| Asset::new(file_name(&asset), Some(asset)))
                .collect();
        }

        let id = self.builder.add(resource);
        if let Some(dir) = &paired_rel {
            let order: Vec<ResourceId> = frontmatter
                .children
                .iter()
                .map(|child| page_id(&dir.join(child)))
                .collect();
            if !order.is_empty() {
                self.builder.order_children(&id, order);
            }
        }
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::nodes::{internal_link_targets, Block, Inline};

    fn write(root: &Path, rel: &str, text: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, text).unwrap();
    }

    #[test]
    fn ids_follow_paths_and_links_resolve() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "Realms.md", "See [Kaleah](Realms/Kaleah.md).\n");
        write(root, "Realms/Kaleah.md", "---\ntags: [people]\n---\n\nQueen of [Realms](../Realms.md).\n");

        let outcome = parse_folder(root).unwrap();
        assert!(outcome.warnings.is_empty());
        let data = outcome.value;
        let realms = page_id(Path::new("Realms.md"));
        let kaleah = page_id(Path::new("Realms/Kaleah.md"));
        assert_eq!(data.roots, vec![realms.clone()]);
        assert_eq!(data.get(&realms).unwrap().children, vec![kaleah.clone()]);
        assert_eq!(
            internal_link_targets(&data.get(&realms).unwrap().content.blocks),
            vec![kaleah.as_str()]
        );
        assert!(data.get(&kaleah).unwrap().tags.contains("people"));
    }

    #[test]
    fn frontmatter_orders_children_and_names_pages() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "Realms.md", "---\ntitle: 'Realms: Known'\nchildren:\n  - Zephyr.md\n  - Aster.md\n---\n");
        write(root, "Realms/Aster.md", "Aster\n");
        write(root, "Realms/Zephyr.md", "Zephyr\n");

        let data = parse_folder(root).unwrap().value;
        let realms = data.get(&page_id(Path::new("Realms.md"))).unwrap();
        assert_eq!(realms.name, "Realms: Known");
        let names: Vec<_> = data.children_of(&realms.id).map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Zephyr", "Aster"]);
        assert!(realms.content.is_empty());
    }

    #[test]
    fn broken_frontmatter_is_skipped_with_a_warning() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "Page.md", "---\ntags: [unclosed\n---\nBody\n");
        let outcome = parse_folder(dir.path()).unwrap();
        assert_eq!(outcome.warnings[0].kind, WarningKind::MissingOptional);
        let page = outcome.value.get(&page_id(Path::new("Page.md"))).unwrap().clone();
        assert_eq!(page.content.blocks, vec![Block::paragraph(vec![Inline::plain("Body")])]);
    }
}
