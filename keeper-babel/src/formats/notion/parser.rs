//! Reading a Notion-style markdown/CSV tree
//!
//! Parsing runs in two passes. The walk discovers every page, its id and its
//! place in the tree; only then are page bodies parsed, so that links can be
//! resolved against the complete path index.

use super::page::{self, ALIASES_KEY, ICON_KEY, TAGS_KEY};
use super::FORMAT_NAME;
use crate::common::csv_tables::{merge_tables, read_csv};
use crate::common::links::{is_external, notion_url_id, resolve_relative};
use crate::common::manifest::Manifest;
use crate::common::names::{derived_id, is_notion_id, split_notion_stem};
use crate::common::tree_walk::{file_name, file_stem, list_dir, relative_to, slash_path};
use crate::diagnostics::{Diagnostics, Outcome, WarningKind};
use crate::error::{FormatError, IoResultExt};
use crate::formats::markdown::{parse_markdown, ParseContext};
use crate::ir::nodes::{internal_link_targets, Document};
use crate::model::{Asset, ConversionData, Resource, ResourceId, WorkspaceBuilder};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

/// A page found by the walk, before its body is read.
struct Discovered {
    id: ResourceId,
    name: String,
    parent: Option<ResourceId>,
    /// Page file relative to the root, `None` for a directory without one
    page: Option<PathBuf>,
    /// Paired directory relative to the root
    dir: Option<PathBuf>,
    assets: Vec<PathBuf>,
    children: Vec<ResourceId>,
}

struct Walk {
    root: PathBuf,
    pages: Vec<Discovered>,
    /// (name, `Name.csv`, `Name_all.csv`)
    tables: BTreeMap<String, (Option<PathBuf>, Option<PathBuf>)>,
    diagnostics: Diagnostics,
}

pub fn parse_tree(root: &Path) -> Result<Outcome<ConversionData>, FormatError> {
    if !root.is_dir() {
        return Err(FormatError::ParseError(format!(
            "'{}' is not a directory",
            root.display()
        )));
    }
    let mut walk = Walk {
        root: root.to_path_buf(),
        pages: Vec::new(),
        tables: BTreeMap::new(),
        diagnostics: Diagnostics::new(),
    };
    walk.directory(root, None)?;
    tracing::debug!(pages = walk.pages.len(), root = %root.display(), "discovered notion pages");

    let index: HashMap<PathBuf, ResourceId> = walk
        .pages
        .iter()
        .filter_map(|p| p.page.clone().map(|path| (path, p.id.clone())))
        .collect();

    let mut builder = WorkspaceBuilder::new();
    let mut diagnostics = walk.diagnostics;
    for discovered in &walk.pages {
        let (resource, order) = read_page(root, discovered, &index, &mut diagnostics)?;
        let id = builder.add(resource);
        if !order.is_empty() {
            builder.order_children(&id, order);
        }
    }

    let manifest = Manifest::read(root, &mut diagnostics)?;
    let root_entry = |name: &str| -> Option<ResourceId> {
        let entry = Path::new(name);
        walk.pages
            .iter()
            .filter(|p| p.parent.is_none())
            .find(|p| p.page.as_deref().or(p.dir.as_deref()) == Some(entry))
            .map(|p| p.id.clone())
    };
    builder.order_roots(manifest.root_order(root_entry));
    for (key, value) in manifest.envelope {
        builder.set_metadata(key, value);
    }

    for (name, (plain, all)) in walk.tables {
        let plain = plain.map(|p| read_csv(&p)).transpose()?;
        let all = all.map(|p| read_csv(&p)).transpose()?;
        builder.add_table(merge_tables(&name, plain.as_ref(), all.as_ref()));
    }

    builder.set_metadata("format", FORMAT_NAME);
    builder.set_metadata("source", root.display().to_string());

    let mut outcome = builder.build();
    let mut warnings = diagnostics.into_warnings();
    warnings.append(&mut outcome.warnings);
    outcome.warnings = warnings;
    Ok(outcome)
}

impl Walk {
    fn directory(&mut self, dir: &Path, parent: Option<usize>) -> Result<(), FormatError> {
        let listing = list_dir(dir)?;

        for table in &listing.tables {
            let stem = file_stem(table);
            let (base, is_all) = match stem.strip_suffix("_all") {
                Some(base) => (base, true),
                None => (stem.as_str(), false),
            };
            let name = split_notion_stem(base).map_or(base, |(name, _)| name).to_string();
            let slot = self.tables.entry(name).or_default();
            if is_all {
                slot.1 = Some(table.clone());
            } else {
                slot.0 = Some(table.clone());
            }
        }

        for page in &listing.pages {
            let rel = relative_to(&self.root, page);
            let stem = file_stem(page);
            let (name, id) = self.identify(&stem, &rel);
            let paired = listing.paired_dir(page).cloned();
            let assets = match &paired {
                Some(dir) => list_dir(dir)?
                    .assets
                    .iter()
                    .map(|asset| relative_to(&self.root, asset))
                    .collect(),
                None => Vec::new(),
            };
            let index = self.push(Discovered {
                id,
                name,
                parent: None,
                page: Some(rel),
                dir: paired.as_deref().map(|d| relative_to(&self.root, d)),
                assets,
                children: Vec::new(),
            }, parent);
            if let Some(paired) = paired {
                self.directory(&paired, Some(index))?;
            }
        }

        for dir in listing.unpaired_dirs() {
            let rel = relative_to(&self.root, dir);
            let stem = file_name(dir);
            let (name, id) = self.identify(&stem, &rel);
            let index = self.push(Discovered {
                id,
                name,
                parent: None,
                page: None,
                dir: Some(rel),
                assets: Vec::new(),
                children: Vec::new(),
            }, parent);
            self.directory(dir, Some(index))?;
        }
        Ok(())
    }

    fn push(&mut self, mut discovered: Discovered, parent: Option<usize>) -> usize {
        if let Some(parent) = parent {
            discovered.parent = Some(self.pages[parent].id.clone());
            self.pages[parent].children.push(discovered.id.clone());
        }
        self.pages.push(discovered);
        self.pages.len() - 1
    }

    fn identify(&mut self, stem: &str, rel: &Path) -> (String, ResourceId) {
        if let Some((name, id)) = split_notion_stem(stem) {
            return (name.to_string(), id.to_string());
        }
        if is_notion_id(stem) {
            return (stem.to_string(), stem.to_string());
        }
        let id = derived_id(&format!("{stem}{}", slash_path(rel)));
        self.diagnostics.warn(
            WarningKind::FallbackIdentifier,
            slash_path(rel),
            format!("no page id in file name, using '{id}'"),
        );
        (stem.to_string(), id)
    }
}

fn read_page(
    root: &Path,
    discovered: &Discovered,
    index: &HashMap<PathBuf, ResourceId>,
    diagnostics: &mut Diagnostics,
) -> Result<(Resource, Vec<ResourceId>), FormatError> {
    let mut resource = Resource::new(&discovered.id, &discovered.name)
        .with_parent(discovered.parent.clone());
    resource.attachments = discovered
        .assets
        .iter()
        .map(|rel| Asset::new(file_name(rel), Some(root.join(rel))))
        .collect();

    let Some(page_rel) = &discovered.page else {
        return Ok((resource, Vec::new()));
    };
    let path = root.join(page_rel);
    tracing::debug!(page = %page_rel.display(), "reading notion page");
    let source = fs::read_to_string(&path).at_path(&path)?;
    let split = page::split_page(&source);
    if let Some(title) = split.title {
        resource.name = title;
    }
    for (key, value) in split.properties {
        match key.as_str() {
            TAGS_KEY => resource.tags.extend(page::split_list(&value)),
            ALIASES_KEY => resource.aliases.extend(page::split_list(&value)),
            ICON_KEY => resource.icon = Some(value).filter(|v| !v.is_empty()),
            _ => {
                resource.properties.insert(key, value);
            }
        }
    }

    let internal_link = |href: &str| -> Option<String> {
        if let Some(id) = notion_url_id(href) {
            return Some(id);
        }
        if is_external(href) {
            return None;
        }
        let target = resolve_relative(page_rel, href)?;
        if let Some(id) = index.get(&target) {
            return Some(id.clone());
        }
        if !target.extension().is_some_and(|e| e == "md") {
            return None;
        }
        // A page link nothing answers to keeps an id, so the export reports
        // it as unresolved instead of carrying a dead relative path.
        let stem = file_stem(&target);
        let id = match split_notion_stem(&stem) {
            Some((_, id)) => id.to_string(),
            None => derived_id(&slash_path(&target)),
        };
        Some(id)
    };
    let asset = |src: &str| -> Option<String> {
        if is_external(src) {
            return None;
        }
        let target = resolve_relative(page_rel, src)?;
        let dir = discovered.dir.as_deref()?;
        (target.parent() == Some(dir)).then(|| file_name(&target))
    };
    let ctx = ParseContext {
        subject: &discovered.id,
        internal_link: &internal_link,
        asset: &asset,
    };
    let (parsed, warnings) = parse_markdown(split.body, &ctx).into_parts();
    diagnostics.extend(warnings);

    let mut blocks = parsed.document.blocks;
    let is_child = |id: &str| discovered.children.iter().any(|c| c == id);
    let mut order = page::take_child_index(&mut blocks, is_child);
    if order.is_empty() {
        for target in internal_link_targets(&blocks) {
            if is_child(target) && !order.iter().any(|known| known == target) {
                order.push(target.to_string());
            }
        }
    }
    resource.content = Document::new(blocks);
    Ok((resource, order))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::nodes::{Block, Inline};

    const REALMS: &str = "0123456789abcdef0123456789abcdef";
    const KALEAH: &str = "fedcba9876543210fedcba9876543210";
    const ASTER: &str = "00000000000000000000000000000001";

    fn write(root: &Path, rel: &str, text: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, text).unwrap();
    }

    #[test]
    fn reads_pages_properties_and_children() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(
            root,
            &format!("Realms {REALMS}.md"),
            &format!(
                "# Realms\n\nTags: world\nEra: Second\n\nThe known lands.\n\n[Kaleah](Realms%20{REALMS}/Kaleah%20{KALEAH}.md)\n\n[Aster](Realms%20{REALMS}/Aster%20{ASTER}.md)\n"
            ),
        );
        write(root, &format!("Realms {REALMS}/Aster {ASTER}.md"), "# Aster\n");
        write(root, &format!("Realms {REALMS}/Kaleah {KALEAH}.md"), "# Kaleah\n\n![map](map.png)\n");
        write(root, &format!("Realms {REALMS}/map.png"), "png");

        let outcome = parse_tree(root).unwrap();
        assert!(outcome.warnings.is_empty(), "{:?}", outcome.warnings);
        let data = outcome.value;
        let realms = data.get(REALMS).unwrap();
        assert_eq!(realms.children, vec![KALEAH, ASTER]);
        assert_eq!(realms.properties.get("Era").map(String::as_str), Some("Second"));
        assert!(realms.tags.contains("world"));
        assert_eq!(
            realms.content.blocks,
            vec![Block::paragraph(vec![Inline::plain("The known lands.")])]
        );
        assert_eq!(realms.attachments[0].name, "map.png");
    }

    #[test]
    fn content_links_order_children_without_an_index() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(
            root,
            &format!("Realms {REALMS}.md"),
            &format!("# Realms\n\nFirst [Kaleah](Realms%20{REALMS}/Kaleah%20{KALEAH}.md), then the rest.\n"),
        );
        write(root, &format!("Realms {REALMS}/Aster {ASTER}.md"), "# Aster\n");
        write(root, &format!("Realms {REALMS}/Kaleah {KALEAH}.md"), "# Kaleah\n");

        let data = parse_tree(root).unwrap().value;
        assert_eq!(data.get(REALMS).unwrap().children, vec![KALEAH, ASTER]);
        assert_eq!(data.get(REALMS).unwrap().content.blocks.len(), 1);
    }

    #[test]
    fn missing_ids_fall_back_with_a_warning() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "Loose Notes.md", "# Loose Notes\n");
        write(dir.path(), "Archive/Old.md", "# Old\n");

        let outcome = parse_tree(dir.path()).unwrap();
        let fallbacks = outcome
            .warnings
            .iter()
            .filter(|w| w.kind == WarningKind::FallbackIdentifier)
            .count();
        assert_eq!(fallbacks, 3);
        let data = outcome.value;
        assert_eq!(data.len(), 3);
        let archive = data
            .walk()
            .into_iter()
            .find(|(_, r)| r.name == "Archive")
            .map(|(_, r)| r.clone())
            .unwrap();
        assert_eq!(archive.children.len(), 1);
        assert!(archive.content.is_empty());
    }

    #[test]
    fn csv_pairs_merge_into_one_table() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "Climate.csv", "Name,Temperature\nTundra,Cold\n");
        write(dir.path(), "Climate_all.csv", "Name,Temperature,Rainfall\nTundra,Cold,Low\nDesert,Hot,\n");

        let data = parse_tree(dir.path()).unwrap().value;
        assert_eq!(data.databases.len(), 1);
        let table = data.database("Climate").unwrap();
        assert_eq!(table.columns(), ["Name", "Temperature", "Rainfall"]);
        assert_eq!(table.rows().len(), 2);
    }
}
