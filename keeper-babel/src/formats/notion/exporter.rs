//! Writing the canonical model as a Notion-style markdown/CSV tree

use super::page::{self, ALIASES_KEY, ICON_KEY, TAGS_KEY};
use crate::common::csv_tables::write_table;
use crate::common::links::{encode_path, LinkResolver};
use crate::common::manifest::Manifest;
use crate::common::names::{derived_id, is_notion_id, sanitize_name};
use crate::common::tree_walk::{copy_asset, create_dir, write_file};
use crate::diagnostics::{Diagnostics, Outcome, WarningKind};
use crate::error::FormatError;
use crate::formats::markdown::{render_blocks, Dialect, RenderContext};
use crate::ir::nodes::{Block, Inline, Link, LinkTarget};
use crate::model::{ConversionData, Resource, ResourceId};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// The id a resource carries in file names. Ids Notion could not have
/// produced are replaced by a stable derived one.
pub fn file_id(id: &str) -> String {
    if is_notion_id(id) {
        id.to_string()
    } else {
        derived_id(id)
    }
}

/// Where each page goes, relative to the export root.
struct Layout {
    pages: HashMap<ResourceId, PathBuf>,
}

impl Layout {
    fn plan(data: &ConversionData) -> Self {
        let mut pages = HashMap::new();
        for (_, resource) in data.walk() {
            let dir = resource
                .parent
                .as_ref()
                .and_then(|parent| pages.get(parent))
                .map(|page: &PathBuf| page.with_extension(""))
                .unwrap_or_default();
            let stem = format!("{} {}", sanitize_name(&resource.name), file_id(&resource.id));
            pages.insert(resource.id.clone(), dir.join(format!("{stem}.md")));
        }
        Layout { pages }
    }

    fn page(&self, id: &str) -> Option<&Path> {
        self.pages.get(id).map(PathBuf::as_path)
    }
}

/// Write `data` into `dest`. Returns `dest`, the root of the tree.
pub fn export_tree(data: &ConversionData, dest: &Path) -> Result<Outcome<PathBuf>, FormatError> {
    create_dir(dest)?;
    let layout = Layout::plan(data);
    let mut resolver = LinkResolver::new();
    for (id, path) in &layout.pages {
        resolver.insert(id.clone(), path.clone());
    }

    let mut diagnostics = Diagnostics::new();
    for (_, resource) in data.walk() {
        let Some(rel) = layout.page(&resource.id) else {
            continue;
        };
        write_page(data, resource, dest, rel, &resolver, &mut diagnostics)?;
    }

    for table in &data.databases {
        let base = sanitize_name(&table.name);
        write_table(&dest.join(format!("{base}.csv")), table)?;
        write_table(&dest.join(format!("{base}_all.csv")), table)?;
    }
    let manifest = Manifest::for_data(data, |id| {
        layout
            .page(id)
            .and_then(Path::file_name)
            .map(|name| name.to_string_lossy().into_owned())
    });
    manifest.write(dest)?;
    tracing::debug!(pages = layout.pages.len(), tables = data.databases.len(), "wrote notion export");
    Ok(diagnostics.finish(dest.to_path_buf()))
}

fn write_page(
    data: &ConversionData,
    resource: &Resource,
    dest: &Path,
    rel: &Path,
    resolver: &LinkResolver,
    diagnostics: &mut Diagnostics,
) -> Result<(), FormatError> {
    let dir_rel = rel.with_extension("");
    let dir_name = dir_rel
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    if !resource.children.is_empty() || !resource.attachments.is_empty() {
        create_dir(&dest.join(&dir_rel))?;
    }
    for asset in &resource.attachments {
        copy_asset(asset, &dest.join(&dir_rel), &resource.id, diagnostics)?;
    }

    if !resource.appearance.is_default() {
        diagnostics.warn(
            WarningKind::MissingOptional,
            &resource.id,
            "icon color, icon shape, visibility, lock and banner are not written",
        );
    }

    let mut text = page::render_title(&resource.name);
    let properties = property_lines(resource, diagnostics);
    if !properties.is_empty() {
        text.push('\n');
        text.push_str(&page::render_properties(&properties));
    }

    let mut blocks = resource.content.blocks.clone();
    blocks.extend(data.children_of(&resource.id).map(|child| {
        Block::paragraph(vec![Inline::Link(Link {
            text: child.name.clone(),
            target: LinkTarget::Internal(child.id.clone()),
        })])
    }));
    let link_href = |id: &str| resolver.href(rel, id);
    let asset_href = |name: &str| encode_path(&Path::new(&dir_name).join(name));
    let ctx = RenderContext {
        dialect: Dialect::Notion,
        link_href: &link_href,
        asset_href: &asset_href,
    };
    let rendered = render_blocks(&blocks, &ctx);
    for (target, link_text) in rendered.unresolved {
        diagnostics.warn(
            WarningKind::UnresolvedLink,
            &resource.id,
            format!("link '{link_text}' to missing page '{target}' written as text"),
        );
    }
    if !rendered.text.is_empty() {
        text.push('\n');
        if properties.is_empty() {
            text.push_str(&page::guard_body(&rendered.text));
        } else {
            text.push_str(&rendered.text);
        }
    }

    let path = dest.join(rel);
    tracing::debug!(page = %rel.display(), "writing notion page");
    write_file(&path, &text)
}

/// Property lines in write order: reserved keys first, then properties by key.
fn property_lines(resource: &Resource, diagnostics: &mut Diagnostics) -> Vec<(String, String)> {
    let mut lines = Vec::new();
    if !resource.tags.is_empty() {
        lines.push((TAGS_KEY.to_string(), join_list(resource.tags.iter())));
    }
    if !resource.aliases.is_empty() {
        lines.push((ALIASES_KEY.to_string(), join_list(resource.aliases.iter())));
    }
    if let Some(icon) = &resource.icon {
        lines.push((ICON_KEY.to_string(), icon.clone()));
    }
    for (key, value) in &resource.properties {
        let reserved = [TAGS_KEY, ALIASES_KEY, ICON_KEY].contains(&key.as_str());
        if reserved || !page::is_writable_key(key) {
            diagnostics.warn(
                WarningKind::MissingOptional,
                &resource.id,
                format!("property '{key}' cannot be written as a property line"),
            );
            continue;
        }
        lines.push((key.clone(), value.clone()));
    }
    lines
}

fn join_list<'a>(items: impl Iterator<Item = &'a String>) -> String {
    items.map(String::as_str).collect::<Vec<_>>().join(", ")
}
