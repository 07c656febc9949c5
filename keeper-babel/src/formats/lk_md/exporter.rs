//! Writing the canonical model as a folder-markdown tree

use super::frontmatter::{Frontmatter, ListField};
use crate::common::csv_tables::write_table;
use crate::common::links::{encode_path, LinkResolver};
use crate::common::manifest::Manifest;
use crate::common::names::sanitize_name;
use crate::common::tree_walk::{copy_asset, create_dir, write_file};
use crate::diagnostics::{Diagnostics, Outcome, WarningKind};
use crate::error::FormatError;
use crate::formats::markdown::{render_blocks, Dialect, RenderContext};
use crate::model::{ConversionData, Resource, ResourceId};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// Page file of every resource, relative to the export root.
fn plan(data: &ConversionData, diagnostics: &mut Diagnostics) -> HashMap<ResourceId, PathBuf> {
    let mut pages = HashMap::new();
    let mut groups: Vec<(PathBuf, &[ResourceId])> = vec![(PathBuf::new(), data.roots.as_slice())];
    while let Some((dir, siblings)) = groups.pop() {
        let mut taken = HashSet::new();
        for id in siblings {
            let Some(resource) = data.get(id) else {
                continue;
            };
            let base = sanitize_name(&resource.name);
            let mut stem = base.clone();
            let mut n = 2;
            while !taken.insert(stem.to_lowercase()) {
                stem = format!("{base} ({n})");
                n += 1;
            }
            if stem != base {
                diagnostics.warn(
                    WarningKind::NameCollision,
                    &resource.id,
                    format!("'{base}' is taken by a sibling, written as '{stem}'"),
                );
            }
            let page = dir.join(format!("{stem}.md"));
            groups.push((dir.join(&stem), resource.children.as_slice()));
            pages.insert(resource.id.clone(), page);
        }
    }
    pages
}

/// Write `data` into `dest`. Returns `dest`, the root of the tree.
pub fn export_folder(data: &ConversionData, dest: &Path) -> Result<Outcome<PathBuf>, FormatError> {
    create_dir(dest)?;
    let mut diagnostics = Diagnostics::new();
    let pages = plan(data, &mut diagnostics);
    let mut resolver = LinkResolver::new();
    for (id, path) in &pages {
        resolver.insert(id.clone(), path.clone());
    }

    for (_, resource) in data.walk() {
        let Some(rel) = pages.get(&resource.id) else {
            continue;
        };
        write_page(data, resource, dest, rel, &pages, &resolver, &mut diagnostics)?;
    }

    let mut table_names = HashSet::new();
    for table in &data.databases {
        let base = sanitize_name(&table.name);
        if !table_names.insert(base.clone()) {
            diagnostics.warn(
                WarningKind::NameCollision,
                &table.name,
                "another table already wrote this file, skipped",
            );
            continue;
        }
        write_table(&dest.join(format!("{base}.csv")), table)?;
    }
    let manifest = Manifest::for_data(data, |id| {
        pages
            .get(id)
            .and_then(|page| page.file_name())
            .map(|name| name.to_string_lossy().into_owned())
    });
    manifest.write(dest)?;
    tracing::debug!(pages = pages.len(), "wrote lk-md export");
    Ok(diagnostics.finish(dest.to_path_buf()))
}

fn write_page(
    data: &ConversionData,
    resource: &Resource,
    dest: &Path,
    rel: &Path,
    pages: &HashMap<ResourceId, PathBuf>,
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

    let file_stem = dir_name.as_str();
    let mut frontmatter = Frontmatter {
        title: (file_stem != resource.name).then(|| resource.name.clone()),
        tags: ListField::List(resource.tags.iter().cloned().collect()),
        aliases: ListField::List(resource.aliases.iter().cloned().collect()),
        icon: resource.icon.clone(),
        properties: resource
            .properties
            .iter()
            .map(|(k, v)| (k.clone(), serde_yaml::Value::String(v.clone())))
            .collect(),
        children: data
            .children_of(&resource.id)
            .filter_map(|child| pages.get(&child.id))
            .filter_map(|page| page.file_name())
            .map(|name| name.to_string_lossy().into_owned())
            .collect(),
        ..Frontmatter::default()
    };
    frontmatter.set_appearance(&resource.appearance);

    let link_href = |id: &str| resolver.href(rel, id);
    let asset_href = |name: &str| encode_path(&Path::new(&dir_name).join(name));
    let ctx = RenderContext {
        dialect: Dialect::LkMarkdown,
        link_href: &link_href,
        asset_href: &asset_href,
    };
    let rendered = render_blocks(&resource.content.blocks, &ctx);
    for (target, link_text) in rendered.unresolved {
        diagnostics.warn(
            WarningKind::UnresolvedLink,
            &resource.id,
            format!("link '{link_text}' to missing page '{target}' written as text"),
        );
    }

    let mut text = String::new();
    // A body opening with a thematic break would read as frontmatter.
    if !frontmatter.is_empty() || rendered.text.starts_with("---") {
        let yaml = frontmatter
            .to_yaml()
            .map_err(|e| FormatError::SerializationError(e.to_string()))?;
        text.push_str("---\n");
        text.push_str(&yaml);
        text.push_str("---\n");
        if !rendered.text.is_empty() {
            text.push('\n');
        }
    }
    text.push_str(&rendered.text);
    write_file(&dest.join(rel), &text)
}
