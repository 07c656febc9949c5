//! Reading a structured JSON export into the canonical model
//!
//! Version 1 lists every resource in one flat array, each naming its parent
//! through `parentId`. Version 2 nests `children` under their parent, either
//! as full objects or as ids of resources listed elsewhere in the file.
//! Sibling order comes from `pos` when present, document order otherwise.

use super::nodes::NodeReader;
use super::FORMAT_NAME;
use crate::common::names::{derived_id, sanitize_name};
use crate::common::manifest::ENVELOPE_KEYS;
use crate::common::tree_walk::{contained_path, is_plain_file_name};
use crate::diagnostics::{Diagnostics, Outcome, WarningKind};
use crate::error::FormatError;
use crate::ir::nodes::{Block, Document, Inline, Raw};
use crate::ir::normalize::normalize_document;
use crate::model::{
    Appearance, Asset, Banner, ConversionData, DatabaseTable, Resource, WorkspaceBuilder,
};
use serde_json::Value;
use std::cmp::Ordering;
use std::path::Path;

/// Envelope versions this reader understands.
pub const SUPPORTED_VERSIONS: &[u64] = &[1, 2];

/// One resource object as found in the file, before linking.
struct Entry<'v> {
    value: &'v Value,
    parent: Option<String>,
}

/// Parse `source`, the text of the export file at `path`. Attachment paths
/// are resolved against the file's directory.
pub fn parse_document(source: &str, path: &Path) -> Result<Outcome<ConversionData>, FormatError> {
    let root: Value = serde_json::from_str(source)
        .map_err(|e| FormatError::ParseError(format!("{}: {e}", path.display())))?;
    let version = envelope_version(&root)?;
    let base = path.parent().unwrap_or_else(|| Path::new(""));

    let resources = root
        .get("resources")
        .and_then(Value::as_array)
        .ok_or_else(|| FormatError::ParseError("missing 'resources' array".to_string()))?;

    let mut diagnostics = Diagnostics::new();
    let mut entries = Vec::new();
    match version {
        1 => {
            for value in resources {
                let parent = value
                    .get("parentId")
                    .and_then(Value::as_str)
                    .filter(|p| !p.is_empty())
                    .map(str::to_string);
                entries.push(Entry { value, parent });
            }
        }
        _ => {
            let mut adopted = Vec::new();
            for value in resources {
                flatten_nested(value, None, &mut entries, &mut adopted);
            }
            // Children listed by id take their parent from the listing.
            for (parent, child) in adopted {
                if let Some(entry) = entries.iter_mut().find(|e| entry_id(e.value) == Some(child.as_str())) {
                    entry.parent = Some(parent);
                }
            }
        }
    }
    entries.sort_by(|a, b| compare_pos(a.value.get("pos"), b.value.get("pos")));
    tracing::debug!(version, resources = entries.len(), "parsing lk-json export");

    let mut builder = WorkspaceBuilder::new();
    for (index, entry) in entries.iter().enumerate() {
        let resource = read_resource(entry, index, base, &mut diagnostics);
        builder.add(resource);
    }

    for table in root
        .get("databases")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
    {
        match read_table(table) {
            Some(table) => builder.add_table(table),
            None => diagnostics.warn(
                WarningKind::MissingOptional,
                "databases",
                "database entry without a name skipped",
            ),
        }
    }

    for key in ENVELOPE_KEYS {
        if let Some(field) = root.get(*key).and_then(Value::as_str).filter(|v| !v.is_empty()) {
            builder.set_metadata(*key, field);
        }
    }
    builder.set_metadata("format", FORMAT_NAME);
    builder.set_metadata("schemaVersion", version.to_string());
    builder.set_metadata("source", path.display().to_string());

    let mut outcome = builder.build();
    let mut warnings = diagnostics.into_warnings();
    warnings.append(&mut outcome.warnings);
    outcome.warnings = warnings;
    Ok(outcome)
}

fn envelope_version(root: &Value) -> Result<u64, FormatError> {
    match root.get("version") {
        Some(Value::Number(n)) => match n.as_u64() {
            Some(v) if SUPPORTED_VERSIONS.contains(&v) => Ok(v),
            _ => Err(FormatError::UnsupportedVersion(n.to_string())),
        },
        Some(other) => Err(FormatError::UnsupportedVersion(other.to_string())),
        None => Err(FormatError::UnsupportedVersion("missing".to_string())),
    }
}

fn flatten_nested<'v>(
    value: &'v Value,
    parent: Option<String>,
    entries: &mut Vec<Entry<'v>>,
    adopted: &mut Vec<(String, String)>,
) {
    let id = entry_id(value).map(str::to_string);
    entries.push(Entry { value, parent });
    let Some(children) = value.get("children").and_then(Value::as_array) else {
        return;
    };
    let Some(id) = id else {
        return;
    };
    for child in children {
        match child {
            Value::String(child_id) => adopted.push((id.clone(), child_id.clone())),
            Value::Object(_) => flatten_nested(child, Some(id.clone()), entries, adopted),
            _ => {}
        }
    }
}

fn entry_id(value: &Value) -> Option<&str> {
    value.get("id").and_then(Value::as_str).filter(|id| !id.is_empty())
}

/// Numeric positions sort before textual ones, missing positions last.
fn compare_pos(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(pos: Option<&Value>) -> u8 {
        match pos {
            Some(Value::Number(_)) => 0,
            Some(Value::String(_)) => 1,
            _ => 2,
        }
    }
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let x = x.as_f64().unwrap_or(0.0);
            let y = y.as_f64().unwrap_or(0.0);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

/// Display fields. A banner counts only while it is enabled.
fn read_appearance(value: &Value) -> Appearance {
    let text = |key: &str| {
        value
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };
    let flag = |key: &str| value.get(key).and_then(Value::as_bool).unwrap_or(false);
    let banner = value
        .get("banner")
        .filter(|banner| banner.get("enabled").and_then(Value::as_bool).unwrap_or(false))
        .map(|banner| Banner {
            url: banner
                .get("url")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            y_position: banner
                .get("yPosition")
                .and_then(Value::as_f64)
                .unwrap_or(Banner::DEFAULT_Y_POSITION),
        });
    Appearance {
        icon_color: text("iconColor"),
        icon_shape: text("iconShape"),
        hidden: flag("isHidden"),
        locked: flag("isLocked"),
        banner,
    }
}

fn read_resource(entry: &Entry, index: usize, base: &Path, diagnostics: &mut Diagnostics) -> Resource {
    let value = entry.value;
    let name = match value.get("name").and_then(Value::as_str) {
        Some(name) => name.to_string(),
        None => {
            diagnostics.warn(
                WarningKind::MissingOptional,
                format!("resources[{index}]"),
                "resource without a name, using 'Untitled'",
            );
            "Untitled".to_string()
        }
    };
    let id = match entry_id(value) {
        Some(id) => id.to_string(),
        None => {
            let id = derived_id(&format!("{name}#{index}"));
            diagnostics.warn(
                WarningKind::FallbackIdentifier,
                &name,
                format!("resource without an id, using '{id}'"),
            );
            id
        }
    };

    let mut resource = Resource::new(id, name).with_parent(entry.parent.clone());
    resource.tags = strings(value.get("tags")).collect();
    resource.aliases = strings(value.get("aliases")).collect();
    resource.icon = value
        .get("iconGlyph")
        .and_then(Value::as_str)
        .filter(|icon| !icon.is_empty())
        .map(str::to_string);
    resource.appearance = read_appearance(value);

    for property in value
        .get("properties")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
    {
        let Some(key) = property.get("name").and_then(Value::as_str) else {
            diagnostics.warn(
                WarningKind::MissingOptional,
                &resource.id,
                "property without a name skipped",
            );
            continue;
        };
        let value = match property.get("value") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        };
        resource.properties.insert(key.to_string(), value);
    }

    // (path as written, asset)
    let mut attachment_paths = Vec::new();
    for attachment in value
        .get("attachments")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
    {
        let Some(name) = attachment.get("name").and_then(Value::as_str) else {
            continue;
        };
        if !is_plain_file_name(name) {
            diagnostics.warn(
                WarningKind::MissingAsset,
                &resource.id,
                format!("attachment name '{name}' is not a plain file name, skipped"),
            );
            continue;
        }
        let written = attachment.get("path").and_then(Value::as_str).unwrap_or(name);
        let origin = match contained_path(base, written) {
            Some(origin) if origin.is_file() => Some(origin),
            Some(_) => {
                diagnostics.warn(
                    WarningKind::MissingAsset,
                    &resource.id,
                    format!("attachment '{name}' not found at '{written}'"),
                );
                None
            }
            None => {
                diagnostics.warn(
                    WarningKind::MissingAsset,
                    &resource.id,
                    format!("attachment '{name}' points outside the export: '{written}'"),
                );
                None
            }
        };
        attachment_paths.push(written.to_string());
        resource.attachments.push(Asset::new(name, origin));
    }

    let asset_prefix = format!("assets/{}/", sanitize_name(&resource.id));
    let asset = |src: &str| -> Option<String> {
        let position = attachment_paths
            .iter()
            .zip(&resource.attachments)
            .find(|(path, asset)| path.as_str() == src || asset.name == src);
        match position {
            Some((_, asset)) => Some(asset.name.clone()),
            None => src.strip_prefix(&asset_prefix).map(str::to_string),
        }
    };

    let documents = value
        .get("documents")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[]);
    if documents.len() > 1 {
        diagnostics.warn(
            WarningKind::FlattenedDocuments,
            &resource.id,
            format!("{} documents merged into one body", documents.len()),
        );
    }
    let mut blocks = Vec::new();
    for (position, document) in documents.iter().enumerate() {
        if position > 0 {
            let title = document.get("name").and_then(Value::as_str).unwrap_or("Untitled");
            blocks.push(Block::heading(1, vec![Inline::plain(title)]));
        }
        match document.get("content") {
            Some(content) if content.get("type").and_then(Value::as_str) == Some("doc") => {
                let nodes = content
                    .get("content")
                    .and_then(Value::as_array)
                    .map(Vec::as_slice)
                    .unwrap_or(&[]);
                let mut reader = NodeReader {
                    subject: &resource.id,
                    asset: &asset,
                    diagnostics: &mut *diagnostics,
                };
                blocks.extend(reader.blocks(nodes));
            }
            _ => blocks.push(Block::Raw(Raw {
                format: super::nodes::RAW_FORMAT.to_string(),
                text: document.to_string(),
            })),
        }
    }
    let content = normalize_document(Document { blocks });
    resource.with_content(content)
}

fn strings(value: Option<&Value>) -> impl Iterator<Item = String> + '_ {
    value
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn read_table(value: &Value) -> Option<DatabaseTable> {
    let name = value.get("name").and_then(Value::as_str)?;
    let columns: Vec<String> = strings(value.get("columns")).collect();
    let primary = value
        .get("primaryColumn")
        .and_then(Value::as_str)
        .or_else(|| columns.first().map(String::as_str))
        .unwrap_or("Name")
        .to_string();
    let mut table = DatabaseTable::new(name, primary.clone());
    for column in &columns {
        table.add_column(column);
    }
    for row in value
        .get("rows")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
    {
        let Some(cells) = row.as_object() else {
            continue;
        };
        let row_name = cells.get(&primary).and_then(Value::as_str).unwrap_or("");
        let values = cells.iter().filter_map(|(column, cell)| match cell {
            Value::String(s) if !s.is_empty() => Some((column.as_str(), s.as_str())),
            _ => None,
        });
        table.push_row(row_name, values);
    }
    Some(table)
}
