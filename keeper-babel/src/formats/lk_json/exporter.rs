//! Writing the canonical model as one structured JSON export

use super::nodes::NodeWriter;
use super::parser::SUPPORTED_VERSIONS;
use crate::common::manifest::envelope;
use crate::common::names::sanitize_name;
use crate::common::tree_walk::{copy_asset, create_dir, is_plain_file_name, write_file};
use crate::diagnostics::{Diagnostics, Outcome, WarningKind};
use crate::error::FormatError;
use crate::model::{ConversionData, DatabaseTable, Resource};
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Export settings, read from string options as passed on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportOptions {
    /// 1 writes a flat resource list, 2 nests children under their parent
    pub schema_version: u64,
    pub pretty: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        ExportOptions {
            schema_version: 1,
            pretty: true,
        }
    }
}

impl ExportOptions {
    /// Recognized keys: `schema-version` (`1` or `2`) and `pretty` (`true` or
    /// `false`). Other keys are ignored.
    pub fn from_map(options: &HashMap<String, String>) -> Result<Self, FormatError> {
        let mut parsed = ExportOptions::default();
        if let Some(raw) = options.get("schema-version") {
            parsed.schema_version = raw
                .trim()
                .parse()
                .ok()
                .filter(|v| SUPPORTED_VERSIONS.contains(v))
                .ok_or_else(|| {
                    FormatError::SerializationError(format!(
                        "schema-version must be 1 or 2, got '{raw}'"
                    ))
                })?;
        }
        if let Some(raw) = options.get("pretty") {
            parsed.pretty = match raw.trim() {
                "true" | "1" | "yes" => true,
                "false" | "0" | "no" => false,
                other => {
                    return Err(FormatError::SerializationError(format!(
                        "pretty must be true or false, got '{other}'"
                    )))
                }
            };
        }
        Ok(parsed)
    }
}

/// Write `data` to `<dest>/<first root name>.json` and copy attachments to
/// `<dest>/assets/<id>/`. Returns the path of the JSON file.
pub fn export_document(
    data: &ConversionData,
    dest: &Path,
    options: ExportOptions,
) -> Result<Outcome<PathBuf>, FormatError> {
    create_dir(dest)?;
    let mut diagnostics = Diagnostics::new();

    let file_name = data
        .roots
        .first()
        .and_then(|id| data.get(id))
        .map(|root| sanitize_name(&root.name))
        .unwrap_or_else(|| "Export".to_string());
    let target = dest.join(format!("{file_name}.json"));

    let mut written = HashMap::new();
    for (_, resource) in data.walk() {
        let value = resource_value(data, resource, dest, &mut diagnostics)?;
        written.insert(resource.id.as_str(), value);
    }

    let resources: Vec<Value> = match options.schema_version {
        1 => data
            .walk()
            .into_iter()
            .filter_map(|(_, resource)| written.remove(resource.id.as_str()))
            .collect(),
        _ => data
            .roots
            .iter()
            .filter_map(|id| nest(data, id, &mut written))
            .collect(),
    };

    let mut root = Map::new();
    root.insert("version".into(), json!(options.schema_version));
    for (key, value) in envelope(data) {
        root.insert(key, json!(value));
    }
    root.insert("resourceCount".into(), json!(data.len()));
    root.insert("resources".into(), Value::Array(resources));
    if !data.databases.is_empty() {
        let tables = data.databases.iter().map(table_value).collect();
        root.insert("databases".into(), Value::Array(tables));
    }
    let root = Value::Object(root);

    let mut text = if options.pretty {
        serde_json::to_string_pretty(&root)
    } else {
        serde_json::to_string(&root)
    }
    .map_err(|e| FormatError::SerializationError(e.to_string()))?;
    text.push('\n');
    write_file(&target, &text)?;
    tracing::debug!(path = %target.display(), resources = data.len(), "wrote lk-json export");
    Ok(diagnostics.finish(target))
}

fn nest(data: &ConversionData, id: &str, written: &mut HashMap<&str, Value>) -> Option<Value> {
    let mut value = written.remove(id)?;
    let children: Vec<Value> = data
        .get(id)
        .map(|r| r.children.as_slice())
        .unwrap_or(&[])
        .iter()
        .filter_map(|child| nest(data, child, written))
        .collect();
    if let Some(object) = value.as_object_mut() {
        object.remove("parentId");
        if !children.is_empty() {
            object.insert("children".into(), Value::Array(children));
        }
    }
    Some(value)
}

fn resource_value(
    data: &ConversionData,
    resource: &Resource,
    dest: &Path,
    diagnostics: &mut Diagnostics,
) -> Result<Value, FormatError> {
    let asset_dir = format!("assets/{}", sanitize_name(&resource.id));

    let mut attachments = Vec::new();
    for asset in &resource.attachments {
        copy_asset(asset, &dest.join(&asset_dir), &resource.id, diagnostics)?;
        if is_plain_file_name(&asset.name) {
            let path = format!("{asset_dir}/{}", asset.name);
            attachments.push(json!({"name": asset.name, "path": path}));
        }
    }

    let link_id = |id: &str| data.get(id).map(|target| target.id.clone());
    let asset_src = |name: &str| format!("{asset_dir}/{name}");
    let mut writer = NodeWriter {
        link_id: &link_id,
        asset_src: &asset_src,
        unresolved: Vec::new(),
    };
    let nodes = writer.blocks(&resource.content.blocks);
    for (target, text) in writer.unresolved {
        diagnostics.warn(
            WarningKind::UnresolvedLink,
            &resource.id,
            format!("link '{text}' to missing page '{target}' written as text"),
        );
    }

    let position = resource
        .parent
        .as_deref()
        .and_then(|parent| data.get(parent))
        .map(|parent| parent.children.as_slice())
        .unwrap_or(data.roots.as_slice())
        .iter()
        .position(|sibling| *sibling == resource.id)
        .unwrap_or(0);

    let mut value = Map::new();
    value.insert("schemaVersion".into(), json!(1));
    value.insert("id".into(), json!(resource.id));
    value.insert("name".into(), json!(resource.name));
    if let Some(parent) = &resource.parent {
        value.insert("parentId".into(), json!(parent));
    }
    value.insert("pos".into(), json!(format!("{position:04}")));
    value.insert("aliases".into(), json!(resource.aliases));
    value.insert("tags".into(), json!(resource.tags));
    if let Some(icon) = &resource.icon {
        value.insert("iconGlyph".into(), json!(icon));
    }
    let appearance = &resource.appearance;
    if let Some(color) = &appearance.icon_color {
        value.insert("iconColor".into(), json!(color));
    }
    if let Some(shape) = &appearance.icon_shape {
        value.insert("iconShape".into(), json!(shape));
    }
    value.insert("isHidden".into(), json!(appearance.hidden));
    value.insert("isLocked".into(), json!(appearance.locked));
    if let Some(banner) = &appearance.banner {
        value.insert(
            "banner".into(),
            json!({"enabled": true, "url": banner.url, "yPosition": banner.y_position}),
        );
    }
    let properties: Vec<Value> = resource
        .properties
        .iter()
        .map(|(name, value)| json!({"name": name, "value": value}))
        .collect();
    value.insert("properties".into(), Value::Array(properties));
    value.insert(
        "documents".into(),
        json!([{
            "id": format!("{}-main", resource.id),
            "name": "Main",
            "type": "page",
            "content": {"type": "doc", "content": nodes},
        }]),
    );
    if !attachments.is_empty() {
        value.insert("attachments".into(), Value::Array(attachments));
    }
    Ok(Value::Object(value))
}

fn table_value(table: &DatabaseTable) -> Value {
    let rows: Vec<Value> = table
        .rows()
        .iter()
        .map(|row| {
            let cells: Map<String, Value> = table
                .columns()
                .iter()
                .filter_map(|column| {
                    row.values
                        .get(column)
                        .map(|cell| (column.clone(), Value::String(cell.clone())))
                })
                .collect();
            Value::Object(cells)
        })
        .collect();
    json!({
        "name": table.name,
        "primaryColumn": table.primary_column,
        "columns": table.columns(),
        "rows": rows,
    })
}
