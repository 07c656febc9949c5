use crate::common::{doc, lk_json, notion_realms, REALMS_ID};
use keeper_babel::diagnostics::WarningKind;
use keeper_babel::FormatRegistry;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::fs;

fn read_json(path: &std::path::Path) -> Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

#[test]
fn export_defaults_to_flat_schema_with_assets() {
    let dir = tempfile::tempdir().unwrap();
    let source = notion_realms(&dir.path().join("source"));
    let registry = FormatRegistry::default();
    let data = registry.parse(&source, "notion").unwrap().value;

    let out = dir.path().join("out");
    let written = registry.export(&data, &out, "lk-json").unwrap();
    assert_eq!(written.value, out.join("Realms.json"));

    let export = read_json(&written.value);
    assert_eq!(export["version"], 1);
    assert_eq!(export["resourceCount"], 3);
    let resources = export["resources"].as_array().unwrap();
    assert_eq!(resources[0]["id"], REALMS_ID);
    assert_eq!(resources[1]["parentId"], REALMS_ID);
    assert_eq!(resources[0]["attachments"][0]["path"], format!("assets/{REALMS_ID}/map.png"));
    assert!(out.join("assets").join(REALMS_ID).join("map.png").is_file());
    assert_eq!(export["databases"][0]["name"], "Regions");
}

#[test]
fn schema_version_two_nests_children() {
    let dir = tempfile::tempdir().unwrap();
    let source = notion_realms(&dir.path().join("source"));
    let registry = FormatRegistry::default();
    let data = registry.parse(&source, "notion").unwrap().value;

    let options = HashMap::from([("schema-version".to_string(), "2".to_string())]);
    let out = dir.path().join("out");
    let written = registry
        .export_with_options(&data, &out, "lk-json", &options)
        .unwrap();
    let export = read_json(&written.value);
    assert_eq!(export["version"], 2);
    let resources = export["resources"].as_array().unwrap();
    assert_eq!(resources.len(), 1);
    let children = resources[0]["children"].as_array().unwrap();
    assert_eq!(children.len(), 2);
    assert_eq!(children[0]["name"], "Kaleah");

    let back = registry.parse(&written.value, "lk-json").unwrap().value;
    assert_eq!(back.get(REALMS_ID).unwrap().children, data.get(REALMS_ID).unwrap().children);
}

#[test]
fn invalid_option_values_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let registry = FormatRegistry::default();
    let options = HashMap::from([("schema-version".to_string(), "7".to_string())]);
    let result = registry.export_with_options(
        &Default::default(),
        dir.path(),
        "lk-json",
        &options,
    );
    assert!(matches!(
        result,
        Err(keeper_babel::FormatError::SerializationError(_))
    ));
}

#[test]
fn several_documents_are_flattened_with_a_warning() {
    let dir = tempfile::tempdir().unwrap();
    let mut documents = doc(json!([
        {"type": "paragraph", "content": [{"type": "text", "text": "Overview"}]}
    ]));
    documents.as_array_mut().unwrap().push(json!({
        "id": "history",
        "name": "History",
        "type": "page",
        "content": {"type": "doc", "content": [
            {"type": "paragraph", "content": [{"type": "text", "text": "Founded long ago"}]}
        ]}
    }));
    let source = lk_json(
        dir.path(),
        json!({"version": 1, "resources": [{"id": "r", "name": "Realms", "documents": documents}]}),
    );

    let outcome = FormatRegistry::default().parse(&source, "lk-json").unwrap();
    let kinds: Vec<_> = outcome.warnings.iter().map(|w| w.kind).collect();
    assert_eq!(kinds, [WarningKind::FlattenedDocuments]);
    let realms = outcome.value.get("r").unwrap();
    let types: Vec<_> = realms.content.blocks.iter().map(|b| b.type_name()).collect();
    assert_eq!(types, ["paragraph", "heading", "paragraph"]);
}
