use crate::common::{notion_realms, ASTER_ID, KALEAH_ID, REALMS_ID};
use keeper_babel::ir::nodes::{Block, ImageSource};
use keeper_babel::FormatRegistry;
use std::fs;

#[test]
fn realms_export_is_detected_and_read() {
    let dir = tempfile::tempdir().unwrap();
    let source = notion_realms(dir.path());
    let registry = FormatRegistry::default();
    assert_eq!(registry.detect_format_from_path(&source).as_deref(), Some("notion"));

    let outcome = registry.parse(&source, "notion").unwrap();
    assert!(outcome.warnings.is_empty(), "{:?}", outcome.warnings);
    let data = outcome.value;
    assert_eq!(data.roots, [REALMS_ID]);

    let realms = data.get(REALMS_ID).unwrap();
    assert_eq!(realms.children, [KALEAH_ID, ASTER_ID]);
    assert_eq!(realms.tags.iter().collect::<Vec<_>>(), ["legend", "world"]);
    assert_eq!(realms.properties.get("Era").map(String::as_str), Some("Second Age"));
    assert_eq!(realms.attachments.len(), 1);
    assert_eq!(realms.attachments[0].name, "map.png");

    let kinds: Vec<_> = realms.content.blocks.iter().map(Block::type_name).collect();
    assert_eq!(kinds, ["callout", "paragraph", "list", "image"]);
    let Some(Block::Image(image)) = realms.content.blocks.last() else {
        panic!("expected the map image last");
    };
    assert_eq!(image.source, ImageSource::Asset("map.png".into()));
}

#[test]
fn export_writes_ids_index_and_both_csv_files() {
    let dir = tempfile::tempdir().unwrap();
    let source = notion_realms(&dir.path().join("source"));
    let registry = FormatRegistry::default();
    let data = registry.parse(&source, "notion").unwrap().value;

    let out = dir.path().join("out");
    let written = registry.export(&data, &out, "notion").unwrap();
    assert!(written.warnings.is_empty());
    assert_eq!(written.value, out);

    let realms = fs::read_to_string(out.join(format!("Realms {REALMS_ID}.md"))).unwrap();
    assert!(realms.starts_with("# Realms\n\nTags: legend, world\nEra: Second Age\n\n<aside>\n"));
    assert!(realms.ends_with(&format!(
        "[Kaleah](Realms%20{REALMS_ID}/Kaleah%20{KALEAH_ID}.md)\n\n[Aster](Realms%20{REALMS_ID}/Aster%20{ASTER_ID}.md)\n"
    )));
    assert!(out.join(format!("Realms {REALMS_ID}")).join("map.png").is_file());

    let plain = fs::read_to_string(out.join("Regions.csv")).unwrap();
    let all = fs::read_to_string(out.join("Regions_all.csv")).unwrap();
    assert_eq!(plain, all);
    assert!(plain.starts_with("Name,Region,Climate\n"));
}
