use crate::common::{notion_realms, write};
use keeper_babel::diagnostics::WarningKind;
use keeper_babel::ir::nodes::Block;
use keeper_babel::FormatRegistry;
use std::fs;

#[test]
fn export_writes_frontmatter_and_dialect_markers() {
    let dir = tempfile::tempdir().unwrap();
    let source = notion_realms(&dir.path().join("source"));
    let registry = FormatRegistry::default();
    let data = registry.parse(&source, "notion").unwrap().value;

    let out = dir.path().join("out");
    let written = registry.export(&data, &out, "lk-md").unwrap();
    assert!(written.warnings.is_empty(), "{:?}", written.warnings);

    let realms = fs::read_to_string(out.join("Realms.md")).unwrap();
    insta::assert_snapshot!(realms, @r###"
    ---
    tags:
    - legend
    - world
    properties:
      Era: Second Age
    children:
    - Kaleah.md
    - Aster.md
    ---

    > [!warning] Beware the northern passes

    Ruled by [Kaleah](Realms/Kaleah.md) from the coast

    - [ ] Map the coast
    - [x] Name the capital

    ![Map](Realms/map.png)
    "###);
    assert!(out.join("Realms").join("map.png").is_file());
    assert!(out.join("Regions.csv").is_file());
    assert!(!out.join("Regions_all.csv").exists());
}

#[test]
fn plain_folders_need_no_frontmatter() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "Realms.md", "Overview of [Kaleah](Realms/Kaleah.md)\n");
    write(dir.path(), "Realms/Kaleah.md", "> [!caution] Hot springs\n");
    write(dir.path(), "Realms/Aster.md", "");

    let registry = FormatRegistry::default();
    assert_eq!(registry.detect_format_from_path(dir.path()).as_deref(), Some("lk-md"));
    let outcome = registry.parse(dir.path(), "lk-md").unwrap();
    assert!(outcome.warnings.is_empty(), "{:?}", outcome.warnings);
    let data = outcome.value;
    let names: Vec<_> = data.walk().into_iter().map(|(_, r)| r.name.as_str()).collect();
    // Without a `children` list siblings follow file names.
    assert_eq!(names, ["Realms", "Aster", "Kaleah"]);
    let kaleah = data.walk().into_iter().map(|(_, r)| r).find(|r| r.name == "Kaleah").unwrap();
    assert!(matches!(&kaleah.content.blocks[0], Block::Callout(c) if c.kind == "warning"));
}

#[test]
fn broken_frontmatter_is_skipped_with_a_warning() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "Realms.md", "---\ntags: [unclosed\n---\nBody\n");

    let outcome = FormatRegistry::default().parse(dir.path(), "lk-md").unwrap();
    assert_eq!(outcome.warnings.len(), 1);
    assert_eq!(outcome.warnings[0].kind, WarningKind::MissingOptional);
    let realms = &outcome.value.resources.values().next().unwrap();
    assert_eq!(realms.name, "Realms");
}
