use crate::common::{doc, lk_json, notion_realms, run, write, REALMS_ID};
use keeper_babel::diagnostics::WarningKind;
use keeper_babel::diff::{Dimension, Severity};
use keeper_babel::ir::nodes::{Block, Inline, LinkTarget};
use serde_json::json;

#[test]
fn realms_callout_survives_lk_json_notion_lk_json() {
    let dir = tempfile::tempdir().unwrap();
    let source = lk_json(
        dir.path(),
        json!({
            "version": 1,
            "resources": [
                {
                    "id": "hb13iidj",
                    "name": "Realms",
                    "properties": [],
                    "tags": [],
                    "documents": doc(json!([
                        {"type": "callout", "attrs": {"kind": "warning"}, "content": [
                            {"type": "paragraph", "content": [{"type": "text", "text": "Beware"}]}
                        ]}
                    ]))
                },
                {
                    "id": "kaleah01",
                    "name": "Kaleah",
                    "parentId": "hb13iidj",
                    "properties": [],
                    "tags": []
                }
            ]
        }),
    );

    let run = run(&source, "lk-json->notion->lk-json");
    let report = run.diff();
    assert_eq!(report.verdict(), Severity::Perfect, "{report}");
    assert!(report.to_string().ends_with("RESULT: PERFECT MATCH"));

    let result = &run.result;
    assert_eq!(result.len(), 2);
    let realms = result
        .walk()
        .into_iter()
        .find(|(depth, r)| *depth == 0 && r.name == "Realms")
        .map(|(_, r)| r)
        .expect("Realms is a root");
    let kaleah: Vec<_> = result.children_of(&realms.id).collect();
    assert_eq!(kaleah.len(), 1);
    assert_eq!(kaleah[0].name, "Kaleah");
    assert_eq!(kaleah[0].parent.as_deref(), Some(realms.id.as_str()));
    match &realms.content.blocks[..] {
        [Block::Callout(callout)] => {
            assert_eq!(callout.kind, "warning");
            assert_eq!(
                callout.body,
                vec![Block::paragraph(vec![Inline::plain("Beware")])]
            );
        }
        other => panic!("expected a single callout, got {other:?}"),
    }
}

#[test]
fn csv_pair_merges_into_one_table() {
    let dir = tempfile::tempdir().unwrap();
    let source = notion_realms(dir.path());

    let run = run(&source, "notion->lk-json->notion");
    let table = run.original.database("Regions").expect("merged table");
    assert_eq!(table.columns(), ["Name", "Region", "Climate"]);
    let vanta = table.row("Vanta").expect("row only in the plain file");
    assert_eq!(vanta.values.get("Region").map(String::as_str), Some("South"));
    assert_eq!(vanta.values.get("Climate"), None);
    let kaleah = table.row("Kaleah").expect("row in both files");
    assert_eq!(kaleah.values.get("Climate").map(String::as_str), Some("Cold"));

    assert_eq!(run.result.database("Regions"), Some(table));
}

#[test]
fn dangling_link_is_one_warning_and_at_most_minor() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        &format!("Realms {REALMS_ID}.md"),
        "# Realms\n\nSee [Vanished](Vanished%200000000000000000000000000000dead.md) for details\n",
    );

    let run = run(dir.path(), "notion->lk-json->notion");
    let report = run.diff();
    assert_eq!(run.warning_count(), 1, "{report}");
    assert_eq!(report.warnings[0].1.kind, WarningKind::UnresolvedLink);
    assert!(report.verdict() <= Severity::Minor, "{report}");

    let realms = run.result.get(REALMS_ID).expect("id survives");
    assert_eq!(
        realms.content.blocks,
        vec![Block::paragraph(vec![Inline::plain("See Vanished for details")])]
    );
}

#[test]
fn missing_page_link_without_id_is_unresolved() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        &format!("Realms {REALMS_ID}.md"),
        "# Realms\n\nSee [Gone](Gone.md) here\n",
    );

    let original = keeper_babel::FormatRegistry::default()
        .parse(dir.path(), "notion")
        .unwrap()
        .value;
    match &original.get(REALMS_ID).unwrap().content.blocks[..] {
        [Block::Paragraph(paragraph)] => assert!(paragraph.content.iter().any(|inline| matches!(
            inline,
            Inline::Link(link) if matches!(link.target, LinkTarget::Internal(_))
        ))),
        other => panic!("expected one paragraph, got {other:?}"),
    }

    let run = run(dir.path(), "notion->lk-json->notion");
    let report = run.diff();
    assert_eq!(run.warning_count(), 1, "{report}");
    assert_eq!(report.warnings[0].1.kind, WarningKind::UnresolvedLink);
    assert_eq!(
        run.result.get(REALMS_ID).unwrap().content.blocks,
        vec![Block::paragraph(vec![Inline::plain("See Gone here")])]
    );
}

#[test]
fn notion_export_is_perfect_through_lk_json() {
    let dir = tempfile::tempdir().unwrap();
    let source = notion_realms(dir.path());

    let run = run(&source, "notion->lk-json->notion");
    let report = run.diff();
    assert_eq!(run.warning_count(), 0, "{report}");
    assert_eq!(report.verdict(), Severity::Perfect, "{report}");
}

#[test]
fn lk_md_chain_rematches_by_path() {
    let dir = tempfile::tempdir().unwrap();
    let source = notion_realms(dir.path());

    let run = run(&source, "notion->lk-md->notion");
    let report = run.diff();
    assert_eq!(report.verdict(), Severity::Perfect, "{report}");
    assert_eq!(crate::common::outline(&run.result), ["Realms", "  Kaleah", "  Aster"]);
    // Path-derived ids differ from the source ids, every resource still pairs up.
    assert!(run.result.get(REALMS_ID).is_none());
    assert!(report.resources.is_empty(), "{report}");
}

#[test]
fn unsupported_version_stops_the_chain() {
    let dir = tempfile::tempdir().unwrap();
    let source = lk_json(dir.path(), json!({"version": "two", "resources": []}));
    let chain = "lk-json->notion".parse().unwrap();
    let err = keeper_babel::chain::run_chain(
        &keeper_babel::FormatRegistry::default(),
        &source,
        &chain,
        &Default::default(),
    )
    .err()
    .expect("a non-integer version is fatal");
    assert!(err.to_string().starts_with("Hop 0 failed during lk-json parse"));
}

#[test]
fn attachment_names_cannot_escape_the_work_dir() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "real.txt", "bytes");
    let source = lk_json(
        dir.path(),
        json!({
            "version": 1,
            "resources": [{
                "id": "r",
                "name": "Realms",
                "attachments": [{"name": "../../../escaped.txt", "path": "real.txt"}]
            }]
        }),
    );
    let options = keeper_babel::ChainOptions {
        work_dir: Some(dir.path().join("deep").join("work")),
        ..Default::default()
    };
    let chain = "lk-json->notion".parse().unwrap();
    let run = keeper_babel::run_chain(&keeper_babel::FormatRegistry::default(), &source, &chain, &options)
        .unwrap();

    assert!(!dir.path().join("deep").join("escaped.txt").exists());
    assert!(!dir.path().join("escaped.txt").exists());
    assert_eq!(run.source_warnings.len(), 1);
    assert_eq!(run.source_warnings[0].kind, WarningKind::MissingAsset);
    assert!(run.result.walk().iter().all(|(_, r)| r.attachments.is_empty()));
}

fn two_realms(root: &std::path::Path) -> std::path::PathBuf {
    lk_json(
        root,
        json!({
            "version": 1,
            "exportId": "exp-7",
            "exportedAt": "2024-03-01T10:00:00Z",
            "resources": [
                {
                    "id": "zephyr01",
                    "name": "Zephyr",
                    "pos": "0000",
                    "iconColor": "#C49454",
                    "isLocked": true,
                    "banner": {"enabled": true, "url": "https://img.example/sky.png", "yPosition": 37.5},
                    "documents": doc(json!([
                        {"type": "paragraph", "content": [{"type": "text", "text": "Windward"}]}
                    ]))
                },
                {"id": "aster001", "name": "Aster", "pos": "0001"}
            ]
        }),
    )
}

#[test]
fn root_order_survives_folder_formats() {
    for chain in ["lk-json->notion->lk-json", "lk-json->lk-md->lk-json"] {
        let dir = tempfile::tempdir().unwrap();
        let source = two_realms(dir.path());
        let run = run(&source, chain);
        assert_eq!(crate::common::outline(&run.result), ["Zephyr", "Aster"], "{chain}");
        let report = run.diff();
        assert!(
            report.structure.iter().all(|d| d.dimension != Dimension::RootOrder),
            "{chain}: {report}"
        );
        assert_eq!(
            run.result.metadata.get("exportedAt").map(String::as_str),
            Some("2024-03-01T10:00:00Z"),
            "{chain}"
        );
    }
}

#[test]
fn appearance_survives_lk_md() {
    let dir = tempfile::tempdir().unwrap();
    let source = two_realms(dir.path());

    let run = run(&source, "lk-json->lk-md->lk-json");
    let report = run.diff();
    assert_eq!(run.warning_count(), 0, "{report}");
    assert_eq!(report.verdict(), Severity::Perfect, "{report}");
    let zephyr = run.result.walk()[0].1;
    assert!(zephyr.appearance.locked);
    assert_eq!(zephyr.appearance.banner.as_ref().map(|b| b.y_position), Some(37.5));
}

#[test]
fn notion_reports_lost_appearance() {
    let dir = tempfile::tempdir().unwrap();
    let source = two_realms(dir.path());

    let run = run(&source, "lk-json->notion->lk-json");
    let report = run.diff();
    assert_eq!(run.warning_count(), 1, "{report}");
    assert_eq!(report.warnings[0].1.kind, WarningKind::MissingOptional);
    assert_eq!(report.verdict(), Severity::Significant, "{report}");
    let fields: Vec<&str> = report
        .differences()
        .filter(|d| d.dimension == Dimension::Appearance)
        .map(|d| d.detail.as_str())
        .collect();
    assert_eq!(fields, ["icon color", "banner", "locked"]);
}

#[test]
fn lk_json_keeps_appearance_and_envelope() {
    let dir = tempfile::tempdir().unwrap();
    let source = two_realms(dir.path());
    let work = dir.path().join("work");
    let options = keeper_babel::ChainOptions {
        work_dir: Some(work.clone()),
        ..Default::default()
    };
    let chain = "lk-json->lk-json".parse().unwrap();
    let run = keeper_babel::run_chain(&keeper_babel::FormatRegistry::default(), &source, &chain, &options)
        .unwrap();
    let report = run.diff();
    assert_eq!(report.verdict(), Severity::Perfect, "{report}");

    let written = std::fs::read_to_string(work.join("hop1-lk-json").join("Zephyr.json")).unwrap();
    for field in ["\"iconColor\"", "\"isLocked\": true", "\"banner\"", "\"exportId\": \"exp-7\""] {
        assert!(written.contains(field), "{field} missing from {written}");
    }
    assert_eq!(run.result.metadata.get("exportId").map(String::as_str), Some("exp-7"));
}
