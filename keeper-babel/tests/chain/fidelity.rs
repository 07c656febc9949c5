use crate::common::{doc, lk_json, notion_realms, run, ASTER_ID, KALEAH_ID, REALMS_ID};
use keeper_babel::diff::{compare, Severity};
use keeper_babel::ir::nodes::Block;
use keeper_babel::model::ConversionData;
use serde_json::json;

fn raw_texts(data: &ConversionData) -> Vec<(String, String)> {
    fn collect(blocks: &[Block], out: &mut Vec<(String, String)>) {
        for block in blocks {
            match block {
                Block::Raw(raw) => out.push((raw.format.clone(), raw.text.clone())),
                Block::Callout(c) => collect(&c.body, out),
                Block::Quote(q) => collect(&q.body, out),
                Block::List(list) => {
                    for item in &list.items {
                        collect(&item.children, out);
                    }
                }
                _ => {}
            }
        }
    }
    let mut out = Vec::new();
    for (_, resource) in data.walk() {
        collect(&resource.content.blocks, &mut out);
    }
    out
}

#[test]
fn second_pass_is_still_perfect() {
    let dir = tempfile::tempdir().unwrap();
    let source = notion_realms(dir.path());

    let first = run(&source, "notion->lk-json->notion");
    assert_eq!(first.diff().verdict(), Severity::Perfect);

    let again_from = first.hops.last().map(|hop| hop.output.clone()).unwrap();
    let second = run(&again_from, "notion->lk-json->notion");
    assert_eq!(second.diff().verdict(), Severity::Perfect, "{}", second.diff());
    assert_eq!(compare(&first.result, &second.result).verdict(), Severity::Perfect);
}

#[test]
fn notion_ids_are_stable_through_lk_json() {
    let dir = tempfile::tempdir().unwrap();
    let source = notion_realms(dir.path());

    let run = run(&source, "notion->lk-json->notion");
    for id in [REALMS_ID, KALEAH_ID, ASTER_ID] {
        let before = run.original.get(id).expect("source id");
        let after = run.result.get(id).expect("same id after the chain");
        assert_eq!(before.name, after.name);
        assert_eq!(before.parent, after.parent);
    }
    assert_eq!(run.result.get(REALMS_ID).unwrap().children, [KALEAH_ID, ASTER_ID]);
}

#[test]
fn raw_json_nodes_are_bit_identical_through_every_format() {
    let embed = json!({"type": "embed", "attrs": {"url": "https://maps.example/kaleah", "height": 300}});
    for chain in [
        "lk-json->notion->lk-json",
        "lk-json->lk-md->lk-json",
        "lk-json->lk-md->notion->lk-json",
    ] {
        let dir = tempfile::tempdir().unwrap();
        let source = lk_json(
            dir.path(),
            json!({
                "version": 2,
                "resources": [{
                    "id": "r",
                    "name": "Realms",
                    "documents": doc(json!([
                        {"type": "paragraph", "content": [{"type": "text", "text": "Above"}]},
                        embed.clone()
                    ]))
                }]
            }),
        );
        let run = run(&source, chain);
        let expected = vec![("lk-json".to_string(), embed.to_string())];
        assert_eq!(raw_texts(&run.original), expected, "{chain}");
        assert_eq!(raw_texts(&run.result), expected, "{chain}");
        assert_eq!(run.diff().verdict(), Severity::Perfect, "{chain}");
    }
}

#[test]
fn raw_markdown_is_bit_identical_through_lk_json() {
    let dir = tempfile::tempdir().unwrap();
    let table = "| Realm | Ruler |\n| --- | --- |\n| Kaleah | Queen |";
    crate::common::write(
        dir.path(),
        &format!("Realms {REALMS_ID}.md"),
        &format!("# Realms\n\nRulers\n\n{table}\n"),
    );

    let run = run(dir.path(), "notion->lk-json->notion");
    let expected = vec![("markdown".to_string(), table.to_string())];
    assert_eq!(raw_texts(&run.original), expected);
    assert_eq!(raw_texts(&run.result), expected);
}
