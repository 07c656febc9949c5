use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

const REALMS_ID: &str = "0123456789abcdef0123456789abcdef";
const KALEAH_ID: &str = "fedcba9876543210fedcba9876543210";

/// Notion export with one page and one child page.
fn notion_export(root: &Path) {
    let page_dir = root.join(format!("Realms {REALMS_ID}"));
    fs::create_dir_all(&page_dir).unwrap();
    fs::write(
        root.join(format!("Realms {REALMS_ID}.md")),
        format!("# Realms\n\nThe known world\n\n[Kaleah](Realms%20{REALMS_ID}/Kaleah%20{KALEAH_ID}.md)\n"),
    )
    .unwrap();
    fs::write(
        page_dir.join(format!("Kaleah {KALEAH_ID}.md")),
        "# Kaleah\n\nQueen of the north\n",
    )
    .unwrap();
}

#[test]
fn test_list_formats() {
    let mut cmd = cargo_bin_cmd!("keeper");
    cmd.arg("--list-formats");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("lk-json"))
        .stdout(predicate::str::contains("lk-md"))
        .stdout(predicate::str::contains("notion"));
}

#[test]
fn test_convert_notion_to_lk_json() {
    let dir = tempdir().unwrap();
    let source = dir.path().join("source");
    notion_export(&source);
    let out = dir.path().join("out");

    let mut cmd = cargo_bin_cmd!("keeper");
    cmd.current_dir(dir.path())
        .arg("convert")
        .arg(&source)
        .arg("--to")
        .arg("lk-json")
        .arg("-o")
        .arg(&out);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Converted 2 resource(s) from notion to lk-json"));

    let json = fs::read_to_string(out.join("Realms.json")).unwrap();
    assert!(json.contains("\"version\": 1"));
    assert!(json.contains("Queen of the north"));
}

#[test]
fn test_convert_schema_version_override() {
    let dir = tempdir().unwrap();
    let source = dir.path().join("source");
    notion_export(&source);
    let out = dir.path().join("out");

    let mut cmd = cargo_bin_cmd!("keeper");
    cmd.current_dir(dir.path())
        .args(["convert", "--to", "lk-json", "--extra-schema-version", "2", "-o"])
        .arg(&out)
        .arg(&source);

    cmd.assert().success();
    let json = fs::read_to_string(out.join("Realms.json")).unwrap();
    assert!(json.contains("\"version\": 2"));
}

#[test]
fn test_convert_rejects_unknown_extras() {
    let dir = tempdir().unwrap();
    let source = dir.path().join("source");
    notion_export(&source);

    let mut cmd = cargo_bin_cmd!("keeper");
    cmd.current_dir(dir.path())
        .arg("convert")
        .arg(&source)
        .args(["--to", "lk-md", "-o", "out", "--extra-theme", "dark"]);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("--extra-theme"));
}

#[test]
fn test_convert_undetectable_input() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("notes.txt");
    fs::write(&input, "just text").unwrap();

    let mut cmd = cargo_bin_cmd!("keeper");
    cmd.current_dir(dir.path())
        .arg("convert")
        .arg(&input)
        .args(["--to", "lk-json", "-o", "out"]);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Could not detect"));
}

#[test]
fn test_inspect_prints_tree() {
    let dir = tempdir().unwrap();
    notion_export(dir.path());

    let mut cmd = cargo_bin_cmd!("keeper");
    cmd.current_dir(dir.path()).arg("inspect").arg(dir.path());

    cmd.assert()
        .success()
        .stdout(predicate::str::contains(format!("• Realms  [{REALMS_ID}]")))
        .stdout(predicate::str::contains(format!("    • Kaleah  [{KALEAH_ID}]")))
        .stdout(predicate::str::contains("2 resources, 0 tables"));
}

#[test]
fn test_missing_config_file_fails() {
    let dir = tempdir().unwrap();
    notion_export(dir.path());

    let mut cmd = cargo_bin_cmd!("keeper");
    cmd.current_dir(dir.path())
        .arg("inspect")
        .arg(dir.path())
        .arg("--config")
        .arg(dir.path().join("absent.toml"));

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load configuration"));
}
