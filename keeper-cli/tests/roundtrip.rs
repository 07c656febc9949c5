use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

const REALMS_ID: &str = "0123456789abcdef0123456789abcdef";
const KALEAH_ID: &str = "fedcba9876543210fedcba9876543210";

fn notion_export(root: &Path) {
    let page_dir = root.join(format!("Realms {REALMS_ID}"));
    fs::create_dir_all(&page_dir).unwrap();
    fs::write(
        root.join(format!("Realms {REALMS_ID}.md")),
        format!(
            "# Realms\n\n\
             Ruled by [Kaleah](Realms%20{REALMS_ID}/Kaleah%20{KALEAH_ID}.md)\n\n\
             [Kaleah](Realms%20{REALMS_ID}/Kaleah%20{KALEAH_ID}.md)\n"
        ),
    )
    .unwrap();
    fs::write(
        page_dir.join(format!("Kaleah {KALEAH_ID}.md")),
        "# Kaleah\n\nQueen of the *north*\n",
    )
    .unwrap();
}

fn report_files(dir: &Path) -> Vec<String> {
    fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|name| name.starts_with("report_") && name.ends_with(".txt"))
        .collect()
}

#[test]
fn test_roundtrip_perfect_match() {
    let dir = tempdir().unwrap();
    notion_export(dir.path());

    let mut cmd = cargo_bin_cmd!("keeper");
    cmd.current_dir(dir.path())
        .arg("roundtrip")
        .arg(dir.path())
        .arg("notion->lk-json->notion");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("ROUND-TRIP REPORT"))
        .stdout(predicate::str::contains("chain: notion -> lk-json -> notion"))
        .stdout(predicate::str::ends_with("RESULT: PERFECT MATCH\n"));
    assert!(report_files(dir.path()).is_empty());
}

#[test]
fn test_roundtrip_writes_timestamped_report() {
    let dir = tempdir().unwrap();
    let source = dir.path().join("source");
    notion_export(&source);
    let reports = dir.path().join("reports");
    fs::create_dir_all(&reports).unwrap();

    let mut cmd = cargo_bin_cmd!("keeper");
    cmd.current_dir(dir.path())
        .arg("roundtrip")
        .arg(&source)
        .arg("notion->lk-md->notion")
        .arg("--report")
        .arg(&reports);

    cmd.assert()
        .success()
        .stderr(predicate::str::contains("Report written to"));

    let written = report_files(&reports);
    assert_eq!(written.len(), 1, "{written:?}");
    let text = fs::read_to_string(reports.join(&written[0])).unwrap();
    assert!(text.starts_with("ROUND-TRIP REPORT"));
    assert!(text.ends_with("RESULT: PERFECT MATCH\n"));
}

#[test]
fn test_roundtrip_report_directory_from_config() {
    let dir = tempdir().unwrap();
    let source = dir.path().join("source");
    notion_export(&source);
    fs::write(
        dir.path().join("keeper.toml"),
        "[report]\ndirectory = \"out\"\nwrite_file = true\n",
    )
    .unwrap();

    let mut cmd = cargo_bin_cmd!("keeper");
    cmd.current_dir(dir.path())
        .arg("roundtrip")
        .arg(&source)
        .arg("notion->lk-json->notion");

    cmd.assert().success();
    assert_eq!(report_files(&dir.path().join("out")).len(), 1);
}

#[test]
fn test_roundtrip_minor_differences_exit_nonzero() {
    let dir = tempdir().unwrap();
    fs::write(
        dir.path().join(format!("Realms {REALMS_ID}.md")),
        "# Realms\n\nSee [Vanished](Vanished%200000000000000000000000000000dead.md) for details\n",
    )
    .unwrap();

    let mut cmd = cargo_bin_cmd!("keeper");
    cmd.current_dir(dir.path())
        .arg("roundtrip")
        .arg(dir.path())
        .arg("notion->lk-json->notion");

    cmd.assert()
        .code(1)
        .stdout(predicate::str::contains("WARNINGS"))
        .stdout(predicate::str::contains("RESULT: MINOR DIFFERENCES"));
}

#[test]
fn test_roundtrip_rejects_mismatched_chain() {
    let dir = tempdir().unwrap();
    notion_export(dir.path());

    let mut cmd = cargo_bin_cmd!("keeper");
    cmd.current_dir(dir.path())
        .arg("roundtrip")
        .arg(dir.path())
        .arg("lk-json->notion");

    cmd.assert()
        .failure()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("Error"));
}

#[test]
fn test_roundtrip_rejects_malformed_chain() {
    let dir = tempdir().unwrap();
    notion_export(dir.path());

    let mut cmd = cargo_bin_cmd!("keeper");
    cmd.current_dir(dir.path())
        .arg("roundtrip")
        .arg(dir.path())
        .arg("notion->docx");

    cmd.assert().failure().stderr(predicate::str::contains("Error"));
}

#[test]
fn test_roundtrip_keeps_intermediates_in_work_dir() {
    let dir = tempdir().unwrap();
    let source = dir.path().join("source");
    notion_export(&source);
    let work = dir.path().join("work");

    let mut cmd = cargo_bin_cmd!("keeper");
    cmd.current_dir(dir.path())
        .arg("roundtrip")
        .arg(&source)
        .arg("notion->lk-json->notion")
        .arg("--extra-work-dir")
        .arg(&work);

    cmd.assert()
        .success()
        .stderr(predicate::str::contains("Intermediate exports kept in"));
    assert!(work.join("hop1-lk-json").join("Realms.json").is_file());
    assert!(work.join("hop2-notion").is_dir());
}
