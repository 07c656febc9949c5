//! Fixture helpers shared by the integration tests.
//!
//! Exports are built on disk at runtime inside a `TempDir`, so every test
//! owns its tree.

use keeper_babel::chain::{run_chain, Chain, ChainOptions, ChainRun};
use keeper_babel::FormatRegistry;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

pub const REALMS_ID: &str = "0123456789abcdef0123456789abcdef";
pub const KALEAH_ID: &str = "fedcba9876543210fedcba9876543210";
pub const ASTER_ID: &str = "00000000000000000000000000000a57";

/// Write `text` to `root/rel`, creating parent directories.
pub fn write(root: &Path, rel: &str, text: &str) -> PathBuf {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().expect("fixture paths have a parent")).unwrap();
    fs::write(&path, text).unwrap();
    path
}

/// Write an lk-json export and return its path.
pub fn lk_json(root: &Path, export: Value) -> PathBuf {
    write(root, "Export.json", &serde_json::to_string_pretty(&export).unwrap())
}

/// A single-document body in the typed node format.
pub fn doc(content: Value) -> Value {
    serde_json::json!([{
        "id": "main",
        "name": "Main",
        "type": "page",
        "content": {"type": "doc", "content": content}
    }])
}

pub fn run(source: &Path, chain: &str) -> ChainRun {
    let chain: Chain = chain.parse().unwrap();
    run_chain(&FormatRegistry::default(), source, &chain, &ChainOptions::default()).unwrap()
}

/// Names of every resource in walk order, indented by depth.
pub fn outline(data: &keeper_babel::ConversionData) -> Vec<String> {
    data.walk()
        .into_iter()
        .map(|(depth, resource)| format!("{}{}", "  ".repeat(depth), resource.name))
        .collect()
}

/// A small Notion export: `Realms` with a callout, a todo list, an image and
/// two ordered children, plus a database table pair.
pub fn notion_realms(root: &Path) -> PathBuf {
    let realms_dir = format!("Realms {REALMS_ID}");
    let realms_href = format!("Realms%20{REALMS_ID}");
    write(
        root,
        &format!("{realms_dir}.md"),
        &format!(
            "# Realms\n\
             \n\
             Tags: world, legend\n\
             Era: Second Age\n\
             \n\
             <aside>\n\
             \u{26A0}\u{FE0F} Beware the northern passes\n\
             \n\
             </aside>\n\
             \n\
             Ruled by [Kaleah]({realms_href}/Kaleah%20{KALEAH_ID}.md) from the coast\n\
             \n\
             - [ ] Map the coast\n\
             - [x] Name the capital\n\
             \n\
             ![Map]({realms_href}/map.png)\n\
             \n\
             [Kaleah]({realms_href}/Kaleah%20{KALEAH_ID}.md)\n\
             \n\
             [Aster]({realms_href}/Aster%20{ASTER_ID}.md)\n"
        ),
    );
    write(root, &format!("{realms_dir}/map.png"), "not really a png");
    write(
        root,
        &format!("{realms_dir}/Kaleah {KALEAH_ID}.md"),
        "# Kaleah\n\nQueen of the *north*\n",
    );
    write(
        root,
        &format!("{realms_dir}/Aster {ASTER_ID}.md"),
        "# Aster\n\nA quiet town\n",
    );
    write(root, "Regions.csv", "Name,Region\nKaleah,North\nVanta,South\n");
    write(
        root,
        "Regions_all.csv",
        "Name,Region,Climate\nKaleah,North,Cold\n",
    );
    root.to_path_buf()
}
