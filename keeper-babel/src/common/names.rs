//! File names and identifiers
//!
//! Display names are free text, file names are not. Exporters write names
//! through [`sanitize_name`]; the exact name survives in the page itself (H1
//! title or frontmatter), so sanitizing never costs fidelity.

use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};

/// Notion page stems: `<Display Name> <32 lowercase hex>`
static NOTION_STEM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(.+?)\s+([a-f0-9]{32})$").unwrap());

static NOTION_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-f0-9]{32}$").unwrap());

/// Identifier derived from arbitrary text: the first 32 hex digits of its
/// SHA-256. Stable across runs and platforms.
pub fn derived_id(seed: &str) -> String {
    let digest = Sha256::digest(seed.as_bytes());
    let mut id = hex::encode(digest);
    id.truncate(32);
    id
}

/// True for ids that can be written into a Notion file name unchanged.
pub fn is_notion_id(id: &str) -> bool {
    NOTION_ID.is_match(id)
}

/// Split a Notion stem into display name and id.
pub fn split_notion_stem(stem: &str) -> Option<(&str, &str)> {
    let captures = NOTION_STEM.captures(stem)?;
    let name = captures.get(1)?.as_str();
    let id = captures.get(2)?.as_str();
    Some((name, id))
}

/// True when a stem ends in a Notion id, with or without a display name.
pub fn has_notion_id(stem: &str) -> bool {
    split_notion_stem(stem).is_some() || is_notion_id(stem)
}

/// Make a display name safe to use as a file or directory name.
///
/// Strips path separators, the characters Windows rejects and control
/// characters, then trims trailing dots and spaces. Never returns an empty
/// string.
pub fn sanitize_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| !matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|'))
        .filter(|c| !c.is_control())
        .collect();
    let trimmed = cleaned.trim_start().trim_end_matches(['.', ' ']);
    if trimmed.is_empty() {
        "Untitled".to_string()
    } else {
        trimmed.to_string()
    }
}
