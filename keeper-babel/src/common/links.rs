//! Link targets between pages of one export.
//!
//! Content keeps internal links as the id of the page they point at. On the
//! way out, exporters build a [`LinkResolver`] over the pages they are about to
//! write and turn each id into a relative, percent-encoded path. On the way in,
//! parsers turn hrefs back into paths with [`resolve_relative`] and look the
//! path up in their own index.

use crate::model::ResourceId;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use url::Url;

/// Characters escaped in a path segment. Notion exports encode spaces as `%20`.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'(')
    .add(b')')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'[')
    .add(b']')
    .add(b'\\')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// Maps the ids of an export onto the files they are written to.
#[derive(Debug, Default, Clone)]
pub struct LinkResolver {
    targets: HashMap<ResourceId, PathBuf>,
}

impl LinkResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: impl Into<ResourceId>, path: impl Into<PathBuf>) {
        self.targets.insert(id.into(), path.into());
    }

    pub fn path_of(&self, id: &str) -> Option<&Path> {
        self.targets.get(id).map(PathBuf::as_path)
    }

    /// Href from the page written at `from` to the page `id`, or `None` when
    /// `id` is not part of this export.
    pub fn href(&self, from: &Path, id: &str) -> Option<String> {
        let target = self.targets.get(id)?;
        Some(relative_href(from, target))
    }
}

/// Percent-encoded relative href between two files of one export.
pub fn relative_href(from_file: &Path, to_file: &Path) -> String {
    let base = from_file.parent().unwrap_or_else(|| Path::new(""));
    let relative = pathdiff::diff_paths(to_file, base).unwrap_or_else(|| to_file.to_path_buf());
    encode_path(&relative)
}

pub fn encode_path(path: &Path) -> String {
    path.components()
        .map(|component| match component {
            Component::ParentDir => "..".to_string(),
            Component::CurDir => ".".to_string(),
            other => utf8_percent_encode(&other.as_os_str().to_string_lossy(), SEGMENT).to_string(),
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// True for hrefs with a scheme (`https:`, `mailto:`) or protocol-relative hrefs.
pub fn is_external(href: &str) -> bool {
    href.starts_with("//") || Url::parse(href).is_ok()
}

/// Resolve a relative href found in the file at `from_file` (relative to the
/// export root) into a root-relative path. External hrefs, fragments-only
/// hrefs and paths escaping the root give `None`.
pub fn resolve_relative(from_file: &Path, href: &str) -> Option<PathBuf> {
    if is_external(href) {
        return None;
    }
    let without_fragment = href.split(['#', '?']).next().unwrap_or("");
    if without_fragment.is_empty() {
        return None;
    }
    let decoded = percent_decode_str(without_fragment).decode_utf8_lossy();
    let base = from_file.parent().unwrap_or_else(|| Path::new(""));
    normalize_lexically(&base.join(decoded.as_ref()))
}

fn normalize_lexically(path: &Path) -> Option<PathBuf> {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    return None;
                }
            }
            Component::Normal(part) => out.push(part),
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(out)
}

/// The page id at the end of a `notion.so` / `notion.site` URL, if any.
pub fn notion_url_id(href: &str) -> Option<String> {
    let url = Url::parse(href).ok()?;
    let host = url.host_str()?;
    if !(host == "notion.so" || host.ends_with(".notion.so") || host.ends_with(".notion.site")) {
        return None;
    }
    let last = url.path_segments()?.filter(|s| !s.is_empty()).last()?;
    let tail = last.rsplit('-').next()?;
    crate::common::names::is_notion_id(tail).then(|| tail.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hrefs_are_relative_and_encoded() {
        let mut resolver = LinkResolver::new();
        resolver.insert("k", "Realms abc/Kaleah def.md");
        assert_eq!(
            resolver.href(Path::new("Realms abc.md"), "k").as_deref(),
            Some("Realms%20abc/Kaleah%20def.md")
        );
        assert_eq!(
            resolver
                .href(Path::new("Other/Deep/Page.md"), "k")
                .as_deref(),
            Some("../../Realms%20abc/Kaleah%20def.md")
        );
        assert_eq!(resolver.href(Path::new("x.md"), "missing"), None);
    }

    #[test]
    fn resolves_relative_hrefs_back_to_paths() {
        assert_eq!(
            resolve_relative(Path::new("Realms/Kaleah.md"), "../Realms.md"),
            Some(PathBuf::from("Realms.md"))
        );
        assert_eq!(
            resolve_relative(Path::new("Realms.md"), "Realms/The%20Road.md#top"),
            Some(PathBuf::from("Realms/The Road.md"))
        );
        assert_eq!(resolve_relative(Path::new("a.md"), "../../x.md"), None);
        assert_eq!(resolve_relative(Path::new("a.md"), "https://x.io/a.md"), None);
    }

    #[test]
    fn recognizes_notion_urls() {
        assert_eq!(
            notion_url_id("https://www.notion.so/Kaleah-0123456789abcdef0123456789abcdef")
                .as_deref(),
            Some("0123456789abcdef0123456789abcdef")
        );
        assert_eq!(notion_url_id("https://example.com/0123456789abcdef0123456789abcdef"), None);
    }
}
