//! Layout of one exported page file
//!
//! ```text
//! # Display Name
//!
//! Tags: lore, places
//! Climate: Temperate
//!
//! Body markdown...
//!
//! [First child](Display%20Name%20<id>/First%20child%20<id>.md)
//! ```
//!
//! The `Key: value` lines directly under the title are the property block.
//! A body whose first paragraph would read as one gets its first colon on
//! each line escaped.

use crate::formats::markdown::{parse_markdown, serializer::escape, ParseContext};
use crate::ir::nodes::{Block, Inline, LinkTarget};
use once_cell::sync::Lazy;
use regex::Regex;

pub const TAGS_KEY: &str = "Tags";
pub const ALIASES_KEY: &str = "Aliases";
pub const ICON_KEY: &str = "Icon";

static PROPERTY_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([^\s:\\`*_\[\]<>][^:\\`*_\[\]<>]*):(?:[ \t]+(.*))?$").unwrap());

/// A page file split into its parts. `body` is still markdown.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PageText<'s> {
    pub title: Option<String>,
    pub properties: Vec<(String, String)>,
    pub body: &'s str,
}

pub fn split_page(source: &str) -> PageText<'_> {
    let source = source.trim_start_matches('\u{feff}');
    let mut page = PageText {
        body: source,
        ..PageText::default()
    };

    let mut offset = 0;
    let mut lines = source.split_inclusive('\n').peekable();
    while let Some(line) = lines.next_if(|l| l.trim().is_empty()) {
        offset += line.len();
    }
    let Some(first) = lines.next_if(|l| is_title_line(l)) else {
        return page;
    };
    page.title = Some(title_text(first));
    offset += first.len();
    page.body = &source[offset..];

    while let Some(line) = lines.next_if(|l| l.trim().is_empty()) {
        offset += line.len();
    }
    let mut block = Vec::new();
    let mut block_len = 0;
    while let Some(line) = lines.next_if(|l| !l.trim().is_empty()) {
        block.push(line.trim_end());
        block_len += line.len();
    }
    if let Some(properties) = property_block(&block) {
        page.properties = properties;
        page.body = &source[offset + block_len..];
    }
    page
}

fn is_title_line(line: &str) -> bool {
    let line = line.trim_end();
    line == "#" || line.starts_with("# ") || line.starts_with("#\t")
}

/// The title as markdown reads it, so escapes written by the exporter vanish.
fn title_text(line: &str) -> String {
    let parsed = parse_markdown(line, &ParseContext::standalone("title")).value;
    match parsed.document.blocks.first() {
        Some(Block::Heading(heading)) => plain_text(&heading.content),
        _ => line.trim_start_matches('#').trim().to_string(),
    }
}

fn plain_text(inlines: &[Inline]) -> String {
    inlines
        .iter()
        .map(|inline| match inline {
            Inline::Text(run) => run.text.clone(),
            Inline::Link(link) => link.text.clone(),
            Inline::Image(image) => image.alt.clone(),
            Inline::Break => " ".to_string(),
        })
        .collect()
}

/// `Some` when every line is a `Key: value` line.
pub fn property_block(lines: &[&str]) -> Option<Vec<(String, String)>> {
    if lines.is_empty() {
        return None;
    }
    lines
        .iter()
        .map(|line| {
            let captures = PROPERTY_LINE.captures(line)?;
            let key = captures.get(1)?.as_str().trim_end().to_string();
            let value = captures.get(2).map_or("", |m| m.as_str()).trim().to_string();
            Some((key, value))
        })
        .collect()
}

/// Whether `key` survives a round trip as a property line.
pub fn is_writable_key(key: &str) -> bool {
    !key.trim().is_empty()
        && key.trim() == key
        && PROPERTY_LINE.is_match(&format!("{key}: x"))
}

/// Comma-separated list value of `Tags` and `Aliases`.
pub fn split_list(value: &str) -> impl Iterator<Item = String> + '_ {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
}

pub fn render_title(name: &str) -> String {
    format!("# {}\n", escape(name, false))
}

pub fn render_properties(properties: &[(String, String)]) -> String {
    properties
        .iter()
        .map(|(key, value)| {
            let value = value.split_whitespace().collect::<Vec<_>>().join(" ");
            if value.is_empty() {
                format!("{key}:\n")
            } else {
                format!("{key}: {value}\n")
            }
        })
        .collect()
}

/// Escape the first colon on each line of a leading paragraph that would
/// otherwise be read back as a property block.
pub fn guard_body(body: &str) -> String {
    let paragraph: Vec<&str> = body
        .lines()
        .take_while(|line| !line.trim().is_empty())
        .collect();
    if property_block(&paragraph).is_none() {
        return body.to_string();
    }
    let mut out = String::with_capacity(body.len() + paragraph.len());
    for (index, line) in body.split_inclusive('\n').enumerate() {
        if index < paragraph.len() {
            out.push_str(&line.replacen(':', "\\:", 1));
        } else {
            out.push_str(line);
        }
    }
    out
}

/// Strip the trailing child-link index from parsed content and return the
/// child order it lists. Each index paragraph is a single internal link to
/// a distinct direct child.
pub fn take_child_index(blocks: &mut Vec<Block>, is_child: impl Fn(&str) -> bool) -> Vec<String> {
    let mut order = Vec::new();
    while let Some(Block::Paragraph(paragraph)) = blocks.last() {
        let [Inline::Link(link)] = paragraph.content.as_slice() else {
            break;
        };
        let LinkTarget::Internal(id) = &link.target else {
            break;
        };
        if !is_child(id) || order.contains(id) {
            break;
        }
        order.push(id.clone());
        blocks.pop();
    }
    order.reverse();
    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::nodes::Link;

    #[test]
    fn splits_title_properties_and_body() {
        let page = split_page("# Kaleah\n\nTags: lore, people\nRank: Queen\n\nShe rules.\n");
        assert_eq!(page.title.as_deref(), Some("Kaleah"));
        assert_eq!(
            page.properties,
            vec![
                ("Tags".to_string(), "lore, people".to_string()),
                ("Rank".to_string(), "Queen".to_string())
            ]
        );
        assert_eq!(page.body, "\nShe rules.\n");
    }

    #[test]
    fn body_paragraph_is_not_a_property_block() {
        let page = split_page("# Kaleah\n\nShe rules: firmly.\nAnd more.\n");
        assert!(page.properties.is_empty());
        assert_eq!(page.body, "\nShe rules: firmly.\nAnd more.\n");
    }

    #[test]
    fn titles_are_unescaped() {
        let source = render_title("Kaleah *the* [Bold]");
        let page = split_page(&source);
        assert_eq!(page.title.as_deref(), Some("Kaleah *the* [Bold]"));
    }

    #[test]
    fn urls_do_not_look_like_properties() {
        assert!(property_block(&["https://example.com"]).is_none());
        assert!(property_block(&["Note:"]).is_some());
    }

    #[test]
    fn guarded_bodies_stay_content() {
        let guarded = guard_body("Ruler: Kaleah\nSeat: Aster\n\nMore.\n");
        assert_eq!(guarded, "Ruler\\: Kaleah\nSeat\\: Aster\n\nMore.\n");
        let source = format!("# Realms\n\n{guarded}");
        let page = split_page(&source);
        assert!(page.properties.is_empty());
    }

    #[test]
    fn child_index_stops_at_repeated_links() {
        let link = |id: &str| {
            Block::paragraph(vec![Inline::Link(Link {
                text: id.to_string(),
                target: LinkTarget::Internal(id.to_string()),
            })])
        };
        let mut blocks = vec![link("a"), link("a"), link("b")];
        let order = take_child_index(&mut blocks, |id| id == "a" || id == "b");
        assert_eq!(order, vec!["a", "b"]);
        assert_eq!(blocks, vec![link("a")]);
    }
}
