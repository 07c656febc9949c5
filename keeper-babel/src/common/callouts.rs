//! Callout kinds and their markers.
//!
//! The canonical kind is a lowercase word from [`KINDS`]. The lk-md dialect
//! writes it as `> [!kind]`, the Notion dialect as a leading emoji inside an
//! `<aside>`. Marker text from other tools goes through an alias table first.

pub const KINDS: &[&str] = &[
    "note", "info", "tip", "warning", "danger", "success", "question", "quote",
];

pub const DEFAULT_KIND: &str = "note";

const EMOJI: &[(&str, &str)] = &[
    ("note", "\u{1F4DD}"),
    ("info", "\u{2139}\u{FE0F}"),
    ("tip", "\u{1F4A1}"),
    ("warning", "\u{26A0}\u{FE0F}"),
    ("danger", "\u{1F6A8}"),
    ("success", "\u{2705}"),
    ("question", "\u{2753}"),
    ("quote", "\u{1F4AC}"),
];

const ALIASES: &[(&str, &str)] = &[
    ("caution", "warning"),
    ("attention", "warning"),
    ("hint", "tip"),
    ("important", "tip"),
    ("error", "danger"),
    ("bug", "danger"),
    ("failure", "danger"),
    ("check", "success"),
    ("done", "success"),
    ("help", "question"),
    ("faq", "question"),
    ("cite", "quote"),
    ("abstract", "info"),
    ("summary", "info"),
    ("tldr", "info"),
    ("todo", "note"),
];

/// Canonical kind for marker text, if it is a known kind or alias.
pub fn resolve_kind(marker: &str) -> Option<&'static str> {
    let marker = marker.trim().to_lowercase();
    KINDS
        .iter()
        .copied()
        .find(|kind| *kind == marker)
        .or_else(|| {
            ALIASES
                .iter()
                .find(|(alias, _)| *alias == marker)
                .map(|(_, kind)| *kind)
        })
}

/// The emoji written for a kind in the Notion dialect.
pub fn emoji_for(kind: &str) -> &'static str {
    let kind = resolve_kind(kind).unwrap_or(DEFAULT_KIND);
    EMOJI
        .iter()
        .find(|(k, _)| *k == kind)
        .map(|(_, emoji)| *emoji)
        .unwrap_or("\u{1F4DD}")
}

/// Canonical kind for an emoji, accepting it with or without the variation
/// selector.
pub fn kind_for_emoji(emoji: &str) -> Option<&'static str> {
    let bare = emoji.trim_end_matches('\u{FE0F}');
    EMOJI
        .iter()
        .find(|(_, e)| e.trim_end_matches('\u{FE0F}') == bare)
        .map(|(kind, _)| *kind)
}

/// Split leading pictographic characters off a line of text.
///
/// Returns the marker (possibly empty) and the rest with leading whitespace
/// removed. Anything that is not ASCII, alphanumeric or whitespace counts as
/// part of the marker, together with variation selectors and joiners.
pub fn split_emoji(text: &str) -> (&str, &str) {
    let text = text.trim_start();
    // U+2139 is a letter as far as char classes go
    for (_, emoji) in EMOJI {
        let bare = emoji.trim_end_matches('\u{FE0F}');
        if let Some(rest) = text.strip_prefix(bare) {
            let rest = rest.strip_prefix('\u{FE0F}').unwrap_or(rest);
            let end = text.len() - rest.len();
            return (&text[..end], rest.trim_start());
        }
    }
    let end = text
        .char_indices()
        .find(|(_, c)| {
            let pictographic = !c.is_ascii() && !c.is_alphanumeric() && !c.is_whitespace();
            let joiner = matches!(c, '\u{FE0F}' | '\u{200D}');
            !(pictographic || joiner)
        })
        .map(|(i, _)| i)
        .unwrap_or(text.len());
    (&text[..end], text[end..].trim_start())
}
