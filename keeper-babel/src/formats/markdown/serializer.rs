//! Markdown serialization (content IR → page body)
//!
//! Rendering is hand-written so every node comes out in exactly the form the
//! parser reads back: text is escaped wherever markdown would give it meaning,
//! lists use fixed markers, and each dialect writes its own callout syntax.
//! Internal links are resolved through the [`RenderContext`]; links the
//! context cannot resolve are written as their plain text and reported in
//! [`Rendered::unresolved`].

use super::{Dialect, RAW_FENCE_PREFIX};
use crate::common::callouts;
use crate::ir::nodes::*;

pub struct RenderContext<'r> {
    pub dialect: Dialect,
    /// Href for an internal link target, `None` when the target is not part of
    /// this export
    pub link_href: &'r dyn Fn(&str) -> Option<String>,
    /// Href for an attachment of the page being written
    pub asset_href: &'r dyn Fn(&str) -> String,
}

fn no_link(_: &str) -> Option<String> {
    None
}

fn asset_as_is(name: &str) -> String {
    name.to_string()
}

impl RenderContext<'static> {
    /// Internal links never resolve, attachments are referenced by name.
    pub fn standalone(dialect: Dialect) -> Self {
        RenderContext {
            dialect,
            link_href: &no_link,
            asset_href: &asset_as_is,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Rendered {
    pub text: String,
    /// (target id, link text) of every internal link written as plain text
    pub unresolved: Vec<(String, String)>,
}

/// Render blocks as a markdown body. The result ends with a newline unless it
/// is empty.
pub fn render_blocks(blocks: &[Block], ctx: &RenderContext) -> Rendered {
    let mut writer = Writer {
        ctx,
        unresolved: Vec::new(),
    };
    let mut text = writer.blocks(blocks);
    if !text.is_empty() {
        text.push('\n');
    }
    Rendered {
        text,
        unresolved: writer.unresolved,
    }
}

struct Writer<'c> {
    ctx: &'c RenderContext<'c>,
    unresolved: Vec<(String, String)>,
}

impl Writer<'_> {
    fn blocks(&mut self, blocks: &[Block]) -> String {
        blocks
            .iter()
            .map(|block| self.block(block))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    fn block(&mut self, block: &Block) -> String {
        match block {
            Block::Paragraph(p) => self.inlines(&p.content, true),
            Block::Heading(h) => {
                let hashes = "#".repeat(h.level.clamp(1, 6) as usize);
                let text = self.inlines(&h.content, false);
                if text.is_empty() {
                    hashes
                } else {
                    format!("{hashes} {text}")
                }
            }
            Block::List(list) => self.list(list),
            Block::Callout(callout) => match self.ctx.dialect {
                Dialect::LkMarkdown => self.lk_callout(callout),
                Dialect::Notion => self.notion_callout(callout),
            },
            Block::Quote(quote) => prefix_lines(&self.blocks(&quote.body), "> ", ">"),
            Block::Image(image) => self.image(image),
            Block::Code(code) => fenced(code.language.as_deref().unwrap_or(""), &code.text),
            Block::Rule => "***".to_string(),
            Block::Raw(raw) if raw.format == "markdown" => raw.text.clone(),
            Block::Raw(raw) => {
                let mut text = raw.text.clone();
                text.push('\n');
                fenced(&format!("{RAW_FENCE_PREFIX}{}", raw.format), &text)
            }
        }
    }

    fn list(&mut self, list: &List) -> String {
        let mut items = Vec::with_capacity(list.items.len());
        for (index, item) in list.items.iter().enumerate() {
            let marker = if list.ordered {
                format!("{}. ", index + 1)
            } else {
                "- ".to_string()
            };
            let indent = " ".repeat(marker.len());
            let checkbox = match item.checked {
                Some(true) => "[x] ",
                Some(false) => "[ ] ",
                None => "",
            };

            let content = self.inlines(&item.content, true);
            let mut text = format!("{marker}{checkbox}{}", indent_tail(&content, &indent));
            let text_len = text.trim_end().len();
            text.truncate(text_len);

            for (i, child) in item.children.iter().enumerate() {
                let rendered = indent_all(&self.block(child), &indent);
                let tight = i == 0 && matches!(child, Block::List(_)) && !content.is_empty();
                text.push_str(if tight { "\n" } else { "\n\n" });
                text.push_str(&rendered);
            }
            items.push(text);
        }
        items.join("\n")
    }

    fn split_lead<'b>(&mut self, body: &'b [Block]) -> (Option<String>, &'b [Block]) {
        match body.split_first() {
            Some((Block::Paragraph(p), rest)) => (Some(self.inlines(&p.content, false)), rest),
            _ => (None, body),
        }
    }

    fn lk_callout(&mut self, callout: &Callout) -> String {
        let (lead, rest) = self.split_lead(&callout.body);
        let mut text = format!("[!{}]", callout.kind);
        if let Some(lead) = lead {
            text.push(' ');
            text.push_str(&lead);
        }
        if !rest.is_empty() {
            text.push_str("\n\n");
            text.push_str(&self.blocks(rest));
        }
        prefix_lines(&text, "> ", ">")
    }

    fn notion_callout(&mut self, callout: &Callout) -> String {
        let (lead, rest) = self.split_lead(&callout.body);
        let mut text = format!("<aside>\n{}", callouts::emoji_for(&callout.kind));
        if let Some(lead) = lead {
            text.push(' ');
            text.push_str(&lead);
        }
        if !rest.is_empty() {
            text.push_str("\n\n");
            text.push_str(&self.blocks(rest));
        }
        text.push_str("\n\n</aside>");
        text
    }

    fn image(&self, image: &Image) -> String {
        let src = match &image.source {
            ImageSource::Asset(name) => (self.ctx.asset_href)(name),
            ImageSource::External(url) => url.clone(),
        };
        let title = image
            .title
            .as_deref()
            .map(|t| format!(" \"{}\"", t.replace('\\', "\\\\").replace('"', "\\\"")))
            .unwrap_or_default();
        format!(
            "![{}]({}{title})",
            escape(&image.alt, false),
            destination(&src)
        )
    }

    fn inlines(&mut self, inlines: &[Inline], line_start: bool) -> String {
        let mut out = String::new();
        let mut at_line_start = line_start;
        for inline in inlines {
            match inline {
                Inline::Text(run) => out.push_str(&styled(run, at_line_start)),
                Inline::Link(link) => match &link.target {
                    LinkTarget::External(url) => out.push_str(&format!(
                        "[{}]({})",
                        escape(&link.text, false),
                        destination(url)
                    )),
                    LinkTarget::Internal(id) => match (self.ctx.link_href)(id) {
                        Some(href) => out.push_str(&format!(
                            "[{}]({})",
                            escape(&link.text, false),
                            destination(&href)
                        )),
                        None => {
                            self.unresolved.push((id.clone(), link.text.clone()));
                            out.push_str(&escape(&link.text, at_line_start));
                        }
                    },
                },
                Inline::Image(image) => out.push_str(&self.image(image)),
                Inline::Break => {
                    out.push_str("\\\n");
                    at_line_start = true;
                    continue;
                }
            }
            at_line_start = false;
        }
        out
    }
}

fn styled(run: &TextRun, line_start: bool) -> String {
    let mut text = if run.style.code {
        code_span(&run.text)
    } else {
        escape(&run.text, line_start)
    };
    if run.style.italic {
        text = format!("*{text}*");
    }
    if run.style.bold {
        text = format!("**{text}**");
    }
    if run.style.strike {
        text = format!("~~{text}~~");
    }
    text
}

fn code_span(text: &str) -> String {
    let fence = "`".repeat(longest_run(text, '`') + 1);
    let pad = text.starts_with('`')
        || text.ends_with('`')
        || (text.starts_with(' ') && text.ends_with(' ') && !text.trim().is_empty());
    if pad {
        format!("{fence} {text} {fence}")
    } else {
        format!("{fence}{text}{fence}")
    }
}

fn fenced(info: &str, text: &str) -> String {
    let fence = "`".repeat((longest_run(text, '`') + 1).max(3));
    let mut body = text.to_string();
    if !body.is_empty() && !body.ends_with('\n') {
        body.push('\n');
    }
    format!("{fence}{info}\n{body}{fence}")
}

fn longest_run(text: &str, c: char) -> usize {
    let mut longest = 0;
    let mut current = 0;
    for ch in text.chars() {
        if ch == c {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    longest
}

/// Escape text so markdown reads it back literally.
pub fn escape(text: &str, line_start: bool) -> String {
    let mut out = String::with_capacity(text.len() + 8);
    for c in text.chars() {
        if matches!(
            c,
            '\\' | '*' | '_' | '`' | '[' | ']' | '<' | '>' | '#' | '|' | '~' | '&'
        ) {
            out.push('\\');
        }
        out.push(c);
    }
    if line_start {
        if out.starts_with(['-', '+', '=']) {
            out.insert(0, '\\');
        } else {
            let digits = out.chars().take_while(char::is_ascii_digit).count();
            if digits > 0 && out[digits..].starts_with(['.', ')']) {
                out.insert(digits, '\\');
            }
        }
    }
    out
}

fn destination(url: &str) -> String {
    let needs_angle = url
        .chars()
        .any(|c| c.is_whitespace() || c.is_control() || c == '(' || c == ')');
    if needs_angle {
        format!("<{}>", url.replace('<', "\\<").replace('>', "\\>"))
    } else {
        url.to_string()
    }
}

fn prefix_lines(text: &str, prefix: &str, empty: &str) -> String {
    text.split('\n')
        .map(|line| {
            if line.is_empty() {
                empty.to_string()
            } else {
                format!("{prefix}{line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Indent every line but the first.
fn indent_tail(text: &str, indent: &str) -> String {
    text.replace('\n', &format!("\n{indent}"))
}

fn indent_all(text: &str, indent: &str) -> String {
    text.split('\n')
        .map(|line| {
            if line.is_empty() {
                String::new()
            } else {
                format!("{indent}{line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
