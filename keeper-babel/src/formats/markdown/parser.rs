//! Markdown parsing (page body → content IR)
//!
//! Pipeline: optional YAML frontmatter is split off by hand, the rest goes
//! through comrak, and the comrak AST is walked into IR blocks. Constructs the
//! IR has no node for keep their exact source text as `Raw` markdown.

use super::RAW_FENCE_PREFIX;
use crate::common::callouts::{self, DEFAULT_KIND};
use crate::diagnostics::{Diagnostics, Outcome, WarningKind};
use crate::ir::nodes::*;
use crate::ir::normalize::{normalize_blocks, normalize_inlines};
use comrak::nodes::{AstNode, ListType, NodeValue};
use comrak::{parse_document, Arena, ComrakOptions};

/// How hrefs and image sources of one page are classified.
pub struct ParseContext<'r> {
    /// Names the page in warnings
    pub subject: &'r str,
    /// The id of the workspace page an href points at, if any
    pub internal_link: &'r dyn Fn(&str) -> Option<String>,
    /// The attachment name an image source refers to, if any
    pub asset: &'r dyn Fn(&str) -> Option<String>,
}

fn no_match(_: &str) -> Option<String> {
    None
}

impl<'r> ParseContext<'r> {
    /// A context in which every link is external and every image remote.
    pub fn standalone(subject: &'r str) -> Self {
        ParseContext {
            subject,
            internal_link: &no_match,
            asset: &no_match,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedMarkdown {
    /// YAML between the leading `---` fences, without the fences
    pub frontmatter: Option<String>,
    pub document: Document,
}

/// Parse a markdown page body into normalized IR.
pub fn parse_markdown(source: &str, ctx: &ParseContext) -> Outcome<ParsedMarkdown> {
    let (frontmatter, body) = split_frontmatter(source);
    let mut reader = Reader::new(body, ctx);
    let blocks = reader.document(body);
    reader.diagnostics.finish(ParsedMarkdown {
        frontmatter,
        document: Document::new(normalize_blocks(blocks)),
    })
}

fn comrak_options() -> ComrakOptions<'static> {
    let mut options = ComrakOptions::default();
    options.extension.table = true;
    options.extension.strikethrough = true;
    options.extension.tasklist = true;
    options
}

fn split_frontmatter(source: &str) -> (Option<String>, &str) {
    let source = source.trim_start_matches('\u{feff}');
    let Some(rest) = source
        .strip_prefix("---\n")
        .or_else(|| source.strip_prefix("---\r\n"))
    else {
        return (None, source);
    };
    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        let trimmed = line.trim_end();
        if trimmed == "---" || trimmed == "..." {
            return (Some(rest[..offset].to_string()), &rest[offset + line.len()..]);
        }
        offset += line.len();
    }
    (None, source)
}

struct Reader<'s, 'c> {
    lines: Vec<&'s str>,
    ctx: &'c ParseContext<'c>,
    diagnostics: Diagnostics,
}

impl<'s, 'c> Reader<'s, 'c> {
    fn new(source: &'s str, ctx: &'c ParseContext<'c>) -> Self {
        Reader {
            lines: source
                .split('\n')
                .map(|l| l.strip_suffix('\r').unwrap_or(l))
                .collect(),
            ctx,
            diagnostics: Diagnostics::new(),
        }
    }

    fn document(&mut self, source: &str) -> Vec<Block> {
        let arena = Arena::new();
        let options = comrak_options();
        let root = parse_document(&arena, source, &options);
        self.blocks(root.children().collect())
    }

    fn blocks<'a>(&mut self, nodes: Vec<&'a AstNode<'a>>) -> Vec<Block> {
        let mut out = Vec::new();
        let mut i = 0;
        while i < nodes.len() {
            let node = nodes[i];
            i += 1;
            if let Some(open) = aside_open(node) {
                let mut body = Vec::new();
                if !open.closed {
                    let mut depth = 0usize;
                    while i < nodes.len() {
                        let next = nodes[i];
                        i += 1;
                        if is_aside_close(next) {
                            if depth == 0 {
                                break;
                            }
                            depth -= 1;
                        } else if aside_open(next).is_some_and(|o| !o.closed) {
                            depth += 1;
                        }
                        body.push(next);
                    }
                }
                out.push(self.aside(&open.head, body));
                continue;
            }
            if let Some(block) = self.block(node) {
                out.push(block);
            }
        }
        out
    }

    fn block<'a>(&mut self, node: &'a AstNode<'a>) -> Option<Block> {
        let value = node.data.borrow().value.clone();
        match value {
            NodeValue::Paragraph => Some(Block::paragraph(self.inlines(node))),
            NodeValue::Heading(heading) => Some(Block::heading(heading.level, self.inlines(node))),
            NodeValue::List(list) => Some(Block::List(List {
                ordered: matches!(list.list_type, ListType::Ordered),
                items: node.children().map(|item| self.list_item(item)).collect(),
            })),
            NodeValue::BlockQuote => Some(self.quote(node)),
            NodeValue::CodeBlock(code) => {
                if let Some(format) = code.info.trim().strip_prefix(RAW_FENCE_PREFIX) {
                    let text = code.literal.strip_suffix('\n').unwrap_or(&code.literal);
                    return Some(Block::Raw(Raw {
                        format: format.to_string(),
                        text: text.to_string(),
                    }));
                }
                let language = code.info.trim();
                Some(Block::Code(CodeBlock {
                    language: (!language.is_empty()).then(|| language.to_string()),
                    text: code.literal,
                }))
            }
            NodeValue::ThematicBreak => Some(Block::Rule),
            NodeValue::FrontMatter(_) => None,
            _ => Some(Block::Raw(Raw {
                format: "markdown".to_string(),
                text: self.source_slice(node),
            })),
        }
    }

    fn list_item<'a>(&mut self, node: &'a AstNode<'a>) -> ListItem {
        let checked = match &node.data.borrow().value {
            NodeValue::TaskItem(mark) => Some(mark.is_some_and(|c| !c.is_whitespace())),
            _ => None,
        };
        let mut kids: Vec<&'a AstNode<'a>> = node.children().collect();
        let mut content = Vec::new();
        if kids
            .first()
            .is_some_and(|first| matches!(first.data.borrow().value, NodeValue::Paragraph))
        {
            let first = kids.remove(0);
            content = self.inlines(first);
        }
        ListItem {
            checked,
            content,
            children: self.blocks(kids),
        }
    }

    /// A blockquote, or an lk-md callout when its first line is `[!kind]`.
    fn quote<'a>(&mut self, node: &'a AstNode<'a>) -> Block {
        let marked = node
            .first_child()
            .is_some_and(|first| self.starts_with_marker(first));
        let mut body = self.blocks(node.children().collect());
        if !marked {
            return Block::Quote(Quote { body });
        }

        let mut marker = String::new();
        if let Some(Block::Paragraph(first)) = body.first_mut() {
            let mut content = normalize_inlines(std::mem::take(&mut first.content));
            if let Some(Inline::Text(run)) = content.first_mut() {
                if let Some((inside, rest)) = run
                    .text
                    .strip_prefix("[!")
                    .and_then(|text| text.split_once(']'))
                {
                    marker = inside.to_string();
                    run.text = rest.trim_start_matches(['+', '-']).trim_start().to_string();
                }
            }
            first.content = content;
        }
        let kind = self.callout_kind(&marker);
        Block::Callout(Callout { kind, body })
    }

    fn starts_with_marker<'a>(&self, node: &'a AstNode<'a>) -> bool {
        let data = node.data.borrow();
        if !matches!(data.value, NodeValue::Paragraph) {
            return false;
        }
        let start = data.sourcepos.start;
        let Some(line) = self.lines.get(start.line.saturating_sub(1)) else {
            return false;
        };
        let from = start.column.saturating_sub(1);
        line.get(from..)
            .unwrap_or(line)
            .trim_start_matches(['>', ' ', '\t'])
            .starts_with("[!")
    }

    /// A Notion `<aside>`: the head text carries the icon emoji and the first
    /// paragraph, the nodes up to `</aside>` are the rest of the body.
    fn aside<'a>(&mut self, head: &str, rest: Vec<&'a AstNode<'a>>) -> Block {
        let mut body = Reader::new(head, self.ctx).sub_document(head, &mut self.diagnostics);
        let mut marker = None;
        if let Some(Block::Paragraph(first)) = body.first_mut() {
            let mut content = normalize_inlines(std::mem::take(&mut first.content));
            if let Some(Inline::Text(run)) = content.first_mut() {
                let (emoji, text) = callouts::split_emoji(&run.text);
                if !emoji.is_empty() {
                    marker = Some(emoji.to_string());
                    run.text = text.to_string();
                }
            }
            first.content = content;
        }
        body.extend(self.blocks(rest));

        let kind = match marker.as_deref() {
            Some(emoji) => match callouts::kind_for_emoji(emoji) {
                Some(kind) => kind.to_string(),
                None => {
                    self.diagnostics.warn(
                        WarningKind::UnknownCallout,
                        self.ctx.subject,
                        format!("callout icon '{emoji}' not recognized, using '{DEFAULT_KIND}'"),
                    );
                    DEFAULT_KIND.to_string()
                }
            },
            None => {
                self.diagnostics.warn(
                    WarningKind::UnknownCallout,
                    self.ctx.subject,
                    format!("callout without icon, using '{DEFAULT_KIND}'"),
                );
                DEFAULT_KIND.to_string()
            }
        };
        Block::Callout(Callout { kind, body })
    }

    fn sub_document(mut self, source: &str, diagnostics: &mut Diagnostics) -> Vec<Block> {
        let blocks = self.document(source);
        diagnostics.extend(self.diagnostics.into_warnings());
        blocks
    }

    fn callout_kind(&mut self, marker: &str) -> String {
        match callouts::resolve_kind(marker) {
            Some(kind) => kind.to_string(),
            None => {
                self.diagnostics.warn(
                    WarningKind::UnknownCallout,
                    self.ctx.subject,
                    format!("callout marker '{marker}' not recognized, using '{DEFAULT_KIND}'"),
                );
                DEFAULT_KIND.to_string()
            }
        }
    }

    fn inlines<'a>(&mut self, node: &'a AstNode<'a>) -> Vec<Inline> {
        let mut out = Vec::new();
        for child in node.children() {
            self.inline(child, Style::default(), &mut out);
        }
        out
    }

    fn inline<'a>(&mut self, node: &'a AstNode<'a>, style: Style, out: &mut Vec<Inline>) {
        let value = node.data.borrow().value.clone();
        match value {
            NodeValue::Text(text) => out.push(Inline::Text(TextRun::styled(text, style))),
            NodeValue::SoftBreak => out.push(Inline::Text(TextRun::styled(" ", style))),
            NodeValue::LineBreak => out.push(Inline::Break),
            NodeValue::Code(code) => out.push(Inline::Text(TextRun::styled(
                code.literal,
                style.with(Style::CODE),
            ))),
            NodeValue::Emph => self.styled_children(node, style.with(Style::ITALIC), out),
            NodeValue::Strong => self.styled_children(node, style.with(Style::BOLD), out),
            NodeValue::Strikethrough => self.styled_children(
                node,
                style.with(Style {
                    strike: true,
                    ..Style::default()
                }),
                out,
            ),
            NodeValue::Link(link) => {
                let target = match (self.ctx.internal_link)(&link.url) {
                    Some(id) => LinkTarget::Internal(id),
                    None => LinkTarget::External(link.url.clone()),
                };
                out.push(Inline::Link(Link {
                    text: flatten_text(node),
                    target,
                }));
            }
            NodeValue::Image(link) => {
                let source = match (self.ctx.asset)(&link.url) {
                    Some(name) => ImageSource::Asset(name),
                    None => ImageSource::External(link.url.clone()),
                };
                out.push(Inline::Image(Image {
                    source,
                    alt: flatten_text(node),
                    title: (!link.title.is_empty()).then(|| link.title.clone()),
                }));
            }
            NodeValue::HtmlInline(html) => {
                let tag = html.trim().to_ascii_lowercase();
                if matches!(tag.as_str(), "<br>" | "<br/>" | "<br />") {
                    out.push(Inline::Break);
                }
            }
            _ => self.styled_children(node, style, out),
        }
    }

    fn styled_children<'a>(&mut self, node: &'a AstNode<'a>, style: Style, out: &mut Vec<Inline>) {
        for child in node.children() {
            self.inline(child, style, out);
        }
    }

    /// Exact source text of a block: its lines, the first cut at its column.
    fn source_slice<'a>(&self, node: &'a AstNode<'a>) -> String {
        let pos = node.data.borrow().sourcepos;
        let start = pos.start.line.max(1);
        let end = pos.end.line.max(start).min(self.lines.len());
        if start > end {
            return String::new();
        }
        let mut lines: Vec<&str> = self.lines[start - 1..end].to_vec();
        if let Some(first) = lines.first_mut() {
            *first = first.get(pos.start.column.saturating_sub(1)..).unwrap_or(first);
        }
        lines.join("\n").trim_end().to_string()
    }
}

struct AsideOpen {
    head: String,
    closed: bool,
}

fn html_literal<'a>(node: &'a AstNode<'a>) -> Option<String> {
    match &node.data.borrow().value {
        NodeValue::HtmlBlock(html) => Some(html.literal.clone()),
        _ => None,
    }
}

fn aside_open<'a>(node: &'a AstNode<'a>) -> Option<AsideOpen> {
    let literal = html_literal(node)?;
    let trimmed = literal.trim_start();
    let rest = strip_prefix_ignore_case(trimmed, "<aside>")?;
    let close = rest.to_ascii_lowercase().find("</aside>");
    Some(match close {
        Some(at) => AsideOpen {
            head: rest[..at].trim().to_string(),
            closed: true,
        },
        None => AsideOpen {
            head: rest.trim().to_string(),
            closed: false,
        },
    })
}

fn is_aside_close<'a>(node: &'a AstNode<'a>) -> bool {
    html_literal(node)
        .is_some_and(|literal| strip_prefix_ignore_case(literal.trim(), "</aside>").is_some())
}

fn strip_prefix_ignore_case<'t>(text: &'t str, prefix: &str) -> Option<&'t str> {
    let head = text.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix).then(|| &text[prefix.len()..])
}

fn flatten_text<'a>(node: &'a AstNode<'a>) -> String {
    let mut text = String::new();
    collect_text(node, &mut text);
    text
}

fn collect_text<'a>(node: &'a AstNode<'a>, output: &mut String) {
    match &node.data.borrow().value {
        NodeValue::Text(text) => output.push_str(text),
        NodeValue::Code(code) => output.push_str(&code.literal),
        NodeValue::SoftBreak | NodeValue::LineBreak => output.push(' '),
        _ => {
            for child in node.children() {
                collect_text(child, output);
            }
        }
    }
}
