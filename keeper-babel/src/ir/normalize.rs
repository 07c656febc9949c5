//! Canonical form for content trees.
//!
//! Every parser runs its output through [`normalize_blocks`], so two sources
//! that mean the same thing produce equal values regardless of how their
//! format happened to split text runs. The rules are exactly the ones the
//! markdown dialects cannot preserve anyway:
//!
//! - newlines inside text fold into spaces (markdown soft breaks)
//! - styled runs never start or end with whitespace (emphasis delimiters
//!   cannot be flanked by spaces), the whitespace moves to a plain run
//! - adjacent runs of the same style merge, empty runs disappear
//! - whitespace at block edges and around hard breaks is dropped
//! - empty paragraphs disappear, and a paragraph holding a single image is an
//!   image block
//! - adjacent lists of the same kind are one list, and a list item whose text
//!   is empty takes its first child paragraph as its text
//! - non-empty code ends with a newline, headings hold no hard breaks

use super::nodes::*;

pub fn normalize_document(doc: Document) -> Document {
    Document {
        blocks: normalize_blocks(doc.blocks),
    }
}

pub fn normalize_blocks(blocks: Vec<Block>) -> Vec<Block> {
    let mut out: Vec<Block> = Vec::with_capacity(blocks.len());
    for block in blocks.into_iter().filter_map(normalize_block) {
        if let (Some(Block::List(prev)), Block::List(next)) = (out.last_mut(), &block) {
            if prev.ordered == next.ordered {
                prev.items.extend(next.items.iter().cloned());
                continue;
            }
        }
        out.push(block);
    }
    out
}

fn normalize_block(block: Block) -> Option<Block> {
    match block {
        Block::Paragraph(p) => {
            let content = normalize_inlines(p.content);
            match content.as_slice() {
                [] => None,
                [Inline::Image(image)] => Some(Block::Image(normalize_image(image.clone()))),
                _ => Some(Block::Paragraph(Paragraph { content })),
            }
        }
        Block::Heading(h) => Some(Block::Heading(Heading {
            level: h.level.clamp(1, 6),
            content: normalize_inlines(
                h.content
                    .into_iter()
                    .map(|inline| match inline {
                        Inline::Break => Inline::plain(" "),
                        other => other,
                    })
                    .collect(),
            ),
        })),
        Block::List(list) => {
            let items: Vec<ListItem> = list
                .items
                .into_iter()
                .map(|item| {
                    let mut content = normalize_inlines(item.content);
                    let mut children = normalize_blocks(item.children);
                    if content.is_empty() {
                        if let Some(Block::Paragraph(_)) = children.first() {
                            if let Block::Paragraph(first) = children.remove(0) {
                                content = first.content;
                            }
                        }
                    }
                    ListItem {
                        checked: item.checked,
                        content,
                        children,
                    }
                })
                .collect();
            if items.is_empty() {
                None
            } else {
                Some(Block::List(List {
                    ordered: list.ordered,
                    items,
                }))
            }
        }
        Block::Callout(c) => Some(Block::Callout(Callout {
            kind: c.kind.trim().to_lowercase(),
            body: normalize_blocks(c.body),
        })),
        Block::Quote(q) => Some(Block::Quote(Quote {
            body: normalize_blocks(q.body),
        })),
        Block::Image(image) => Some(Block::Image(normalize_image(image))),
        Block::Code(code) => {
            let mut text = code.text;
            if !text.is_empty() && !text.ends_with('\n') {
                text.push('\n');
            }
            Some(Block::Code(CodeBlock {
                language: code
                    .language
                    .map(|l| l.trim().to_string())
                    .filter(|l| !l.is_empty()),
                text,
            }))
        }
        other @ (Block::Rule | Block::Raw(_)) => Some(other),
    }
}

fn normalize_image(image: Image) -> Image {
    Image {
        source: image.source,
        alt: fold_newlines(&image.alt).trim().to_string(),
        title: image.title.filter(|t| !t.is_empty()),
    }
}

fn fold_newlines(text: &str) -> String {
    text.replace("\r\n", " ").replace(['\n', '\r'], " ")
}

/// Canonicalize a sequence of inline nodes.
pub fn normalize_inlines(inlines: Vec<Inline>) -> Vec<Inline> {
    // Fold newlines, pull edge whitespace out of styled runs
    let mut expanded: Vec<Inline> = Vec::with_capacity(inlines.len());
    for inline in inlines {
        match inline {
            Inline::Text(run) => {
                let text = fold_newlines(&run.text);
                if run.style.is_plain() || run.style.code {
                    expanded.push(Inline::Text(TextRun::styled(text, run.style)));
                    continue;
                }
                let core = text.trim();
                if core.is_empty() {
                    expanded.push(Inline::plain(text));
                    continue;
                }
                let start = text.len() - text.trim_start().len();
                let end = text.trim_end().len();
                if start > 0 {
                    expanded.push(Inline::plain(&text[..start]));
                }
                expanded.push(Inline::Text(TextRun::styled(core, run.style)));
                if end < text.len() {
                    expanded.push(Inline::plain(&text[end..]));
                }
            }
            Inline::Link(link) => expanded.push(Inline::Link(Link {
                text: fold_newlines(&link.text),
                target: link.target,
            })),
            Inline::Image(image) => expanded.push(Inline::Image(normalize_image(image))),
            Inline::Break => expanded.push(Inline::Break),
        }
    }

    let mut merged = merge_runs(expanded);

    // Markdown eats whitespace around hard breaks
    for i in 0..merged.len() {
        if !matches!(merged[i], Inline::Break) {
            continue;
        }
        if i > 0 {
            trim_plain(&mut merged[i - 1], false, true);
        }
        if i + 1 < merged.len() {
            trim_plain(&mut merged[i + 1], true, false);
        }
    }

    // Leading and trailing breaks carry nothing
    while matches!(merged.first(), Some(Inline::Break)) {
        merged.remove(0);
    }
    while matches!(merged.last(), Some(Inline::Break)) {
        merged.pop();
    }

    if let Some(first) = merged.first_mut() {
        trim_plain(first, true, false);
    }
    if let Some(last) = merged.last_mut() {
        trim_plain(last, false, true);
    }

    merge_runs(
        merged
            .into_iter()
            .filter(|inline| !matches!(inline, Inline::Text(run) if run.text.is_empty()))
            .collect(),
    )
}

fn trim_plain(inline: &mut Inline, start: bool, end: bool) {
    if let Inline::Text(run) = inline {
        if run.style.code {
            return;
        }
        if start {
            run.text = run.text.trim_start().to_string();
        }
        if end {
            run.text = run.text.trim_end().to_string();
        }
    }
}

fn merge_runs(inlines: Vec<Inline>) -> Vec<Inline> {
    let mut out: Vec<Inline> = Vec::with_capacity(inlines.len());
    for inline in inlines {
        if let Inline::Text(next) = &inline {
            if next.text.is_empty() {
                continue;
            }
            if let Some(Inline::Text(prev)) = out.last_mut() {
                if prev.style == next.style {
                    prev.text.push_str(&next.text);
                    continue;
                }
            }
        }
        out.push(inline);
    }
    out
}
