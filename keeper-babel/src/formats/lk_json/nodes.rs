//! Typed rich-text nodes ↔ content IR
//!
//! Documents in the JSON export hold a tree of `{type, attrs, content, text,
//! marks}` nodes. Each known node type maps to one IR node by a fixed table.
//! Anything else, including a known block that holds an unknown inline node
//! or mark, is kept as `Raw{format: "lk-json"}` with the node's compact JSON.

use crate::common::callouts::{self, DEFAULT_KIND};
use crate::diagnostics::{Diagnostics, WarningKind};
use crate::formats::markdown::RAW_FENCE_PREFIX;
use crate::ir::nodes::*;
use serde_json::{json, Map, Value};

pub const RAW_FORMAT: &str = "lk-json";

/// Input side: how image sources of the current resource are classified.
pub struct NodeReader<'r> {
    pub subject: &'r str,
    pub asset: &'r dyn Fn(&str) -> Option<String>,
    pub diagnostics: &'r mut Diagnostics,
}

impl NodeReader<'_> {
    pub fn blocks(&mut self, nodes: &[Value]) -> Vec<Block> {
        nodes.iter().map(|node| self.block(node)).collect()
    }

    fn block(&mut self, node: &Value) -> Block {
        let kind = node_type(node);
        let mapped = match kind {
            "paragraph" => self.inlines(children(node)).map(Block::paragraph),
            "heading" => {
                let level = attr(node, "level").and_then(Value::as_u64).unwrap_or(1);
                self.inlines(children(node))
                    .map(|content| Block::heading(level.clamp(1, 6) as u8, content))
            }
            "bulletList" | "orderedList" | "taskList" => self.list(node, kind == "orderedList"),
            "blockquote" => Some(Block::Quote(Quote {
                body: self.blocks(children(node)),
            })),
            "callout" => Some(self.callout(node)),
            "codeBlock" => Some(code_block(node)),
            "rule" | "horizontalRule" => Some(Block::Rule),
            "image" => Some(Block::Image(self.image(node))),
            _ => None,
        };
        mapped.unwrap_or_else(|| raw(node))
    }

    fn list(&mut self, node: &Value, ordered: bool) -> Option<Block> {
        let mut items = Vec::new();
        for item in children(node) {
            let checked = match node_type(item) {
                "taskItem" => Some(attr(item, "checked").and_then(Value::as_bool).unwrap_or(false)),
                "listItem" => None,
                _ => return None,
            };
            let mut blocks = children(item);
            let mut content = Vec::new();
            if let Some((first, rest)) = blocks.split_first() {
                if node_type(first) == "paragraph" {
                    if let Some(inlines) = self.inlines(children(first)) {
                        content = inlines;
                        blocks = rest;
                    }
                }
            }
            items.push(ListItem {
                checked,
                content,
                children: self.blocks(blocks),
            });
        }
        Some(Block::List(List { ordered, items }))
    }

    fn callout(&mut self, node: &Value) -> Block {
        let marker = attr(node, "kind")
            .or_else(|| attr(node, "type"))
            .and_then(Value::as_str)
            .unwrap_or("");
        let kind = match callouts::resolve_kind(marker) {
            Some(kind) => kind.to_string(),
            None => {
                self.diagnostics.warn(
                    WarningKind::UnknownCallout,
                    self.subject,
                    format!("callout kind '{marker}' not recognized, using '{DEFAULT_KIND}'"),
                );
                DEFAULT_KIND.to_string()
            }
        };
        Block::Callout(Callout {
            kind,
            body: self.blocks(children(node)),
        })
    }

    fn image(&self, node: &Value) -> Image {
        let src = attr_str(node, "src");
        let source = match (self.asset)(src) {
            Some(name) => ImageSource::Asset(name),
            None => ImageSource::External(src.to_string()),
        };
        Image {
            source,
            alt: attr_str(node, "alt").to_string(),
            title: attr(node, "title")
                .and_then(Value::as_str)
                .filter(|t| !t.is_empty())
                .map(str::to_string),
        }
    }

    /// `None` when any inline node or mark is not understood.
    fn inlines(&self, nodes: &[Value]) -> Option<Vec<Inline>> {
        let mut out = Vec::with_capacity(nodes.len());
        for node in nodes {
            match node_type(node) {
                "text" => out.push(text_node(node)?),
                "mention" => out.push(Inline::Link(Link {
                    text: attr(node, "text")
                        .or_else(|| attr(node, "label"))
                        .and_then(Value::as_str)
                        .unwrap_or("")
                        .to_string(),
                    target: LinkTarget::Internal(attr_str(node, "id").to_string()),
                })),
                "hardBreak" => out.push(Inline::Break),
                "image" => out.push(Inline::Image(self.image(node))),
                _ => return None,
            }
        }
        Some(out)
    }
}

fn text_node(node: &Value) -> Option<Inline> {
    let text = node.get("text").and_then(Value::as_str).unwrap_or("");
    let mut style = Style::default();
    let mut href = None;
    for mark in node.get("marks").and_then(Value::as_array).map(Vec::as_slice).unwrap_or(&[]) {
        match node_type(mark) {
            "strong" | "bold" => style.bold = true,
            "em" | "italic" => style.italic = true,
            "code" => style.code = true,
            "strike" | "strikethrough" => style.strike = true,
            "link" => href = Some(attr_str(mark, "href").to_string()),
            _ => return None,
        }
    }
    Some(match href {
        Some(url) => Inline::Link(Link {
            text: text.to_string(),
            target: LinkTarget::External(url),
        }),
        None => Inline::Text(TextRun::styled(text, style)),
    })
}

fn code_block(node: &Value) -> Block {
    let text: String = children(node)
        .iter()
        .filter_map(|child| child.get("text").and_then(Value::as_str))
        .collect();
    let language = attr(node, "language").and_then(Value::as_str).map(str::trim);
    if let Some(format) = language.and_then(|l| l.strip_prefix(RAW_FENCE_PREFIX)) {
        return Block::Raw(Raw {
            format: format.to_string(),
            text,
        });
    }
    Block::Code(CodeBlock {
        language: language.filter(|l| !l.is_empty()).map(str::to_string),
        text,
    })
}

fn raw(node: &Value) -> Block {
    Block::Raw(Raw {
        format: RAW_FORMAT.to_string(),
        text: node.to_string(),
    })
}

fn node_type(node: &Value) -> &str {
    node.get("type").and_then(Value::as_str).unwrap_or("")
}

fn children(node: &Value) -> &[Value] {
    node.get("content")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn attr<'v>(node: &'v Value, key: &str) -> Option<&'v Value> {
    node.get("attrs")?.get(key).filter(|v| !v.is_null())
}

fn attr_str<'v>(node: &'v Value, key: &str) -> &'v str {
    attr(node, key).and_then(Value::as_str).unwrap_or("")
}

/// Output side: how internal links and attachments are written.
pub struct NodeWriter<'w> {
    /// Id of a link target in the exported document, `None` when it is not exported
    pub link_id: &'w dyn Fn(&str) -> Option<String>,
    pub asset_src: &'w dyn Fn(&str) -> String,
    /// (target id, link text) of internal links written as plain text
    pub unresolved: Vec<(String, String)>,
}

impl NodeWriter<'_> {
    pub fn blocks(&mut self, blocks: &[Block]) -> Vec<Value> {
        blocks.iter().map(|block| self.block(block)).collect()
    }

    fn block(&mut self, block: &Block) -> Value {
        match block {
            Block::Paragraph(p) => with_content(json!({"type": "paragraph"}), self.inlines(&p.content)),
            Block::Heading(h) => with_content(
                json!({"type": "heading", "attrs": {"level": h.level}}),
                self.inlines(&h.content),
            ),
            Block::List(list) => {
                let all_tasks =
                    !list.items.is_empty() && list.items.iter().all(|i| i.checked.is_some());
                let kind = match (list.ordered, all_tasks) {
                    (true, _) => "orderedList",
                    (false, true) => "taskList",
                    (false, false) => "bulletList",
                };
                let items = list.items.iter().map(|item| self.list_item(item)).collect();
                with_content(json!({"type": kind}), items)
            }
            Block::Callout(c) => with_content(
                json!({"type": "callout", "attrs": {"kind": c.kind}}),
                self.blocks(&c.body),
            ),
            Block::Quote(q) => with_content(json!({"type": "blockquote"}), self.blocks(&q.body)),
            Block::Image(image) => self.image(image),
            Block::Code(code) => code_value(code.language.as_deref(), &code.text),
            Block::Rule => json!({"type": "rule"}),
            Block::Raw(raw) if raw.format == RAW_FORMAT => serde_json::from_str(&raw.text)
                .unwrap_or_else(|_| {
                    code_value(Some(&format!("{RAW_FENCE_PREFIX}{RAW_FORMAT}")), &raw.text)
                }),
            Block::Raw(raw) => {
                code_value(Some(&format!("{RAW_FENCE_PREFIX}{}", raw.format)), &raw.text)
            }
        }
    }

    fn list_item(&mut self, item: &ListItem) -> Value {
        let mut content = Vec::new();
        if !item.content.is_empty() {
            content.push(with_content(
                json!({"type": "paragraph"}),
                self.inlines(&item.content),
            ));
        }
        content.extend(self.blocks(&item.children));
        let node = match item.checked {
            Some(checked) => json!({"type": "taskItem", "attrs": {"checked": checked}}),
            None => json!({"type": "listItem"}),
        };
        with_content(node, content)
    }

    fn image(&self, image: &Image) -> Value {
        let src = match &image.source {
            ImageSource::Asset(name) => (self.asset_src)(name),
            ImageSource::External(url) => url.clone(),
        };
        let mut attrs = Map::new();
        attrs.insert("src".into(), Value::String(src));
        attrs.insert("alt".into(), Value::String(image.alt.clone()));
        if let Some(title) = &image.title {
            attrs.insert("title".into(), Value::String(title.clone()));
        }
        json!({"type": "image", "attrs": attrs})
    }

    fn inlines(&mut self, inlines: &[Inline]) -> Vec<Value> {
        inlines.iter().map(|inline| self.inline(inline)).collect()
    }

    fn inline(&mut self, inline: &Inline) -> Value {
        match inline {
            Inline::Text(run) => {
                let mut marks = Vec::new();
                if run.style.bold {
                    marks.push(json!({"type": "strong"}));
                }
                if run.style.italic {
                    marks.push(json!({"type": "em"}));
                }
                if run.style.code {
                    marks.push(json!({"type": "code"}));
                }
                if run.style.strike {
                    marks.push(json!({"type": "strike"}));
                }
                text_value(&run.text, marks)
            }
            Inline::Link(link) => match &link.target {
                LinkTarget::External(url) => text_value(
                    &link.text,
                    vec![json!({"type": "link", "attrs": {"href": url}})],
                ),
                LinkTarget::Internal(id) => match (self.link_id)(id) {
                    Some(target) => json!({
                        "type": "mention",
                        "attrs": {"id": target, "text": link.text},
                    }),
                    None => {
                        self.unresolved.push((id.clone(), link.text.clone()));
                        text_value(&link.text, Vec::new())
                    }
                },
            },
            Inline::Image(image) => self.image(image),
            Inline::Break => json!({"type": "hardBreak"}),
        }
    }
}

fn text_value(text: &str, marks: Vec<Value>) -> Value {
    let mut node = json!({"type": "text", "text": text});
    if !marks.is_empty() {
        node["marks"] = Value::Array(marks);
    }
    node
}

fn code_value(language: Option<&str>, text: &str) -> Value {
    let node = json!({"type": "codeBlock", "attrs": {"language": language}});
    if text.is_empty() {
        node
    } else {
        with_content(node, vec![json!({"type": "text", "text": text})])
    }
}

fn with_content(mut node: Value, content: Vec<Value>) -> Value {
    if !content.is_empty() {
        node["content"] = Value::Array(content);
    }
    node
}
