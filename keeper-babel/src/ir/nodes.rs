//! Core data structures for the canonical content AST.

/// The body of one resource.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Document {
    pub blocks: Vec<Block>,
}

impl Document {
    pub fn new(blocks: Vec<Block>) -> Self {
        Document { blocks }
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

/// A block-level content node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Paragraph(Paragraph),
    Heading(Heading),
    List(List),
    Callout(Callout),
    Image(Image),
    Quote(Quote),
    Code(CodeBlock),
    Rule,
    /// Content no canonical node covers, kept verbatim
    Raw(Raw),
}

/// Represents a paragraph of text.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Paragraph {
    pub content: Vec<Inline>,
}

/// Represents a heading with a specific level (1-6).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heading {
    pub level: u8,
    pub content: Vec<Inline>,
}

/// Represents a list of items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct List {
    pub ordered: bool,
    pub items: Vec<ListItem>,
}

/// Represents an item in a list.
///
/// `checked` is `Some` for todo items.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ListItem {
    pub checked: Option<bool>,
    pub content: Vec<Inline>,
    pub children: Vec<Block>,
}

/// A highlighted aside. `kind` is one of [`crate::common::callouts::KINDS`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Callout {
    pub kind: String,
    pub body: Vec<Block>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Quote {
    pub body: Vec<Block>,
}

/// Represents a block of verbatim code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBlock {
    pub language: Option<String>,
    pub text: String,
}

/// Unmapped source content.
///
/// `format` names the representation `text` is written in (`markdown`,
/// `lk-json`); exporters for that format emit `text` unchanged, all others
/// wrap it so it survives the next parse bit for bit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Raw {
    pub format: String,
    pub text: String,
}

/// Represents an image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    pub source: ImageSource,
    pub alt: String,
    pub title: Option<String>,
}

/// Where an image's bytes come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// One of the owning resource's attachments, by file name
    Asset(String),
    /// Anything else: absolute URLs, paths outside the page's asset folder
    External(String),
}

impl ImageSource {
    pub fn as_str(&self) -> &str {
        match self {
            ImageSource::Asset(name) => name,
            ImageSource::External(url) => url,
        }
    }
}

/// Inline content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inline {
    Text(TextRun),
    Link(Link),
    Image(Image),
    /// Hard line break
    Break,
}

impl Inline {
    pub fn plain(text: impl Into<String>) -> Self {
        Inline::Text(TextRun::plain(text))
    }
}

/// A run of text sharing one style.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextRun {
    pub text: String,
    pub style: Style,
}

impl TextRun {
    pub fn plain(text: impl Into<String>) -> Self {
        TextRun {
            text: text.into(),
            style: Style::default(),
        }
    }

    pub fn styled(text: impl Into<String>, style: Style) -> Self {
        TextRun {
            text: text.into(),
            style,
        }
    }
}

/// Style flags for a text run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Style {
    pub bold: bool,
    pub italic: bool,
    pub code: bool,
    pub strike: bool,
}

impl Style {
    pub const BOLD: Style = Style {
        bold: true,
        italic: false,
        code: false,
        strike: false,
    };
    pub const ITALIC: Style = Style {
        bold: false,
        italic: true,
        code: false,
        strike: false,
    };
    pub const CODE: Style = Style {
        bold: false,
        italic: false,
        code: true,
        strike: false,
    };

    pub fn is_plain(&self) -> bool {
        *self == Style::default()
    }

    /// Union of two styles, used while descending nested emphasis.
    pub fn with(self, other: Style) -> Style {
        Style {
            bold: self.bold || other.bold,
            italic: self.italic || other.italic,
            code: self.code || other.code,
            strike: self.strike || other.strike,
        }
    }
}

/// A hyperlink. The text is kept plain; styles on link text are not carried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub text: String,
    pub target: LinkTarget,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkTarget {
    External(String),
    /// Another page of the workspace, by the identifier it had when parsed
    Internal(String),
}

impl Block {
    pub fn paragraph(content: Vec<Inline>) -> Self {
        Block::Paragraph(Paragraph { content })
    }

    pub fn heading(level: u8, content: Vec<Inline>) -> Self {
        Block::Heading(Heading { level, content })
    }

    /// Name used by the inspect output and diff messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Block::Paragraph(_) => "paragraph",
            Block::Heading(_) => "heading",
            Block::List(_) => "list",
            Block::Callout(_) => "callout",
            Block::Image(_) => "image",
            Block::Quote(_) => "quote",
            Block::Code(_) => "code",
            Block::Rule => "rule",
            Block::Raw(_) => "raw",
        }
    }
}

/// Visit every inline of a block tree, depth first.
pub fn walk_inlines<'a>(blocks: &'a [Block], visit: &mut dyn FnMut(&'a Inline)) {
    for block in blocks {
        match block {
            Block::Paragraph(p) => p.content.iter().for_each(&mut *visit),
            Block::Heading(h) => h.content.iter().for_each(&mut *visit),
            Block::List(list) => {
                for item in &list.items {
                    item.content.iter().for_each(&mut *visit);
                    walk_inlines(&item.children, visit);
                }
            }
            Block::Callout(c) => walk_inlines(&c.body, visit),
            Block::Quote(q) => walk_inlines(&q.body, visit),
            Block::Image(_) | Block::Code(_) | Block::Rule | Block::Raw(_) => {}
        }
    }
}

/// Identifiers of every internal link in document order.
pub fn internal_link_targets(blocks: &[Block]) -> Vec<&str> {
    let mut targets = Vec::new();
    walk_inlines(blocks, &mut |inline| {
        if let Inline::Link(Link {
            target: LinkTarget::Internal(id),
            ..
        }) = inline
        {
            targets.push(id.as_str());
        }
    });
    targets
}
