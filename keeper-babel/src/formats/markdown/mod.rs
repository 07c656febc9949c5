//! Markdown page bodies
//!
//! Both folder formats store page content as markdown. This module converts a
//! page body to and from the content IR; the page layout around it (title,
//! property block, frontmatter, file naming) belongs to the formats
//! themselves.
//!
//! # Library Choice
//!
//! Parsing uses `comrak` (CommonMark plus the table, strikethrough and task
//! list extensions). Rendering is done by hand in [`serializer`]: each dialect
//! has its own callout syntax and internal link form, and the output has to
//! parse back into exactly the same IR, which needs tighter control over
//! escaping than a generic formatter gives.
//!
//! # Element Mapping Table
//!
//! | IR element      | lk-md dialect              | Notion dialect                  |
//! |-----------------|----------------------------|---------------------------------|
//! | Paragraph       | Paragraph                  | Paragraph                       |
//! | Heading         | `#` .. `######`            | `#` .. `######`                 |
//! | List            | `- ` / `1. `               | `- ` / `1. `                    |
//! | Todo item       | `- [ ] ` / `- [x] `        | `- [ ] ` / `- [x] `             |
//! | Callout         | `> [!kind] text`           | `<aside>` + kind emoji          |
//! | Quote           | `> `                       | `> `                            |
//! | Code            | fenced block               | fenced block                    |
//! | Image           | `![alt](src)`              | `![alt](src)`                   |
//! | Internal link   | relative `.md` path        | relative `.md` path with id     |
//! | Raw (markdown)  | verbatim                   | verbatim                        |
//! | Raw (other)     | ```` ```keeper-raw:<fmt> ```` fence | same                   |
//!
//! Both dialects read both callout syntaxes.
//!
//! # Lossy Conversions
//!
//! - Styles on link text are dropped, links carry plain text
//! - Tables, HTML blocks and other unmapped blocks become raw markdown
//! - Inline HTML tags are stripped, their text is kept

pub mod parser;
pub mod serializer;

pub use parser::{parse_markdown, ParseContext, ParsedMarkdown};
pub use serializer::{render_blocks, RenderContext, Rendered};

/// Prefix of fenced code info strings that carry raw content of another format.
pub const RAW_FENCE_PREFIX: &str = "keeper-raw:";

/// Markdown flavour of a folder format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Notion,
    LkMarkdown,
}
