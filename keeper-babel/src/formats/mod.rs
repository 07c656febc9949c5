//! Format implementations
//!
//! Each format reads a physical export into the canonical model and writes
//! the model back out. The two folder formats share the markdown body
//! conversion in [`markdown`].

pub mod lk_json;
pub mod lk_md;
pub mod markdown;
pub mod notion;

pub use lk_json::LkJsonFormat;
pub use lk_md::LkMarkdownFormat;
pub use notion::NotionFormat;
