//! Intermediate Representation (IR) for page content.
//!
//! This module defines the format-agnostic content tree every resource body is
//! held in. Markdown dialects and the typed JSON nodes are parsed into it and
//! exported from it, and the diff engine compares it.

pub mod nodes;
pub mod normalize;
