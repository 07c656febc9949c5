//! Per-format tests through the registry: detection, export layout and
//! reading the export back.

mod lk_json;
mod lk_md;
mod notion;
