//! Helpers shared by several formats: names and ids, link targets, callout
//! markers, directory listings, the folder manifest and CSV tables.

pub mod callouts;
pub mod csv_tables;
pub mod links;
pub mod manifest;
pub mod names;
pub mod tree_walk;
