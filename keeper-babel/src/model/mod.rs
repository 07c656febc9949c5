//! Canonical data model
//!
//! Every format parses into [`ConversionData`] and every exporter reads from
//! it. A snapshot is a forest of [`Resource`]s (pages) plus a list of
//! [`DatabaseTable`]s and a small metadata map. Parsers build snapshots through
//! [`WorkspaceBuilder`], which resolves the parent/child links and repairs
//! broken trees; once built, a snapshot is only read.

pub mod builder;

pub use builder::WorkspaceBuilder;

use crate::ir::nodes::Document;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::PathBuf;
use thiserror::Error;

/// Identifier of a resource, unique within one snapshot.
pub type ResourceId = String;

/// A file attached to a resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    /// File name, which is also how content refers to it
    pub name: String,
    /// Where the bytes currently live, if known
    pub origin: Option<PathBuf>,
}

impl Asset {
    pub fn new(name: impl Into<String>, origin: Option<PathBuf>) -> Self {
        Asset {
            name: name.into(),
            origin,
        }
    }
}

/// Header image shown above a page.
#[derive(Debug, Clone)]
pub struct Banner {
    pub url: String,
    /// Vertical focus in percent
    pub y_position: f64,
}

impl Banner {
    pub const DEFAULT_Y_POSITION: f64 = 50.0;
}

impl PartialEq for Banner {
    fn eq(&self, other: &Self) -> bool {
        self.url == other.url && self.y_position.to_bits() == other.y_position.to_bits()
    }
}

impl Eq for Banner {}

/// How a page is displayed in its wiki. Only the structured JSON export
/// stores all of it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Appearance {
    pub icon_color: Option<String>,
    pub icon_shape: Option<String>,
    pub hidden: bool,
    pub locked: bool,
    pub banner: Option<Banner>,
}

impl Appearance {
    pub fn is_default(&self) -> bool {
        *self == Appearance::default()
    }
}

/// A page or entry node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    pub id: ResourceId,
    pub name: String,
    pub parent: Option<ResourceId>,
    pub children: Vec<ResourceId>,
    pub content: Document,
    pub properties: BTreeMap<String, String>,
    pub tags: BTreeSet<String>,
    pub aliases: BTreeSet<String>,
    pub icon: Option<String>,
    pub appearance: Appearance,
    pub attachments: Vec<Asset>,
}

impl Resource {
    pub fn new(id: impl Into<ResourceId>, name: impl Into<String>) -> Self {
        Resource {
            id: id.into(),
            name: name.into(),
            parent: None,
            children: Vec::new(),
            content: Document::default(),
            properties: BTreeMap::new(),
            tags: BTreeSet::new(),
            aliases: BTreeSet::new(),
            icon: None,
            appearance: Appearance::default(),
            attachments: Vec::new(),
        }
    }

    pub fn with_parent(mut self, parent: Option<ResourceId>) -> Self {
        self.parent = parent;
        self
    }

    pub fn with_content(mut self, content: Document) -> Self {
        self.content = content;
        self
    }
}

/// One row of a database table, keyed by its primary column value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseRow {
    pub name: String,
    pub values: BTreeMap<String, String>,
}

/// A named table of rows.
///
/// Column order is the order in which columns were first seen, primary column
/// first, and is what exporters write as the header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseTable {
    pub name: String,
    pub primary_column: String,
    columns: Vec<String>,
    rows: Vec<DatabaseRow>,
}

impl DatabaseTable {
    pub fn new(name: impl Into<String>, primary_column: impl Into<String>) -> Self {
        let primary_column = primary_column.into();
        DatabaseTable {
            name: name.into(),
            columns: vec![primary_column.clone()],
            primary_column,
            rows: Vec::new(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[DatabaseRow] {
        &self.rows
    }

    pub fn row(&self, name: &str) -> Option<&DatabaseRow> {
        self.rows.iter().find(|row| row.name == name)
    }

    /// Register a column without adding values, keeping first-seen order.
    pub fn add_column(&mut self, column: &str) {
        if !self.columns.iter().any(|c| c == column) {
            self.columns.push(column.to_string());
        }
    }

    /// Append a row. The primary column value is always the row name.
    pub fn push_row<I, K, V>(&mut self, name: impl Into<String>, values: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let name = name.into();
        let mut row_values = BTreeMap::new();
        for (key, value) in values {
            let key = key.into();
            self.add_column(&key);
            row_values.insert(key, value.into());
        }
        row_values.insert(self.primary_column.clone(), name.clone());
        self.rows.push(DatabaseRow {
            name,
            values: row_values,
        });
    }
}

/// Tree invariant violations reported by [`ConversionData::validate`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModelError {
    #[error("resource '{0}' is referenced but does not exist")]
    MissingResource(ResourceId),
    #[error("resource '{child}' is listed under '{listed}' but its parent is {actual:?}")]
    ParentMismatch {
        child: ResourceId,
        listed: String,
        actual: Option<ResourceId>,
    },
    #[error("resource '{0}' is reachable more than once")]
    VisitedTwice(ResourceId),
    #[error("resource '{0}' is not reachable from any root")]
    Unreachable(ResourceId),
}

/// A full snapshot of one workspace.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversionData {
    pub roots: Vec<ResourceId>,
    pub resources: BTreeMap<ResourceId, Resource>,
    pub databases: Vec<DatabaseTable>,
    pub metadata: BTreeMap<String, String>,
}

impl ConversionData {
    pub fn get(&self, id: &str) -> Option<&Resource> {
        self.resources.get(id)
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty() && self.databases.is_empty()
    }

    pub fn database(&self, name: &str) -> Option<&DatabaseTable> {
        self.databases.iter().find(|table| table.name == name)
    }

    pub fn children_of(&self, id: &str) -> impl Iterator<Item = &Resource> {
        self.get(id)
            .map(|r| r.children.as_slice())
            .unwrap_or_default()
            .iter()
            .filter_map(|child| self.get(child))
    }

    /// Resources in pre-order (parents before children, siblings in order),
    /// each with its depth.
    pub fn walk(&self) -> Vec<(usize, &Resource)> {
        let mut out = Vec::with_capacity(self.resources.len());
        let mut seen = HashSet::new();
        let mut stack: Vec<(usize, &str)> =
            self.roots.iter().rev().map(|id| (0, id.as_str())).collect();
        while let Some((depth, id)) = stack.pop() {
            let Some(resource) = self.get(id) else {
                continue;
            };
            if !seen.insert(id) {
                continue;
            }
            out.push((depth, resource));
            for child in resource.children.iter().rev() {
                stack.push((depth + 1, child.as_str()));
            }
        }
        out
    }

    /// Names from the root down to (excluding) the resource itself.
    pub fn ancestor_names(&self, id: &str) -> Vec<&str> {
        let mut names = Vec::new();
        let mut seen = HashSet::new();
        let mut current = self.get(id).and_then(|r| r.parent.as_deref());
        while let Some(parent_id) = current {
            if !seen.insert(parent_id) {
                break;
            }
            let Some(parent) = self.get(parent_id) else {
                break;
            };
            names.push(parent.name.as_str());
            current = parent.parent.as_deref();
        }
        names.reverse();
        names
    }

    /// Check the tree invariants: every child link points at an existing
    /// resource whose parent agrees, and every resource is reachable from the
    /// roots exactly once.
    pub fn validate(&self) -> Result<(), ModelError> {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut stack: Vec<(&str, Option<&str>)> =
            self.roots.iter().map(|id| (id.as_str(), None)).collect();
        while let Some((id, listed_under)) = stack.pop() {
            let resource = self
                .get(id)
                .ok_or_else(|| ModelError::MissingResource(id.to_string()))?;
            if resource.parent.as_deref() != listed_under {
                return Err(ModelError::ParentMismatch {
                    child: id.to_string(),
                    listed: listed_under.unwrap_or("<root>").to_string(),
                    actual: resource.parent.clone(),
                });
            }
            if !seen.insert(id) {
                return Err(ModelError::VisitedTwice(id.to_string()));
            }
            for child in &resource.children {
                stack.push((child.as_str(), Some(id)));
            }
        }
        if let Some(missing) = self.resources.keys().find(|id| !seen.contains(id.as_str())) {
            return Err(ModelError::Unreachable(missing.clone()));
        }
        Ok(())
    }
}
