//! Round-trip structural diff
//!
//! [`compare`] aligns the resources of two snapshots, first by id and then by
//! name and ancestor names, and compares every aligned pair dimension by
//! dimension. Each difference carries a [`Severity`]; the report's verdict is
//! the worst of them, and never better than `Minor` once a warning was
//! recorded. The engine never fails: whatever does not match is a finding.

pub mod report;

pub use report::render;

use crate::common::manifest::{envelope, ENVELOPE_KEYS};
use crate::diagnostics::Warning;
use crate::ir::nodes::{Block, Inline, LinkTarget};
use crate::model::{Appearance, Banner, ConversionData, DatabaseTable, Resource, ResourceId};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Perfect,
    Minor,
    Significant,
}

impl Severity {
    pub fn label(&self) -> &'static str {
        match self {
            Severity::Perfect => "perfect",
            Severity::Minor => "minor",
            Severity::Significant => "significant",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// What part of a resource or table differs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dimension {
    Missing,
    Extra,
    Name,
    Property,
    Tags,
    Aliases,
    Icon,
    Appearance,
    Attachments,
    Parent,
    Children,
    Content,
    Link,
    RootOrder,
    Envelope,
    Table,
    Columns,
    ColumnOrder,
    Row,
    Cell,
}

impl Dimension {
    pub fn label(&self) -> &'static str {
        match self {
            Dimension::Missing => "missing",
            Dimension::Extra => "extra",
            Dimension::Name => "name",
            Dimension::Property => "property",
            Dimension::Tags => "tags",
            Dimension::Aliases => "aliases",
            Dimension::Icon => "icon",
            Dimension::Appearance => "appearance",
            Dimension::Attachments => "attachments",
            Dimension::Parent => "parent",
            Dimension::Children => "children",
            Dimension::Content => "content",
            Dimension::Link => "broken internal link",
            Dimension::RootOrder => "root order",
            Dimension::Envelope => "export envelope",
            Dimension::Table => "table",
            Dimension::Columns => "columns",
            Dimension::ColumnOrder => "column order",
            Dimension::Row => "row",
            Dimension::Cell => "cell",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Difference {
    pub severity: Severity,
    pub dimension: Dimension,
    /// Property key, row name, link target; empty when the dimension says it all
    pub detail: String,
    pub old: Option<String>,
    pub new: Option<String>,
}

impl Difference {
    fn new(severity: Severity, dimension: Dimension, detail: impl Into<String>) -> Self {
        Difference {
            severity,
            dimension,
            detail: detail.into(),
            old: None,
            new: None,
        }
    }

    fn values(mut self, old: impl Into<String>, new: impl Into<String>) -> Self {
        self.old = Some(old.into());
        self.new = Some(new.into());
        self
    }
}

/// Differences of one resource, or of the tree as a whole.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceDiff {
    /// Name path of the resource, `/`-joined
    pub path: String,
    pub old_id: Option<ResourceId>,
    pub new_id: Option<ResourceId>,
    pub differences: Vec<Difference>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDiff {
    pub name: String,
    pub differences: Vec<Difference>,
}

#[derive(Debug, Clone, Default)]
pub struct DiffReport {
    pub chain: Option<String>,
    pub old_resources: usize,
    pub new_resources: usize,
    pub old_tables: usize,
    pub new_tables: usize,
    /// Tree-level differences such as root order
    pub structure: Vec<Difference>,
    pub resources: Vec<ResourceDiff>,
    pub tables: Vec<TableDiff>,
    /// (where the warning was recorded, warning)
    pub warnings: Vec<(String, Warning)>,
}

impl DiffReport {
    pub fn set_chain(&mut self, chain: impl Into<String>) {
        self.chain = Some(chain.into());
    }

    pub fn record_warnings(&mut self, origin: impl Into<String>, warnings: &[Warning]) {
        let origin = origin.into();
        self.warnings
            .extend(warnings.iter().map(|w| (origin.clone(), w.clone())));
    }

    pub fn differences(&self) -> impl Iterator<Item = &Difference> {
        self.structure
            .iter()
            .chain(self.resources.iter().flat_map(|r| &r.differences))
            .chain(self.tables.iter().flat_map(|t| &t.differences))
    }

    pub fn verdict(&self) -> Severity {
        let worst = self
            .differences()
            .map(|d| d.severity)
            .max()
            .unwrap_or(Severity::Perfect);
        if self.warnings.is_empty() {
            worst
        } else {
            worst.max(Severity::Minor)
        }
    }

    /// The report's closing line.
    pub fn result_line(&self) -> &'static str {
        match self.verdict() {
            Severity::Perfect => "RESULT: PERFECT MATCH",
            Severity::Minor => "RESULT: MINOR DIFFERENCES",
            Severity::Significant => "RESULT: SIGNIFICANT DIFFERENCES",
        }
    }
}

/// Compare the snapshot before a chain with the one after it.
pub fn compare(old: &ConversionData, new: &ConversionData) -> DiffReport {
    let alignment = align(old, new);
    let mut report = DiffReport {
        old_resources: old.len(),
        new_resources: new.len(),
        old_tables: old.databases.len(),
        new_tables: new.databases.len(),
        ..DiffReport::default()
    };

    let translate = |id: &str| alignment.get(id).cloned();

    for (_, resource) in old.walk() {
        let path = name_path(old, resource);
        match alignment.get(&resource.id) {
            Some(new_id) => {
                let Some(counterpart) = new.get(new_id) else {
                    continue;
                };
                let differences = compare_resource(old, resource, counterpart, &translate);
                if !differences.is_empty() {
                    report.resources.push(ResourceDiff {
                        path,
                        old_id: Some(resource.id.clone()),
                        new_id: Some(new_id.clone()),
                        differences,
                    });
                }
            }
            None => report.resources.push(ResourceDiff {
                path,
                old_id: Some(resource.id.clone()),
                new_id: None,
                differences: vec![Difference::new(
                    Severity::Significant,
                    Dimension::Missing,
                    "not present after the chain",
                )],
            }),
        }
    }

    let aligned_new: HashSet<&str> = alignment.values().map(String::as_str).collect();
    for (_, resource) in new.walk() {
        if !aligned_new.contains(resource.id.as_str()) {
            report.resources.push(ResourceDiff {
                path: name_path(new, resource),
                old_id: None,
                new_id: Some(resource.id.clone()),
                differences: vec![Difference::new(
                    Severity::Significant,
                    Dimension::Extra,
                    "not present before the chain",
                )],
            });
        }
    }

    let old_roots: Vec<String> = old.roots.iter().filter_map(|id| translate(id)).collect();
    let new_roots: Vec<String> = new
        .roots
        .iter()
        .filter(|id| old_roots.contains(id))
        .cloned()
        .collect();
    if old_roots != new_roots {
        report.structure.push(
            Difference::new(Severity::Minor, Dimension::RootOrder, "")
                .values(root_names(new, &old_roots), root_names(new, &new_roots)),
        );
    }

    let (old_envelope, new_envelope) = (envelope(old), envelope(new));
    for key in ENVELOPE_KEYS {
        let (a, b) = (old_envelope.get(*key), new_envelope.get(*key));
        if a != b {
            report.structure.push(
                Difference::new(Severity::Minor, Dimension::Envelope, *key)
                    .values(display_opt(a), display_opt(b)),
            );
        }
    }

    report.tables = compare_tables(old, new);
    report
}

/// Old id → new id.
fn align(old: &ConversionData, new: &ConversionData) -> HashMap<ResourceId, ResourceId> {
    let mut alignment = HashMap::new();
    let mut taken = HashSet::new();
    for (_, resource) in old.walk() {
        if new.get(&resource.id).is_some() {
            alignment.insert(resource.id.clone(), resource.id.clone());
            taken.insert(resource.id.clone());
        }
    }

    // Leftovers pair up by (name, ancestor names), in walk order.
    let mut candidates: HashMap<(String, Vec<String>), Vec<ResourceId>> = HashMap::new();
    for (_, resource) in new.walk() {
        if !taken.contains(&resource.id) {
            candidates
                .entry(location_key(new, resource))
                .or_default()
                .push(resource.id.clone());
        }
    }
    for list in candidates.values_mut() {
        list.reverse();
    }
    for (_, resource) in old.walk() {
        if alignment.contains_key(&resource.id) {
            continue;
        }
        if let Some(found) = candidates
            .get_mut(&location_key(old, resource))
            .and_then(Vec::pop)
        {
            alignment.insert(resource.id.clone(), found);
        }
    }
    alignment
}

fn location_key(data: &ConversionData, resource: &Resource) -> (String, Vec<String>) {
    let ancestors = data
        .ancestor_names(&resource.id)
        .into_iter()
        .map(str::to_string)
        .collect();
    (resource.name.clone(), ancestors)
}

fn name_path(data: &ConversionData, resource: &Resource) -> String {
    let mut names = data.ancestor_names(&resource.id);
    names.push(&resource.name);
    names.join("/")
}

fn root_names(data: &ConversionData, ids: &[String]) -> String {
    ids.iter()
        .map(|id| data.get(id).map_or(id.as_str(), |r| r.name.as_str()))
        .collect::<Vec<_>>()
        .join(", ")
}

fn compare_resource(
    old_data: &ConversionData,
    old: &Resource,
    new: &Resource,
    translate: &dyn Fn(&str) -> Option<String>,
) -> Vec<Difference> {
    let mut out = Vec::new();

    if old.name != new.name {
        let severity = if fold(&old.name) == fold(&new.name) {
            Severity::Minor
        } else {
            Severity::Significant
        };
        out.push(Difference::new(severity, Dimension::Name, "").values(&old.name, &new.name));
    }

    let keys: BTreeSet<&String> = old.properties.keys().chain(new.properties.keys()).collect();
    for key in keys {
        let (a, b) = (old.properties.get(key), new.properties.get(key));
        if a == b {
            continue;
        }
        let severity = match (a, b) {
            (Some(a), Some(b)) if fold(a) == fold(b) => Severity::Minor,
            _ => Severity::Significant,
        };
        out.push(
            Difference::new(severity, Dimension::Property, key.as_str())
                .values(display_opt(a), display_opt(b)),
        );
    }

    if old.tags != new.tags {
        out.push(
            Difference::new(Severity::Significant, Dimension::Tags, "")
                .values(join_set(&old.tags), join_set(&new.tags)),
        );
    }
    if old.aliases != new.aliases {
        out.push(
            Difference::new(Severity::Significant, Dimension::Aliases, "")
                .values(join_set(&old.aliases), join_set(&new.aliases)),
        );
    }
    if old.icon != new.icon {
        out.push(
            Difference::new(Severity::Minor, Dimension::Icon, "")
                .values(display_opt(old.icon.as_ref()), display_opt(new.icon.as_ref())),
        );
    }

    out.extend(compare_appearance(&old.appearance, &new.appearance));

    let old_assets: Vec<&str> = old.attachments.iter().map(|a| a.name.as_str()).collect();
    let new_assets: Vec<&str> = new.attachments.iter().map(|a| a.name.as_str()).collect();
    if old_assets != new_assets {
        let same_set = old_assets.iter().collect::<BTreeSet<_>>()
            == new_assets.iter().collect::<BTreeSet<_>>();
        let severity = if same_set {
            Severity::Minor
        } else {
            Severity::Significant
        };
        out.push(
            Difference::new(severity, Dimension::Attachments, "")
                .values(old_assets.join(", "), new_assets.join(", ")),
        );
    }

    let old_parent = old.parent.as_deref().and_then(|p| translate(p));
    if old_parent != new.parent {
        out.push(
            Difference::new(Severity::Significant, Dimension::Parent, "")
                .values(display_opt(old.parent.as_ref()), display_opt(new.parent.as_ref())),
        );
    }

    let old_children: Vec<String> = old.children.iter().filter_map(|c| translate(c)).collect();
    let new_children: Vec<&String> = new
        .children
        .iter()
        .filter(|c| old_children.contains(c))
        .collect();
    if old_children.iter().collect::<Vec<_>>() != new_children {
        out.push(
            Difference::new(Severity::Significant, Dimension::Children, "order changed")
                .values(old_children.join(", "), join_refs(&new_children)),
        );
    }

    out.extend(compare_content(old_data, old, new, translate));
    out
}

/// Visibility and locking change who sees a page; the rest is cosmetic.
fn compare_appearance(old: &Appearance, new: &Appearance) -> Vec<Difference> {
    let mut out = Vec::new();
    let mut text = |field: &str, a: &Option<String>, b: &Option<String>| {
        if a != b {
            out.push(
                Difference::new(Severity::Minor, Dimension::Appearance, field)
                    .values(display_opt(a.as_ref()), display_opt(b.as_ref())),
            );
        }
    };
    text("icon color", &old.icon_color, &new.icon_color);
    text("icon shape", &old.icon_shape, &new.icon_shape);
    let banner = |b: &Option<Banner>| b.as_ref().map(|b| format!("{} at {}%", b.url, b.y_position));
    text("banner", &banner(&old.banner), &banner(&new.banner));
    for (field, a, b) in [("hidden", old.hidden, new.hidden), ("locked", old.locked, new.locked)] {
        if a != b {
            out.push(
                Difference::new(Severity::Significant, Dimension::Appearance, field)
                    .values(a.to_string(), b.to_string()),
            );
        }
    }
    out
}

fn compare_content(
    old_data: &ConversionData,
    old: &Resource,
    new: &Resource,
    translate: &dyn Fn(&str) -> Option<String>,
) -> Vec<Difference> {
    let mut out = Vec::new();
    let mut expected = old.content.blocks.clone();
    retarget(&mut expected, translate);

    if expected != new.content.blocks {
        let (before, after) = (flatten(&old.content.blocks), flatten(&new.content.blocks));
        let severity = if fold(&before) == fold(&after) {
            Severity::Minor
        } else {
            Severity::Significant
        };
        out.push(Difference::new(severity, Dimension::Content, "").values(before, after));
    }

    let mut remaining: Vec<&str> = crate::ir::nodes::internal_link_targets(&new.content.blocks);
    for target in crate::ir::nodes::internal_link_targets(&old.content.blocks) {
        if old_data.get(target).is_none() {
            continue;
        }
        let found = translate(target)
            .and_then(|mapped| remaining.iter().position(|t| *t == mapped));
        match found {
            Some(position) => {
                remaining.remove(position);
            }
            None => {
                let label = old_data.get(target).map_or(target, |r| r.name.as_str());
                out.push(Difference::new(Severity::Significant, Dimension::Link, label));
            }
        }
    }
    out
}

/// Rewrite internal link targets through the alignment. Unaligned targets
/// stay as they are.
fn retarget(blocks: &mut [Block], translate: &dyn Fn(&str) -> Option<String>) {
    fn inlines(items: &mut [Inline], translate: &dyn Fn(&str) -> Option<String>) {
        for inline in items {
            if let Inline::Link(link) = inline {
                if let LinkTarget::Internal(id) = &mut link.target {
                    if let Some(mapped) = translate(id) {
                        *id = mapped;
                    }
                }
            }
        }
    }
    for block in blocks {
        match block {
            Block::Paragraph(p) => inlines(&mut p.content, translate),
            Block::Heading(h) => inlines(&mut h.content, translate),
            Block::List(list) => {
                for item in &mut list.items {
                    inlines(&mut item.content, translate);
                    retarget(&mut item.children, translate);
                }
            }
            Block::Callout(c) => retarget(&mut c.body, translate),
            Block::Quote(q) => retarget(&mut q.body, translate),
            Block::Image(_) | Block::Code(_) | Block::Rule | Block::Raw(_) => {}
        }
    }
}

/// Text of a block tree with node types dropped. Callout kinds, image
/// sources and raw text count as text.
pub fn flatten(blocks: &[Block]) -> String {
    let mut out = String::new();
    flatten_into(blocks, &mut out);
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn flatten_into(blocks: &[Block], out: &mut String) {
    for block in blocks {
        out.push(' ');
        match block {
            Block::Paragraph(p) => flatten_inlines(&p.content, out),
            Block::Heading(h) => flatten_inlines(&h.content, out),
            Block::List(list) => {
                for item in &list.items {
                    if let Some(checked) = item.checked {
                        out.push_str(if checked { " [x] " } else { " [ ] " });
                    }
                    flatten_inlines(&item.content, out);
                    flatten_into(&item.children, out);
                }
            }
            Block::Callout(c) => {
                out.push_str(&c.kind);
                out.push(' ');
                flatten_into(&c.body, out);
            }
            Block::Quote(q) => flatten_into(&q.body, out),
            Block::Image(image) => {
                out.push_str(&image.alt);
                out.push(' ');
                out.push_str(image.source.as_str());
            }
            Block::Code(code) => out.push_str(&code.text),
            Block::Rule => {}
            Block::Raw(raw) => out.push_str(&raw.text),
        }
    }
}

fn flatten_inlines(inlines: &[Inline], out: &mut String) {
    for inline in inlines {
        match inline {
            Inline::Text(run) => out.push_str(&run.text),
            Inline::Link(link) => {
                out.push_str(&link.text);
                if let LinkTarget::External(url) = &link.target {
                    out.push(' ');
                    out.push_str(url);
                    out.push(' ');
                }
            }
            Inline::Image(image) => {
                out.push_str(&image.alt);
                out.push(' ');
                out.push_str(image.source.as_str());
                out.push(' ');
            }
            Inline::Break => out.push(' '),
        }
    }
}

/// Whitespace collapsed, case folded.
fn fold(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn display_opt(value: Option<&String>) -> String {
    value.cloned().unwrap_or_else(|| "(none)".to_string())
}

fn join_set(set: &BTreeSet<String>) -> String {
    set.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
}

fn join_refs(items: &[&String]) -> String {
    items.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(", ")
}

fn compare_tables(old: &ConversionData, new: &ConversionData) -> Vec<TableDiff> {
    let mut out = Vec::new();
    let mut seen = HashSet::new();
    for table in &old.databases {
        seen.insert(table.name.as_str());
        let differences = match new.database(&table.name) {
            Some(other) => compare_table(table, other),
            None => vec![Difference::new(
                Severity::Significant,
                Dimension::Missing,
                "table not present after the chain",
            )],
        };
        if !differences.is_empty() {
            out.push(TableDiff {
                name: table.name.clone(),
                differences,
            });
        }
    }
    for table in &new.databases {
        if !seen.contains(table.name.as_str()) {
            out.push(TableDiff {
                name: table.name.clone(),
                differences: vec![Difference::new(
                    Severity::Significant,
                    Dimension::Extra,
                    "table not present before the chain",
                )],
            });
        }
    }
    out
}

fn compare_table(old: &DatabaseTable, new: &DatabaseTable) -> Vec<Difference> {
    let mut out = Vec::new();
    if old.primary_column != new.primary_column {
        out.push(
            Difference::new(Severity::Significant, Dimension::Table, "primary column")
                .values(&old.primary_column, &new.primary_column),
        );
    }
    if old.columns() != new.columns() {
        let old_set: BTreeSet<&String> = old.columns().iter().collect();
        let new_set: BTreeSet<&String> = new.columns().iter().collect();
        let dimension = if old_set == new_set {
            Dimension::ColumnOrder
        } else {
            Dimension::Columns
        };
        let severity = if old_set == new_set {
            Severity::Minor
        } else {
            Severity::Significant
        };
        out.push(
            Difference::new(severity, dimension, "")
                .values(old.columns().join(", "), new.columns().join(", ")),
        );
    }

    for row in old.rows() {
        let Some(other) = new.row(&row.name) else {
            out.push(Difference::new(Severity::Significant, Dimension::Row, format!("'{}' missing", row.name)));
            continue;
        };
        let columns: BTreeSet<&String> = row.values.keys().chain(other.values.keys()).collect();
        for column in columns {
            let (a, b) = (row.values.get(column), other.values.get(column));
            if a == b {
                continue;
            }
            let severity = match (a, b) {
                (Some(a), Some(b)) if fold(a) == fold(b) => Severity::Minor,
                _ => Severity::Significant,
            };
            out.push(
                Difference::new(severity, Dimension::Cell, format!("{} / {column}", row.name))
                    .values(display_opt(a), display_opt(b)),
            );
        }
    }
    for row in new.rows() {
        if old.row(&row.name).is_none() {
            out.push(Difference::new(Severity::Significant, Dimension::Row, format!("'{}' added", row.name)));
        }
    }
    out
}
