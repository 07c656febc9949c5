//! Two-phase construction of a [`ConversionData`] snapshot.
//!
//! Parsers first register every resource they discover with its parent id
//! (phase one), in the order siblings should appear. [`WorkspaceBuilder::build`]
//! then links the tree (phase two): it drops dangling parent references, breaks
//! cycles, fills in `children` and applies any explicit ordering the source
//! recorded. Every repair is reported as a warning rather than an error.

use super::{ConversionData, DatabaseTable, Resource, ResourceId};
use crate::common::names::derived_id;
use crate::diagnostics::{Diagnostics, Outcome, WarningKind};
use std::collections::{BTreeMap, HashMap, HashSet};

#[derive(Debug, Default)]
pub struct WorkspaceBuilder {
    order: Vec<ResourceId>,
    resources: BTreeMap<ResourceId, Resource>,
    child_order: HashMap<ResourceId, Vec<ResourceId>>,
    root_order: Vec<ResourceId>,
    databases: Vec<DatabaseTable>,
    metadata: BTreeMap<String, String>,
    diagnostics: Diagnostics,
}

impl WorkspaceBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a resource and return the id it was stored under.
    ///
    /// An id that is already taken is replaced with a derived one and a
    /// `DuplicateIdentifier` warning is recorded. Any `children` already set on
    /// the resource are ignored; they are rebuilt from parent links.
    pub fn add(&mut self, mut resource: Resource) -> ResourceId {
        if self.resources.contains_key(&resource.id) {
            let original = resource.id.clone();
            let mut attempt = 1usize;
            let mut candidate = derived_id(&format!("{original}#{attempt}"));
            while self.resources.contains_key(&candidate) {
                attempt += 1;
                candidate = derived_id(&format!("{original}#{attempt}"));
            }
            self.diagnostics.warn(
                WarningKind::DuplicateIdentifier,
                &original,
                format!(
                    "'{}' reuses an existing id, stored as '{candidate}'",
                    resource.name
                ),
            );
            resource.id = candidate;
        }
        resource.children.clear();
        let id = resource.id.clone();
        self.order.push(id.clone());
        self.resources.insert(id.clone(), resource);
        id
    }

    pub fn contains(&self, id: &str) -> bool {
        self.resources.contains_key(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Resource> {
        self.resources.get_mut(id)
    }

    /// Preferred order for the children of `parent`. Listed ids that turn out
    /// to be children come first in the given order, the rest keep their
    /// registration order after them.
    pub fn order_children(&mut self, parent: &str, order: Vec<ResourceId>) {
        self.child_order.insert(parent.to_string(), order);
    }

    /// Preferred order of the roots, applied the same way as
    /// [`order_children`](Self::order_children).
    pub fn order_roots(&mut self, order: Vec<ResourceId>) {
        self.root_order = order;
    }

    pub fn add_table(&mut self, table: DatabaseTable) {
        self.databases.push(table);
    }

    pub fn set_metadata(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.metadata.insert(key.into(), value.into());
    }

    pub fn warn(
        &mut self,
        kind: WarningKind,
        subject: impl Into<String>,
        message: impl Into<String>,
    ) {
        self.diagnostics.warn(kind, subject, message);
    }

    pub fn build(mut self) -> Outcome<ConversionData> {
        self.drop_dangling_parents();
        self.break_cycles();

        let mut roots = Vec::new();
        let mut children: HashMap<ResourceId, Vec<ResourceId>> = HashMap::new();
        for id in &self.order {
            match self.resources.get(id).and_then(|r| r.parent.clone()) {
                Some(parent) => children.entry(parent).or_default().push(id.clone()),
                None => roots.push(id.clone()),
            }
        }

        if !self.root_order.is_empty() {
            roots = apply_order(roots, &self.root_order);
        }
        for (parent, mut list) in children {
            if let Some(preferred) = self.child_order.get(&parent) {
                list = apply_order(list, preferred);
            }
            if let Some(resource) = self.resources.get_mut(&parent) {
                resource.children = list;
            }
        }

        let data = ConversionData {
            roots,
            resources: self.resources,
            databases: self.databases,
            metadata: self.metadata,
        };
        self.diagnostics.finish(data)
    }

    fn drop_dangling_parents(&mut self) {
        let known: HashSet<ResourceId> = self.resources.keys().cloned().collect();
        for id in &self.order {
            let Some(resource) = self.resources.get_mut(id) else {
                continue;
            };
            if let Some(parent) = &resource.parent {
                if !known.contains(parent) {
                    self.diagnostics.warn(
                        WarningKind::OrphanedResource,
                        id,
                        format!("parent '{parent}' does not exist, attached as a root"),
                    );
                    resource.parent = None;
                }
            }
        }
    }

    fn break_cycles(&mut self) {
        let order = self.order.clone();
        for id in &order {
            let mut seen = HashSet::new();
            let mut current = Some(id.clone());
            let mut cyclic = false;
            while let Some(step) = current {
                if !seen.insert(step.clone()) {
                    cyclic = step == *id;
                    break;
                }
                current = self.resources.get(&step).and_then(|r| r.parent.clone());
            }
            if cyclic {
                if let Some(resource) = self.resources.get_mut(id) {
                    resource.parent = None;
                }
                self.diagnostics.warn(
                    WarningKind::OrphanedResource,
                    id,
                    "parent chain forms a cycle, attached as a root",
                );
            }
        }
    }
}

fn apply_order(current: Vec<ResourceId>, preferred: &[ResourceId]) -> Vec<ResourceId> {
    let members: HashSet<&ResourceId> = current.iter().collect();
    let mut placed = HashSet::new();
    let mut out = Vec::with_capacity(current.len());
    for id in preferred {
        if members.contains(id) && placed.insert(id.clone()) {
            out.push(id.clone());
        }
    }
    for id in current {
        if !placed.contains(&id) {
            out.push(id);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn child(id: &str, name: &str, parent: &str) -> Resource {
        Resource::new(id, name).with_parent(Some(parent.to_string()))
    }

    #[test]
    fn links_children_in_registration_order() {
        let mut builder = WorkspaceBuilder::new();
        builder.add(child("k", "Kaleah", "r"));
        builder.add(Resource::new("r", "Realms"));
        builder.add(child("a", "Aster", "r"));
        let outcome = builder.build();

        assert!(outcome.warnings.is_empty());
        assert_eq!(outcome.value.roots, vec!["r"]);
        assert_eq!(outcome.value.resources["r"].children, vec!["k", "a"]);
        assert_eq!(outcome.value.validate(), Ok(()));
    }

    #[test]
    fn explicit_order_wins_and_leftovers_follow() {
        let mut builder = WorkspaceBuilder::new();
        builder.add(Resource::new("r", "Realms"));
        builder.add(child("a", "Aster", "r"));
        builder.add(child("b", "Brim", "r"));
        builder.add(child("c", "Cole", "r"));
        builder.order_children("r", vec!["c".into(), "zz".into(), "a".into()]);
        let data = builder.build().value;
        assert_eq!(data.resources["r"].children, vec!["c", "a", "b"]);
    }

    #[test]
    fn root_order_ignores_children_and_unknown_ids() {
        let mut builder = WorkspaceBuilder::new();
        builder.add(Resource::new("a", "Aster"));
        builder.add(Resource::new("b", "Brim"));
        builder.add(child("k", "Kaleah", "a"));
        builder.add(Resource::new("c", "Cole"));
        builder.order_roots(vec!["c".into(), "k".into(), "gone".into(), "a".into()]);
        let data = builder.build().value;
        assert_eq!(data.roots, vec!["c", "a", "b"]);
        assert_eq!(data.validate(), Ok(()));
    }

    #[test]
    fn duplicate_ids_are_renamed_with_a_warning() {
        let mut builder = WorkspaceBuilder::new();
        let first = builder.add(Resource::new("x", "One"));
        let second = builder.add(Resource::new("x", "Two"));
        let outcome = builder.build();

        assert_eq!(first, "x");
        assert_ne!(second, "x");
        assert_eq!(second.len(), 32);
        assert_eq!(outcome.warnings.len(), 1);
        assert_eq!(outcome.warnings[0].kind, WarningKind::DuplicateIdentifier);
        assert_eq!(outcome.value.roots.len(), 2);
    }

    #[test]
    fn dangling_parents_and_cycles_become_roots() {
        let mut builder = WorkspaceBuilder::new();
        builder.add(child("o", "Orphan", "missing"));
        builder.add(child("p", "P", "q"));
        builder.add(child("q", "Q", "p"));
        let outcome = builder.build();

        let kinds: Vec<_> = outcome.warnings.iter().map(|w| w.kind).collect();
        assert_eq!(kinds, vec![WarningKind::OrphanedResource; 2]);
        assert_eq!(outcome.value.roots, vec!["o", "p"]);
        assert_eq!(outcome.value.resources["p"].children, vec!["q"]);
        assert_eq!(outcome.value.validate(), Ok(()));
    }
}
