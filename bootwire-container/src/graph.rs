//! The service dependency graph.
//!
//! Two ordered maps, kept as exact inverses of each other:
//! - `dependencies[a]`: what `a` needs
//! - `dependents[b]`: what needs `b`
//!
//! Only [`ServiceRegistry`](crate::registry::ServiceRegistry) writes to the
//! graph, and only through [`DependencyGraph::ensure_node`] and
//! [`DependencyGraph::add_edge`]. Neither ever replaces an existing set, so
//! the order in which services register cannot erase edges recorded by
//! services that registered earlier.

use std::collections::{BTreeMap, BTreeSet};

static EMPTY: BTreeSet<String> = BTreeSet::new();

/// Required-edge graph over service names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyGraph {
    dependencies: BTreeMap<String, BTreeSet<String>>,
    dependents: BTreeMap<String, BTreeSet<String>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the node's entries if absent. Existing sets are left alone.
    pub(crate) fn ensure_node(&mut self, name: &str) {
        if !self.dependencies.contains_key(name) {
            self.dependencies.insert(name.to_string(), BTreeSet::new());
        }
        if !self.dependents.contains_key(name) {
            self.dependents.insert(name.to_string(), BTreeSet::new());
        }
    }

    /// Records `from` depends on `to`. Both nodes are created if absent.
    pub(crate) fn add_edge(&mut self, from: &str, to: &str) {
        self.ensure_node(from);
        self.ensure_node(to);

        if let Some(set) = self.dependencies.get_mut(from) {
            set.insert(to.to_string());
        }
        if let Some(set) = self.dependents.get_mut(to) {
            set.insert(from.to_string());
        }
    }

    /// Every node, declared or only referenced, in name order.
    pub fn nodes(&self) -> impl Iterator<Item = &str> {
        self.dependencies.keys().map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.dependencies.contains_key(name)
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.dependencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dependencies.is_empty()
    }

    /// What `name` needs. Empty for unknown names.
    pub fn dependencies_of(&self, name: &str) -> &BTreeSet<String> {
        self.dependencies.get(name).unwrap_or(&EMPTY)
    }

    /// What needs `name`. Empty for unknown names.
    pub fn dependents_of(&self, name: &str) -> &BTreeSet<String> {
        self.dependents.get(name).unwrap_or(&EMPTY)
    }

    /// Checks that the two maps are exact inverses.
    pub fn is_consistent(&self) -> bool {
        let forward = self
            .dependencies
            .iter()
            .all(|(a, deps)| deps.iter().all(|b| self.dependents_of(b).contains(a)));
        let backward = self
            .dependents
            .iter()
            .all(|(b, users)| users.iter().all(|a| self.dependencies_of(a).contains(b)));

        forward
            && backward
            && self.dependencies.keys().eq(self.dependents.keys())
    }
}
