//! Initialization order resolution.
//!
//! Kahn's algorithm over the required-edge graph, with the ready set kept
//! in name order so the result depends only on the graph, never on the
//! order in which services were declared.
//!
//! When some services cannot be ordered the resolver fails closed: the
//! unresolved remainder is reported, never appended to the result.

use std::collections::{BTreeMap, BTreeSet};
use std::ops::Deref;

use bootwire_support::rendering::{ChainEntry, render_chain_vertical};
use tracing::{debug, instrument, warn};

use crate::error::{BootwireError, CycleError, Result};
use crate::graph::DependencyGraph;
use crate::registry::ServiceRegistry;

/// Service names in construction order.
///
/// For every required edge `a → b`, `b` comes before `a`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitializationOrder(Vec<String>);

impl InitializationOrder {
    /// Position of `name` in the order.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.0.iter().position(|n| n == name)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    /// Renders the order as a vertical plan with scopes and needs.
    pub fn render(&self, registry: &ServiceRegistry) -> String {
        let entries: Vec<ChainEntry> = self
            .0
            .iter()
            .map(|name| {
                let needs = registry.dependencies_of(name);
                ChainEntry {
                    name: name.clone(),
                    scope: registry
                        .descriptor(name)
                        .map(|d| d.scope.as_str())
                        .unwrap_or("?")
                        .to_string(),
                    detail: (!needs.is_empty()).then(|| {
                        format!(
                            "needs: {}",
                            needs.iter().cloned().collect::<Vec<_>>().join(", ")
                        )
                    }),
                }
            })
            .collect();

        render_chain_vertical(&entries)
    }
}

impl Deref for InitializationOrder {
    type Target = [String];

    fn deref(&self) -> &[String] {
        &self.0
    }
}

/// Computes the initialization order of a frozen registry.
///
/// # Errors
/// - [`BootwireError::NotFrozen`]: `registry` is still open, so its graph
///   may hold names nothing declared
/// - [`BootwireError::Cycle`]: the required edges contain a cycle. The
///   error lists every unresolved service, their remaining in-degrees and
///   one concrete cycle.
#[instrument(skip(registry), fields(nodes = registry.len()), name = "compute_order")]
pub fn compute_order(registry: &ServiceRegistry) -> Result<InitializationOrder> {
    if !registry.is_frozen() {
        return Err(BootwireError::NotFrozen);
    }
    order_graph(registry.graph())
}

fn order_graph(graph: &DependencyGraph) -> Result<InitializationOrder> {
    let mut indegree: BTreeMap<&str, usize> = graph
        .nodes()
        .map(|name| (name, graph.dependencies_of(name).len()))
        .collect();

    let mut ready: BTreeSet<&str> = indegree
        .iter()
        .filter(|(_, degree)| **degree == 0)
        .map(|(name, _)| *name)
        .collect();

    let mut order = Vec::with_capacity(graph.len());

    while let Some(name) = ready.pop_first() {
        order.push(name.to_string());

        for dependent in graph.dependents_of(name) {
            if let Some(degree) = indegree.get_mut(dependent.as_str()) {
                *degree -= 1;
                if *degree == 0 {
                    ready.insert(dependent.as_str());
                }
            }
        }
    }

    if order.len() == graph.len() {
        debug!(order = ?order, "Initialization order resolved");
        return Ok(InitializationOrder(order));
    }

    let emitted: BTreeSet<&str> = order.iter().map(String::as_str).collect();
    let indegrees: BTreeMap<String, usize> = indegree
        .into_iter()
        .filter(|(name, _)| !emitted.contains(name))
        .map(|(name, degree)| (name.to_string(), degree))
        .collect();
    let remaining: Vec<String> = indegrees.keys().cloned().collect();
    let cycle = find_cycle(graph, &remaining);

    warn!(
        cycle = ?cycle,
        unresolved = remaining.len(),
        "Circular dependency detected!"
    );

    Err(BootwireError::Cycle(CycleError {
        cycle,
        remaining,
        indegrees,
    }))
}

/// Walks unresolved dependency edges from the first remaining service until
/// a name repeats, and returns that loop closed on its first name.
///
/// Every unresolved service has at least one unresolved dependency, so the
/// walk always stays inside `remaining` and must revisit a name.
fn find_cycle(graph: &DependencyGraph, remaining: &[String]) -> Vec<String> {
    let unresolved: BTreeSet<&str> = remaining.iter().map(String::as_str).collect();
    let Some(start) = remaining.first() else {
        return Vec::new();
    };

    let mut path: Vec<&str> = Vec::new();
    let mut current = start.as_str();

    loop {
        if let Some(pos) = path.iter().position(|n| *n == current) {
            let mut cycle: Vec<String> = path[pos..].iter().map(|n| n.to_string()).collect();
            cycle.push(current.to_string());
            return cycle;
        }
        path.push(current);

        let next = graph
            .dependencies_of(current)
            .iter()
            .map(String::as_str)
            .find(|dep| unresolved.contains(dep));

        match next {
            Some(dep) => current = dep,
            // Unreachable for a remainder produced by Kahn's algorithm.
            None => return path.iter().map(|n| n.to_string()).collect(),
        }
    }
}
