//! Topological Scheduler
//!
//! Post-order depth-first walk from the entry points, dependencies visited in
//! declaration order. The order only depends on the declarations, so unchanged input
//! always yields the same schedule.

use crate::graph::{Binding, DependencyGraph};
use crate::model::TypeKey;
use std::collections::HashSet;

/// Every node of an acyclic graph, each after all of its dependencies.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schedule {
    pub order: Vec<TypeKey>,
}

impl Schedule {
    pub fn position(&self, key: &TypeKey) -> Option<usize> {
        self.order.iter().position(|k| k == key)
    }

    /// Scheduled bindings, in order.
    pub fn bindings<'g>(&self, graph: &'g DependencyGraph) -> Vec<&'g Binding> {
        self.order.iter().filter_map(|key| graph.get(key)).collect()
    }

    /// Bindings that get a memoized field, in initialization order.
    pub fn cached<'g>(&self, graph: &'g DependencyGraph) -> Vec<&'g Binding> {
        self.bindings(graph)
            .into_iter()
            .filter(|binding| binding.is_cached())
            .collect()
    }
}

/// `graph` must already have passed [`check_cycles`](crate::graph::check_cycles).
pub fn schedule(graph: &DependencyGraph) -> Schedule {
    let mut visited = HashSet::new();
    let mut order = Vec::with_capacity(graph.len());

    let roots = graph
        .entry_points
        .iter()
        .map(|entry| &entry.key)
        .chain(graph.nodes.keys());
    for root in roots {
        if graph.contains(root) {
            post_order(graph, root, &mut visited, &mut order);
        }
    }

    tracing::debug!("Scheduled {} bindings", order.len());
    Schedule { order }
}

fn post_order<'g>(
    graph: &'g DependencyGraph,
    key: &'g TypeKey,
    visited: &mut HashSet<&'g TypeKey>,
    order: &mut Vec<TypeKey>,
) {
    if !visited.insert(key) {
        return;
    }
    for dependency in graph.edges(key) {
        post_order(graph, dependency, visited, order);
    }
    order.push(key.clone());
}
