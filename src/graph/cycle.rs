//! Cycle & Completeness Checker
//!
//! Completeness is enforced while resolving; this pass only looks for back-edges with
//! a three-colour depth-first walk and reports each cycle as one error carrying the
//! whole path, first key repeated at the end.

use crate::error::CompileError;
use crate::graph::DependencyGraph;
use crate::model::TypeKey;
use std::collections::HashMap;

/// Absent from the map means unvisited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    InProgress,
    Resolved,
}

struct CycleChecker<'g> {
    graph: &'g DependencyGraph,
    marks: HashMap<&'g TypeKey, Mark>,
    stack: Vec<&'g TypeKey>,
    cycles: Vec<CompileError>,
}

pub fn check_cycles(graph: &DependencyGraph) -> Vec<CompileError> {
    let mut checker = CycleChecker {
        graph,
        marks: HashMap::new(),
        stack: Vec::new(),
        cycles: Vec::new(),
    };
    for key in graph.nodes.keys() {
        if !checker.marks.contains_key(key) {
            checker.visit(key);
        }
    }
    checker.cycles
}

impl<'g> CycleChecker<'g> {
    fn visit(&mut self, key: &'g TypeKey) {
        self.marks.insert(key, Mark::InProgress);
        self.stack.push(key);

        let graph = self.graph;
        for dependency in graph.edges(key) {
            match self.marks.get(dependency) {
                None => self.visit(dependency),
                Some(Mark::InProgress) => self.report(dependency),
                Some(Mark::Resolved) => {}
            }
        }

        self.stack.pop();
        self.marks.insert(key, Mark::Resolved);
    }

    fn report(&mut self, back_edge_target: &'g TypeKey) {
        let Some(start) = self.stack.iter().position(|k| *k == back_edge_target) else {
            return;
        };
        let mut cycle: Vec<TypeKey> = self.stack[start..].iter().map(|k| (*k).clone()).collect();
        cycle.push(back_edge_target.clone());
        tracing::debug!("Found dependency cycle of length {}", cycle.len() - 1);
        self.cycles.push(CompileError::cycle(cycle));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{BindingTable, resolve};
    use crate::model::{ComponentDecl, FactoryDecl, ModelBuilder, ModuleDecl};

    fn cycles_of(module: ModuleDecl, entries: &[&str]) -> Vec<CompileError> {
        let mut component = ComponentDecl::new().module("M");
        for entry in entries {
            component = component.entry(entry.to_lowercase(), *entry);
        }
        let model = ModelBuilder::new()
            .module("M", module)
            .component("App", component)
            .build();
        let decl = model.component("App").unwrap();
        let (table, _) = BindingTable::build(&model, "App", decl);
        let (graph, _) = resolve(&table, &decl.entry_points);
        check_cycles(&graph)
    }

    fn keys(names: &[&str]) -> Vec<TypeKey> {
        names.iter().map(|n| TypeKey::from(*n)).collect()
    }

    #[test]
    fn test_two_node_cycle_reports_full_path() {
        let cycles = cycles_of(
            ModuleDecl::new()
                .factory(FactoryDecl::factory("a", "A", ["B"]))
                .factory(FactoryDecl::factory("b", "B", ["A"])),
            &["A"],
        );
        assert_eq!(cycles, vec![CompileError::cycle(keys(&["A", "B", "A"]))]);
    }

    #[test]
    fn test_self_dependency() {
        let cycles = cycles_of(
            ModuleDecl::new().factory(FactoryDecl::factory("a", "A", ["A"])),
            &["A"],
        );
        assert_eq!(cycles, vec![CompileError::cycle(keys(&["A", "A"]))]);
    }

    #[test]
    fn test_cycle_below_acyclic_prefix() {
        let cycles = cycles_of(
            ModuleDecl::new()
                .factory(FactoryDecl::factory("root", "Root", ["X"]))
                .factory(FactoryDecl::factory("x", "X", ["Y"]))
                .factory(FactoryDecl::factory("y", "Y", ["Z"]))
                .factory(FactoryDecl::factory("z", "Z", ["X"])),
            &["Root"],
        );
        assert_eq!(cycles, vec![CompileError::cycle(keys(&["X", "Y", "Z", "X"]))]);
    }

    #[test]
    fn test_qualified_cycle() {
        let cycles = cycles_of(
            ModuleDecl::new()
                .factory(FactoryDecl::factory("remote", "Loader@remote", ["Loader@local"]))
                .factory(FactoryDecl::factory("local", "Loader@local", ["Loader@remote"])),
            &["Loader@remote"],
        );
        assert_eq!(
            cycles,
            vec![CompileError::cycle(keys(&["Loader@remote", "Loader@local", "Loader@remote"]))]
        );
    }

    #[test]
    fn test_diamond_is_not_a_cycle() {
        let cycles = cycles_of(
            ModuleDecl::new()
                .factory(FactoryDecl::factory("top", "Top", ["Left", "Right"]))
                .factory(FactoryDecl::factory("left", "Left", ["Base"]))
                .factory(FactoryDecl::factory("right", "Right", ["Base"]))
                .factory(FactoryDecl::factory("base", "Base", Vec::<TypeKey>::new())),
            &["Top"],
        );
        assert!(cycles.is_empty());
    }

    #[test]
    fn test_independent_cycles_each_reported() {
        let cycles = cycles_of(
            ModuleDecl::new()
                .factory(FactoryDecl::factory("a", "A", ["B"]))
                .factory(FactoryDecl::factory("b", "B", ["A"]))
                .factory(FactoryDecl::factory("c", "C", ["C"])),
            &["A", "C"],
        );
        assert_eq!(cycles.len(), 2);
    }
}
