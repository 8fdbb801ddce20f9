//! Graph Resolver
//!
//! Depth-first walk from each entry point through the binding table. Every reachable
//! key is looked up once; missing keys are reported with the full chain of keys that
//! led to them, and the walk carries on so unrelated defects are reported together.

use crate::error::CompileError;
use crate::graph::{BindingTable, DependencyGraph};
use crate::model::{EntryPoint, TypeKey};
use std::collections::HashSet;

struct Resolver<'t, 'm> {
    table: &'t BindingTable<'m>,
    graph: DependencyGraph,
    /// Keys that failed lookup; reported once, never retried.
    failed: HashSet<TypeKey>,
    /// Keys from the entry point down to the key being resolved.
    chain: Vec<TypeKey>,
    errors: Vec<CompileError>,
}

/// Resolve every key reachable from `entry_points`.
///
/// Nodes are inserted before their dependencies are visited, which both memoizes them
/// and stops the walk from looping on cyclic input; cycles are left in the graph for
/// [`check_cycles`](crate::graph::check_cycles) to report.
pub fn resolve(
    table: &BindingTable<'_>,
    entry_points: &[EntryPoint],
) -> (DependencyGraph, Vec<CompileError>) {
    let mut resolver = Resolver {
        table,
        graph: DependencyGraph::new(entry_points.to_vec()),
        failed: HashSet::new(),
        chain: Vec::new(),
        errors: Vec::new(),
    };
    for entry in entry_points {
        resolver.visit(&entry.key);
    }
    (resolver.graph, resolver.errors)
}

impl Resolver<'_, '_> {
    fn visit(&mut self, key: &TypeKey) {
        if self.graph.contains(key) || self.failed.contains(key) {
            return;
        }

        self.chain.push(key.clone());
        match self.table.lookup(key) {
            None => {
                self.errors.push(CompileError::unsatisfied(self.chain.clone()));
                self.failed.insert(key.clone());
            }
            Some(Err(e)) => {
                self.errors.push(e);
                self.failed.insert(key.clone());
            }
            Some(Ok(binding)) => {
                tracing::debug!("Resolved {} via {}", key, binding.site);
                let dependencies = binding.dependencies.clone();
                self.graph.nodes.insert(key.clone(), binding);
                for dependency in &dependencies {
                    self.visit(dependency);
                }
            }
        }
        self.chain.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::model::{
        ComponentDecl, ConstructorDecl, DeclarationModel, FactoryDecl, InjectableDecl,
        ModelBuilder, ModuleDecl,
    };

    fn resolve_component(model: &DeclarationModel, name: &str) -> (DependencyGraph, Vec<CompileError>) {
        let component = model.component(name).unwrap();
        let (table, errors) = BindingTable::build(model, name, component);
        assert!(errors.is_empty(), "{errors:?}");
        resolve(&table, &component.entry_points)
    }

    fn loaders(with_local: bool) -> DeclarationModel {
        let mut module = ModuleDecl::new().factory(FactoryDecl::factory(
            "remote",
            "Loader@remote",
            ["Loader@local"],
        ));
        if with_local {
            module = module.factory(FactoryDecl::factory("local", "Loader@local", Vec::<TypeKey>::new()));
        }
        ModelBuilder::new()
            .module("LoaderModule", module)
            .component(
                "LoaderComponent",
                ComponentDecl::new()
                    .module("LoaderModule")
                    .entry("remote_loader", "Loader@remote"),
            )
            .build()
    }

    #[test]
    fn test_resolves_through_qualified_dependency() {
        let (graph, errors) = resolve_component(&loaders(true), "LoaderComponent");
        assert!(errors.is_empty());
        let keys: Vec<_> = graph.nodes.keys().cloned().collect();
        assert_eq!(
            keys,
            vec![
                TypeKey::qualified("Loader", "remote"),
                TypeKey::qualified("Loader", "local")
            ]
        );
    }

    #[test]
    fn test_missing_dependency_reports_chain() {
        let (_, errors) = resolve_component(&loaders(false), "LoaderComponent");
        assert_eq!(
            errors,
            vec![CompileError::UnsatisfiedDependency {
                key: TypeKey::qualified("Loader", "local"),
                chain: vec![
                    TypeKey::qualified("Loader", "remote"),
                    TypeKey::qualified("Loader", "local"),
                ],
            }]
        );
    }

    #[test]
    fn test_unqualified_request_never_matches_qualified_binding() {
        let model = ModelBuilder::new()
            .module(
                "M",
                ModuleDecl::new().factory(FactoryDecl::factory("local", "Loader@local", Vec::<TypeKey>::new())),
            )
            .component(
                "App",
                ComponentDecl::new()
                    .module("M")
                    .entry("plain", "Loader")
                    .entry("remote", "Loader@remote"),
            )
            .build();
        let (graph, errors) = resolve_component(&model, "App");
        assert!(graph.is_empty());
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().all(|e| e.kind() == ErrorKind::UnsatisfiedDependency));
    }

    #[test]
    fn test_collects_independent_missing_dependencies() {
        let model = ModelBuilder::new()
            .injectable(
                "Service",
                InjectableDecl::new().constructor(ConstructorDecl::inject(["Db", "Cache", "Db"])),
            )
            .component("App", ComponentDecl::new().entry("service", "Service"))
            .build();
        let (graph, errors) = resolve_component(&model, "App");
        assert_eq!(graph.len(), 1);
        // Db is reported once even though it is requested twice.
        let missing: Vec<_> = errors
            .iter()
            .map(|e| e.keys().last().map(|k| k.to_string()))
            .collect();
        assert_eq!(missing, vec![Some("Db".to_string()), Some("Cache".to_string())]);
    }

    #[test]
    fn test_cyclic_input_terminates() {
        let model = ModelBuilder::new()
            .module(
                "M",
                ModuleDecl::new()
                    .factory(FactoryDecl::factory("a", "A", ["B"]))
                    .factory(FactoryDecl::factory("b", "B", ["A"])),
            )
            .component("App", ComponentDecl::new().module("M").entry("a", "A"))
            .build();
        let (graph, errors) = resolve_component(&model, "App");
        assert!(errors.is_empty());
        assert_eq!(graph.len(), 2);
    }
}
