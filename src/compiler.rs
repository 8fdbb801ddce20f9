//! Compilation pipeline
//!
//! One component at a time: binding table, resolution, cycle check, schedule,
//! generation. Defects from the first three stages are collected together and the
//! component fails whole; nothing is generated for a component with errors.

use crate::codegen::{GeneratedUnit, generate};
use crate::config::CompilerOptions;
use crate::error::{CompileError, Diagnostics};
use crate::graph::{BindingTable, check_cycles, resolve, schedule};
use crate::model::DeclarationModel;
use crate::worker::WorkerPool;
use tracing::instrument;

/// Outcome of compiling one component.
pub type UnitResult = Result<GeneratedUnit, Diagnostics>;

pub struct Compiler<'m> {
    model: &'m DeclarationModel,
    options: CompilerOptions,
}

impl<'m> Compiler<'m> {
    pub fn new(model: &'m DeclarationModel) -> Self {
        Self::with_options(model, CompilerOptions::default())
    }

    pub fn with_options(model: &'m DeclarationModel, options: CompilerOptions) -> Self {
        Self { model, options }
    }

    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    #[instrument(skip(self))]
    pub fn compile(&self, component: &str) -> UnitResult {
        let Some(decl) = self.model.component(component) else {
            tracing::error!("Component {} is not declared", component);
            return Err(Diagnostics::single(
                component,
                CompileError::UnknownComponent {
                    component: component.to_string(),
                },
            ));
        };
        tracing::info!(
            "Compiling component {} ({} entry points)",
            component,
            decl.entry_points.len()
        );

        let (table, mut errors) = BindingTable::build(self.model, component, decl);
        let (graph, unresolved) = resolve(&table, &decl.entry_points);
        errors.extend(unresolved);
        errors.extend(check_cycles(&graph));

        if !errors.is_empty() {
            tracing::error!(
                "Component {} failed with {} error(s)",
                component,
                errors.len()
            );
            return Err(Diagnostics::new(component, errors));
        }

        let order = schedule(&graph);
        let unit = generate(component, &graph, &order, self.model, &self.options)
            .map_err(|e| Diagnostics::single(component, e))?;

        tracing::info!(
            "Compiled {} into {} ({} cached, {} fresh, {} inputs)",
            component,
            unit.name,
            unit.fields.len(),
            unit.providers.len(),
            unit.inputs.len()
        );
        Ok(unit)
    }

    /// Compile every declared component, in declaration order.
    ///
    /// Components share nothing while compiling, so they run on a worker pool sized by
    /// [`CompilerOptions::jobs`]. One component failing never affects another.
    pub fn compile_all(&self) -> Vec<(String, UnitResult)> {
        let names: Vec<&String> = self.model.components.keys().collect();
        let compile_one = |name: &&String| ((*name).clone(), self.compile(name));

        if self.options.jobs <= 1 || names.len() <= 1 {
            return names.iter().map(compile_one).collect();
        }
        match WorkerPool::new(self.options.jobs) {
            Ok(pool) => {
                tracing::debug!(
                    "Compiling {} components on {} threads",
                    names.len(),
                    pool.num_threads()
                );
                pool.map(&names, compile_one)
            }
            Err(e) => {
                tracing::warn!("Failed to start worker pool ({}), compiling sequentially", e);
                names.iter().map(compile_one).collect()
            }
        }
    }
}

/// Compile `component` with default options.
pub fn compile(model: &DeclarationModel, component: &str) -> UnitResult {
    Compiler::new(model).compile(component)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::model::{ComponentDecl, FactoryDecl, ModelBuilder, ModuleDecl, TypeKey};

    fn none() -> Vec<TypeKey> {
        Vec::new()
    }

    #[test]
    fn test_unknown_component() {
        let model = DeclarationModel::default();
        let diagnostics = compile(&model, "Nope").unwrap_err();
        assert_eq!(diagnostics.kinds(), vec![ErrorKind::UnknownComponent]);
    }

    #[test]
    fn test_errors_from_every_stage_are_collected() {
        let model = ModelBuilder::new()
            .module(
                "First",
                ModuleDecl::new()
                    .factory(FactoryDecl::factory("config", "Config", none()))
                    .factory(FactoryDecl::factory("a", "A", ["B"]))
                    .factory(FactoryDecl::factory("b", "B", ["A"])),
            )
            .module(
                "Second",
                ModuleDecl::new().factory(FactoryDecl::factory("config", "Config", none())),
            )
            .component(
                "App",
                ComponentDecl::new()
                    .module("First")
                    .module("Second")
                    .entry("config", "Config")
                    .entry("a", "A")
                    .entry("db", "Db"),
            )
            .build();

        let diagnostics = compile(&model, "App").unwrap_err();
        assert_eq!(diagnostics.component, "App");
        assert_eq!(
            diagnostics.kinds(),
            vec![
                ErrorKind::DuplicateBinding,
                ErrorKind::UnsatisfiedDependency,
                ErrorKind::CyclicDependency,
            ]
        );
    }

    #[test]
    fn test_compile_all_isolates_failures() {
        let model = ModelBuilder::new()
            .module(
                "GreetingModule",
                ModuleDecl::new()
                    .default_constructible()
                    .factory(FactoryDecl::factory("greeting", "Greeting", none())),
            )
            .component(
                "Good",
                ComponentDecl::new()
                    .module("GreetingModule")
                    .entry("greeting", "Greeting"),
            )
            .component("Bad", ComponentDecl::new().entry("missing", "Missing"))
            .component(
                "AlsoGood",
                ComponentDecl::new()
                    .module("GreetingModule")
                    .entry("greeting", "Greeting"),
            )
            .build();

        let options = CompilerOptions {
            jobs: 4,
            ..CompilerOptions::default()
        };
        let results = Compiler::with_options(&model, options).compile_all();
        let names: Vec<_> = results.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["Good", "Bad", "AlsoGood"]);
        assert!(results[0].1.is_ok());
        assert!(results[1].1.is_err());
        assert_eq!(results[2].1.as_ref().unwrap().name, "WiredAlsoGood");
    }

    #[test]
    fn test_parallel_and_sequential_agree() {
        let model = ModelBuilder::new()
            .module(
                "M",
                ModuleDecl::new()
                    .factory(FactoryDecl::factory("remote", "Loader@remote", ["Loader@local"]))
                    .factory(FactoryDecl::factory("local", "Loader@local", none())),
            )
            .component("A", ComponentDecl::new().module("M").entry("remote", "Loader@remote"))
            .component("B", ComponentDecl::new().module("M").entry("local", "Loader@local"))
            .build();

        let sequential = Compiler::with_options(
            &model,
            CompilerOptions {
                jobs: 1,
                ..CompilerOptions::default()
            },
        )
        .compile_all();
        let parallel = Compiler::with_options(
            &model,
            CompilerOptions {
                jobs: 2,
                ..CompilerOptions::default()
            },
        )
        .compile_all();
        assert_eq!(sequential, parallel);
    }
}
