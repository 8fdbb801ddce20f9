//! Code-Shape Generator
//!
//! Walks the scheduled graph and lays out the generated unit: runtime bindings and
//! module instances become builder inputs, cached bindings become fields, fresh ones
//! become providers, and each entry point becomes an accessor. The graph is already
//! validated, so the only failure here is an internal invariant violation.

use crate::codegen::unit::{
    Access, Accessor, BuilderShape, CachedField, Factory, FreshProvider, GeneratedUnit,
    InputSource, Setter, UnitInput,
};
use crate::config::CompilerOptions;
use crate::error::{CompileError, Result};
use crate::graph::{Binding, BindingKind, BindingSite, DependencyGraph, Schedule};
use crate::model::{DeclarationModel, TypeKey};
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};

pub fn generate(
    component: &str,
    graph: &DependencyGraph,
    schedule: &Schedule,
    model: &DeclarationModel,
    options: &CompilerOptions,
) -> Result<GeneratedUnit> {
    let bindings = schedule.bindings(graph);
    let mut names = NameAllocator::default();
    // Declared names claim their identifiers before derived ones.
    let mut binding_names = HashMap::new();
    for binding in bindings.iter().filter(|b| b.declared_name().is_some()) {
        binding_names.insert(binding.key.clone(), names.allocate(&base_name(binding)));
    }
    for binding in bindings.iter().filter(|b| b.declared_name().is_none()) {
        binding_names.insert(binding.key.clone(), names.allocate(&base_name(binding)));
    }

    let mut generator = Generator {
        model,
        names,
        binding_names,
        access: HashMap::new(),
        module_inputs: IndexMap::new(),
        inputs: Vec::new(),
        fields: Vec::new(),
        providers: Vec::new(),
    };

    for binding in bindings {
        generator.place(binding)?;
    }

    let accessors = graph
        .entry_points
        .iter()
        .map(|entry| {
            Ok(Accessor {
                name: entry.name.clone(),
                key: entry.key.clone(),
                access: generator.access_of(&entry.key, &entry.key)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let name = options.unit_name(component);
    let builder = BuilderShape {
        name: options.builder_name(&name),
        setters: generator
            .inputs
            .iter()
            .map(|input| Setter {
                name: input.name.clone(),
                input: input.name.clone(),
                required: input.required,
            })
            .collect(),
    };

    tracing::debug!(
        "Generated {}: {} inputs, {} cached fields, {} fresh providers",
        name,
        generator.inputs.len(),
        generator.fields.len(),
        generator.providers.len()
    );

    Ok(GeneratedUnit {
        name,
        component: component.to_string(),
        inputs: generator.inputs,
        fields: generator.fields,
        providers: generator.providers,
        accessors,
        builder,
    })
}

struct Generator<'m> {
    model: &'m DeclarationModel,
    names: NameAllocator,
    binding_names: HashMap<TypeKey, String>,
    access: HashMap<TypeKey, Access>,
    /// Module name to the input holding its instance.
    module_inputs: IndexMap<String, String>,
    inputs: Vec<UnitInput>,
    fields: Vec<CachedField>,
    providers: Vec<FreshProvider>,
}

impl Generator<'_> {
    fn place(&mut self, binding: &Binding) -> Result<()> {
        let name = self.binding_names.get(&binding.key).cloned().ok_or_else(|| {
            CompileError::Internal(format!("{} was never scheduled", binding.key))
        })?;
        if let BindingKind::Runtime { optional } = binding.kind {
            self.inputs.push(UnitInput {
                name: name.clone(),
                source: InputSource::Binding {
                    key: binding.key.clone(),
                },
                required: !optional,
            });
            self.access.insert(binding.key.clone(), Access::Input(name));
            return Ok(());
        }

        let factory = self.factory(binding)?;
        let access = if binding.is_cached() {
            self.fields.push(CachedField {
                name: name.clone(),
                key: binding.key.clone(),
                factory,
            });
            Access::Field(name)
        } else {
            self.providers.push(FreshProvider {
                name: name.clone(),
                key: binding.key.clone(),
                factory,
            });
            Access::Provider(name)
        };
        self.access.insert(binding.key.clone(), access);
        Ok(())
    }

    fn factory(&mut self, binding: &Binding) -> Result<Factory> {
        let args = binding
            .dependencies
            .iter()
            .map(|dep| self.access_of(dep, &binding.key))
            .collect::<Result<Vec<_>>>()?;

        Ok(match &binding.kind {
            BindingKind::Constructor {
                target,
                constructor,
            } => Factory::Construct {
                ty: target.clone(),
                constructor: constructor.clone(),
                args,
            },
            BindingKind::Wrapping {
                target,
                constructor,
            } => Factory::NewInstance {
                ty: target.clone(),
                constructor: constructor.clone(),
                args,
            },
            BindingKind::ModuleFactory { module, method } => Factory::ModuleCall {
                module_input: self.module_input(module),
                module: module.clone(),
                method: method.clone(),
                args,
            },
            BindingKind::Delegate => match args.into_iter().next() {
                Some(target) => Factory::Delegate { target },
                None => {
                    return Err(CompileError::Internal(format!(
                        "delegate binding {} has no target",
                        binding.key
                    )));
                }
            },
            BindingKind::Runtime { .. } => {
                return Err(CompileError::Internal(format!(
                    "runtime binding {} has no factory body",
                    binding.key
                )));
            }
        })
    }

    fn module_input(&mut self, module: &str) -> String {
        if let Some(name) = self.module_inputs.get(module) {
            return name.clone();
        }
        let name = self.names.allocate(&snake_case(module));
        let required = !self
            .model
            .module(module)
            .is_some_and(|decl| decl.default_constructible);
        self.inputs.push(UnitInput {
            name: name.clone(),
            source: InputSource::Module {
                module: module.to_string(),
            },
            required,
        });
        self.module_inputs.insert(module.to_string(), name.clone());
        name
    }

    fn access_of(&self, key: &TypeKey, requested_by: &TypeKey) -> Result<Access> {
        self.access.get(key).cloned().ok_or_else(|| {
            CompileError::Internal(format!(
                "{requested_by} was generated before its dependency {key}"
            ))
        })
    }
}

fn base_name(binding: &Binding) -> String {
    match &binding.site {
        BindingSite::Declared { name, .. } => snake_case(name),
        BindingSite::Implicit { ty } => snake_case(ty),
    }
}

/// Hands out unique identifiers, suffixing `_2`, `_3`, .. on collision.
#[derive(Default)]
struct NameAllocator {
    used: HashSet<String>,
}

impl NameAllocator {
    fn allocate(&mut self, base: &str) -> String {
        let mut candidate = base.to_string();
        let mut n = 2;
        while !self.used.insert(candidate.clone()) {
            candidate = format!("{base}_{n}");
            n += 1;
        }
        candidate
    }
}

/// `localBookLoader` -> `local_book_loader`, `crate::io::DummyModule` -> `dummy_module`,
/// `dyn BookLoader` -> `book_loader`. Keywords get a trailing underscore.
pub(crate) fn snake_case(raw: &str) -> String {
    let stem = raw.trim();
    let stem = stem.strip_prefix("dyn ").unwrap_or(stem);
    let stem = stem.split('<').next().unwrap_or(stem);
    let stem = stem.rsplit("::").next().unwrap_or(stem);

    let mut out = String::with_capacity(stem.len() + 4);
    let mut after_lower = false;
    for c in stem.chars() {
        if c.is_uppercase() {
            if after_lower {
                out.push('_');
            }
            out.extend(c.to_lowercase());
            after_lower = false;
        } else if c.is_alphanumeric() {
            out.push(c);
            after_lower = true;
        } else {
            if !out.is_empty() && !out.ends_with('_') {
                out.push('_');
            }
            after_lower = false;
        }
    }
    let mut out = out.trim_end_matches('_').to_string();

    if out.is_empty() || out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert_str(0, "value_");
    }
    if syn::parse_str::<syn::Ident>(&out).is_err() {
        out.push('_');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{BindingTable, check_cycles, resolve, schedule};
    use crate::model::{
        ComponentDecl, ConstructorDecl, FactoryDecl, InjectableDecl, ModelBuilder, ModuleDecl,
    };

    fn generate_for(model: &DeclarationModel, component: &str) -> GeneratedUnit {
        let decl = model.component(component).unwrap();
        let (table, errors) = BindingTable::build(model, component, decl);
        assert!(errors.is_empty(), "{errors:?}");
        let (graph, errors) = resolve(&table, &decl.entry_points);
        assert!(errors.is_empty(), "{errors:?}");
        assert!(check_cycles(&graph).is_empty());
        let order = schedule(&graph);
        generate(component, &graph, &order, model, &CompilerOptions::default()).unwrap()
    }

    fn none() -> Vec<TypeKey> {
        Vec::new()
    }

    #[test]
    fn test_snake_case() {
        assert_eq!(snake_case("localBookLoader"), "local_book_loader");
        assert_eq!(snake_case("DummyModule"), "dummy_module");
        assert_eq!(snake_case("crate::io::DummyModule"), "dummy_module");
        assert_eq!(snake_case("dyn BookLoader"), "book_loader");
        assert_eq!(snake_case("Vec<String>"), "vec");
        assert_eq!(snake_case("provide_greeting"), "provide_greeting");
        assert_eq!(snake_case("type"), "type_");
        assert_eq!(snake_case("i32"), "i32");
        assert_eq!(snake_case("2fa"), "value_2fa");
    }

    #[test]
    fn test_book_loader_shape() {
        let model = ModelBuilder::new()
            .injectable(
                "LocalBookLoader",
                InjectableDecl::new()
                    .supertype("dyn BookLoader")
                    .constructor(ConstructorDecl::inject(none())),
            )
            .injectable(
                "RemoteBookLoader",
                InjectableDecl::new()
                    .supertype("dyn BookLoader")
                    .constructor(ConstructorDecl::new(["dyn BookLoader@local"])),
            )
            .component(
                "DummyComponent",
                ComponentDecl::new()
                    .provision(FactoryDecl::runtime("hello", "String"))
                    .provision(FactoryDecl::delegate(
                        "localBookLoader",
                        "dyn BookLoader@local",
                        "LocalBookLoader",
                    ))
                    .provision(FactoryDecl::new_instance_of(
                        "remoteBookLoader",
                        "dyn BookLoader@remote",
                        "RemoteBookLoader",
                    ))
                    .entry("hello", "String")
                    .entry("local_book_loader", "dyn BookLoader@local")
                    .entry("remote_book_loader", "dyn BookLoader@remote"),
            )
            .build();

        let unit = generate_for(&model, "DummyComponent");
        assert_eq!(unit.name, "WiredDummyComponent");
        assert_eq!(unit.builder.name, "WiredDummyComponentBuilder");
        assert_eq!(unit.required_runtime_inputs(), vec![("hello", &TypeKey::new("String"))]);

        let fields: Vec<_> = unit.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(fields, vec!["local_book_loader_2", "local_book_loader"]);
        assert_eq!(
            unit.fields[0].factory,
            Factory::Construct {
                ty: "LocalBookLoader".into(),
                constructor: "new".into(),
                args: vec![],
            }
        );
        assert_eq!(
            unit.fields[1].factory,
            Factory::Delegate {
                target: Access::Field("local_book_loader_2".into())
            }
        );

        assert_eq!(unit.providers.len(), 1);
        assert_eq!(
            unit.providers[0].factory,
            Factory::NewInstance {
                ty: "RemoteBookLoader".into(),
                constructor: "new".into(),
                args: vec![Access::Field("local_book_loader".into())],
            }
        );

        let accesses: Vec<_> = unit.accessors.iter().map(|a| a.access.clone()).collect();
        assert_eq!(
            accesses,
            vec![
                Access::Input("hello".into()),
                Access::Field("local_book_loader".into()),
                Access::Provider("remote_book_loader".into()),
            ]
        );
    }

    #[test]
    fn test_module_instances_become_inputs() {
        let model = ModelBuilder::new()
            .module(
                "ConfigModule",
                ModuleDecl::new()
                    .default_constructible()
                    .factory(FactoryDecl::factory("config", "Config", none())),
            )
            .module(
                "DbModule",
                ModuleDecl::new()
                    .factory(FactoryDecl::optional_runtime("pool_size", "usize"))
                    .factory(FactoryDecl::factory("db", "Db", ["Config", "usize"])),
            )
            .component(
                "App",
                ComponentDecl::new()
                    .module("ConfigModule")
                    .module("DbModule")
                    .entry("db", "Db")
                    .entry("config", "Config"),
            )
            .build();

        let unit = generate_for(&model, "App");
        let inputs: Vec<_> = unit
            .inputs
            .iter()
            .map(|i| (i.name.as_str(), i.required))
            .collect();
        assert_eq!(
            inputs,
            vec![("config_module", false), ("pool_size", false), ("db_module", true)]
        );
        assert!(unit.required_runtime_inputs().is_empty());
        assert_eq!(
            unit.field("db").unwrap().factory,
            Factory::ModuleCall {
                module_input: "db_module".into(),
                module: "DbModule".into(),
                method: "db".into(),
                args: vec![Access::Field("config".into()), Access::Input("pool_size".into())],
            }
        );
        assert_eq!(unit.builder.setters.len(), 3);
        assert!(unit.builder.setters.iter().any(|s| s.name == "db_module" && s.required));
    }
}
