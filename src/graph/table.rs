//! Binding Table Builder
//!
//! Indexes every provider visible to one component by type key. Explicit module
//! bindings are collected eagerly (duplicates are reported with both declaration
//! sites); implicit constructor bindings are derived on lookup, and only for
//! unqualified keys that have no explicit binding.

use crate::error::CompileError;
use crate::graph::{Binding, BindingKind, BindingSite};
use crate::model::{
    ComponentDecl, ConstructorDecl, DeclarationModel, FactoryDecl, Lifetime, Provision, TypeKey,
    inline_module_name,
};
use indexmap::IndexMap;
use std::collections::HashSet;

/// Every binding visible to one component.
///
/// Built once, read-only afterwards.
pub struct BindingTable<'m> {
    model: &'m DeclarationModel,
    bindings: IndexMap<TypeKey, Binding>,
}

impl<'m> BindingTable<'m> {
    /// Merge the component's inline provisions and attached modules into one table.
    ///
    /// The table is always returned, holding the first binding for any duplicated key,
    /// so resolution can continue and report further defects.
    pub fn build(
        model: &'m DeclarationModel,
        component_name: &str,
        component: &ComponentDecl,
    ) -> (Self, Vec<CompileError>) {
        let mut errors = Vec::new();
        let mut sources: Vec<(String, &[FactoryDecl], bool)> = Vec::new();

        if !component.provisions.is_empty() {
            sources.push((
                inline_module_name(component_name),
                component.provisions.as_slice(),
                true,
            ));
        }

        let mut attached = HashSet::new();
        for module_name in &component.modules {
            if !attached.insert(module_name.as_str()) {
                tracing::debug!(
                    "Module {} attached to {} more than once",
                    module_name,
                    component_name
                );
                continue;
            }
            match model.module(module_name) {
                Some(module) => {
                    sources.push((module_name.clone(), module.factories.as_slice(), false))
                }
                None => errors.push(CompileError::UnknownModule {
                    component: component_name.to_string(),
                    module: module_name.clone(),
                }),
            }
        }

        let mut bindings: IndexMap<TypeKey, Binding> = IndexMap::new();
        for (module_name, factories, inline) in sources {
            for (key, binding) in bind_module(model, &module_name, factories, inline, &mut errors) {
                match bindings.get(&key) {
                    Some(existing) => errors.push(CompileError::duplicate(
                        key,
                        existing.site.clone(),
                        binding.site,
                    )),
                    None => {
                        bindings.insert(key, binding);
                    }
                }
            }
        }

        check_entry_points(component_name, component, &mut errors);
        check_runtime_qualifiers(component, &bindings, &mut errors);

        tracing::debug!(
            "Binding table for {}: {} explicit bindings",
            component_name,
            bindings.len()
        );
        (Self { model, bindings }, errors)
    }

    /// Explicit binding for exactly `key`, if one was declared.
    pub fn explicit(&self, key: &TypeKey) -> Option<&Binding> {
        self.bindings.get(key)
    }

    /// Two-tier lookup: the explicit binding first, then the implicit constructor binding.
    ///
    /// `None` means nothing can provide `key`.
    pub fn lookup(&self, key: &TypeKey) -> Option<Result<Binding, CompileError>> {
        if let Some(binding) = self.bindings.get(key) {
            return Some(Ok(binding.clone()));
        }
        self.implicit(key)
    }

    fn implicit(&self, key: &TypeKey) -> Option<Result<Binding, CompileError>> {
        if key.is_qualified() {
            return None;
        }
        let injectable = self.model.injectable(&key.ty)?;
        let site = BindingSite::Implicit { ty: key.ty.clone() };
        match injectable.inject_constructors().as_slice() {
            [] => None,
            [ctor] => Some(Ok(Binding {
                key: key.clone(),
                kind: BindingKind::Constructor {
                    target: key.ty.clone(),
                    constructor: ctor.name.clone(),
                },
                lifetime: injectable.lifetime,
                dependencies: ctor.params.clone(),
                site,
            })),
            _ => Some(Err(CompileError::invalid_provision(
                key.clone(),
                site,
                format!(
                    "more than one injectable constructor on {}, can't choose one",
                    key.ty
                ),
            ))),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Binding> {
        self.bindings.values()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

/// Bindings declared by one module, duplicates within the module reported.
fn bind_module(
    model: &DeclarationModel,
    module_name: &str,
    factories: &[FactoryDecl],
    inline: bool,
    errors: &mut Vec<CompileError>,
) -> IndexMap<TypeKey, Binding> {
    let mut bindings: IndexMap<TypeKey, Binding> = IndexMap::new();
    for decl in factories {
        let binding = match bind_declaration(model, module_name, decl, inline) {
            Ok(binding) => binding,
            Err(e) => {
                errors.push(e);
                continue;
            }
        };
        match bindings.get(&binding.key) {
            Some(existing) => errors.push(CompileError::duplicate(
                binding.key.clone(),
                existing.site.clone(),
                binding.site,
            )),
            None => {
                bindings.insert(binding.key.clone(), binding);
            }
        }
    }
    bindings
}

fn bind_declaration(
    model: &DeclarationModel,
    module_name: &str,
    decl: &FactoryDecl,
    inline: bool,
) -> Result<Binding, CompileError> {
    let site = BindingSite::declared(module_name, &decl.name);
    let invalid =
        |reason: String| CompileError::invalid_provision(decl.key.clone(), site.clone(), reason);

    if !decl.params.is_empty() && decl.provision != Provision::Factory {
        return Err(invalid(format!(
            "only module factories can declare parameters, {} declares {}",
            decl.name,
            decl.params.len()
        )));
    }

    let lifetime = decl.lifetime.unwrap_or_default();
    let (kind, dependencies, lifetime) = match &decl.provision {
        Provision::Runtime { optional } => (
            BindingKind::Runtime {
                optional: *optional,
            },
            Vec::new(),
            Lifetime::Cached,
        ),
        Provision::Factory => {
            if inline {
                return Err(invalid(
                    "module factories need a module instance, declare them in an attached module"
                        .to_string(),
                ));
            }
            (
                BindingKind::ModuleFactory {
                    module: module_name.to_string(),
                    method: decl.name.clone(),
                },
                decl.params.clone(),
                lifetime,
            )
        }
        Provision::Constructor { target } => {
            let ctor = constructor_for(model, &decl.key, target).map_err(&invalid)?;
            (
                BindingKind::Constructor {
                    target: target.clone(),
                    constructor: ctor.name.clone(),
                },
                ctor.params.clone(),
                lifetime,
            )
        }
        Provision::NewInstance { target } => {
            let target = target.clone().unwrap_or_else(|| decl.key.ty.clone());
            let ctor = constructor_for(model, &decl.key, &target).map_err(&invalid)?;
            if decl.lifetime == Some(Lifetime::Cached) {
                tracing::warn!(
                    "{} is a new-instance binding and is never cached, ignoring its cached lifetime",
                    site
                );
            }
            let constructor = ctor.name.clone();
            let dependencies = ctor.params.clone();
            (
                BindingKind::Wrapping {
                    target,
                    constructor,
                },
                dependencies,
                Lifetime::Fresh,
            )
        }
        Provision::Delegate { target } => {
            if let Some(injectable) = model.injectable(&target.ty) {
                if !injectable.is_assignable_to(&target.ty, &decl.key.ty) {
                    return Err(invalid(format!(
                        "injected type {} is not a subtype of {}",
                        target.ty, decl.key.ty
                    )));
                }
            }
            (BindingKind::Delegate, vec![target.clone()], lifetime)
        }
    };

    Ok(Binding {
        key: decl.key.clone(),
        kind,
        lifetime,
        dependencies,
        site,
    })
}

fn constructor_for<'m>(
    model: &'m DeclarationModel,
    key: &TypeKey,
    target: &str,
) -> Result<&'m ConstructorDecl, String> {
    let injectable = model
        .injectable(target)
        .ok_or_else(|| format!("no constructors declared for {target}"))?;
    if !injectable.is_assignable_to(target, &key.ty) {
        return Err(format!(
            "implementation type {target} is not a subtype of {}",
            key.ty
        ));
    }
    injectable.select_constructor(target)
}

/// Entry points become methods on the generated unit, beside `builder()` and the
/// private `provide_*` methods, so their names must be unique and stay clear of those.
fn check_entry_points(
    component_name: &str,
    component: &ComponentDecl,
    errors: &mut Vec<CompileError>,
) {
    let mut seen = HashSet::new();
    for entry in &component.entry_points {
        let name = entry.name.as_str();
        let reason = if !seen.insert(name) {
            "is declared more than once"
        } else if name == "builder" {
            "clashes with the generated builder() method"
        } else if name.starts_with("provide_") {
            "uses the provide_ prefix reserved for provider methods"
        } else {
            continue;
        };
        errors.push(CompileError::invalid_entry_point(component_name, name, reason));
    }
}

/// An entry point that shares its name with a runtime-supplied declaration must request
/// exactly the key that declaration provides.
fn check_runtime_qualifiers(
    component: &ComponentDecl,
    bindings: &IndexMap<TypeKey, Binding>,
    errors: &mut Vec<CompileError>,
) {
    for entry in &component.entry_points {
        for binding in bindings.values() {
            if binding.is_runtime()
                && binding.declared_name() == Some(entry.name.as_str())
                && binding.key.same_type(&entry.key)
                && binding.key.qualifier != entry.key.qualifier
            {
                errors.push(CompileError::malformed_qualifier(
                    binding.key.clone(),
                    binding.site.clone(),
                    format!(
                        "entry point {} requests {} but the runtime value is declared as {}",
                        entry.name, entry.key, binding.key
                    ),
                ));
            }
        }
    }
}
