//! Generated-unit interpreter
//!
//! Runs a [`GeneratedUnit`] directly instead of going through emitted source. Values
//! are type-erased `Arc<dyn Any + Send + Sync>`; constructors, module factories and
//! defaults are looked up by name in a [`ProviderRegistry`].

mod builder;

pub use builder::UnitBuilder;

use crate::codegen::{Access, Factory, GeneratedUnit};
use crate::error::BuildError;
use dashmap::DashMap;
use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

pub type Instance = Arc<dyn Any + Send + Sync>;

type ConstructorFn = Arc<dyn Fn(&[Instance]) -> Instance + Send + Sync>;
type FactoryFn = Arc<dyn Fn(&Instance, &[Instance]) -> Instance + Send + Sync>;
type DefaultFn = Arc<dyn Fn() -> Instance + Send + Sync>;

/// Thread-safe table of the callables a generated unit invokes.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    constructors: DashMap<(String, String), ConstructorFn>,
    factories: DashMap<(String, String), FactoryFn>,
    defaults: DashMap<String, DefaultFn>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `ty::constructor`. Arguments arrive in declared parameter order.
    pub fn constructor<F>(&self, ty: &str, constructor: &str, f: F) -> &Self
    where
        F: Fn(&[Instance]) -> Instance + Send + Sync + 'static,
    {
        self.constructors
            .insert((ty.to_string(), constructor.to_string()), Arc::new(f));
        self
    }

    /// Register factory `method` of `module`, called on the unit's module instance.
    pub fn factory<F>(&self, module: &str, method: &str, f: F) -> &Self
    where
        F: Fn(&Instance, &[Instance]) -> Instance + Send + Sync + 'static,
    {
        self.factories
            .insert((module.to_string(), method.to_string()), Arc::new(f));
        self
    }

    /// Fallback for an optional input, keyed by type identity or module name.
    pub fn default_value<F>(&self, name: &str, f: F) -> &Self
    where
        F: Fn() -> Instance + Send + Sync + 'static,
    {
        self.defaults.insert(name.to_string(), Arc::new(f));
        self
    }

    pub fn default_of<T: Default + Send + Sync + 'static>(&self, name: &str) -> &Self {
        self.default_value(name, || Arc::new(T::default()))
    }

    fn default_for(&self, name: &str) -> Option<Instance> {
        let make = self.defaults.get(name)?.value().clone();
        Some(make())
    }

    pub fn len(&self) -> usize {
        self.constructors.len() + self.factories.len() + self.defaults.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Storage for one cached field. `init` serializes the first construction so the
/// factory runs at most once even when several threads miss at the same time.
#[derive(Default)]
struct FieldSlot {
    value: OnceLock<Instance>,
    init: Mutex<()>,
}

/// A built generated unit: inputs fixed, cached fields filled on first access.
pub struct WiredInstance {
    unit: Arc<GeneratedUnit>,
    registry: Arc<ProviderRegistry>,
    inputs: HashMap<String, Instance>,
    fields: HashMap<String, FieldSlot>,
}

impl WiredInstance {
    pub fn unit(&self) -> &GeneratedUnit {
        &self.unit
    }

    /// Value of the entry point named `accessor`.
    pub fn get(&self, accessor: &str) -> Result<Instance, BuildError> {
        let accessor = self
            .unit
            .accessor(accessor)
            .ok_or_else(|| BuildError::UnknownAccessor {
                unit: self.unit.name.clone(),
                name: accessor.to_string(),
            })?;
        self.access(&accessor.access)
    }

    pub fn get_as<T: Any + Send + Sync>(&self, accessor: &str) -> Result<Arc<T>, BuildError> {
        self.get(accessor)?
            .downcast::<T>()
            .map_err(|_| BuildError::DowncastFailed {
                unit: self.unit.name.clone(),
                name: accessor.to_string(),
                expected: std::any::type_name::<T>().to_string(),
            })
    }

    fn access(&self, access: &Access) -> Result<Instance, BuildError> {
        match access {
            Access::Input(name) => self
                .inputs
                .get(name)
                .cloned()
                .ok_or_else(|| self.unknown_input(name)),
            Access::Field(name) => {
                let slot = self.fields.get(name).ok_or_else(|| self.unknown_input(name))?;
                if let Some(value) = slot.value.get() {
                    return Ok(value.clone());
                }
                // Dependencies lock their own slots; the graph is acyclic, so no lock
                // is ever waited on by a field it depends on.
                let _init = slot.init.lock().unwrap_or_else(PoisonError::into_inner);
                if let Some(value) = slot.value.get() {
                    return Ok(value.clone());
                }
                let field = self.unit.field(name).ok_or_else(|| self.unknown_input(name))?;
                let value = self.run(&field.factory)?;
                Ok(slot.value.get_or_init(|| value).clone())
            }
            Access::Provider(name) => {
                let provider = self
                    .unit
                    .provider(name)
                    .ok_or_else(|| self.unknown_input(name))?;
                self.run(&provider.factory)
            }
        }
    }

    fn run(&self, factory: &Factory) -> Result<Instance, BuildError> {
        let args = factory
            .args()
            .iter()
            .map(|arg| self.access(arg))
            .collect::<Result<Vec<_>, _>>()?;

        match factory {
            Factory::Construct {
                ty, constructor, ..
            }
            | Factory::NewInstance {
                ty, constructor, ..
            } => {
                let call = self
                    .registry
                    .constructors
                    .get(&(ty.clone(), constructor.clone()))
                    .map(|f| f.value().clone())
                    .ok_or_else(|| self.missing_provider(format!("{ty}::{constructor}")))?;
                Ok(call(&args))
            }
            Factory::ModuleCall {
                module_input,
                module,
                method,
                ..
            } => {
                let instance = self
                    .inputs
                    .get(module_input)
                    .ok_or_else(|| self.unknown_input(module_input))?;
                let call = self
                    .registry
                    .factories
                    .get(&(module.clone(), method.clone()))
                    .map(|f| f.value().clone())
                    .ok_or_else(|| self.missing_provider(format!("{module}::{method}")))?;
                Ok(call(instance, &args))
            }
            Factory::Delegate { .. } => args
                .into_iter()
                .next()
                .ok_or_else(|| self.missing_provider("delegate target".to_string())),
        }
    }

    fn unknown_input(&self, name: &str) -> BuildError {
        BuildError::UnknownInput {
            unit: self.unit.name.clone(),
            name: name.to_string(),
        }
    }

    fn missing_provider(&self, target: String) -> BuildError {
        BuildError::MissingProvider {
            unit: self.unit.name.clone(),
            target,
        }
    }
}
