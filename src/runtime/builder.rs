use crate::codegen::{GeneratedUnit, InputSource};
use crate::error::BuildError;
use crate::runtime::{FieldSlot, Instance, ProviderRegistry, WiredInstance};
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

/// Builder for a runnable generated unit
///
/// Inputs are set by name; `build()` checks them all at once.
///
/// # Example
/// ```
/// use meshestra_compiler::model::{ComponentDecl, FactoryDecl, ModelBuilder};
/// use meshestra_compiler::runtime::{ProviderRegistry, UnitBuilder};
///
/// let model = ModelBuilder::new()
///     .component(
///         "PortComponent",
///         ComponentDecl::new()
///             .provision(FactoryDecl::runtime("port", "u16"))
///             .entry("port", "u16"),
///     )
///     .build();
/// let unit = meshestra_compiler::compile(&model, "PortComponent").unwrap();
///
/// let wired = UnitBuilder::new(unit, ProviderRegistry::new())
///     .set("port", 8080u16)
///     .build()
///     .unwrap();
/// assert_eq!(*wired.get_as::<u16>("port").unwrap(), 8080);
/// ```
pub struct UnitBuilder {
    unit: Arc<GeneratedUnit>,
    registry: Arc<ProviderRegistry>,
    values: HashMap<String, Instance>,
}

impl UnitBuilder {
    pub fn new(unit: GeneratedUnit, registry: ProviderRegistry) -> Self {
        Self::shared(Arc::new(unit), Arc::new(registry))
    }

    /// Several instances of one unit can share the unit and registry.
    pub fn shared(unit: Arc<GeneratedUnit>, registry: Arc<ProviderRegistry>) -> Self {
        Self {
            unit,
            registry,
            values: HashMap::new(),
        }
    }

    /// Set the input named `name`.
    pub fn set<T: Any + Send + Sync>(self, name: &str, value: T) -> Self {
        self.set_instance(name, Arc::new(value))
    }

    pub fn set_instance(mut self, name: &str, value: Instance) -> Self {
        self.values.insert(name.to_string(), value);
        self
    }

    /// Supply the instance of `module` instead of its default.
    pub fn set_module<T: Any + Send + Sync>(self, module: &str, value: T) -> Self {
        let name = self
            .unit
            .inputs
            .iter()
            .find(|input| matches!(&input.source, InputSource::Module { module: m } if m == module))
            .map(|input| input.name.clone())
            .unwrap_or_else(|| module.to_string());
        self.set(&name, value)
    }

    pub fn build(mut self) -> Result<WiredInstance, BuildError> {
        let unit_name = &self.unit.name;

        let mut unknown: Vec<String> = self
            .values
            .keys()
            .filter(|name| self.unit.input(name).is_none())
            .cloned()
            .collect();
        if !unknown.is_empty() {
            unknown.sort();
            return Err(BuildError::UnknownInputs {
                unit: unit_name.clone(),
                names: unknown,
            });
        }

        let missing: Vec<String> = self
            .unit
            .inputs
            .iter()
            .filter(|input| input.required && !self.values.contains_key(&input.name))
            .map(|input| input.name.clone())
            .collect();
        if !missing.is_empty() {
            tracing::debug!("{}: build() without {:?}", unit_name, missing);
            return Err(BuildError::MissingRequiredInput {
                unit: unit_name.clone(),
                inputs: missing,
            });
        }

        for input in self.unit.inputs.iter().filter(|input| !input.required) {
            if self.values.contains_key(&input.name) {
                continue;
            }
            let value = self
                .registry
                .default_for(input.source.default_name())
                .ok_or_else(|| BuildError::MissingDefault {
                    unit: unit_name.clone(),
                    input: input.name.clone(),
                })?;
            self.values.insert(input.name.clone(), value);
        }

        Ok(WiredInstance {
            registry: self.registry,
            inputs: self.values,
            fields: self
                .unit
                .fields
                .iter()
                .map(|field| (field.name.clone(), FieldSlot::default()))
                .collect(),
            unit: self.unit,
        })
    }
}
