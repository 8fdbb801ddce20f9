use crate::model::TypeKey;
use serde::{Deserialize, Serialize};

/// The compiler's output for one component, handed to an emitter.
///
/// Immutable once returned. Field, provider and input order is the topological order
/// of the bindings they come from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedUnit {
    pub name: String,
    pub component: String,
    pub inputs: Vec<UnitInput>,
    pub fields: Vec<CachedField>,
    pub providers: Vec<FreshProvider>,
    pub accessors: Vec<Accessor>,
    pub builder: BuilderShape,
}

impl GeneratedUnit {
    /// Runtime-supplied values that `build()` insists on, as `(parameter name, type key)`.
    pub fn required_runtime_inputs(&self) -> Vec<(&str, &TypeKey)> {
        self.inputs
            .iter()
            .filter(|input| input.required)
            .filter_map(|input| match &input.source {
                InputSource::Binding { key } => Some((input.name.as_str(), key)),
                InputSource::Module { .. } => None,
            })
            .collect()
    }

    pub fn input(&self, name: &str) -> Option<&UnitInput> {
        self.inputs.iter().find(|input| input.name == name)
    }

    pub fn field(&self, name: &str) -> Option<&CachedField> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn provider(&self, name: &str) -> Option<&FreshProvider> {
        self.providers.iter().find(|provider| provider.name == name)
    }

    pub fn accessor(&self, name: &str) -> Option<&Accessor> {
        self.accessors.iter().find(|accessor| accessor.name == name)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitInput {
    pub name: String,
    pub source: InputSource,
    /// Unset required inputs make `build()` fail; optional ones fall back to a default.
    pub required: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum InputSource {
    /// A runtime-supplied binding.
    Binding { key: TypeKey },
    /// The instance of a module whose factories the unit calls.
    Module { module: String },
}

impl InputSource {
    /// Name the default value is looked up by: the type identity or the module name.
    pub fn default_name(&self) -> &str {
        match self {
            Self::Binding { key } => &key.ty,
            Self::Module { module } => module,
        }
    }
}

/// One memoized value per generated-unit instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedField {
    pub name: String,
    pub key: TypeKey,
    pub factory: Factory,
}

/// A factory body re-run on every access.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreshProvider {
    pub name: String,
    pub key: TypeKey,
    pub factory: Factory,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Factory {
    /// `ty::constructor(args..)`
    Construct {
        ty: String,
        constructor: String,
        args: Vec<Access>,
    },
    /// Same call as `Construct`, from a new-instance binding.
    NewInstance {
        ty: String,
        constructor: String,
        args: Vec<Access>,
    },
    /// `module_input.method(args..)`
    ModuleCall {
        module_input: String,
        module: String,
        method: String,
        args: Vec<Access>,
    },
    Delegate { target: Access },
}

impl Factory {
    pub fn args(&self) -> &[Access] {
        match self {
            Self::Construct { args, .. }
            | Self::NewInstance { args, .. }
            | Self::ModuleCall { args, .. } => args,
            Self::Delegate { target } => std::slice::from_ref(target),
        }
    }
}

/// How generated code reaches an already-generated value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "kebab-case")]
pub enum Access {
    /// Read a runtime or module input.
    Input(String),
    /// Read (initializing once) a cached field.
    Field(String),
    /// Invoke a fresh provider.
    Provider(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Accessor {
    pub name: String,
    pub key: TypeKey,
    pub access: Access,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuilderShape {
    pub name: String,
    pub setters: Vec<Setter>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Setter {
    pub name: String,
    pub input: String,
    pub required: bool,
}
