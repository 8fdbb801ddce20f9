//! Declaration Model
//!
//! The neutral, already-parsed description of components, modules and injectable
//! types that the compiler consumes. Front-ends (attribute macros, config files,
//! the fluent [`ModelBuilder`]) translate their own syntax into this shape; nothing
//! downstream ever looks at source syntax.

mod builder;

pub use builder::ModelBuilder;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Identifies a requested or provided value: a type identity plus an optional qualifier.
///
/// `Loader`, `Loader@""` and `Loader@local` are three distinct keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TypeKey {
    pub ty: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qualifier: Option<String>,
}

impl TypeKey {
    pub fn new(ty: impl Into<String>) -> Self {
        Self {
            ty: ty.into(),
            qualifier: None,
        }
    }

    pub fn qualified(ty: impl Into<String>, qualifier: impl Into<String>) -> Self {
        Self {
            ty: ty.into(),
            qualifier: Some(qualifier.into()),
        }
    }

    pub fn is_qualified(&self) -> bool {
        self.qualifier.is_some()
    }

    /// Same type identity, different (or absent) qualifier.
    pub fn same_type(&self, other: &TypeKey) -> bool {
        self.ty == other.ty
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.qualifier.as_deref() {
            None => write!(f, "{}", self.ty),
            Some("") => write!(f, "{}@\"\"", self.ty),
            Some(q) => write!(f, "{}@{}", self.ty, q),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyParseError {
    #[error("type key `{0}` has no type")]
    EmptyType(String),
    #[error("type key `{0}` has nothing after `@`; the empty qualifier is written `@\"\"`")]
    EmptyQualifier(String),
}

/// Parses the display form back: `Loader`, `Loader@local`, `Loader@""`.
///
/// A bare trailing `@` is rejected so every key has exactly one text form.
impl FromStr for TypeKey {
    type Err = KeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = match s.rsplit_once('@') {
            Some((ty, q)) => match q.trim() {
                "" => return Err(KeyParseError::EmptyQualifier(s.to_string())),
                "\"\"" => TypeKey::qualified(ty.trim(), ""),
                q => TypeKey::qualified(ty.trim(), q),
            },
            None => TypeKey::new(s.trim()),
        };
        if key.ty.is_empty() {
            return Err(KeyParseError::EmptyType(s.to_string()));
        }
        Ok(key)
    }
}

/// Lenient conversion for builder arguments. Text that does not parse becomes an
/// unqualified key spelled exactly as written; it matches no declaration, so the
/// resolver reports it verbatim.
impl From<&str> for TypeKey {
    fn from(s: &str) -> Self {
        s.parse().unwrap_or_else(|_| TypeKey::new(s.trim()))
    }
}

/// Whether a binding's value is memoized per component instance or rebuilt per access.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lifetime {
    #[default]
    Cached,
    Fresh,
}

/// How a declared factory produces its value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Provision {
    /// Furnished by whoever builds the generated unit.
    Runtime {
        #[serde(default)]
        optional: bool,
    },
    /// A factory method on the module instance; its parameters are its dependencies.
    Factory,
    /// Constructor injection on a concrete target type.
    Constructor { target: String },
    /// Always-fresh construction of `target` (defaults to the requested type).
    NewInstance {
        #[serde(default)]
        target: Option<String>,
    },
    /// Satisfied by whatever binding satisfies `target`.
    Delegate { target: TypeKey },
}

/// A single provider declaration inside a module (or inline on a component).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactoryDecl {
    pub name: String,
    pub key: TypeKey,
    pub provision: Provision,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<TypeKey>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lifetime: Option<Lifetime>,
}

impl FactoryDecl {
    fn with(name: impl Into<String>, key: impl Into<TypeKey>, provision: Provision) -> Self {
        Self {
            name: name.into(),
            key: key.into(),
            provision,
            params: Vec::new(),
            lifetime: None,
        }
    }

    pub fn runtime(name: impl Into<String>, key: impl Into<TypeKey>) -> Self {
        Self::with(name, key, Provision::Runtime { optional: false })
    }

    /// A runtime input that falls back to the type's default when never set.
    pub fn optional_runtime(name: impl Into<String>, key: impl Into<TypeKey>) -> Self {
        Self::with(name, key, Provision::Runtime { optional: true })
    }

    pub fn factory<P, K>(name: impl Into<String>, key: impl Into<TypeKey>, params: P) -> Self
    where
        P: IntoIterator<Item = K>,
        K: Into<TypeKey>,
    {
        let mut decl = Self::with(name, key, Provision::Factory);
        decl.params = params.into_iter().map(Into::into).collect();
        decl
    }

    pub fn constructor(
        name: impl Into<String>,
        key: impl Into<TypeKey>,
        target: impl Into<String>,
    ) -> Self {
        Self::with(name, key, Provision::Constructor { target: target.into() })
    }

    pub fn new_instance(name: impl Into<String>, key: impl Into<TypeKey>) -> Self {
        Self::with(name, key, Provision::NewInstance { target: None })
    }

    pub fn new_instance_of(
        name: impl Into<String>,
        key: impl Into<TypeKey>,
        target: impl Into<String>,
    ) -> Self {
        Self::with(
            name,
            key,
            Provision::NewInstance {
                target: Some(target.into()),
            },
        )
    }

    pub fn delegate(
        name: impl Into<String>,
        key: impl Into<TypeKey>,
        target: impl Into<TypeKey>,
    ) -> Self {
        Self::with(name, key, Provision::Delegate { target: target.into() })
    }

    pub fn fresh(mut self) -> Self {
        self.lifetime = Some(Lifetime::Fresh);
        self
    }

    pub fn cached(mut self) -> Self {
        self.lifetime = Some(Lifetime::Cached);
        self
    }

    pub fn with_params<P, K>(mut self, params: P) -> Self
    where
        P: IntoIterator<Item = K>,
        K: Into<TypeKey>,
    {
        self.params = params.into_iter().map(Into::into).collect();
        self
    }
}

/// A named group of factory declarations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleDecl {
    #[serde(default)]
    pub factories: Vec<FactoryDecl>,
    /// The module can be built without arguments when the caller does not supply one.
    #[serde(default)]
    pub default_constructible: bool,
}

impl ModuleDecl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn default_constructible(mut self) -> Self {
        self.default_constructible = true;
        self
    }

    pub fn factory(mut self, decl: FactoryDecl) -> Self {
        self.factories.push(decl);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryPoint {
    pub name: String,
    pub key: TypeKey,
}

/// A set of entry points plus the modules that supply bindings for them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentDecl {
    #[serde(default)]
    pub entry_points: Vec<EntryPoint>,
    #[serde(default)]
    pub modules: Vec<String>,
    /// Provisions declared directly on the component. They form an implicit module
    /// named by [`inline_module_name`].
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub provisions: Vec<FactoryDecl>,
}

impl ComponentDecl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn module(mut self, name: impl Into<String>) -> Self {
        self.modules.push(name.into());
        self
    }

    pub fn entry(mut self, name: impl Into<String>, key: impl Into<TypeKey>) -> Self {
        self.entry_points.push(EntryPoint {
            name: name.into(),
            key: key.into(),
        });
        self
    }

    pub fn provision(mut self, decl: FactoryDecl) -> Self {
        self.provisions.push(decl);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstructorDecl {
    #[serde(default = "default_constructor_name")]
    pub name: String,
    #[serde(default)]
    pub params: Vec<TypeKey>,
    /// Marked as the injection constructor.
    #[serde(default)]
    pub inject: bool,
    #[serde(default = "default_visible")]
    pub visible: bool,
}

fn default_constructor_name() -> String {
    "new".to_string()
}

fn default_visible() -> bool {
    true
}

impl ConstructorDecl {
    pub fn new<P, K>(params: P) -> Self
    where
        P: IntoIterator<Item = K>,
        K: Into<TypeKey>,
    {
        Self {
            name: default_constructor_name(),
            params: params.into_iter().map(Into::into).collect(),
            inject: false,
            visible: true,
        }
    }

    pub fn inject<P, K>(params: P) -> Self
    where
        P: IntoIterator<Item = K>,
        K: Into<TypeKey>,
    {
        Self {
            inject: true,
            ..Self::new(params)
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }
}

/// A concrete (or abstract) type and the constructors it exposes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InjectableDecl {
    #[serde(default, rename = "abstract")]
    pub is_abstract: bool,
    #[serde(default)]
    pub supertypes: Vec<String>,
    #[serde(default)]
    pub constructors: Vec<ConstructorDecl>,
    #[serde(default)]
    pub lifetime: Lifetime,
}

impl InjectableDecl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn abstract_type(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    pub fn supertype(mut self, ty: impl Into<String>) -> Self {
        self.supertypes.push(ty.into());
        self
    }

    pub fn constructor(mut self, ctor: ConstructorDecl) -> Self {
        self.constructors.push(ctor);
        self
    }

    pub fn fresh(mut self) -> Self {
        self.lifetime = Lifetime::Fresh;
        self
    }

    /// `own_ty` is this declaration's own type identity.
    pub fn is_assignable_to(&self, own_ty: &str, ty: &str) -> bool {
        own_ty == ty || self.supertypes.iter().any(|s| s == ty)
    }

    /// Constructors eligible for implicit injection: visible and marked `inject`.
    pub fn inject_constructors(&self) -> Vec<&ConstructorDecl> {
        if self.is_abstract {
            return Vec::new();
        }
        self.constructors
            .iter()
            .filter(|c| c.inject && c.visible)
            .collect()
    }

    /// The constructor an explicit constructor/new-instance provision calls.
    ///
    /// Prefers the `inject`-marked constructor, otherwise the sole visible one.
    pub fn select_constructor(&self, own_ty: &str) -> Result<&ConstructorDecl, String> {
        if self.is_abstract {
            return Err(format!("can't create instances of abstract type {own_ty}"));
        }
        let injectable = self.inject_constructors();
        if injectable.len() == 1 {
            return Ok(injectable[0]);
        }
        if injectable.len() > 1 {
            return Err(format!(
                "more than one injectable constructor on {own_ty}, can't choose one"
            ));
        }
        let visible: Vec<_> = self.constructors.iter().filter(|c| c.visible).collect();
        match visible.as_slice() {
            [] => Err(format!("no visible constructor on {own_ty}")),
            [only] => Ok(only),
            _ => Err(format!(
                "more than one constructor available on {own_ty}, can't choose one"
            )),
        }
    }
}

/// Everything the front-end parsed: components, modules and injectable types by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclarationModel {
    #[serde(default)]
    pub components: IndexMap<String, ComponentDecl>,
    #[serde(default)]
    pub modules: IndexMap<String, ModuleDecl>,
    #[serde(default)]
    pub injectables: IndexMap<String, InjectableDecl>,
}

impl DeclarationModel {
    pub fn builder() -> ModelBuilder {
        ModelBuilder::new()
    }

    pub fn component(&self, name: &str) -> Option<&ComponentDecl> {
        self.components.get(name)
    }

    pub fn module(&self, name: &str) -> Option<&ModuleDecl> {
        self.modules.get(name)
    }

    pub fn injectable(&self, ty: &str) -> Option<&InjectableDecl> {
        self.injectables.get(ty)
    }
}

/// Name of the implicit module formed by a component's inline provisions:
/// `DummyComponent` becomes `DummyModule`, `Shell` becomes `ShellModule`.
pub fn inline_module_name(component: &str) -> String {
    match component.strip_suffix("Component") {
        Some(stem) if !stem.is_empty() => format!("{stem}Module"),
        _ => format!("{component}Module"),
    }
}
