//! Binding resolution
//!
//! ```text
//! DeclarationModel ─▶ BindingTable ─▶ resolve ─▶ check_cycles ─▶ schedule
//!                     (table.rs)      (resolver.rs) (cycle.rs)    (schedule.rs)
//! ```
//!
//! Each stage works on one component at a time and shares no mutable state with any
//! other component's compilation.

pub mod cycle;
pub mod resolver;
pub mod schedule;
pub mod table;

pub use cycle::check_cycles;
pub use resolver::resolve;
pub use schedule::{Schedule, schedule};
pub use table::BindingTable;

use crate::model::{EntryPoint, Lifetime, TypeKey};
use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;

/// Where a binding was declared, for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum BindingSite {
    /// `module::declaration`
    Declared { module: String, name: String },
    /// Derived from the injectable constructor of `ty`.
    Implicit { ty: String },
}

impl BindingSite {
    pub fn declared(module: impl Into<String>, name: impl Into<String>) -> Self {
        Self::Declared {
            module: module.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for BindingSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Declared { module, name } => write!(f, "{module}::{name}"),
            Self::Implicit { ty } => write!(f, "injectable constructor of {ty}"),
        }
    }
}

/// The closed set of ways a binding produces its value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum BindingKind {
    /// Supplied by the caller of the generated builder.
    Runtime { optional: bool },
    /// `target::constructor(deps..)`
    Constructor { target: String, constructor: String },
    /// `module.method(deps..)` on the module instance.
    ModuleFactory { module: String, method: String },
    /// Like `Constructor`, but never cached.
    Wrapping { target: String, constructor: String },
    /// Whatever satisfies the single dependency.
    Delegate,
}

/// A provider for exactly one type key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Binding {
    pub key: TypeKey,
    pub kind: BindingKind,
    pub lifetime: Lifetime,
    pub dependencies: Vec<TypeKey>,
    pub site: BindingSite,
}

impl Binding {
    pub fn is_cached(&self) -> bool {
        self.lifetime == Lifetime::Cached && !self.is_runtime()
    }

    pub fn is_runtime(&self) -> bool {
        matches!(self.kind, BindingKind::Runtime { .. })
    }

    /// Name of the declaration this binding came from, if it was declared explicitly.
    pub fn declared_name(&self) -> Option<&str> {
        match &self.site {
            BindingSite::Declared { name, .. } => Some(name),
            BindingSite::Implicit { .. } => None,
        }
    }
}

/// Bindings reachable from a component's entry points.
///
/// Nodes are kept in first-discovery order; edges are each node's dependency keys.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    pub entry_points: Vec<EntryPoint>,
    pub nodes: IndexMap<TypeKey, Binding>,
}

impl DependencyGraph {
    pub fn new(entry_points: Vec<EntryPoint>) -> Self {
        Self {
            entry_points,
            nodes: IndexMap::new(),
        }
    }

    pub fn get(&self, key: &TypeKey) -> Option<&Binding> {
        self.nodes.get(key)
    }

    pub fn contains(&self, key: &TypeKey) -> bool {
        self.nodes.contains_key(key)
    }

    /// Dependencies of `key` that resolved to a node in this graph.
    pub fn edges(&self, key: &TypeKey) -> Vec<&TypeKey> {
        match self.nodes.get(key) {
            Some(binding) => binding
                .dependencies
                .iter()
                .filter(|dep| self.nodes.contains_key(*dep))
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
