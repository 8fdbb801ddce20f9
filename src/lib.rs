//! # Meshestra Compiler
//!
//! A compile-time dependency injection graph compiler for Rust.
//!
//! Components list the types they hand out; modules declare how to make them. The
//! compiler resolves every requested type key to exactly one binding, rejects
//! missing, duplicate and cyclic wiring with full diagnostics, orders the bindings
//! and produces a [`GeneratedUnit`]: the shape of a wired container type with a
//! validating builder.
//!
//! ## Features
//!
//! - **Qualified keys**: `Loader@local` and `Loader@remote` are resolved independently
//! - **Lifetimes**: cached bindings are built once per unit instance, fresh ones per access
//! - **Batch diagnostics**: every defect in a component is reported, not just the first
//! - **Deterministic output**: unchanged declarations give identical units
//! - **Two back-ends**: [`codegen::emit_rust`] renders source, [`runtime`] runs a unit directly
//!
//! ## Quick Start
//!
//! ```rust
//! use meshestra_compiler::prelude::*;
//!
//! let model = ModelBuilder::new()
//!     .module(
//!         "LoaderModule",
//!         ModuleDecl::new()
//!             .default_constructible()
//!             .factory(FactoryDecl::factory("remote", "Loader@remote", ["Loader@local"]))
//!             .factory(FactoryDecl::factory("local", "Loader@local", Vec::<&str>::new())),
//!     )
//!     .component(
//!         "LoaderComponent",
//!         ComponentDecl::new()
//!             .module("LoaderModule")
//!             .entry("loader", "Loader@remote"),
//!     )
//!     .build();
//!
//! let unit = Compiler::new(&model).compile("LoaderComponent").unwrap();
//! assert_eq!(unit.name, "WiredLoaderComponent");
//! let fields: Vec<_> = unit.fields.iter().map(|f| f.name.as_str()).collect();
//! assert_eq!(fields, ["local", "remote"]);
//! ```

pub mod codegen;
pub mod compiler;
pub mod config;
pub mod error;
pub mod graph;
pub mod model;
pub mod runtime;
pub mod worker;

// Re-export core types
pub use codegen::GeneratedUnit;
pub use compiler::{Compiler, UnitResult, compile};
pub use config::{CompilerOptions, ConfigService};
pub use error::{BuildError, CompileError, Diagnostics, EmitError, ErrorKind, Result};
pub use model::{DeclarationModel, KeyParseError, ModelBuilder, TypeKey};

/// Prelude module for convenient imports
///
/// ```
/// use meshestra_compiler::prelude::*;
/// ```
pub mod prelude {
    pub use crate::codegen::{Access, Factory, GeneratedUnit, emit_rust};
    pub use crate::compiler::{Compiler, compile};
    pub use crate::config::CompilerOptions;
    pub use crate::error::{BuildError, CompileError, Diagnostics, ErrorKind};
    pub use crate::model::{
        ComponentDecl, ConstructorDecl, DeclarationModel, FactoryDecl, InjectableDecl, Lifetime,
        ModelBuilder, ModuleDecl, TypeKey,
    };
    pub use crate::runtime::{ProviderRegistry, UnitBuilder, WiredInstance};
    pub use std::sync::Arc;
}
