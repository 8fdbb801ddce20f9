//! Generated units: their shape, how it is derived from a scheduled graph, and how it
//! is rendered as Rust source.

pub mod emit;
pub mod generator;
pub mod unit;

pub use emit::emit_rust;
pub use generator::generate;
pub use unit::{
    Access, Accessor, BuilderShape, CachedField, Factory, FreshProvider, GeneratedUnit,
    InputSource, Setter, UnitInput,
};
