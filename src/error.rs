use crate::graph::BindingSite;
use crate::model::TypeKey;
use serde::Serialize;
use strum_macros::{Display, EnumIter, IntoStaticStr};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CompileError>;

/// Stable classification of every diagnostic the compiler or a generated unit can raise.
///
/// The kebab-case string form (`duplicate-binding`, ...) is part of the public contract:
/// reporting layers match on it.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, IntoStaticStr, EnumIter, Serialize,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    DuplicateBinding,
    UnsatisfiedDependency,
    CyclicDependency,
    MissingRequiredInput,
    MalformedQualifier,
    InvalidProvision,
    InvalidEntryPoint,
    UnknownModule,
    UnknownComponent,
    MissingProvider,
    UnknownMember,
    DowncastFailed,
    Internal,
}

/// A declaration-level defect found while compiling one component.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    #[error("Duplicate binding for {key}: declared by {first} and {second}")]
    DuplicateBinding {
        key: TypeKey,
        first: BindingSite,
        second: BindingSite,
    },

    #[error("Unsatisfied dependency {key}: no binding found (requested via {})", format_path(.chain))]
    UnsatisfiedDependency { key: TypeKey, chain: Vec<TypeKey> },

    #[error("Cyclic dependency: {}", format_path(.cycle))]
    CyclicDependency { cycle: Vec<TypeKey> },

    #[error("Malformed qualifier on {key} ({site}): {reason}")]
    MalformedQualifier {
        key: TypeKey,
        site: BindingSite,
        reason: String,
    },

    #[error("Invalid provision {site} for {key}: {reason}")]
    InvalidProvision {
        key: TypeKey,
        site: BindingSite,
        reason: String,
    },

    #[error("Entry point {name} of {component} {reason}")]
    InvalidEntryPoint {
        component: String,
        name: String,
        reason: String,
    },

    #[error("Component {component} references unknown module {module}")]
    UnknownModule { component: String, module: String },

    #[error("Unknown component: {component}")]
    UnknownComponent { component: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CompileError {
    pub fn duplicate(key: TypeKey, first: BindingSite, second: BindingSite) -> Self {
        Self::DuplicateBinding { key, first, second }
    }

    /// `chain` runs from the entry point to the missing key, inclusive.
    pub fn unsatisfied(chain: Vec<TypeKey>) -> Self {
        let key = chain.last().cloned().unwrap_or_else(|| TypeKey::new("<unknown>"));
        Self::UnsatisfiedDependency { key, chain }
    }

    pub fn cycle(cycle: Vec<TypeKey>) -> Self {
        Self::CyclicDependency { cycle }
    }

    pub fn malformed_qualifier(key: TypeKey, site: BindingSite, reason: impl Into<String>) -> Self {
        Self::MalformedQualifier {
            key,
            site,
            reason: reason.into(),
        }
    }

    pub fn invalid_provision(key: TypeKey, site: BindingSite, reason: impl Into<String>) -> Self {
        Self::InvalidProvision {
            key,
            site,
            reason: reason.into(),
        }
    }

    pub fn invalid_entry_point(
        component: impl Into<String>,
        name: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidEntryPoint {
            component: component.into(),
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::DuplicateBinding { .. } => ErrorKind::DuplicateBinding,
            Self::UnsatisfiedDependency { .. } => ErrorKind::UnsatisfiedDependency,
            Self::CyclicDependency { .. } => ErrorKind::CyclicDependency,
            Self::MalformedQualifier { .. } => ErrorKind::MalformedQualifier,
            Self::InvalidProvision { .. } => ErrorKind::InvalidProvision,
            Self::InvalidEntryPoint { .. } => ErrorKind::InvalidEntryPoint,
            Self::UnknownModule { .. } => ErrorKind::UnknownModule,
            Self::UnknownComponent { .. } => ErrorKind::UnknownComponent,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// The type keys this error is about, in report order.
    pub fn keys(&self) -> Vec<&TypeKey> {
        match self {
            Self::DuplicateBinding { key, .. }
            | Self::MalformedQualifier { key, .. }
            | Self::InvalidProvision { key, .. } => vec![key],
            Self::UnsatisfiedDependency { chain, .. } => chain.iter().collect(),
            Self::CyclicDependency { cycle } => cycle.iter().collect(),
            Self::InvalidEntryPoint { .. }
            | Self::UnknownModule { .. }
            | Self::UnknownComponent { .. }
            | Self::Internal(_) => Vec::new(),
        }
    }
}

fn format_path(keys: &[TypeKey]) -> String {
    keys.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Every defect found for a single component.
///
/// A component either compiles cleanly or fails with all of its errors; nothing is
/// partially generated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Component {component} failed to compile with {} error(s)", .errors.len())]
pub struct Diagnostics {
    pub component: String,
    pub errors: Vec<CompileError>,
}

impl Diagnostics {
    pub fn new(component: impl Into<String>, errors: Vec<CompileError>) -> Self {
        Self {
            component: component.into(),
            errors,
        }
    }

    pub fn single(component: impl Into<String>, error: CompileError) -> Self {
        Self::new(component, vec![error])
    }

    pub fn kinds(&self) -> Vec<ErrorKind> {
        self.errors.iter().map(CompileError::kind).collect()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CompileError> {
        self.errors.iter()
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a CompileError;
    type IntoIter = std::slice::Iter<'a, CompileError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.iter()
    }
}

/// Errors raised by a generated unit's builder or accessors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("{unit}: required inputs were never set: {}", .inputs.join(", "))]
    MissingRequiredInput { unit: String, inputs: Vec<String> },

    #[error("{unit}: no default value registered for optional input {input}")]
    MissingDefault { unit: String, input: String },

    #[error("{unit}: no provider registered for {target}")]
    MissingProvider { unit: String, target: String },

    #[error("{unit}: no input named {name}")]
    UnknownInput { unit: String, name: String },

    #[error("{unit}: no inputs named {}", .names.join(", "))]
    UnknownInputs { unit: String, names: Vec<String> },

    #[error("{unit}: no accessor named {name}")]
    UnknownAccessor { unit: String, name: String },

    #[error("{unit}: value of {name} is not a {expected}")]
    DowncastFailed {
        unit: String,
        name: String,
        expected: String,
    },
}

impl BuildError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingRequiredInput { .. } | Self::MissingDefault { .. } => {
                ErrorKind::MissingRequiredInput
            }
            Self::MissingProvider { .. } => ErrorKind::MissingProvider,
            Self::UnknownInput { .. } | Self::UnknownInputs { .. } | Self::UnknownAccessor { .. } => {
                ErrorKind::UnknownMember
            }
            Self::DowncastFailed { .. } => ErrorKind::DowncastFailed,
        }
    }
}

/// Errors raised while rendering a generated unit to Rust tokens.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EmitError {
    #[error("Type `{ty}` used by {context} is not valid Rust type syntax: {message}")]
    InvalidType {
        ty: String,
        context: String,
        message: String,
    },

    #[error("`{name}` is not a valid Rust identifier")]
    InvalidIdent { name: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_error_kind_codes_are_kebab_case() {
        assert_eq!(ErrorKind::DuplicateBinding.to_string(), "duplicate-binding");
        assert_eq!(
            <&'static str>::from(ErrorKind::MissingRequiredInput),
            "missing-required-input"
        );
        for kind in ErrorKind::iter() {
            let code = kind.to_string();
            assert!(code.chars().all(|c| c.is_ascii_lowercase() || c == '-'), "{code}");
        }
    }

    #[test]
    fn test_unsatisfied_reports_full_chain() {
        let err = CompileError::unsatisfied(vec![
            TypeKey::qualified("Loader", "remote"),
            TypeKey::qualified("Loader", "local"),
        ]);
        assert_eq!(err.kind(), ErrorKind::UnsatisfiedDependency);
        assert_eq!(err.keys().len(), 2);
        assert_eq!(
            err.to_string(),
            "Unsatisfied dependency Loader@local: no binding found \
             (requested via Loader@remote -> Loader@local)"
        );
    }

    #[test]
    fn test_cycle_message() {
        let a = TypeKey::new("A");
        let b = TypeKey::new("B");
        let err = CompileError::cycle(vec![a.clone(), b, a]);
        assert_eq!(err.to_string(), "Cyclic dependency: A -> B -> A");
    }

    #[test]
    fn test_build_error_kind() {
        let err = BuildError::MissingRequiredInput {
            unit: "WiredApp".into(),
            inputs: vec!["some_int".into(), "context".into()],
        };
        assert_eq!(err.kind(), ErrorKind::MissingRequiredInput);
        assert_eq!(
            err.to_string(),
            "WiredApp: required inputs were never set: some_int, context"
        );
    }
}
