use crate::model::{ComponentDecl, DeclarationModel, InjectableDecl, ModuleDecl};

/// Builder for assembling a declaration model in code
///
/// Front-ends that do not go through JSON use this to register modules, components
/// and injectable types before handing the finished model to the compiler.
///
/// # Example
/// ```
/// use meshestra_compiler::model::{ComponentDecl, FactoryDecl, ModelBuilder, ModuleDecl};
///
/// let model = ModelBuilder::new()
///     .module(
///         "GreetingModule",
///         ModuleDecl::new()
///             .default_constructible()
///             .factory(FactoryDecl::factory("provide_greeting", "Greeting", Vec::<&str>::new())),
///     )
///     .component(
///         "GreetingComponent",
///         ComponentDecl::new().module("GreetingModule").entry("greeting", "Greeting"),
///     )
///     .build();
/// assert!(model.component("GreetingComponent").is_some());
/// ```
pub struct ModelBuilder {
    model: DeclarationModel,
}

impl ModelBuilder {
    /// Create a new, empty model builder
    pub fn new() -> Self {
        Self {
            model: DeclarationModel::default(),
        }
    }

    /// Register a module under `name`
    pub fn module(mut self, name: impl Into<String>, module: ModuleDecl) -> Self {
        let name = name.into();
        if self.model.modules.insert(name.clone(), module).is_some() {
            tracing::warn!("Module {} declared twice, keeping the last declaration", name);
        }
        self
    }

    /// Register a component under `name`
    pub fn component(mut self, name: impl Into<String>, component: ComponentDecl) -> Self {
        let name = name.into();
        if self.model.components.insert(name.clone(), component).is_some() {
            tracing::warn!("Component {} declared twice, keeping the last declaration", name);
        }
        self
    }

    /// Register the constructors of type `ty`
    pub fn injectable(mut self, ty: impl Into<String>, decl: InjectableDecl) -> Self {
        self.model.injectables.insert(ty.into(), decl);
        self
    }

    /// Build the model
    pub fn build(self) -> DeclarationModel {
        self.model
    }
}

impl Default for ModelBuilder {
    fn default() -> Self {
        Self::new()
    }
}
