//! Runtime errors

use thiserror::Error;

use dagger_model::{BindingKey, ComponentPath};

/// Runtime result type
pub type Result<T> = std::result::Result<T, RuntimeError>;

/// Failures while providing instances from a component.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("scoped binding {key} was requested while it was being constructed")]
    ReentrantScopedProvision { key: BindingKey },

    #[error("no constructor registered for {factory}")]
    MissingConstructor { factory: String },

    #[error("{key} is not provided by {component}")]
    UnknownKey {
        component: ComponentPath,
        key: BindingKey,
    },

    #[error("no implementation named {0}")]
    UnknownComponent(String),

    #[error("{component} has no entry point named {name}")]
    UnknownEntryPoint {
        component: ComponentPath,
        name: String,
    },

    #[error("{key} is not a {expected}")]
    TypeMismatch {
        key: BindingKey,
        expected: &'static str,
    },

    #[error("no instance was supplied for {key}")]
    MissingInstance { key: BindingKey },

    #[error("contribution {key} has no map key")]
    MissingMapKey { key: BindingKey },

    #[error("argument {index} of {factory} is not {expected}")]
    ArgumentMismatch {
        factory: String,
        index: usize,
        expected: &'static str,
    },

    #[error("{0} has been released")]
    ComponentReleased(ComponentPath),

    #[error("{factory} failed: {message}")]
    Construction { factory: String, message: String },
}
