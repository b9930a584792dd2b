//! Code generation errors.
//!
//! The generator only runs on graphs the validator accepted, so every error
//! here is an internal invariant violation rather than a user mistake.

use thiserror::Error;

use dagger_model::component::ComponentPath;
use dagger_model::foundation::BindingKey;

/// Codegen result type
pub type Result<T> = std::result::Result<T, CodegenError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodegenError {
    #[error("binding graph of {component} still has unresolved key {key}")]
    UnresolvedKey {
        component: ComponentPath,
        key: BindingKey,
    },

    #[error("binding graph of {component} has an unmediated cycle through {keys:?}")]
    CycleDetected {
        component: ComponentPath,
        keys: Vec<String>,
    },

    #[error("invalid codegen options: {0}")]
    InvalidOptions(String),
}
