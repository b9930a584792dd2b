//! Declaration model of the Dagger binding graph compiler.
//!
//! This crate turns annotated declarations supplied by the host compiler
//! into the typed entities every later phase works with:
//!
//! - [`foundation`] - keys, types, scopes, qualifiers, requests and
//!   declaration identities
//! - [`declaration`] - raw declaration records and the symbol index
//! - [`binding`] - binding declarations and resolved bindings
//! - [`component`] - parsed component and module specifications
//! - [`parse`] - `parse_module` / `parse_component` with deferral
//! - [`error`] - diagnostics shared by all phases

pub mod binding;
pub mod component;
pub mod declaration;
pub mod error;
pub mod foundation;
pub mod parse;

pub use binding::{Binding, BindingDeclaration, BindingKind, ContributionType, DeclarationKind};
pub use component::{
    ComponentLevel, ComponentPath, ComponentSpec, EntryPoint, EntryPointKind, ModuleSpec,
};
pub use declaration::{DeclarationIndex, DeclarationSet};
pub use error::{Diagnostic, DiagnosticFormatter, ErrorKind, Severity};
pub use foundation::{
    BindingKey, DeclarationId, DependencyRequest, Qualifier, RequestKind, Scope, TypeRef,
};
pub use parse::{DeclarationError, Deferred, ParseOptions};
