//! Foundation types shared by every compiler phase.

pub mod identity;
pub mod key;
pub mod request;
pub mod scope;
pub mod types;

pub use identity::DeclarationId;
pub use key::{BindingKey, Qualifier};
pub use request::{DependencyRequest, RequestKind};
pub use scope::Scope;
pub use types::{TypeParseError, TypeRef, names};
