//! Runtime contract of generated components.
//!
//! The code generator describes each component as a
//! [`ComponentImplementation`](dagger_codegen::ComponentImplementation).
//! This crate executes those descriptions against user code registered in a
//! [`ConstructorRegistry`], and is the reference for what emitted component
//! classes must do:
//!
//! - scoped bindings retain one instance per owning component
//!   ([`DoubleCheck`], [`SingleCheck`] for `@Reusable`)
//! - deferred requests receive [`Provider`] and [`Lazy`] handles
//! - direct and switching dispatch behave identically

pub mod component;
pub mod error;
pub mod handle;
pub mod memo;
pub mod registry;

pub use component::{
    BoundInstances, ComponentInstance, MapValues, OptionalValue, Runtime, SetValues,
    SubcomponentCreator,
};
pub use error::{Result, RuntimeError};
pub use handle::{Argument, Arguments, Lazy, Provider};
pub use memo::{DoubleCheck, Instance, Memo, SingleCheck};
pub use registry::{Constructor, ConstructorRegistry};
