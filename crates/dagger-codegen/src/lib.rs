//! Factory specification generation.
//!
//! Turns a validated [`BindingGraph`](dagger_graph::BindingGraph) into a
//! [`ComponentImplementation`]: an ordered list of [`FactorySpecification`]s
//! plus the component's entry points, switching providers and shards. The
//! textual emission of these specifications is left to a separate stage.

pub mod error;
pub mod generate;
pub mod naming;
pub mod order;
pub mod spec;

pub use error::{CodegenError, Result};
pub use generate::{CodegenOptions, generate};
pub use order::{InitializationLevel, initialization_levels};
pub use spec::{
    ComponentImplementation, DispatchMode, EntryPointBody, EntryPointSpec, FactoryBody,
    FactorySpecification, MemoizationStrategy, ParameterSpec, Shard, SwitchingProvider,
};
