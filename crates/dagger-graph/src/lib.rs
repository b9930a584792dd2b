//! Binding graphs of the Dagger compiler.
//!
//! Each component gets a [`BindingGraph`] built from its entry points
//! ([`build_graph`]); subcomponents are built below their parent in a
//! [`ComponentTree`] ([`build_tree`]). Built graphs are then checked by a
//! [`Validator`], which reports every problem it finds in a stable order.

pub mod builder;
pub mod graph;
pub mod tree;
pub mod validate;

pub use builder::build_graph;
pub use graph::{
    BindingGraph, DependencyEdge, EdgeSource, InjectionConflict, MapKeyConflict, Resolution,
};
pub use tree::{ComponentTree, TreeNode, build_tree};
pub use validate::{
    CheckContext, Finding, GraphCheck, ValidationOptions, Validator, validate,
    validate_orphaned_modules,
};
