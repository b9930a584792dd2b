//! Binding graph of one component.
//!
//! A [`BindingGraph`] owns the resolution of every key reached from the
//! component's entry points, the directed dependency edges between them,
//! and the problems recorded while building. Graphs are immutable once
//! built; descendants hold their ancestors through `Arc` and share the
//! ancestors' `Arc<Binding>` nodes instead of copying them.

use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use serde::Serialize;

use dagger_model::binding::Binding;
use dagger_model::component::{ComponentPath, ComponentSpec, EntryPoint};
use dagger_model::declaration::MapKey;
use dagger_model::error::Diagnostic;
use dagger_model::foundation::{BindingKey, DeclarationId, DependencyRequest};

/// How one key was resolved in a component.
#[derive(Debug, Clone)]
pub enum Resolution {
    /// Exactly one binding satisfies the key.
    Bound {
        binding: Arc<Binding>,
        /// Component that owns the binding (memoizes it when scoped).
        owner: ComponentPath,
        /// Resolved by an ancestor graph and shared, not re-expanded.
        inherited: bool,
    },
    /// No binding anywhere.
    Missing,
    /// More than one unique explicit candidate in the component lineage.
    Duplicate { candidates: Vec<Arc<Binding>> },
    /// Unique bindings and multibinding contributions share the key.
    KindConflict {
        unique: Vec<Arc<Binding>>,
        contributions: Vec<Arc<Binding>>,
    },
    /// The implicit declaration for the key is malformed (already reported).
    Invalid,
}

impl Resolution {
    pub fn binding(&self) -> Option<&Arc<Binding>> {
        match self {
            Resolution::Bound { binding, .. } => Some(binding),
            _ => None,
        }
    }

    pub fn is_inherited(&self) -> bool {
        matches!(self, Resolution::Bound { inherited: true, .. })
    }
}

/// Where a dependency edge starts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum EdgeSource {
    /// Index into the component's entry points.
    EntryPoint(usize),
    Binding(BindingKey),
}

/// A binding or entry point requesting a key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyEdge {
    pub source: EdgeSource,
    pub request: DependencyRequest,
}

impl DependencyEdge {
    pub fn target(&self) -> &BindingKey {
        &self.request.key
    }

    /// Deferred edges (`Provider`, `Lazy`) impose no construction order.
    pub fn is_deferred(&self) -> bool {
        self.request.is_deferred()
    }
}

/// Two or more `@IntoMap` contributions with the same map key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MapKeyConflict {
    /// The `Map<K, V>` key.
    pub key: BindingKey,
    pub map_key: MapKey,
    pub origins: Vec<DeclarationId>,
}

/// An explicit binding for a type that also has an `@Inject` constructor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InjectionConflict {
    pub key: BindingKey,
    pub explicit: DeclarationId,
    pub constructor: DeclarationId,
}

/// The resolved binding graph of one component.
#[derive(Debug)]
pub struct BindingGraph {
    pub(crate) component: Arc<ComponentSpec>,
    pub(crate) path: ComponentPath,
    pub(crate) parent: Option<Arc<BindingGraph>>,
    pub(crate) resolutions: IndexMap<BindingKey, Resolution>,
    pub(crate) edges: Vec<DependencyEdge>,
    pub(crate) map_key_conflicts: Vec<MapKeyConflict>,
    pub(crate) injection_conflicts: Vec<InjectionConflict>,
    pub(crate) diagnostics: Vec<Diagnostic>,
    pub(crate) used_declarations: IndexSet<DeclarationId>,
}

impl BindingGraph {
    pub fn component(&self) -> &ComponentSpec {
        &self.component
    }

    pub fn component_arc(&self) -> &Arc<ComponentSpec> {
        &self.component
    }

    pub fn path(&self) -> &ComponentPath {
        &self.path
    }

    pub fn parent(&self) -> Option<&Arc<BindingGraph>> {
        self.parent.as_ref()
    }

    /// Parent, grandparent, ... up to the root.
    pub fn ancestors(&self) -> impl Iterator<Item = &BindingGraph> {
        std::iter::successors(self.parent.as_deref(), |g| g.parent.as_deref())
    }

    pub fn entry_points(&self) -> &[EntryPoint] {
        &self.component.entry_points
    }

    /// Every key reached from the entry points, in discovery order.
    pub fn resolutions(&self) -> &IndexMap<BindingKey, Resolution> {
        &self.resolutions
    }

    pub fn resolution(&self, key: &BindingKey) -> Option<&Resolution> {
        self.resolutions.get(key)
    }

    pub fn binding(&self, key: &BindingKey) -> Option<&Arc<Binding>> {
        self.resolutions.get(key).and_then(Resolution::binding)
    }

    /// Bindings this graph resolved itself (not shared from an ancestor).
    pub fn local_bindings(&self) -> impl Iterator<Item = (&Arc<Binding>, &ComponentPath)> {
        self.resolutions.values().filter_map(|r| match r {
            Resolution::Bound {
                binding,
                owner,
                inherited: false,
            } => Some((binding, owner)),
            _ => None,
        })
    }

    pub fn edges(&self) -> &[DependencyEdge] {
        &self.edges
    }

    /// Edges leaving the binding for `key`.
    pub fn dependencies_of<'a>(
        &'a self,
        key: &'a BindingKey,
    ) -> impl Iterator<Item = &'a DependencyEdge> + 'a {
        self.edges
            .iter()
            .filter(move |e| matches!(&e.source, EdgeSource::Binding(k) if k == key))
    }

    pub fn map_key_conflicts(&self) -> &[MapKeyConflict] {
        &self.map_key_conflicts
    }

    pub fn injection_conflicts(&self) -> &[InjectionConflict] {
        &self.injection_conflicts
    }

    /// Malformed implicit declarations found while building.
    pub fn construction_diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Declarations that produced a binding in this graph.
    pub fn used_declarations(&self) -> &IndexSet<DeclarationId> {
        &self.used_declarations
    }

    /// Number of keys resolved to a binding.
    pub fn binding_count(&self) -> usize {
        self.resolutions.values().filter(|r| r.binding().is_some()).count()
    }
}
