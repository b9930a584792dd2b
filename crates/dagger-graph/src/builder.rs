//! Binding graph construction.
//!
//! Starting from a component's entry points, the builder keeps a frontier of
//! unresolved keys. Each key is looked up in priority order:
//!
//! 1. multibinding aggregates (contributions from this component and every
//!    ancestor are collected, never treated as duplicates)
//! 2. explicit declarations across the whole lineage: two or more are a
//!    duplicate even when they sit at different levels, and an ancestor that
//!    already resolved the key shares its node
//! 3. implicit bindings: component self-bindings, subcomponent creators,
//!    members injectors and `@Inject` constructors
//!
//! A found binding's dependencies are pushed onto the frontier. Keys are
//! deduplicated through a visited set, so cycles terminate exploration and
//! are left as edges for the validator. Missing and duplicate keys are
//! recorded and building continues, so one pass surfaces every problem.

use std::collections::VecDeque;
use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use tracing::{debug, instrument, trace};

use dagger_model::binding::{Binding, BindingDeclaration, BindingKind, DeclarationKind};
use dagger_model::component::{ComponentPath, ComponentSpec, SubcomponentSource};
use dagger_model::declaration::{DeclarationIndex, Lookup, MapKey};
use dagger_model::error::{Diagnostic, ErrorKind};
use dagger_model::foundation::{
    BindingKey, DeclarationId, DependencyRequest, RequestKind,
};
use dagger_model::parse::{DeclarationError, Deferred, injection_binding, members_injector_binding};

use crate::graph::{
    BindingGraph, DependencyEdge, EdgeSource, InjectionConflict, MapKeyConflict, Resolution,
};

/// Builds the binding graph of `component`.
///
/// `parent` is the already-built graph of the enclosing component for
/// subcomponents. Returns [`Deferred`] when a required type is declared but
/// not yet resolved; every other problem is recorded in the graph.
#[instrument(skip_all, fields(component = %path))]
pub fn build_graph(
    component: Arc<ComponentSpec>,
    path: ComponentPath,
    parent: Option<Arc<BindingGraph>>,
    index: &DeclarationIndex<'_>,
) -> Result<BindingGraph, Deferred> {
    GraphBuilder {
        component,
        path,
        parent,
        index,
    }
    .build()
}

/// One component in the lookup chain (self first, then ancestors).
struct Level<'g> {
    path: &'g ComponentPath,
    spec: &'g ComponentSpec,
    /// Already-built graph; `None` for the component being built.
    graph: Option<&'g BindingGraph>,
}

/// Outcome of looking up one key.
enum Candidate {
    /// Resolved by an ancestor graph.
    Shared(Arc<Binding>, ComponentPath),
    /// New binding owned by the given component.
    Fresh(Binding, ComponentPath),
    Aggregate {
        binding: Binding,
        declarations: Vec<DeclarationId>,
        conflicts: Vec<MapKeyConflict>,
    },
    Duplicate(Vec<Binding>),
    KindConflict {
        unique: Vec<Binding>,
        contributions: Vec<Binding>,
    },
    Malformed(Vec<Diagnostic>),
    Deferred(Deferred),
    Missing,
}

impl Candidate {
    fn is_satisfied(&self) -> bool {
        matches!(
            self,
            Candidate::Shared(..) | Candidate::Fresh(..) | Candidate::Aggregate { .. }
        )
    }
}

#[derive(Default)]
struct BuildState {
    queue: VecDeque<BindingKey>,
    visited: IndexSet<BindingKey>,
    resolutions: IndexMap<BindingKey, Resolution>,
    edges: Vec<DependencyEdge>,
    map_key_conflicts: Vec<MapKeyConflict>,
    injection_conflicts: Vec<InjectionConflict>,
    diagnostics: Vec<Diagnostic>,
    used_declarations: IndexSet<DeclarationId>,
}

impl BuildState {
    fn push_edge(&mut self, source: EdgeSource, request: DependencyRequest) {
        if self.visited.insert(request.key.clone()) {
            self.queue.push_back(request.key.clone());
        }
        self.edges.push(DependencyEdge { source, request });
    }

    fn expand(&mut self, binding: &Binding) {
        self.used_declarations.insert(binding.origin.clone());
        for dependency in &binding.dependencies {
            self.push_edge(EdgeSource::Binding(binding.key.clone()), dependency.clone());
        }
    }
}

struct GraphBuilder<'i, 'a> {
    component: Arc<ComponentSpec>,
    path: ComponentPath,
    parent: Option<Arc<BindingGraph>>,
    index: &'i DeclarationIndex<'a>,
}

impl<'i, 'a> GraphBuilder<'i, 'a> {
    fn build(self) -> Result<BindingGraph, Deferred> {
        let mut state = BuildState::default();

        for (i, entry) in self.component.entry_points.iter().enumerate() {
            if let Some(request) = entry.request() {
                state.push_edge(EdgeSource::EntryPoint(i), request);
            }
        }

        while let Some(key) = state.queue.pop_front() {
            let resolution = match self.lookup(&key) {
                Candidate::Shared(binding, owner) => Resolution::Bound {
                    binding,
                    owner,
                    inherited: true,
                },
                Candidate::Fresh(binding, owner) => {
                    self.record_injection_conflict(&binding, &mut state);
                    state.expand(&binding);
                    Resolution::Bound {
                        binding: Arc::new(binding),
                        owner,
                        inherited: false,
                    }
                }
                Candidate::Aggregate {
                    binding,
                    declarations,
                    conflicts,
                } => {
                    state.used_declarations.extend(declarations);
                    for conflict in conflicts {
                        if !state.map_key_conflicts.contains(&conflict) {
                            state.map_key_conflicts.push(conflict);
                        }
                    }
                    state.expand(&binding);
                    Resolution::Bound {
                        binding: Arc::new(binding),
                        owner: self.path.clone(),
                        inherited: false,
                    }
                }
                Candidate::Duplicate(candidates) => Resolution::Duplicate {
                    candidates: candidates.into_iter().map(Arc::new).collect(),
                },
                Candidate::KindConflict {
                    unique,
                    contributions,
                } => Resolution::KindConflict {
                    unique: unique.into_iter().map(Arc::new).collect(),
                    contributions: contributions.into_iter().map(Arc::new).collect(),
                },
                Candidate::Malformed(diagnostics) => {
                    state.diagnostics.extend(diagnostics);
                    Resolution::Invalid
                }
                Candidate::Deferred(deferred) => {
                    debug!(key = %key, awaiting = %deferred.awaiting, "deferring component");
                    return Err(deferred);
                }
                Candidate::Missing => Resolution::Missing,
            };
            trace!(key = %key, "resolved");
            state.resolutions.insert(key, resolution);
        }

        let graph = BindingGraph {
            component: self.component,
            path: self.path,
            parent: self.parent,
            resolutions: state.resolutions,
            edges: state.edges,
            map_key_conflicts: state.map_key_conflicts,
            injection_conflicts: state.injection_conflicts,
            diagnostics: state.diagnostics,
            used_declarations: state.used_declarations,
        };
        debug!(
            keys = graph.resolutions.len(),
            bindings = graph.binding_count(),
            edges = graph.edges.len(),
            "built binding graph"
        );
        Ok(graph)
    }

    fn levels(&self) -> Vec<Level<'_>> {
        let mut levels = vec![Level {
            path: &self.path,
            spec: &self.component,
            graph: None,
        }];
        if let Some(parent) = &self.parent {
            for graph in std::iter::once(parent.as_ref()).chain(parent.ancestors()) {
                levels.push(Level {
                    path: &graph.path,
                    spec: &graph.component,
                    graph: Some(graph),
                });
            }
        }
        levels
    }

    fn lookup(&self, key: &BindingKey) -> Candidate {
        if key.is_contribution() {
            return self.lookup_contribution(key);
        }
        if let Some(candidate) = self.lookup_multibinding(key) {
            return candidate;
        }
        let levels = self.levels();
        let mut explicit: Vec<(usize, Binding)> = Vec::new();
        for (depth, level) in levels.iter().enumerate() {
            for binding in self.explicit_at(level, key) {
                // The nearest optional declaration stands for every level.
                let repeated = explicit.iter().any(|(_, b)| {
                    b.origin == binding.origin
                        || (b.kind == BindingKind::Optional && binding.kind == BindingKind::Optional)
                });
                if !repeated {
                    explicit.push((depth, binding));
                }
            }
        }
        if explicit.len() > 1 {
            return Candidate::Duplicate(explicit.into_iter().map(|(_, b)| b).collect());
        }
        let mut explicit = explicit.pop();
        for (depth, level) in levels.iter().enumerate() {
            if let Some(graph) = level.graph
                && let Some(Resolution::Bound { binding, owner, .. }) = graph.resolutions.get(key)
            {
                return Candidate::Shared(Arc::clone(binding), owner.clone());
            }
            if let Some((_, binding)) = explicit.take_if(|(at, _)| *at == depth) {
                return Candidate::Fresh(binding, level.path.clone());
            }
        }
        self.lookup_implicit(key)
    }

    /// Unique explicit bindings for `key` declared at one level.
    fn explicit_at(&self, level: &Level<'_>, key: &BindingKey) -> Vec<Binding> {
        let spec = level.spec;
        let mut found: Vec<Binding> = spec
            .declarations()
            .filter(|d| d.is_unique_binding() && d.key == *key)
            .map(Binding::from_declaration)
            .collect();

        if let Some(optional) = spec
            .declarations()
            .find(|d| d.kind == DeclarationKind::OptionalDeclaration && d.key == *key)
        {
            found.push(self.optional_binding(optional));
        }

        for instance in &spec.bound_instances {
            if instance.key == *key {
                found.push(
                    Binding::new(key.clone(), BindingKind::BoundInstance, instance.id.clone())
                        .with_nullable(instance.nullable),
                );
            }
        }

        for dependency in &spec.dependencies {
            if key.qualifier.is_none() && key.ty == dependency.ty {
                found.push(Binding::new(
                    key.clone(),
                    BindingKind::ComponentDependency,
                    DeclarationId::of_type(dependency.ty.name()),
                ));
            }
            for provision in &dependency.provisions {
                if provision.key == *key {
                    found.push(
                        Binding::new(
                            key.clone(),
                            BindingKind::ComponentProvision,
                            provision.id.clone(),
                        )
                        .with_dependencies(vec![DependencyRequest::instance(BindingKey::of(
                            dependency.ty.clone(),
                        ))])
                        .with_nullable(provision.nullable),
                    );
                }
            }
        }
        found
    }

    /// `Optional<T>` depends on `T` only when `T` is bound.
    fn optional_binding(&self, declaration: &BindingDeclaration) -> Binding {
        let binding = Binding::from_declaration(declaration);
        let Some(inner) = declaration.key.ty.single_arg() else {
            return binding;
        };
        let inner = declaration.key.with_type(inner.clone());
        if self.lookup(&inner).is_satisfied() {
            binding.with_dependencies(vec![DependencyRequest::instance(inner)])
        } else {
            binding
        }
    }

    fn lookup_contribution(&self, key: &BindingKey) -> Candidate {
        let Some(id) = &key.contribution else {
            return Candidate::Missing;
        };
        for level in self.levels() {
            if let Some(graph) = level.graph
                && let Some(Resolution::Bound { binding, owner, .. }) = graph.resolutions.get(key)
            {
                return Candidate::Shared(Arc::clone(binding), owner.clone());
            }
            if let Some(declaration) = level
                .spec
                .declarations()
                .find(|d| d.id == *id && d.node_key() == *key)
            {
                return Candidate::Fresh(Binding::from_declaration(declaration), level.path.clone());
            }
        }
        Candidate::Missing
    }

    /// Aggregates set and map contributions for `key`, including
    /// `Map<K, Provider<V>>` views of `Map<K, V>` contributions.
    fn lookup_multibinding(&self, key: &BindingKey) -> Option<Candidate> {
        let (aggregate_key, provider_values) = match key.unwrap_provider_map() {
            Some(inner) => (inner, true),
            None => (key.clone(), false),
        };
        if !aggregate_key.ty.is_set() && !aggregate_key.ty.is_map() {
            return None;
        }

        let levels = self.levels();
        let mut seen = IndexSet::new();
        let mut contributions: Vec<&BindingDeclaration> = Vec::new();
        let mut declarations: Vec<&BindingDeclaration> = Vec::new();
        let mut local = false;
        for (depth, level) in levels.iter().enumerate() {
            for declaration in level.spec.declarations() {
                if declaration.key != aggregate_key || !seen.insert(&declaration.id) {
                    continue;
                }
                if declaration.contribution.is_multibinding() {
                    contributions.push(declaration);
                } else if declaration.kind == DeclarationKind::Multibinds {
                    declarations.push(declaration);
                } else {
                    continue;
                }
                local |= depth == 0;
            }
        }
        let first = contributions.first().or(declarations.first())?;
        let origin = first.id.clone();

        let unique: Vec<Binding> = levels
            .iter()
            .flat_map(|level| self.explicit_at(level, key))
            .collect();
        if !unique.is_empty() {
            return Some(Candidate::KindConflict {
                unique,
                contributions: contributions
                    .iter()
                    .map(|d| Binding::from_declaration(d))
                    .collect(),
            });
        }

        if !local {
            for level in &levels[1..] {
                if let Some(graph) = level.graph
                    && let Some(Resolution::Bound { binding, owner, .. }) =
                        graph.resolutions.get(key)
                {
                    return Some(Candidate::Shared(Arc::clone(binding), owner.clone()));
                }
            }
        }

        let request_kind = if provider_values {
            RequestKind::Provider
        } else {
            RequestKind::Instance
        };
        let dependencies = contributions
            .iter()
            .map(|d| DependencyRequest {
                key: d.node_key(),
                kind: request_kind,
                nullable: false,
                element: None,
            })
            .collect();

        let mut conflicts = Vec::new();
        let kind = if aggregate_key.ty.is_set() {
            BindingKind::MultiboundSet
        } else {
            let mut by_map_key: IndexMap<MapKey, (&MapKey, Vec<DeclarationId>)> = IndexMap::new();
            for contribution in &contributions {
                if let Some(map_key) = &contribution.map_key {
                    by_map_key
                        .entry(map_key.canonical())
                        .or_insert_with(|| (map_key, Vec::new()))
                        .1
                        .push(contribution.id.clone());
                }
            }
            for (_, (map_key, origins)) in by_map_key {
                if origins.len() > 1 {
                    conflicts.push(MapKeyConflict {
                        key: aggregate_key.clone(),
                        map_key: map_key.clone(),
                        origins,
                    });
                }
            }
            BindingKind::MultiboundMap
        };

        Some(Candidate::Aggregate {
            binding: Binding::new(key.clone(), kind, origin).with_dependencies(dependencies),
            declarations: declarations.iter().map(|d| d.id.clone()).collect(),
            conflicts,
        })
    }

    fn lookup_implicit(&self, key: &BindingKey) -> Candidate {
        if key.qualifier.is_none() {
            let levels = self.levels();
            for level in &levels {
                if key.ty == level.spec.ty {
                    return Candidate::Fresh(
                        Binding::new(key.clone(), BindingKind::Component, level.spec.id.clone()),
                        level.path.clone(),
                    );
                }
            }
            if let Some(binding) = self.factory_method_creator(key) {
                return Candidate::Fresh(binding, self.path.clone());
            }
            if key.ty.is_members_injector() {
                return self.members_injector(key);
            }
            if let Some(candidate) = self.injection(key, &levels) {
                return candidate;
            }
        }
        if self.index.is_unresolved(&key.ty) {
            return Candidate::Deferred(Deferred::new(
                self.component.id.clone(),
                key.ty.to_string(),
            ));
        }
        Candidate::Missing
    }

    /// Creator of a subcomponent reached through a parent factory method.
    fn factory_method_creator(&self, key: &BindingKey) -> Option<Binding> {
        self.component
            .subcomponents
            .iter()
            .filter(|s| matches!(s.source, SubcomponentSource::FactoryMethod(_)))
            .find_map(|s| match self.index.component(&s.name) {
                Lookup::Found(decl) => decl
                    .creator
                    .as_ref()
                    .filter(|c| c.name == key.ty.name())
                    .map(|c| {
                        Binding::new(
                            key.clone(),
                            BindingKind::SubcomponentCreator,
                            DeclarationId::of_type(&c.name),
                        )
                    }),
                _ => None,
            })
    }

    fn members_injector(&self, key: &BindingKey) -> Candidate {
        let Some(target) = key.ty.single_arg() else {
            return Candidate::Missing;
        };
        match self.index.ty(target.name()) {
            Lookup::Found(decl) => match members_injector_binding(decl, self.index) {
                Ok(binding) => Candidate::Fresh(binding, self.path.clone()),
                Err(DeclarationError::Malformed(diagnostics)) => Candidate::Malformed(diagnostics),
                Err(DeclarationError::Deferred(deferred)) => Candidate::Deferred(deferred),
            },
            Lookup::Unresolved => Candidate::Deferred(Deferred::new(
                self.component.id.clone(),
                target.to_string(),
            )),
            Lookup::Absent => Candidate::Missing,
        }
    }

    /// `@Inject` constructor binding. Scoped types are owned by the nearest
    /// component carrying the same scope.
    fn injection(&self, key: &BindingKey, levels: &[Level<'_>]) -> Option<Candidate> {
        let Lookup::Found(decl) = self.index.ty(key.ty.name()) else {
            return None;
        };
        if decl.inject.is_none() || !key.ty.args().is_empty() {
            return None;
        }
        match injection_binding(decl, self.index) {
            Ok(Some(binding)) => {
                let owning = binding
                    .scope
                    .as_ref()
                    .filter(|scope| !scope.is_reusable())
                    .and_then(|scope| levels.iter().find(|l| l.spec.has_scope(scope)));
                let Some(level) = owning else {
                    return Some(Candidate::Fresh(binding, self.path.clone()));
                };
                if let Some(graph) = level.graph {
                    let owner = self.at_ancestor(graph);
                    match owner.unsatisfied(&binding) {
                        Ok(diagnostics) if !diagnostics.is_empty() => {
                            return Some(Candidate::Malformed(diagnostics));
                        }
                        Ok(_) => {}
                        Err(deferred) => return Some(Candidate::Deferred(deferred)),
                    }
                }
                Some(Candidate::Fresh(binding, level.path.clone()))
            }
            Ok(None) => None,
            Err(DeclarationError::Malformed(diagnostics)) => Some(Candidate::Malformed(diagnostics)),
            Err(DeclarationError::Deferred(deferred)) => Some(Candidate::Deferred(deferred)),
        }
    }

    /// Lookup view of an already-built ancestor, excluding every component
    /// below it.
    fn at_ancestor<'s>(&'s self, graph: &BindingGraph) -> GraphBuilder<'s, 'a> {
        GraphBuilder {
            component: Arc::clone(&graph.component),
            path: graph.path.clone(),
            parent: graph.parent.clone(),
            index: self.index,
        }
    }

    /// Missing-binding diagnostics for the transitive dependencies of
    /// `binding` that this component cannot satisfy.
    fn unsatisfied(&self, binding: &Binding) -> Result<Vec<Diagnostic>, Deferred> {
        let mut diagnostics = Vec::new();
        let mut visited: IndexSet<BindingKey> = IndexSet::new();
        let mut queue: VecDeque<(BindingKey, BindingKey)> = binding
            .dependencies
            .iter()
            .map(|d| (binding.key.clone(), d.key.clone()))
            .collect();

        while let Some((requester, key)) = queue.pop_front() {
            if !visited.insert(key.clone()) {
                continue;
            }
            let dependencies = match self.lookup(&key) {
                Candidate::Shared(..) => continue,
                Candidate::Fresh(found, _) => found.dependencies,
                Candidate::Aggregate { binding: found, .. } => found.dependencies,
                Candidate::Malformed(found) => {
                    diagnostics.extend(found);
                    continue;
                }
                Candidate::Deferred(deferred) => return Err(deferred),
                Candidate::Duplicate(_) | Candidate::KindConflict { .. } => continue,
                Candidate::Missing => {
                    diagnostics.push(
                        Diagnostic::new(
                            ErrorKind::MissingBinding,
                            binding.origin.clone(),
                            format!(
                                "missing binding for {}: {} is owned by {}, where {} is not bound (unsatisfied)",
                                key, binding.key, self.path, key
                            ),
                        )
                        .with_note(format!(
                            "{} is requested by {}; bind it in {} or one of its ancestors",
                            key, requester, self.path
                        )),
                    );
                    continue;
                }
            };
            queue.extend(dependencies.into_iter().map(|d| (key.clone(), d.key)));
        }
        Ok(diagnostics)
    }

    fn record_injection_conflict(&self, binding: &Binding, state: &mut BuildState) {
        if !matches!(binding.kind, BindingKind::Provision | BindingKind::Delegate)
            || binding.key.qualifier.is_some()
            || binding.key.is_contribution()
        {
            return;
        }
        if let Lookup::Found(decl) = self.index.ty(binding.key.ty.name())
            && decl.inject.is_some()
        {
            state.injection_conflicts.push(InjectionConflict {
                key: binding.key.clone(),
                explicit: binding.origin.clone(),
                constructor: decl.constructor_id(),
            });
        }
    }
}
