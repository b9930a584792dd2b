//! Component implementation generation.

use indexmap::IndexSet;
use tracing::{debug, instrument};

use dagger_graph::{BindingGraph, Resolution};
use dagger_model::binding::{Binding, BindingKind, ContributionType};
use dagger_model::component::{ComponentPath, EntryPointKind};
use dagger_model::foundation::{BindingKey, TypeRef};

use crate::error::{CodegenError, Result};
use crate::naming::{NameAllocator, component_class_name, factory_name};
use crate::order::initialization_levels;
use crate::spec::{
    ComponentImplementation, DispatchMode, EntryPointBody, EntryPointSpec, FactoryBody,
    FactorySpecification, MemoizationStrategy, ParameterSpec, Shard, SwitchingProvider,
};

/// Size controls for generated components.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodegenOptions {
    /// Always use switch dispatch.
    pub fast_init: bool,
    /// Provider count above which switch dispatch is used anyway.
    pub switching_threshold: usize,
    pub cases_per_switch: usize,
    pub keys_per_component_shard: usize,
}

impl Default for CodegenOptions {
    fn default() -> Self {
        Self {
            fast_init: false,
            switching_threshold: 64,
            cases_per_switch: 100,
            keys_per_component_shard: 3500,
        }
    }
}

impl CodegenOptions {
    pub fn validate(&self) -> Result<()> {
        if self.cases_per_switch == 0 {
            return Err(CodegenError::InvalidOptions(
                "casesPerSwitch must be at least 1".to_string(),
            ));
        }
        if self.keys_per_component_shard == 0 {
            return Err(CodegenError::InvalidOptions(
                "keysPerComponentShard must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Generates the implementation of one validated component graph.
///
/// Providers are emitted for every binding the graph resolved itself, in
/// initialization order. Inherited bindings are referenced through the
/// ancestor that provides them.
#[instrument(skip_all, fields(component = %graph.path()))]
pub fn generate(graph: &BindingGraph, options: &CodegenOptions) -> Result<ComponentImplementation> {
    options.validate()?;

    let mut local = IndexSet::new();
    for (key, resolution) in graph.resolutions() {
        match resolution {
            Resolution::Bound {
                inherited: false, ..
            } => {
                local.insert(key.clone());
            }
            Resolution::Bound { .. } => {}
            _ => {
                return Err(CodegenError::UnresolvedKey {
                    component: graph.path().clone(),
                    key: key.clone(),
                });
            }
        }
    }

    let levels = initialization_levels(graph, &local)?;
    let class_name = component_class_name(graph.path());
    let dispatch = if options.fast_init || local.len() > options.switching_threshold {
        DispatchMode::Switching
    } else {
        DispatchMode::Direct
    };

    let mut names = NameAllocator::default();
    let mut factories = Vec::with_capacity(local.len());
    for key in levels.iter().flat_map(|level| level.keys.iter()) {
        let Some(Resolution::Bound { binding, owner, .. }) = graph.resolution(key) else {
            continue;
        };
        let index = factories.len();
        let name = names.provider_name(binding);
        let memo = memoization(binding);
        let body = match (dispatch, memo) {
            (DispatchMode::Switching, memoization) => FactoryBody::SwitchCase {
                provider: switching_provider_name(index / options.cases_per_switch),
                case: index % options.cases_per_switch,
                memoization,
            },
            (DispatchMode::Direct, Some(strategy)) => FactoryBody::MemoizedField {
                strategy,
                field: name.clone(),
            },
            (DispatchMode::Direct, None) => FactoryBody::DirectCall,
        };
        factories.push(FactorySpecification {
            name,
            key: key.clone(),
            binding_kind: binding.kind,
            origin: binding.origin.clone(),
            factory: factory_name(binding).or_else(|| created_subcomponent(graph, binding)),
            owner: owner.clone(),
            parameters: parameters(graph, binding),
            body,
            shard: index / options.keys_per_component_shard,
        });
    }

    let switching_providers = match dispatch {
        DispatchMode::Direct => Vec::new(),
        DispatchMode::Switching => factories
            .chunks(options.cases_per_switch)
            .enumerate()
            .map(|(i, chunk)| SwitchingProvider {
                name: switching_provider_name(i),
                cases: chunk.iter().map(|f| f.name.clone()).collect(),
            })
            .collect(),
    };

    let shards = if factories.is_empty() {
        vec![Shard {
            name: class_name.clone(),
            factories: Vec::new(),
        }]
    } else {
        factories
            .chunks(options.keys_per_component_shard)
            .enumerate()
            .map(|(i, chunk)| Shard {
                name: if i == 0 {
                    class_name.clone()
                } else {
                    format!("{}Shard{}", class_name, i)
                },
                factories: chunk.iter().map(|f| f.name.clone()).collect(),
            })
            .collect()
    };

    let entry_points = graph
        .entry_points()
        .iter()
        .map(|entry| EntryPointSpec {
            id: entry.id.clone(),
            name: entry.name.clone(),
            body: match &entry.kind {
                EntryPointKind::Provision(request) => EntryPointBody::Provision {
                    key: request.key.clone(),
                    request: request.kind,
                },
                EntryPointKind::MembersInjection(ty) => EntryPointBody::MembersInjection {
                    key: BindingKey::of(TypeRef::members_injector_of(ty.clone())),
                },
                EntryPointKind::SubcomponentFactory(name) => EntryPointBody::SubcomponentFactory {
                    component: component_class_name(&graph.path().child(name)),
                },
            },
        })
        .collect();

    let implementation = ComponentImplementation {
        component: graph.path().clone(),
        class_name,
        parent: graph.parent().map(|p| component_class_name(p.path())),
        dispatch,
        factories,
        entry_points,
        switching_providers,
        shards,
        subcomponents: graph
            .component()
            .subcomponents
            .iter()
            .map(|s| component_class_name(&graph.path().child(&s.name)))
            .collect(),
    };
    debug!(
        factories = implementation.factories.len(),
        levels = levels.len(),
        dispatch = ?implementation.dispatch,
        "generated component"
    );
    Ok(implementation)
}

fn memoization(binding: &Binding) -> Option<MemoizationStrategy> {
    match &binding.scope {
        Some(scope) if scope.is_reusable() => Some(MemoizationStrategy::SingleCheck),
        Some(_) => Some(MemoizationStrategy::DoubleCheck),
        None => None,
    }
}

/// Implementation created by a subcomponent creator binding. Creators are
/// nested in their subcomponent (`app.SessionComponent.Factory`).
fn created_subcomponent(graph: &BindingGraph, binding: &Binding) -> Option<String> {
    if binding.kind != BindingKind::SubcomponentCreator {
        return None;
    }
    let (owner, _) = binding.key.ty.name().rsplit_once('.')?;
    graph
        .component()
        .subcomponents
        .iter()
        .find(|s| s.name == owner)
        .map(|s| component_class_name(&graph.path().child(&s.name)))
}

fn switching_provider_name(index: usize) -> String {
    format!("SwitchingProvider{}", index)
}

fn parameters(graph: &BindingGraph, binding: &Binding) -> Vec<ParameterSpec> {
    binding
        .dependencies
        .iter()
        .map(|request| {
            let dependency = graph.binding(&request.key);
            ParameterSpec {
                key: request.key.clone(),
                kind: request.kind,
                provided_by: providing_component(graph, &request.key),
                map_key: dependency.and_then(|d| d.map_key.clone()),
                elements: dependency
                    .is_some_and(|d| d.contribution == ContributionType::ElementsIntoSet),
            }
        })
        .collect()
}

/// The graph (self or ancestor) that emits the provider for `key`.
fn providing_component(graph: &BindingGraph, key: &BindingKey) -> ComponentPath {
    std::iter::once(graph)
        .chain(graph.ancestors())
        .find(|g| {
            g.resolution(key)
                .is_some_and(|r| r.binding().is_some() && !r.is_inherited())
        })
        .map(|g| g.path().clone())
        .unwrap_or_else(|| graph.path().clone())
}
