//! Dependency ordering of a component's local bindings.

use indexmap::{IndexMap, IndexSet};

use dagger_graph::{BindingGraph, EdgeSource};
use dagger_model::foundation::BindingKey;

use crate::error::{CodegenError, Result};

/// A set of bindings with no ordering constraints between them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitializationLevel {
    pub keys: Vec<BindingKey>,
}

/// Kahn topological levels over the instance edges between `local` keys.
///
/// Deferred (`Provider`/`Lazy`) edges impose no order. Keys inside a level
/// are sorted by canonical string for determinism.
pub fn initialization_levels(
    graph: &BindingGraph,
    local: &IndexSet<BindingKey>,
) -> Result<Vec<InitializationLevel>> {
    let mut in_degree: IndexMap<&BindingKey, usize> = local.iter().map(|k| (k, 0)).collect();
    let mut dependents: IndexMap<&BindingKey, IndexSet<&BindingKey>> = IndexMap::new();

    for edge in graph.edges() {
        let EdgeSource::Binding(source) = &edge.source else {
            continue;
        };
        let target = edge.target();
        if edge.is_deferred() || !local.contains(source) || !local.contains(target) {
            continue;
        }
        if dependents.entry(target).or_default().insert(source)
            && let Some(degree) = in_degree.get_mut(source)
        {
            *degree += 1;
        }
    }

    let mut levels = Vec::new();
    let mut current: Vec<&BindingKey> = in_degree
        .iter()
        .filter(|&(_, &degree)| degree == 0)
        .map(|(k, _)| *k)
        .collect();
    let mut processed = 0;

    while !current.is_empty() {
        current.sort_by_key(|k| k.canonical());
        processed += current.len();

        let mut next = Vec::new();
        for key in &current {
            for dependent in dependents.get(key).into_iter().flatten() {
                if let Some(degree) = in_degree.get_mut(dependent) {
                    *degree -= 1;
                    if *degree == 0 {
                        next.push(*dependent);
                    }
                }
            }
        }
        levels.push(InitializationLevel {
            keys: current.into_iter().cloned().collect(),
        });
        current = next;
    }

    if processed != local.len() {
        let mut keys: Vec<String> = in_degree
            .iter()
            .filter(|&(_, &degree)| degree > 0)
            .map(|(k, _)| k.canonical())
            .collect();
        keys.sort();
        return Err(CodegenError::CycleDetected {
            component: graph.path().clone(),
            keys,
        });
    }
    Ok(levels)
}
