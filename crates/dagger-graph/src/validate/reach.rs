//! Shortest request paths from entry points.

use indexmap::IndexMap;

use dagger_model::foundation::BindingKey;

use crate::graph::{BindingGraph, DependencyEdge, EdgeSource};

#[derive(Debug, Clone)]
enum Step {
    Entry(usize),
    From(BindingKey),
}

/// Breadth-first search trees over a graph's edges, one per entry point in
/// declaration order. A key belongs to the first entry point that reaches
/// it, and following parents yields a shortest chain from that entry point.
#[derive(Debug, Clone, Default)]
pub struct Reachability {
    parents: IndexMap<BindingKey, Step>,
}

impl Reachability {
    pub fn compute(graph: &BindingGraph) -> Self {
        let mut outgoing: IndexMap<&BindingKey, Vec<&DependencyEdge>> = IndexMap::new();
        let mut roots: Vec<(usize, &BindingKey)> = Vec::new();
        for edge in graph.edges() {
            match &edge.source {
                EdgeSource::EntryPoint(i) => roots.push((*i, edge.target())),
                EdgeSource::Binding(key) => outgoing.entry(key).or_default().push(edge),
            }
        }

        let mut parents = IndexMap::new();
        let mut queue = std::collections::VecDeque::new();
        for (i, root) in roots {
            if parents.contains_key(root) {
                continue;
            }
            parents.insert(root.clone(), Step::Entry(i));
            queue.push_back(root);
            while let Some(key) = queue.pop_front() {
                for edge in outgoing.get(key).into_iter().flatten() {
                    let target = edge.target();
                    if !parents.contains_key(target) {
                        parents.insert(target.clone(), Step::From(key.clone()));
                        queue.push_back(target);
                    }
                }
            }
        }
        Self { parents }
    }

    /// Index of the entry point whose chain reaches `key`, or `usize::MAX`.
    pub fn entry_of(&self, key: &BindingKey) -> usize {
        self.trace(key).0.unwrap_or(usize::MAX)
    }

    /// Entry point index and key chain ending at `key`.
    pub fn trace(&self, key: &BindingKey) -> (Option<usize>, Vec<BindingKey>) {
        let mut chain = vec![key.clone()];
        let mut current = key;
        loop {
            match self.parents.get(current) {
                Some(Step::Entry(i)) => {
                    chain.reverse();
                    return (Some(*i), chain);
                }
                Some(Step::From(parent)) => {
                    chain.push(parent.clone());
                    current = parent;
                }
                None => {
                    chain.reverse();
                    return (None, chain);
                }
            }
        }
    }

    /// The key that requested `key` on its shortest chain, if any.
    pub fn requester(&self, key: &BindingKey) -> Option<&BindingKey> {
        match self.parents.get(key) {
            Some(Step::From(parent)) => Some(parent),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::tests::build;
    use dagger_model::foundation::TypeRef;

    #[test]
    fn test_key_belongs_to_first_entry_point() {
        let graph = build(
            r#"
types:
  - name: app.A
    inject:
      - { name: b, type: app.B }
  - name: app.B
    inject:
      - { name: x, type: app.X }
  - name: app.X
    inject: []
components:
  - name: app.AppComponent
    methods:
      - { name: a, returns: app.A }
      - { name: x, returns: app.X }
"#,
        );
        let reach = Reachability::compute(&graph);
        let x = BindingKey::of(TypeRef::named("app.X"));

        let (entry, chain) = reach.trace(&x);
        assert_eq!(entry, Some(0));
        assert_eq!(chain.len(), 3);
        assert_eq!(reach.requester(&x).map(ToString::to_string), Some("app.B".to_string()));
    }
}
