use std::collections::VecDeque;

use indexmap::{IndexMap, IndexSet};

use dagger_model::error::{Diagnostic, ErrorKind};
use dagger_model::foundation::BindingKey;

use super::{CheckContext, Finding, GraphCheck};
use crate::graph::{BindingGraph, EdgeSource};

/// Dependency cycles made only of instance requests.
///
/// A cycle that passes through a `Provider` or `Lazy` request is legal and
/// ignored. One diagnostic is reported per strongly connected component.
pub struct CycleCheck;

impl GraphCheck for CycleCheck {
    fn name(&self) -> &'static str {
        "dependency-cycle"
    }

    fn check(&self, context: &CheckContext<'_>, findings: &mut Vec<Finding>) {
        let adjacency = instance_edges(context.graph);
        for component in strongly_connected(&adjacency) {
            let is_cycle = component.len() > 1
                || adjacency
                    .get(component[0])
                    .is_some_and(|targets| targets.contains(component[0]));
            if !is_cycle {
                continue;
            }
            let Some(start) = component.iter().min_by_key(|k| k.canonical()).copied() else {
                continue;
            };
            let members: IndexSet<&BindingKey> = component.iter().copied().collect();
            let path = cycle_path(start, &members, &adjacency);
            findings.push(Finding::at_key(context, start, report(context, &path)));
        }
    }
}

fn instance_edges(graph: &BindingGraph) -> IndexMap<&BindingKey, IndexSet<&BindingKey>> {
    let mut adjacency: IndexMap<&BindingKey, IndexSet<&BindingKey>> = IndexMap::new();
    for edge in graph.edges() {
        if edge.is_deferred() {
            continue;
        }
        if let EdgeSource::Binding(source) = &edge.source
            && graph.resolution(source).is_some_and(|r| !r.is_inherited())
        {
            adjacency.entry(source).or_default().insert(edge.target());
        }
    }
    adjacency
}

/// Tarjan's algorithm. Components come out in reverse topological order.
fn strongly_connected<'k>(
    adjacency: &IndexMap<&'k BindingKey, IndexSet<&'k BindingKey>>,
) -> Vec<Vec<&'k BindingKey>> {
    struct Tarjan<'a, 'k> {
        adjacency: &'a IndexMap<&'k BindingKey, IndexSet<&'k BindingKey>>,
        index: IndexMap<&'k BindingKey, (usize, usize)>,
        stack: Vec<&'k BindingKey>,
        on_stack: IndexSet<&'k BindingKey>,
        components: Vec<Vec<&'k BindingKey>>,
    }

    impl<'k> Tarjan<'_, 'k> {
        fn visit(&mut self, node: &'k BindingKey) {
            let order = self.index.len();
            self.index.insert(node, (order, order));
            self.stack.push(node);
            self.on_stack.insert(node);

            let adjacency = self.adjacency;
            for &target in adjacency.get(node).into_iter().flatten() {
                if !self.index.contains_key(target) {
                    self.visit(target);
                    let low = self.index[target].1;
                    let entry = &mut self.index[node];
                    entry.1 = entry.1.min(low);
                } else if self.on_stack.contains(target) {
                    let order = self.index[target].0;
                    let entry = &mut self.index[node];
                    entry.1 = entry.1.min(order);
                }
            }

            let (order, low) = self.index[node];
            if order == low {
                let mut component = Vec::new();
                while let Some(member) = self.stack.pop() {
                    self.on_stack.swap_remove(member);
                    component.push(member);
                    if member == node {
                        break;
                    }
                }
                self.components.push(component);
            }
        }
    }

    let mut tarjan = Tarjan {
        adjacency,
        index: IndexMap::new(),
        stack: Vec::new(),
        on_stack: IndexSet::new(),
        components: Vec::new(),
    };
    for node in adjacency.keys() {
        if !tarjan.index.contains_key(*node) {
            tarjan.visit(node);
        }
    }
    tarjan.components
}

/// Shortest path `start -> ... -> start` inside one component.
fn cycle_path<'k>(
    start: &'k BindingKey,
    members: &IndexSet<&'k BindingKey>,
    adjacency: &IndexMap<&'k BindingKey, IndexSet<&'k BindingKey>>,
) -> Vec<&'k BindingKey> {
    let mut parents: IndexMap<&BindingKey, &BindingKey> = IndexMap::new();
    let mut queue = VecDeque::from([start]);
    while let Some(node) = queue.pop_front() {
        for &target in adjacency.get(node).into_iter().flatten() {
            if !members.contains(target) {
                continue;
            }
            if target == start {
                let mut path = vec![node];
                let mut current = node;
                while let Some(&parent) = parents.get(current) {
                    path.push(parent);
                    current = parent;
                }
                path.reverse();
                path.push(start);
                return path;
            }
            if !parents.contains_key(target) {
                parents.insert(target, node);
                queue.push_back(target);
            }
        }
    }
    vec![start, start]
}

fn report(context: &CheckContext<'_>, path: &[&BindingKey]) -> Diagnostic {
    let origin = |key: &BindingKey| {
        context
            .graph
            .binding(key)
            .map(|b| b.origin.clone())
            .unwrap_or_else(|| context.graph.component().id.clone())
    };
    let description = path
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" -> ");

    let mut diagnostic = Diagnostic::new(
        ErrorKind::CyclicDependency,
        origin(path[0]),
        format!("dependency cycle: {}", description),
    );
    let last = path.len() - 1;
    for (i, key) in path.iter().enumerate() {
        let message = if i == 0 {
            "cycle starts here".to_string()
        } else if i == last {
            "cycle completes here".to_string()
        } else {
            format!("depends on '{}'", path[i + 1])
        };
        diagnostic = diagnostic.with_label(origin(*key), message);
    }
    diagnostic.with_note(
        "break the cycle by requesting one of these dependencies as Provider<T> or Lazy<T>"
            .to_string(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::tests::{build, run};

    const CYCLE: &str = r#"
types:
  - name: app.A
    inject:
      - { name: b, type: app.B }
  - name: app.B
    inject:
      - { name: c, type: app.C }
  - name: app.C
    inject:
      - { name: a, type: app.A }
components:
  - name: app.AppComponent
    methods:
      - { name: a, returns: app.A }
"#;

    #[test]
    fn test_reports_cycle_once() {
        let graph = build(CYCLE);
        let diagnostics = run(&CycleCheck, &graph);

        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].kind, ErrorKind::CyclicDependency);
        assert_eq!(
            diagnostics[0].message,
            "dependency cycle: app.A -> app.B -> app.C -> app.A"
        );
        let labels: Vec<&str> = diagnostics[0]
            .labels
            .iter()
            .map(|l| l.message.as_str())
            .collect();
        assert_eq!(
            labels,
            vec![
                "cycle starts here",
                "depends on 'app.C'",
                "depends on 'app.A'",
                "cycle completes here"
            ]
        );
    }

    #[test]
    fn test_provider_breaks_cycle() {
        let graph = build(&CYCLE.replace(
            "{ name: a, type: app.A }",
            "{ name: a, type: \"Provider<app.A>\" }",
        ));
        assert!(run(&CycleCheck, &graph).is_empty());
    }

    #[test]
    fn test_lazy_breaks_cycle() {
        let graph = build(&CYCLE.replace(
            "{ name: c, type: app.C }",
            "{ name: c, type: \"Lazy<app.C>\" }",
        ));
        assert!(run(&CycleCheck, &graph).is_empty());
    }

    #[test]
    fn test_self_loop() {
        let graph = build(
            r#"
types:
  - name: app.Node
    inject:
      - { name: next, type: app.Node }
components:
  - name: app.AppComponent
    methods:
      - { name: node, returns: app.Node }
"#,
        );
        let diagnostics = run(&CycleCheck, &graph);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].message, "dependency cycle: app.Node -> app.Node");
    }
}
