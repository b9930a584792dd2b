use dagger_model::error::{Diagnostic, ErrorKind};

use super::{CheckContext, Finding, GraphCheck};

/// Scope compatibility between bindings and the components that own them.
///
/// - a subcomponent may not repeat a scope of one of its ancestors
/// - a binding with a scope other than `@Reusable` must be owned by a
///   component carrying that scope
pub struct ScopeCheck;

impl GraphCheck for ScopeCheck {
    fn name(&self) -> &'static str {
        "scope"
    }

    fn check(&self, context: &CheckContext<'_>, findings: &mut Vec<Finding>) {
        let graph = context.graph;
        let component = graph.component();

        for scope in &component.scopes {
            if let Some(ancestor) = graph.ancestors().find(|a| a.component().has_scope(scope)) {
                let diagnostic = Diagnostic::new(
                    ErrorKind::ScopeMismatch,
                    component.id.clone(),
                    format!(
                        "{} has scope {} which is already used by its ancestor {}",
                        component.name(),
                        scope,
                        ancestor.component().name()
                    ),
                )
                .with_label(ancestor.component().id.clone(), "ancestor declared here".to_string());
                findings.push(Finding::component(diagnostic));
            }
        }

        for (binding, owner) in graph.local_bindings() {
            let Some(scope) = binding.scope.as_ref().filter(|s| !s.is_reusable()) else {
                continue;
            };
            let owner_has_scope = std::iter::once(graph)
                .chain(graph.ancestors())
                .find(|g| g.path() == owner)
                .is_some_and(|g| g.component().has_scope(scope));
            if owner_has_scope {
                continue;
            }
            let diagnostic = Diagnostic::new(
                ErrorKind::ScopeMismatch,
                context.anchor(&binding.key),
                format!(
                    "{} may not reference bindings with different scopes: {} {}",
                    context.component_description(),
                    scope,
                    binding.key
                ),
            )
            .with_label(binding.origin.clone(), format!("scoped {} here", scope))
            .with_note(format!(
                "install this binding in a component scoped {}, or remove the scope",
                scope
            ));
            findings.push(Finding::at_key(context, &binding.key, diagnostic));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::tests::{build, run, tree};

    #[test]
    fn test_unscoped_component_with_scoped_binding() {
        let graph = build(
            r#"
types:
  - name: app.Cache
    scopes: [Singleton]
    inject: []
components:
  - name: app.AppComponent
    methods:
      - { name: cache, returns: app.Cache }
"#,
        );
        let diagnostics = run(&ScopeCheck, &graph);

        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].kind, ErrorKind::ScopeMismatch);
        assert_eq!(
            diagnostics[0].message,
            "app.AppComponent (unscoped) may not reference bindings with different scopes: @Singleton app.Cache"
        );
    }

    #[test]
    fn test_reusable_is_exempt() {
        let graph = build(
            r#"
types:
  - name: app.Cache
    scopes: [Reusable]
    inject: []
components:
  - name: app.AppComponent
    methods:
      - { name: cache, returns: app.Cache }
"#,
        );
        assert!(run(&ScopeCheck, &graph).is_empty());
    }

    #[test]
    fn test_subcomponent_repeating_ancestor_scope() {
        let tree = tree(
            r#"
components:
  - name: app.AppComponent
    scopes: [Singleton]
    methods:
      - { name: session, returns: app.SessionComponent }
  - name: app.SessionComponent
    kind: subcomponent
    scopes: [Singleton]
    methods: []
"#,
        );
        let child = tree.children[0].graph().expect("child built");
        let diagnostics = run(&ScopeCheck, child);

        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message.contains("already used by its ancestor app.AppComponent"));
    }

    #[test]
    fn test_scoped_injection_owned_by_ancestor() {
        let tree = tree(
            r#"
types:
  - name: app.Cache
    scopes: [Singleton]
    inject: []
components:
  - name: app.AppComponent
    scopes: [Singleton]
    methods:
      - { name: session, returns: app.SessionComponent }
  - name: app.SessionComponent
    kind: subcomponent
    methods:
      - { name: cache, returns: app.Cache }
"#,
        );
        let child = tree.children[0].graph().expect("child built");
        assert!(run(&ScopeCheck, child).is_empty());
    }
}
