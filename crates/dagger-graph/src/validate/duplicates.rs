use dagger_model::error::{Diagnostic, ErrorKind};

use super::{CheckContext, Finding, GraphCheck};
use crate::graph::Resolution;

/// Keys bound more than once in a component's lineage, and map
/// contributions that collide on a map key.
pub struct DuplicateBindingCheck;

impl GraphCheck for DuplicateBindingCheck {
    fn name(&self) -> &'static str {
        "duplicate-binding"
    }

    fn check(&self, context: &CheckContext<'_>, findings: &mut Vec<Finding>) {
        for (key, resolution) in context.graph.resolutions() {
            let Resolution::Duplicate { candidates } = resolution else {
                continue;
            };
            let sites: Vec<String> = candidates.iter().map(|b| b.origin.to_string()).collect();
            let mut diagnostic = Diagnostic::new(
                ErrorKind::DuplicateBinding,
                context.anchor(key),
                format!("{} is bound multiple times: {}", key, sites.join(", ")),
            );
            for candidate in candidates {
                diagnostic =
                    diagnostic.with_label(candidate.origin.clone(), "bound here".to_string());
            }
            findings.push(Finding::at_key(context, key, diagnostic));
        }

        for conflict in context.graph.map_key_conflicts() {
            let origins: Vec<String> = conflict.origins.iter().map(ToString::to_string).collect();
            let mut diagnostic = Diagnostic::new(
                ErrorKind::DuplicateBinding,
                context.anchor(&conflict.key),
                format!(
                    "{} has more than one contribution for map key {}: {}",
                    conflict.key,
                    conflict.map_key,
                    origins.join(", ")
                ),
            );
            for origin in &conflict.origins {
                diagnostic = diagnostic.with_label(origin.clone(), "contributes here".to_string());
            }
            findings.push(Finding::at_key(context, &conflict.key, diagnostic));
        }
    }
}

/// Keys bound both uniquely and through multibinding contributions.
pub struct KindConflictCheck;

impl GraphCheck for KindConflictCheck {
    fn name(&self) -> &'static str {
        "conflicting-binding-kinds"
    }

    fn check(&self, context: &CheckContext<'_>, findings: &mut Vec<Finding>) {
        for (key, resolution) in context.graph.resolutions() {
            let Resolution::KindConflict {
                unique,
                contributions,
            } = resolution
            else {
                continue;
            };
            let mut diagnostic = Diagnostic::new(
                ErrorKind::ConflictingBindingKinds,
                context.anchor(key),
                format!(
                    "{} has incompatible bindings: {} unique and {} multibinding contribution(s)",
                    key,
                    unique.len(),
                    contributions.len()
                ),
            );
            for binding in unique {
                diagnostic =
                    diagnostic.with_label(binding.origin.clone(), "unique binding".to_string());
            }
            for binding in contributions {
                diagnostic = diagnostic.with_label(
                    binding.origin.clone(),
                    "multibinding contribution".to_string(),
                );
            }
            let diagnostic = diagnostic.with_note(
                "a key is either provided by one binding or assembled from contributions, not both"
                    .to_string(),
            );
            findings.push(Finding::at_key(context, key, diagnostic));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::tests::{build, run};
    use dagger_model::foundation::{BindingKey, TypeRef};

    #[test]
    fn test_duplicate_lists_every_site() {
        let graph = build(
            r#"
types:
  - name: app.Heater
    kind: interface
  - name: app.ElectricHeater
    supertypes: [app.Heater]
modules:
  - name: app.ModuleA
    methods:
      - { name: heater, annotations: [Provides], returns: app.Heater }
  - name: app.ModuleB
    methods:
      - { name: otherHeater, annotations: [Provides], returns: app.Heater }
components:
  - name: app.AppComponent
    modules: [app.ModuleA, app.ModuleB]
    methods:
      - { name: heater, returns: app.Heater }
"#,
        );
        let diagnostics = run(&DuplicateBindingCheck, &graph);

        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].kind, ErrorKind::DuplicateBinding);
        assert_eq!(
            diagnostics[0].message,
            "app.Heater is bound multiple times: app.ModuleA#heater(), app.ModuleB#otherHeater()"
        );
        assert_eq!(diagnostics[0].labels.len(), 2);
    }

    #[test]
    fn test_map_key_collision() {
        let graph = build(
            r#"
modules:
  - name: app.PluginModule
    methods:
      - name: first
        annotations: [Provides, IntoMap]
        mapKeys: [{ annotation: StringKey, value: '"a"' }]
        returns: app.Plugin
      - name: second
        annotations: [Provides, IntoMap]
        mapKeys: [{ annotation: StringKey, value: '"a"' }]
        returns: app.Plugin
components:
  - name: app.AppComponent
    modules: [app.PluginModule]
    methods:
      - { name: plugins, returns: "Map<java.lang.String, app.Plugin>" }
"#,
        );
        let diagnostics = run(&DuplicateBindingCheck, &graph);

        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message.contains("more than one contribution for map key"));
        assert_eq!(diagnostics[0].labels.len(), 2);
    }

    #[test]
    fn test_lazy_class_key_collides_with_class_key() {
        let graph = build(
            r#"
modules:
  - name: app.PluginModule
    methods:
      - name: eager
        annotations: [Provides, IntoMap]
        mapKeys: [{ annotation: ClassKey, value: app.Screen.class }]
        returns: app.Plugin
      - name: lazy
        annotations: [Provides, IntoMap]
        mapKeys: [{ annotation: LazyClassKey, value: app.Screen.class }]
        returns: app.Plugin
      - name: other
        annotations: [Provides, IntoMap]
        mapKeys: [{ annotation: LazyClassKey, value: app.Settings.class }]
        returns: app.Plugin
components:
  - name: app.AppComponent
    modules: [app.PluginModule]
    methods:
      - { name: plugins, returns: "Map<java.lang.Class<?>, app.Plugin>" }
"#,
        );
        let plugins = graph
            .binding(&BindingKey::of(
                TypeRef::parse("Map<java.lang.Class<?>, app.Plugin>").unwrap(),
            ))
            .expect("map bound");
        assert_eq!(plugins.dependencies.len(), 3);

        let diagnostics = run(&DuplicateBindingCheck, &graph);
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message.contains("@ClassKey(app.Screen.class)"));
        assert_eq!(diagnostics[0].labels.len(), 2);
    }

    #[test]
    fn test_unique_and_contribution_conflict() {
        let graph = build(
            r#"
modules:
  - name: app.PluginModule
    methods:
      - { name: plugin, annotations: [Provides, IntoSet], returns: app.Plugin }
      - { name: plugins, annotations: [Provides], returns: "Set<app.Plugin>" }
components:
  - name: app.AppComponent
    modules: [app.PluginModule]
    methods:
      - { name: plugins, returns: "Set<app.Plugin>" }
"#,
        );
        let diagnostics = run(&KindConflictCheck, &graph);

        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].kind, ErrorKind::ConflictingBindingKinds);
        assert_eq!(diagnostics[0].labels.len(), 2);
    }
}
