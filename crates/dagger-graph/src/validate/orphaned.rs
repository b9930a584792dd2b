use tracing::debug;

use dagger_model::component::ComponentPath;
use dagger_model::error::{Diagnostic, ErrorKind};

use super::ValidationOptions;
use crate::tree::ComponentTree;

/// Modules installed in a component whose bindings are never used by that
/// component or any of its subcomponents.
///
/// Runs over a whole tree because usage by descendants counts. Modules
/// without declarations are ignored.
pub fn validate_orphaned_modules(
    tree: &ComponentTree,
    options: &ValidationOptions,
) -> Vec<(ComponentPath, Diagnostic)> {
    let Some(severity) = options.orphaned_module else {
        return Vec::new();
    };
    let mut diagnostics = Vec::new();
    for node in tree.walk() {
        let Some(graph) = node.graph() else {
            continue;
        };
        let used = node.used_declarations();
        for module in &graph.component().modules {
            if module.is_empty() || module.declarations.iter().any(|d| used.contains(&d.id)) {
                continue;
            }
            debug!(module = %module.name, component = %node.path, "orphaned module");
            let diagnostic = Diagnostic::with_severity(
                ErrorKind::OrphanedModule,
                severity,
                module.id(),
                format!(
                    "module {} is installed in {} but none of its bindings are used",
                    module.name,
                    graph.component().name()
                ),
            )
            .with_label(graph.component().id.clone(), "installed here".to_string());
            diagnostics.push((node.path.clone(), diagnostic));
        }
    }
    diagnostics
}
