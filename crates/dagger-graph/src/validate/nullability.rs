use dagger_model::error::{Diagnostic, ErrorKind};

use super::{CheckContext, Finding, GraphCheck};
use crate::graph::EdgeSource;

/// Nullable bindings injected into non-nullable instance requests.
pub struct NullabilityCheck;

impl GraphCheck for NullabilityCheck {
    fn name(&self) -> &'static str {
        "nullability"
    }

    fn check(&self, context: &CheckContext<'_>, findings: &mut Vec<Finding>) {
        let Some(severity) = context.options.nullable else {
            return;
        };
        let graph = context.graph;
        for edge in graph.edges() {
            if edge.is_deferred() || edge.request.nullable {
                continue;
            }
            let Some(binding) = graph.binding(edge.target()).filter(|b| b.nullable) else {
                continue;
            };
            let requester = match &edge.source {
                EdgeSource::EntryPoint(i) => graph.entry_points().get(*i).map(|e| e.id.clone()),
                EdgeSource::Binding(key) => graph.binding(key).map(|b| b.origin.clone()),
            }
            .unwrap_or_else(|| graph.component().id.clone());

            let diagnostic = Diagnostic::with_severity(
                ErrorKind::NullableMismatch,
                severity,
                requester.clone(),
                format!(
                    "{} is not nullable, but is being provided by {}",
                    edge.target(),
                    binding.origin
                ),
            )
            .with_label(binding.origin.clone(), "nullable binding".to_string())
            .with_note(format!("mark the request in {} as @Nullable", requester));
            findings.push(Finding::at_key(context, edge.target(), diagnostic));
        }
    }
}
