use dagger_model::error::{Diagnostic, ErrorKind};

use super::{CheckContext, Finding, GraphCheck};

/// Explicit `@Provides`/`@Binds` bindings for types that also have an
/// `@Inject` constructor. Off unless a severity is configured.
pub struct InjectionConflictCheck;

impl GraphCheck for InjectionConflictCheck {
    fn name(&self) -> &'static str {
        "explicit-binding-conflicts-with-inject"
    }

    fn check(&self, context: &CheckContext<'_>, findings: &mut Vec<Finding>) {
        let Some(severity) = context.options.explicit_binding_conflicts_with_inject else {
            return;
        };
        for conflict in context.graph.injection_conflicts() {
            let diagnostic = Diagnostic::with_severity(
                ErrorKind::ExplicitBindingConflict,
                severity,
                conflict.explicit.clone(),
                format!(
                    "{} is bound explicitly by {} but also has an @Inject constructor",
                    conflict.key, conflict.explicit
                ),
            )
            .with_label(conflict.constructor.clone(), "@Inject constructor".to_string());
            findings.push(Finding::at_key(context, &conflict.key, diagnostic));
        }
    }
}
