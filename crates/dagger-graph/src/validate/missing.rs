use dagger_model::error::{Diagnostic, ErrorKind};

use super::{CheckContext, Finding, GraphCheck};
use crate::graph::Resolution;

/// Every reached key with no binding.
pub struct MissingBindingCheck;

impl GraphCheck for MissingBindingCheck {
    fn name(&self) -> &'static str {
        "missing-binding"
    }

    fn check(&self, context: &CheckContext<'_>, findings: &mut Vec<Finding>) {
        for (key, resolution) in context.graph.resolutions() {
            if !matches!(resolution, Resolution::Missing) {
                continue;
            }
            let mut diagnostic = Diagnostic::new(
                ErrorKind::MissingBinding,
                context.anchor(key),
                format!(
                    "missing binding for {}: {} (unsatisfied)",
                    key,
                    context.request_chain(key)
                ),
            );
            if let Some(requester) = context.requesting_declaration(key) {
                diagnostic = diagnostic.with_label(requester, "requested here".to_string());
            }
            let hint = if key.ty.is_set() || key.ty.is_map() {
                format!(
                    "declare {} with @Multibinds, or contribute to it with @IntoSet, @ElementsIntoSet or @IntoMap",
                    key
                )
            } else if key.qualifier.is_some() {
                format!("qualified keys need an explicit @Provides or @Binds method for {}", key)
            } else {
                format!(
                    "add an @Inject constructor to {} or a @Provides or @Binds method for it",
                    key.ty
                )
            };
            findings.push(Finding::at_key(context, key, diagnostic.with_note(hint)));
        }
    }
}
