//! Generated names.

use indexmap::IndexSet;

use dagger_model::binding::{Binding, BindingKind};
use dagger_model::component::ComponentPath;

/// `DaggerAppComponent` for a root, `DaggerAppComponent.SessionComponentImpl`
/// for its subcomponents.
pub fn component_class_name(path: &ComponentPath) -> String {
    let mut segments = path.0.iter().map(|name| simple_name(name));
    let Some(root) = segments.next() else {
        return String::new();
    };
    let mut name = format!("Dagger{}", root);
    for child in segments {
        name.push('.');
        name.push_str(child);
        name.push_str("Impl");
    }
    name
}

/// User code invoked by a binding, if any.
pub fn factory_name(binding: &Binding) -> Option<String> {
    match binding.kind {
        BindingKind::Injection => Some(format!("{}_Factory", binding.key.ty.simple_name())),
        BindingKind::Provision => {
            let module = binding.module.as_deref().unwrap_or(&binding.origin.owner);
            let method = method_name(binding.origin.member.as_deref().unwrap_or_default());
            Some(format!("{}_{}Factory", simple_name(module), capitalize(method)))
        }
        BindingKind::MembersInjector => binding
            .key
            .ty
            .single_arg()
            .map(|target| format!("{}_MembersInjector", target.simple_name())),
        BindingKind::ComponentProvision => Some(binding.origin.to_string()),
        _ => None,
    }
}

/// Allocates provider names unique within one component.
#[derive(Debug, Default)]
pub struct NameAllocator {
    used: IndexSet<String>,
}

impl NameAllocator {
    /// `databaseProvider`, `setOfStringProvider`, `namedDatabaseProvider2`, ...
    pub fn provider_name(&mut self, binding: &Binding) -> String {
        let mut base = String::new();
        if let Some(qualifier) = &binding.key.qualifier {
            let name = qualifier.0.split('(').next().unwrap_or_default();
            base.push_str(&decapitalize(simple_name(name)));
            base.push_str(&capitalize(&binding.key.ty.mangled()));
        } else {
            base.push_str(&decapitalize(&binding.key.ty.mangled()));
        }
        if binding.key.is_contribution() {
            base.push_str("Contribution");
        }
        base.push_str("Provider");

        let mut name = base.clone();
        let mut n = 2;
        while !self.used.insert(name.clone()) {
            name = format!("{}{}", base, n);
            n += 1;
        }
        name
    }
}

fn simple_name(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name)
}

/// `provideClock(app.Config)` -> `provideClock`.
fn method_name(signature: &str) -> &str {
    signature.split('(').next().unwrap_or(signature)
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn decapitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}
