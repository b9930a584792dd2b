//! Graph validation.
//!
//! A [`Validator`] runs a fixed battery of independent [`GraphCheck`]s over
//! a built [`BindingGraph`]. Checks never stop early: each one appends every
//! problem it finds, and the validator sorts the combined findings so that
//! identical input always yields an identical diagnostic list.
//!
//! # Ordering
//!
//! Findings are ordered by:
//! 1. index of the first entry point (in declaration order) that reaches
//!    the offending key
//! 2. canonical string of the key
//! 3. error kind
//!
//! Component-level findings (not tied to a key) sort first.

mod cycles;
mod duplicates;
mod injection;
mod missing;
mod nullability;
mod orphaned;
mod reach;
mod scopes;

use dagger_model::error::{Diagnostic, Severity};
use dagger_model::foundation::{BindingKey, DeclarationId};
use tracing::debug;

use crate::graph::BindingGraph;

pub use cycles::CycleCheck;
pub use duplicates::{DuplicateBindingCheck, KindConflictCheck};
pub use injection::InjectionConflictCheck;
pub use missing::MissingBindingCheck;
pub use nullability::NullabilityCheck;
pub use orphaned::validate_orphaned_modules;
pub use reach::Reachability;
pub use scopes::ScopeCheck;

/// Severity switches for the configurable checks. `None` disables a check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationOptions {
    pub nullable: Option<Severity>,
    pub explicit_binding_conflicts_with_inject: Option<Severity>,
    pub orphaned_module: Option<Severity>,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            nullable: Some(Severity::Error),
            explicit_binding_conflicts_with_inject: None,
            orphaned_module: Some(Severity::Warning),
        }
    }
}

/// Inputs shared by every check.
pub struct CheckContext<'g> {
    pub graph: &'g BindingGraph,
    pub reach: Reachability,
    pub options: &'g ValidationOptions,
}

impl CheckContext<'_> {
    /// Entry point that first reaches `key`, or the component when none does.
    pub fn anchor(&self, key: &BindingKey) -> DeclarationId {
        self.reach
            .trace(key)
            .0
            .and_then(|i| self.graph.entry_points().get(i))
            .map(|entry| entry.id.clone())
            .unwrap_or_else(|| self.graph.component().id.clone())
    }

    /// `entry requires A requires B` down to `key`.
    pub fn request_chain(&self, key: &BindingKey) -> String {
        let (entry, chain) = self.reach.trace(key);
        let mut steps: Vec<String> = Vec::with_capacity(chain.len() + 1);
        if let Some(entry) = entry.and_then(|i| self.graph.entry_points().get(i)) {
            steps.push(entry.id.to_string());
        }
        steps.extend(chain.iter().map(ToString::to_string));
        steps.join(" requires ")
    }

    /// Origin of the binding that requested `key` on its shortest chain.
    pub fn requesting_declaration(&self, key: &BindingKey) -> Option<DeclarationId> {
        let requester = self.reach.requester(key)?;
        self.graph.binding(requester).map(|b| b.origin.clone())
    }

    /// Human-readable component description for messages.
    pub fn component_description(&self) -> String {
        let component = self.graph.component();
        if component.scopes.is_empty() {
            format!("{} (unscoped)", component.name())
        } else {
            let scopes: Vec<String> = component.scopes.iter().map(ToString::to_string).collect();
            format!("{} (scoped {})", component.name(), scopes.join(" "))
        }
    }
}

/// One diagnostic plus its sort position.
#[derive(Debug, Clone)]
pub struct Finding {
    pub entry: usize,
    pub key: String,
    pub diagnostic: Diagnostic,
}

impl Finding {
    /// A finding about the component itself.
    pub fn component(diagnostic: Diagnostic) -> Self {
        Self {
            entry: 0,
            key: String::new(),
            diagnostic,
        }
    }

    /// A finding about `key`.
    pub fn at_key(context: &CheckContext<'_>, key: &BindingKey, diagnostic: Diagnostic) -> Self {
        Self {
            entry: context.reach.entry_of(key),
            key: key.canonical(),
            diagnostic,
        }
    }
}

/// A structural check over one binding graph.
pub trait GraphCheck: Send + Sync {
    fn name(&self) -> &'static str;

    fn check(&self, context: &CheckContext<'_>, findings: &mut Vec<Finding>);
}

/// Runs the check battery over graphs.
pub struct Validator {
    checks: Vec<Box<dyn GraphCheck>>,
    options: ValidationOptions,
}

impl Validator {
    /// Validator with the standard battery.
    pub fn new(options: ValidationOptions) -> Self {
        Self {
            checks: vec![
                Box::new(MissingBindingCheck),
                Box::new(DuplicateBindingCheck),
                Box::new(KindConflictCheck),
                Box::new(CycleCheck),
                Box::new(ScopeCheck),
                Box::new(NullabilityCheck),
                Box::new(InjectionConflictCheck),
            ],
            options,
        }
    }

    /// Adds a check after the standard battery.
    pub fn with_check(mut self, check: Box<dyn GraphCheck>) -> Self {
        self.checks.push(check);
        self
    }

    pub fn options(&self) -> &ValidationOptions {
        &self.options
    }

    /// Validates one graph, returning diagnostics in stable order.
    ///
    /// Malformed implicit declarations recorded while building are included.
    pub fn validate(&self, graph: &BindingGraph) -> Vec<Diagnostic> {
        let context = CheckContext {
            graph,
            reach: Reachability::compute(graph),
            options: &self.options,
        };

        let mut findings: Vec<Finding> = graph
            .construction_diagnostics()
            .iter()
            .map(|d| Finding {
                entry: 0,
                key: d.declaration.to_string(),
                diagnostic: d.clone(),
            })
            .collect();

        for check in &self.checks {
            let before = findings.len();
            check.check(&context, &mut findings);
            debug!(
                component = %graph.path(),
                check = check.name(),
                findings = findings.len() - before,
                "ran graph check"
            );
        }

        findings.sort_by(|a, b| {
            (a.entry, &a.key, a.diagnostic.kind).cmp(&(b.entry, &b.key, b.diagnostic.kind))
        });
        findings.into_iter().map(|f| f.diagnostic).collect()
    }
}

/// Validates `graph` with the standard battery.
pub fn validate(graph: &BindingGraph, options: &ValidationOptions) -> Vec<Diagnostic> {
    Validator::new(options.clone()).validate(graph)
}
