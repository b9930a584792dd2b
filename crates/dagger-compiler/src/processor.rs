//! Round-based processing.
//!
//! The host toolchain hands declarations over in rounds. A component whose
//! declarations are not all resolved yet is deferred and rebuilt from
//! scratch in a later round; every other component is processed exactly
//! once. On the final round, anything still deferred is reported as an
//! [`ErrorKind::UnresolvedDeclaration`].

use indexmap::IndexSet;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use dagger_codegen::{CodegenOptions, ComponentImplementation, generate};
use dagger_graph::{
    ComponentTree, TreeNode, ValidationOptions, build_tree, validate, validate_orphaned_modules,
};
use dagger_model::component::ComponentPath;
use dagger_model::declaration::{ComponentDecl, DeclarationIndex, DeclarationSet};
use dagger_model::error::{Diagnostic, DiagnosticFormatter, ErrorKind, has_errors};
use dagger_model::foundation::DeclarationId;
use dagger_model::parse::Deferred;

use crate::options::CompilerOptions;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RoundKind {
    /// More declarations may arrive in a later round.
    Intermediate,
    /// No further rounds follow.
    Final,
}

/// Result of processing one component.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", tag = "status")]
pub enum ComponentOutcome {
    Generated {
        implementation: ComponentImplementation,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        warnings: Vec<Diagnostic>,
    },
    Failed {
        diagnostics: Vec<Diagnostic>,
    },
    /// Retried in the next round.
    Deferred {
        element: DeclarationId,
        awaiting: String,
    },
}

impl ComponentOutcome {
    fn deferred(deferred: &Deferred) -> Self {
        ComponentOutcome::Deferred {
            element: deferred.element.clone(),
            awaiting: deferred.awaiting.clone(),
        }
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        match self {
            ComponentOutcome::Generated { warnings, .. } => warnings,
            ComponentOutcome::Failed { diagnostics } => diagnostics,
            ComponentOutcome::Deferred { .. } => &[],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentReport {
    pub path: ComponentPath,
    #[serde(flatten)]
    pub outcome: ComponentOutcome,
}

/// Everything one round produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundReport {
    pub round: usize,
    pub kind: RoundKind,
    /// Per component path, root components in declaration order and each
    /// root's subcomponents in pre-order.
    pub components: Vec<ComponentReport>,
    /// Diagnostics first reported in this round.
    pub diagnostics: Vec<Diagnostic>,
}

impl RoundReport {
    pub fn has_errors(&self) -> bool {
        has_errors(&self.diagnostics)
            || self
                .components
                .iter()
                .any(|c| matches!(c.outcome, ComponentOutcome::Failed { .. }))
    }

    pub fn outcome(&self, path: &ComponentPath) -> Option<&ComponentOutcome> {
        self.components
            .iter()
            .find(|c| &c.path == path)
            .map(|c| &c.outcome)
    }

    pub fn implementations(&self) -> impl Iterator<Item = &ComponentImplementation> {
        self.components.iter().filter_map(|c| match &c.outcome {
            ComponentOutcome::Generated { implementation, .. } => Some(implementation),
            _ => None,
        })
    }

    pub fn deferred(&self) -> impl Iterator<Item = &ComponentReport> {
        self.components
            .iter()
            .filter(|c| matches!(c.outcome, ComponentOutcome::Deferred { .. }))
    }

    pub fn format_diagnostics(&self) -> String {
        DiagnosticFormatter::new().format_all(&self.diagnostics)
    }
}

/// Processing state of one compilation invocation.
#[derive(Debug)]
pub struct Processor {
    options: CompilerOptions,
    declarations: DeclarationSet,
    /// Root components that were generated or failed.
    finished: IndexSet<String>,
    emitted: Vec<Diagnostic>,
    round: usize,
}

/// Outcome of one root component and its subcomponents.
struct RootResult {
    root: String,
    reports: Vec<ComponentReport>,
    deferred: bool,
}

impl Processor {
    pub fn new(options: CompilerOptions) -> Self {
        Self {
            options,
            declarations: DeclarationSet::new(),
            finished: IndexSet::new(),
            emitted: Vec::new(),
            round: 0,
        }
    }

    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    /// Declarations accumulated over all rounds so far.
    pub fn declarations(&self) -> &DeclarationSet {
        &self.declarations
    }

    pub fn rounds(&self) -> usize {
        self.round
    }

    pub fn is_finished(&self, component: &str) -> bool {
        self.finished.contains(component)
    }

    /// Merges `declarations` and processes every root component that has
    /// not been generated or failed yet.
    #[instrument(skip_all, fields(round = self.round + 1, kind = ?kind))]
    pub fn process_round(&mut self, declarations: DeclarationSet, kind: RoundKind) -> RoundReport {
        self.round += 1;
        self.declarations.merge(declarations);

        let index = self.declarations.index();
        let pending: Vec<&ComponentDecl> = index
            .root_components()
            .filter(|c| !self.finished.contains(&c.name))
            .collect();
        debug!(components = pending.len(), "processing root components");

        let options = &self.options;
        let results: Vec<RootResult> = if options.parallel_components {
            pending
                .par_iter()
                .map(|root| process_root(root, &index, options, kind))
                .collect()
        } else {
            pending
                .iter()
                .map(|root| process_root(root, &index, options, kind))
                .collect()
        };

        let mut components = Vec::new();
        let mut diagnostics = Vec::new();
        for result in results {
            if !result.deferred {
                self.finished.insert(result.root);
            }
            for report in result.reports {
                for diagnostic in report.outcome.diagnostics() {
                    if !self.emitted.contains(diagnostic) {
                        self.emitted.push(diagnostic.clone());
                        diagnostics.push(diagnostic.clone());
                    }
                }
                components.push(report);
            }
        }

        let report = RoundReport {
            round: self.round,
            kind,
            components,
            diagnostics,
        };
        info!(
            generated = report.implementations().count(),
            deferred = report.deferred().count(),
            diagnostics = report.diagnostics.len(),
            "round complete"
        );
        report
    }
}

fn process_root(
    root: &ComponentDecl,
    index: &DeclarationIndex<'_>,
    options: &CompilerOptions,
    kind: RoundKind,
) -> RootResult {
    let tree = build_tree(root, index, options.parse());
    let nodes = tree.walk();

    if kind == RoundKind::Intermediate
        && let Some(deferred) = nodes.iter().find_map(|n| match &n.node {
            TreeNode::Deferred(deferred) => Some(deferred),
            _ => None,
        })
    {
        debug!(component = %root.name, awaiting = %deferred.awaiting, "deferred");
        return RootResult {
            root: root.name.clone(),
            reports: vec![ComponentReport {
                path: tree.path.clone(),
                outcome: ComponentOutcome::deferred(deferred),
            }],
            deferred: true,
        };
    }

    let validation = options.validation();
    let orphaned = validate_orphaned_modules(&tree, &validation);
    let codegen = options.codegen();

    let reports = nodes
        .into_iter()
        .map(|node| {
            let outcome = process_node(node, &orphaned, &validation, &codegen);
            ComponentReport {
                path: node.path.clone(),
                outcome,
            }
        })
        .collect();

    RootResult {
        root: root.name.clone(),
        reports,
        deferred: false,
    }
}

fn process_node(
    node: &ComponentTree,
    orphaned: &[(ComponentPath, Diagnostic)],
    validation: &ValidationOptions,
    codegen: &CodegenOptions,
) -> ComponentOutcome {
    let graph = match &node.node {
        TreeNode::Built(graph) => graph,
        TreeNode::Malformed(diagnostics) => {
            return ComponentOutcome::Failed {
                diagnostics: diagnostics.clone(),
            };
        }
        TreeNode::Deferred(deferred) => {
            return ComponentOutcome::Failed {
                diagnostics: vec![unresolved(deferred)],
            };
        }
    };

    let mut diagnostics = validate(graph, validation);
    diagnostics.extend(
        orphaned
            .iter()
            .filter(|(path, _)| path == &node.path)
            .map(|(_, diagnostic)| diagnostic.clone()),
    );
    if has_errors(&diagnostics) {
        debug!(component = %node.path, "validation failed");
        return ComponentOutcome::Failed { diagnostics };
    }

    match generate(graph, codegen) {
        Ok(implementation) => ComponentOutcome::Generated {
            implementation,
            warnings: diagnostics,
        },
        Err(e) => {
            warn!(component = %node.path, error = %e, "code generation failed");
            diagnostics.push(Diagnostic::new(
                ErrorKind::Internal,
                graph.component().id.clone(),
                e.to_string(),
            ));
            ComponentOutcome::Failed { diagnostics }
        }
    }
}

fn unresolved(deferred: &Deferred) -> Diagnostic {
    Diagnostic::new(
        ErrorKind::UnresolvedDeclaration,
        deferred.element.clone(),
        format!(
            "{} could not be processed because {} was never resolved",
            deferred.element, deferred.awaiting
        ),
    )
}

/// Processes `declarations` in a single, final round.
pub fn compile(declarations: &DeclarationSet, options: &CompilerOptions) -> RoundReport {
    Processor::new(options.clone()).process_round(declarations.clone(), RoundKind::Final)
}
