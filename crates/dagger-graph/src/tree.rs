//! Component hierarchies.
//!
//! A root component and its subcomponents form a tree. Each node is parsed
//! and built in isolation; a subcomponent sees its ancestors only through
//! their published, read-only graphs.

use std::sync::Arc;

use indexmap::IndexSet;

use dagger_model::component::ComponentPath;
use dagger_model::declaration::{ComponentDecl, DeclarationIndex, Lookup};
use dagger_model::error::{Diagnostic, ErrorKind};
use dagger_model::foundation::DeclarationId;
use dagger_model::parse::{DeclarationError, Deferred, ParseOptions, parse_component};

use crate::builder::build_graph;
use crate::graph::BindingGraph;

/// State of one component in the tree.
#[derive(Debug, Clone)]
pub enum TreeNode {
    Built(Arc<BindingGraph>),
    /// The component declaration (or a module it installs) is malformed.
    Malformed(Vec<Diagnostic>),
    Deferred(Deferred),
}

/// A component and the subcomponents reachable from it.
///
/// Children are only present when the node itself was built.
#[derive(Debug, Clone)]
pub struct ComponentTree {
    pub path: ComponentPath,
    pub node: TreeNode,
    pub children: Vec<ComponentTree>,
}

impl ComponentTree {
    fn leaf(path: ComponentPath, node: TreeNode) -> Self {
        Self {
            path,
            node,
            children: Vec::new(),
        }
    }

    pub fn graph(&self) -> Option<&Arc<BindingGraph>> {
        match &self.node {
            TreeNode::Built(graph) => Some(graph),
            _ => None,
        }
    }

    /// All nodes in pre-order (parents before children).
    pub fn walk(&self) -> Vec<&ComponentTree> {
        let mut nodes = vec![self];
        for child in &self.children {
            nodes.extend(child.walk());
        }
        nodes
    }

    /// Declarations used by this component or any of its descendants.
    pub fn used_declarations(&self) -> IndexSet<DeclarationId> {
        let mut used = IndexSet::new();
        for node in self.walk() {
            if let Some(graph) = node.graph() {
                used.extend(graph.used_declarations().iter().cloned());
            }
        }
        used
    }
}

/// Parses and builds `root` and every subcomponent below it.
pub fn build_tree(
    root: &ComponentDecl,
    index: &DeclarationIndex<'_>,
    options: ParseOptions,
) -> ComponentTree {
    build_node(root, ComponentPath::root(&root.name), None, index, options)
}

fn build_node(
    decl: &ComponentDecl,
    path: ComponentPath,
    parent: Option<Arc<BindingGraph>>,
    index: &DeclarationIndex<'_>,
    options: ParseOptions,
) -> ComponentTree {
    let spec = match parse_component(decl, index, options) {
        Ok(spec) => Arc::new(spec),
        Err(DeclarationError::Malformed(diagnostics)) => {
            return ComponentTree::leaf(path, TreeNode::Malformed(diagnostics));
        }
        Err(DeclarationError::Deferred(deferred)) => {
            return ComponentTree::leaf(path, TreeNode::Deferred(deferred));
        }
    };
    let graph = match build_graph(Arc::clone(&spec), path.clone(), parent, index) {
        Ok(graph) => Arc::new(graph),
        Err(deferred) => return ComponentTree::leaf(path, TreeNode::Deferred(deferred)),
    };

    let children = spec
        .subcomponents
        .iter()
        .map(|sub| {
            let child_path = path.child(&sub.name);
            if path.contains(&sub.name) {
                let diagnostic = Diagnostic::new(
                    ErrorKind::MalformedDeclaration,
                    DeclarationId::of_type(&sub.name),
                    format!("{} is installed as a subcomponent of itself through {}", sub.name, path),
                );
                return ComponentTree::leaf(child_path, TreeNode::Malformed(vec![diagnostic]));
            }
            match index.component(&sub.name) {
                Lookup::Found(child) => {
                    build_node(child, child_path, Some(Arc::clone(&graph)), index, options)
                }
                Lookup::Unresolved | Lookup::Absent => ComponentTree::leaf(
                    child_path,
                    TreeNode::Deferred(Deferred::new(spec.id.clone(), &sub.name)),
                ),
            }
        })
        .collect();

    ComponentTree {
        path,
        node: TreeNode::Built(graph),
        children,
    }
}
