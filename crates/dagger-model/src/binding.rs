//! Binding declarations and resolved bindings.
//!
//! A [`BindingDeclaration`] is what a module method declares. A [`Binding`]
//! is a node of a component's binding graph: how to produce an instance for
//! one [`BindingKey`]. Bindings are immutable once created and shared as
//! `Arc<Binding>` between a component graph and its descendants.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::declaration::MapKey;
use crate::foundation::{BindingKey, DeclarationId, DependencyRequest, Scope};

/// What a module method declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DeclarationKind {
    /// `@Provides`
    Provision,
    /// `@Binds`
    Delegate,
    /// `@Multibinds`
    Multibinds,
    /// `@BindsOptionalOf`
    OptionalDeclaration,
    /// Entry of a module's `subcomponents` list.
    SubcomponentCreator,
}

/// How a declaration contributes to its key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ContributionType {
    #[default]
    Unique,
    IntoSet,
    ElementsIntoSet,
    IntoMap,
}

impl ContributionType {
    pub fn is_multibinding(self) -> bool {
        self != ContributionType::Unique
    }
}

/// One binding declared by a module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BindingDeclaration {
    pub id: DeclarationId,
    /// Declaring module.
    pub module: String,
    pub kind: DeclarationKind,
    /// For contributions, the aggregate `Set`/`Map` key.
    pub key: BindingKey,
    #[serde(default)]
    pub contribution: ContributionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub map_key: Option<MapKey>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<Scope>,
    #[serde(default)]
    pub dependencies: Vec<DependencyRequest>,
    #[serde(default)]
    pub nullable: bool,
}

impl BindingDeclaration {
    /// Key of the graph node this declaration becomes.
    pub fn node_key(&self) -> BindingKey {
        if self.contribution.is_multibinding() {
            self.key.with_contribution(self.id.clone())
        } else {
            self.key.clone()
        }
    }

    /// Declares a binding that can satisfy a key on its own (not a
    /// contribution, multibinding declaration or optional declaration).
    pub fn is_unique_binding(&self) -> bool {
        !self.contribution.is_multibinding()
            && matches!(
                self.kind,
                DeclarationKind::Provision
                    | DeclarationKind::Delegate
                    | DeclarationKind::SubcomponentCreator
            )
    }
}

/// How a resolved binding produces its instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BindingKind {
    /// `@Inject` constructor.
    Injection,
    /// `@Provides` method.
    Provision,
    /// `@Binds` method.
    Delegate,
    MultiboundSet,
    MultiboundMap,
    /// Provision method of a component dependency.
    ComponentProvision,
    /// A component dependency instance.
    ComponentDependency,
    /// A component bound to itself.
    Component,
    SubcomponentCreator,
    /// `@BindsInstance` creator parameter.
    BoundInstance,
    /// `MembersInjector<T>` for an injectable type.
    MembersInjector,
    /// `Optional<T>` from `@BindsOptionalOf`.
    Optional,
}

impl BindingKind {
    /// Whether instances come from a user-written method or constructor.
    pub fn has_factory(self) -> bool {
        matches!(
            self,
            BindingKind::Injection | BindingKind::Provision | BindingKind::MembersInjector
        )
    }
}

impl fmt::Display for BindingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BindingKind::Injection => "constructor injection",
            BindingKind::Provision => "provision method",
            BindingKind::Delegate => "binds delegation",
            BindingKind::MultiboundSet => "multibound set",
            BindingKind::MultiboundMap => "multibound map",
            BindingKind::ComponentProvision => "component dependency provision",
            BindingKind::ComponentDependency => "component dependency",
            BindingKind::Component => "component",
            BindingKind::SubcomponentCreator => "subcomponent creator",
            BindingKind::BoundInstance => "bound instance",
            BindingKind::MembersInjector => "members injector",
            BindingKind::Optional => "optional",
        };
        f.write_str(name)
    }
}

/// A resolved node of a binding graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Binding {
    pub key: BindingKey,
    pub kind: BindingKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<Scope>,
    pub dependencies: Vec<DependencyRequest>,
    /// Originating declaration, used for diagnostics.
    pub origin: DeclarationId,
    /// Declaring module for module bindings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    #[serde(default)]
    pub contribution: ContributionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub map_key: Option<MapKey>,
    #[serde(default)]
    pub nullable: bool,
}

impl Binding {
    pub fn new(key: BindingKey, kind: BindingKind, origin: DeclarationId) -> Self {
        Self {
            key,
            kind,
            scope: None,
            dependencies: Vec::new(),
            origin,
            module: None,
            contribution: ContributionType::Unique,
            map_key: None,
            nullable: false,
        }
    }

    /// Binding realising one module declaration.
    pub fn from_declaration(declaration: &BindingDeclaration) -> Self {
        let kind = match declaration.kind {
            DeclarationKind::Provision => BindingKind::Provision,
            DeclarationKind::Delegate => BindingKind::Delegate,
            DeclarationKind::SubcomponentCreator => BindingKind::SubcomponentCreator,
            DeclarationKind::OptionalDeclaration => BindingKind::Optional,
            DeclarationKind::Multibinds => {
                if declaration.key.ty.is_map() {
                    BindingKind::MultiboundMap
                } else {
                    BindingKind::MultiboundSet
                }
            }
        };
        Self {
            key: declaration.node_key(),
            kind,
            scope: declaration.scope.clone(),
            dependencies: declaration.dependencies.clone(),
            origin: declaration.id.clone(),
            module: Some(declaration.module.clone()),
            contribution: declaration.contribution,
            map_key: declaration.map_key.clone(),
            nullable: declaration.nullable,
        }
    }

    pub fn with_scope(mut self, scope: Option<Scope>) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_dependencies(mut self, dependencies: Vec<DependencyRequest>) -> Self {
        self.dependencies = dependencies;
        self
    }

    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    pub fn is_scoped(&self) -> bool {
        self.scope.is_some()
    }

    /// Scoped with a scope other than `@Reusable`.
    pub fn is_strictly_scoped(&self) -> bool {
        self.scope.as_ref().is_some_and(|s| !s.is_reusable())
    }

    pub fn is_multibinding(&self) -> bool {
        matches!(self.kind, BindingKind::MultiboundSet | BindingKind::MultiboundMap)
    }
}
