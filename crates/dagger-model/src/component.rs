//! Parsed component and module specifications.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::binding::BindingDeclaration;
use crate::declaration::CreatorKind;
use crate::foundation::{BindingKey, DeclarationId, DependencyRequest, Scope, TypeRef};

/// A parsed `@Module` with its binding declarations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleSpec {
    pub name: String,
    pub declarations: Vec<BindingDeclaration>,
    /// Directly included modules.
    pub includes: Vec<String>,
}

impl ModuleSpec {
    pub fn id(&self) -> DeclarationId {
        DeclarationId::of_type(&self.name)
    }

    /// Modules with no declarations are never reported as orphaned.
    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }
}

/// Root component or subcomponent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ComponentLevel {
    Root,
    Subcomponent,
}

/// What an entry point method asks of the component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EntryPointKind {
    /// `Foo foo()`
    Provision(DependencyRequest),
    /// `void inject(Foo)` or `Foo inject(Foo)`
    MembersInjection(TypeRef),
    /// `ChildComponent child(SomeModule)` on the parent.
    SubcomponentFactory(String),
}

/// One entry point of a component, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryPoint {
    pub id: DeclarationId,
    pub name: String,
    pub kind: EntryPointKind,
}

impl EntryPoint {
    /// Key resolved for this entry point, if it requests one.
    pub fn request(&self) -> Option<DependencyRequest> {
        match &self.kind {
            EntryPointKind::Provision(request) => Some(request.clone()),
            EntryPointKind::MembersInjection(ty) => Some(DependencyRequest::instance(
                BindingKey::of(TypeRef::members_injector_of(ty.clone())),
            )),
            EntryPointKind::SubcomponentFactory(_) => None,
        }
    }
}

/// A provision method of a component dependency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyProvision {
    pub id: DeclarationId,
    pub key: BindingKey,
    #[serde(default)]
    pub nullable: bool,
}

/// A component dependency (`@Component(dependencies = ...)`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentDependency {
    #[serde(rename = "type")]
    pub ty: TypeRef,
    pub provisions: Vec<DependencyProvision>,
}

/// A `@BindsInstance` creator parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundInstance {
    pub id: DeclarationId,
    pub key: BindingKey,
    #[serde(default)]
    pub nullable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatorSpec {
    #[serde(rename = "type")]
    pub ty: TypeRef,
    pub kind: CreatorKind,
}

/// How a subcomponent is reached from its parent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SubcomponentSource {
    /// Listed in an installed module's `subcomponents`.
    Module(String),
    /// Returned by a factory method of the parent.
    FactoryMethod(DeclarationId),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubcomponentRef {
    pub name: String,
    pub source: SubcomponentSource,
}

/// A fully parsed component, ready for graph building.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentSpec {
    pub id: DeclarationId,
    #[serde(rename = "type")]
    pub ty: TypeRef,
    pub level: ComponentLevel,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scopes: Vec<Scope>,
    /// Installed modules, transitive includes flattened, first occurrence wins.
    pub modules: Vec<ModuleSpec>,
    pub entry_points: Vec<EntryPoint>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<ComponentDependency>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bound_instances: Vec<BoundInstance>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creator: Option<CreatorSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subcomponents: Vec<SubcomponentRef>,
}

impl ComponentSpec {
    pub fn name(&self) -> &str {
        self.ty.name()
    }

    pub fn simple_name(&self) -> &str {
        self.ty.simple_name()
    }

    pub fn has_scope(&self, scope: &Scope) -> bool {
        self.scopes.contains(scope)
    }

    pub fn declarations(&self) -> impl Iterator<Item = &BindingDeclaration> {
        self.modules.iter().flat_map(|m| m.declarations.iter())
    }
}

/// Path of a component from its root, e.g. `app.AppComponent/app.UserComponent`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComponentPath(pub Vec<String>);

impl ComponentPath {
    pub fn root(name: impl Into<String>) -> Self {
        Self(vec![name.into()])
    }

    pub fn child(&self, name: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(name.into());
        Self(segments)
    }

    pub fn leaf(&self) -> &str {
        self.0.last().map(String::as_str).unwrap_or_default()
    }

    pub fn depth(&self) -> usize {
        self.0.len()
    }

    pub fn is_root(&self) -> bool {
        self.0.len() == 1
    }

    /// Whether `name` already appears on this path.
    pub fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|s| s == name)
    }
}

impl fmt::Display for ComponentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_component_path() {
        let root = ComponentPath::root("app.AppComponent");
        let child = root.child("app.UserComponent");
        assert_eq!(child.to_string(), "app.AppComponent/app.UserComponent");
        assert_eq!(child.leaf(), "app.UserComponent");
        assert!(child.contains("app.AppComponent"));
        assert!(root.is_root());
        assert!(!child.is_root());
    }

    #[test]
    fn test_members_injection_entry_point_request() {
        let entry = EntryPoint {
            id: DeclarationId::member("app.C", "inject(app.Activity)"),
            name: "inject".to_string(),
            kind: EntryPointKind::MembersInjection(TypeRef::named("app.Activity")),
        };
        let request = entry.request().unwrap();
        assert!(request.key.ty.is_members_injector());
    }
}
