//! Annotated declaration records supplied by the host compiler.
//!
//! These records are the raw, strongly-typed input of the compiler. They are
//! produced once per round from the host toolchain's symbol API (or loaded
//! from a manifest) and are never mutated by later phases. Annotations are
//! represented as closed marker variants plus the open qualifier, scope and
//! map-key lists rather than as reflected metadata.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::foundation::{DeclarationId, Qualifier, Scope, TypeRef};

/// Framework annotations with no arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Marker {
    Inject,
    Provides,
    Binds,
    IntoSet,
    ElementsIntoSet,
    IntoMap,
    Multibinds,
    BindsOptionalOf,
    BindsInstance,
    Nullable,
}

/// A map-key annotation on an `@IntoMap` contribution, e.g. `@StringKey("a")`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapKey {
    /// Annotation name without `@`.
    pub annotation: String,
    /// Source form of the annotation value.
    pub value: String,
    /// Key type for custom map-key annotations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_type: Option<TypeRef>,
}

impl MapKey {
    pub fn new(annotation: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            annotation: annotation.into().trim_start_matches('@').to_string(),
            value: value.into(),
            key_type: None,
        }
    }

    /// The `K` of the `Map<K, V>` this key contributes to.
    pub fn key_type(&self) -> TypeRef {
        if let Some(ty) = &self.key_type {
            return ty.clone();
        }
        match self.annotation.as_str() {
            "StringKey" | "dagger.multibindings.StringKey" => TypeRef::named("java.lang.String"),
            "IntKey" | "dagger.multibindings.IntKey" => TypeRef::named("java.lang.Integer"),
            "LongKey" | "dagger.multibindings.LongKey" => TypeRef::named("java.lang.Long"),
            "ClassKey" | "dagger.multibindings.ClassKey" => {
                TypeRef::generic("java.lang.Class", vec![TypeRef::named("?")])
            }
            "LazyClassKey" | "dagger.multibindings.LazyClassKey" => {
                TypeRef::generic("java.lang.Class", vec![TypeRef::named("?")])
            }
            other => TypeRef::named(other),
        }
    }

    /// `@LazyClassKey` names its class by string, so the class is not
    /// loaded until the map is queried.
    pub fn is_lazy_class_key(&self) -> bool {
        matches!(
            self.annotation.as_str(),
            "LazyClassKey" | "dagger.multibindings.LazyClassKey"
        )
    }

    pub fn is_class_key(&self) -> bool {
        self.is_lazy_class_key()
            || matches!(
                self.annotation.as_str(),
                "ClassKey" | "dagger.multibindings.ClassKey"
            )
    }

    /// Class named by a `@ClassKey` or `@LazyClassKey` value, without the
    /// `.class` suffix.
    pub fn class_name(&self) -> Option<&str> {
        if !self.is_class_key() {
            return None;
        }
        let name = self.value.trim();
        let name = name.strip_suffix(".class").unwrap_or(name);
        Some(name).filter(|n| !n.is_empty() && !n.contains('"'))
    }

    /// Form under which two keys select the same map entry: class keys
    /// compare by class name, whether lazy or not.
    pub fn canonical(&self) -> MapKey {
        match self.class_name() {
            Some(class) => MapKey::new("ClassKey", class),
            None => self.clone(),
        }
    }
}

impl std::fmt::Display for MapKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "@{}({})", self.annotation, self.value)
    }
}

/// Annotations attached to one declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Annotations {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub annotations: Vec<Marker>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub qualifiers: Vec<Qualifier>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scopes: Vec<Scope>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub map_keys: Vec<MapKey>,
}

impl Annotations {
    pub fn has(&self, marker: Marker) -> bool {
        self.annotations.contains(&marker)
    }

    /// The single qualifier, if exactly zero or one is present.
    pub fn qualifier(&self) -> Option<Qualifier> {
        self.qualifiers.first().cloned()
    }

    pub fn scope(&self) -> Option<Scope> {
        self.scopes.first().cloned()
    }

    pub fn is_nullable(&self) -> bool {
        self.has(Marker::Nullable)
    }
}

/// A method or constructor parameter, or an injected field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamDecl {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeRef,
    #[serde(flatten)]
    pub annotations: Annotations,
}

impl ParamDecl {
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            ty,
            annotations: Annotations::default(),
        }
    }
}

/// A method declared on a module, component, entry point or type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodDecl {
    pub name: String,
    #[serde(flatten)]
    pub annotations: Annotations,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<ParamDecl>,
    /// Return type; `None` is `void`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub returns: Option<TypeRef>,
    #[serde(default, rename = "abstract")]
    pub is_abstract: bool,
}

impl MethodDecl {
    /// Member signature, e.g. `provideFoo(app.Bar)`.
    pub fn signature(&self) -> String {
        let params = self
            .params
            .iter()
            .map(|p| p.ty.to_string())
            .collect::<Vec<_>>()
            .join(",");
        format!("{}({})", self.name, params)
    }

    pub fn id(&self, owner: &str) -> DeclarationId {
        DeclarationId::member(owner, self.signature())
    }
}

/// Class versus interface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TypeKind {
    #[default]
    Class,
    AbstractClass,
    Interface,
}

/// A type known to the symbol table: injectable classes, component
/// dependencies, and plain supertypes used for assignability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeDecl {
    pub name: String,
    #[serde(default)]
    pub kind: TypeKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub supertypes: Vec<TypeRef>,
    #[serde(flatten)]
    pub annotations: Annotations,
    /// Parameters of the `@Inject` constructor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inject: Option<Vec<ParamDecl>>,
    /// `@Inject` fields and single-parameter methods.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub members: Vec<ParamDecl>,
    /// Methods visible to a component depending on this type.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub methods: Vec<MethodDecl>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub install_binding: Option<InstallBinding>,
    /// `false` while the type is still being generated by another processor.
    #[serde(default = "resolved_default")]
    pub resolved: bool,
}

/// `@InstallBinding`: binds a type to one of its supertypes in a component
/// without a hand-written module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallBinding {
    pub component: String,
    /// Required when the type has more than one supertype.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bound_type: Option<TypeRef>,
}

impl TypeDecl {
    pub fn is_abstract(&self) -> bool {
        self.kind != TypeKind::Class
    }

    pub fn id(&self) -> DeclarationId {
        DeclarationId::of_type(&self.name)
    }

    pub fn constructor_id(&self) -> DeclarationId {
        let params = self
            .inject
            .iter()
            .flatten()
            .map(|p| p.ty.to_string())
            .collect::<Vec<_>>()
            .join(",");
        DeclarationId::member(&self.name, format!("<init>({})", params))
    }
}

/// A `@Module`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleDecl {
    pub name: String,
    #[serde(default)]
    pub methods: Vec<MethodDecl>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub includes: Vec<String>,
    /// Subcomponents whose creators this module makes injectable.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subcomponents: Vec<String>,
    /// Components this module is aggregated into (`@InstallIn`).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub install_in: Vec<String>,
    #[serde(default = "resolved_default")]
    pub resolved: bool,
}

impl ModuleDecl {
    pub fn id(&self) -> DeclarationId {
        DeclarationId::of_type(&self.name)
    }
}

/// `@Component` or `@Subcomponent`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ComponentKind {
    #[default]
    Component,
    Subcomponent,
}

/// Builder or factory creator of a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CreatorKind {
    Builder,
    Factory,
}

/// A nested `@Component.Builder` / `@Component.Factory`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatorDecl {
    pub name: String,
    pub kind: CreatorKind,
    /// Setter or factory-method parameters.
    #[serde(default)]
    pub params: Vec<ParamDecl>,
}

/// A component or subcomponent interface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentDecl {
    pub name: String,
    #[serde(default)]
    pub kind: ComponentKind,
    #[serde(flatten)]
    pub annotations: Annotations,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub modules: Vec<String>,
    /// Component dependencies (root components only).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub methods: Vec<MethodDecl>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creator: Option<CreatorDecl>,
    #[serde(default = "resolved_default")]
    pub resolved: bool,
}

impl ComponentDecl {
    pub fn id(&self) -> DeclarationId {
        DeclarationId::of_type(&self.name)
    }

    pub fn is_root(&self) -> bool {
        self.kind == ComponentKind::Component
    }
}

/// A Hilt-style entry point interface aggregated into components.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryPointDecl {
    pub name: String,
    pub install_in: Vec<String>,
    #[serde(default)]
    pub methods: Vec<MethodDecl>,
}

fn resolved_default() -> bool {
    true
}

/// All declarations visible in one processing round.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeclarationSet {
    #[serde(default)]
    pub types: Vec<TypeDecl>,
    #[serde(default)]
    pub modules: Vec<ModuleDecl>,
    #[serde(default)]
    pub components: Vec<ComponentDecl>,
    #[serde(default)]
    pub entry_points: Vec<EntryPointDecl>,
}

impl DeclarationSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
            && self.modules.is_empty()
            && self.components.is_empty()
            && self.entry_points.is_empty()
    }

    /// Merges declarations from a later round.
    ///
    /// Declarations with a name already present replace the earlier record
    /// (a later round can only know more about a type); new names are
    /// appended in order.
    pub fn merge(&mut self, other: DeclarationSet) {
        merge_by_name(&mut self.types, other.types, |t| &t.name);
        merge_by_name(&mut self.modules, other.modules, |m| &m.name);
        merge_by_name(&mut self.components, other.components, |c| &c.name);
        merge_by_name(&mut self.entry_points, other.entry_points, |e| &e.name);
    }

    /// Builds the name index used by parsing and graph building.
    pub fn index(&self) -> DeclarationIndex<'_> {
        DeclarationIndex {
            types: self.types.iter().map(|t| (t.name.as_str(), t)).collect(),
            modules: self.modules.iter().map(|m| (m.name.as_str(), m)).collect(),
            components: self
                .components
                .iter()
                .map(|c| (c.name.as_str(), c))
                .collect(),
            entry_points: &self.entry_points,
        }
    }
}

fn merge_by_name<T>(existing: &mut Vec<T>, incoming: Vec<T>, name: impl Fn(&T) -> &String) {
    for item in incoming {
        match existing.iter().position(|e| name(e) == name(&item)) {
            Some(pos) => existing[pos] = item,
            None => existing.push(item),
        }
    }
}

/// Whether a looked-up declaration is usable yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup<T> {
    Found(T),
    /// Declared but still being generated.
    Unresolved,
    Absent,
}

/// Read-only symbol table over a [`DeclarationSet`].
#[derive(Debug, Clone)]
pub struct DeclarationIndex<'a> {
    types: IndexMap<&'a str, &'a TypeDecl>,
    modules: IndexMap<&'a str, &'a ModuleDecl>,
    components: IndexMap<&'a str, &'a ComponentDecl>,
    entry_points: &'a [EntryPointDecl],
}

impl<'a> DeclarationIndex<'a> {
    pub fn ty(&self, name: &str) -> Lookup<&'a TypeDecl> {
        match self.types.get(name) {
            Some(t) if t.resolved => Lookup::Found(t),
            Some(_) => Lookup::Unresolved,
            None => Lookup::Absent,
        }
    }

    pub fn module(&self, name: &str) -> Lookup<&'a ModuleDecl> {
        match self.modules.get(name) {
            Some(m) if m.resolved => Lookup::Found(m),
            Some(_) => Lookup::Unresolved,
            None => Lookup::Absent,
        }
    }

    pub fn component(&self, name: &str) -> Lookup<&'a ComponentDecl> {
        match self.components.get(name) {
            Some(c) if c.resolved => Lookup::Found(c),
            Some(_) => Lookup::Unresolved,
            None => Lookup::Absent,
        }
    }

    /// Whether `ty` names a type declared but not yet resolved.
    pub fn is_unresolved(&self, ty: &TypeRef) -> bool {
        matches!(self.ty(ty.name()), Lookup::Unresolved)
            || matches!(self.module(ty.name()), Lookup::Unresolved)
            || matches!(self.component(ty.name()), Lookup::Unresolved)
    }

    pub fn root_components(&self) -> impl Iterator<Item = &'a ComponentDecl> + '_ {
        self.components.values().copied().filter(|c| c.is_root())
    }

    /// Modules with `installIn` naming `component`.
    pub fn modules_installed_in<'s>(
        &'s self,
        component: &'s str,
    ) -> impl Iterator<Item = &'a ModuleDecl> + 's {
        self.modules
            .values()
            .copied()
            .filter(move |m| m.install_in.iter().any(|c| c == component))
    }

    /// Types with `@InstallBinding` naming `component`.
    pub fn install_bindings_in<'s>(
        &'s self,
        component: &'s str,
    ) -> impl Iterator<Item = &'a TypeDecl> + 's {
        self.types.values().copied().filter(move |t| {
            t.install_binding
                .as_ref()
                .is_some_and(|b| b.component == component)
        })
    }

    /// Entry point interfaces with `installIn` naming `component`.
    pub fn entry_points_installed_in<'s>(
        &'s self,
        component: &'s str,
    ) -> impl Iterator<Item = &'a EntryPointDecl> + 's {
        self.entry_points
            .iter()
            .filter(move |e| e.install_in.iter().any(|c| c == component))
    }

    /// Whether a value of type `from` can be assigned to `to`.
    ///
    /// Returns `None` when the supertype closure of `from` is not fully
    /// known to the symbol table.
    pub fn is_assignable(&self, from: &TypeRef, to: &TypeRef) -> Option<bool> {
        if from == to {
            return Some(true);
        }
        let mut pending = vec![from.clone()];
        let mut seen = Vec::new();
        let mut complete = true;
        while let Some(current) = pending.pop() {
            if seen.contains(&current) {
                continue;
            }
            let Lookup::Found(decl) = self.ty(current.name()) else {
                if current == *from {
                    return None;
                }
                complete = false;
                seen.push(current);
                continue;
            };
            for supertype in &decl.supertypes {
                if supertype == to {
                    return Some(true);
                }
                pending.push(supertype.clone());
            }
            seen.push(current);
        }
        if complete { Some(false) } else { None }
    }
}
