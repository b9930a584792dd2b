//! Graph building and validation over whole component hierarchies.

use std::sync::Arc;

use dagger_graph::{
    BindingGraph, ComponentTree, Resolution, TreeNode, ValidationOptions, build_graph, build_tree,
    validate,
};
use dagger_model::binding::BindingKind;
use dagger_model::declaration::DeclarationSet;
use dagger_model::parse::{ParseOptions, parse_component};
use dagger_model::{BindingKey, ComponentPath, ErrorKind, RequestKind, TypeRef};

fn load(yaml: &str) -> DeclarationSet {
    serde_yaml::from_str(yaml).expect("valid declaration yaml")
}

fn root_graph(set: &DeclarationSet) -> Result<BindingGraph, dagger_model::Deferred> {
    let index = set.index();
    let decl = &set.components[0];
    let spec = parse_component(decl, &index, ParseOptions::default()).expect("component parses");
    build_graph(Arc::new(spec), ComponentPath::root(&decl.name), None, &index)
}

fn tree(set: &DeclarationSet) -> ComponentTree {
    build_tree(&set.components[0], &set.index(), ParseOptions::default())
}

fn key(ty: &str) -> BindingKey {
    BindingKey::of(TypeRef::parse(ty).expect("valid type"))
}

#[test]
fn test_set_contributions_aggregate() {
    let set = load(
        r#"
modules:
  - name: app.NamesModule
    methods:
      - { name: first, annotations: [Provides, IntoSet], returns: java.lang.String }
      - { name: second, annotations: [Provides, IntoSet], returns: java.lang.String }
  - name: app.MoreNamesModule
    methods:
      - { name: third, annotations: [Provides, IntoSet], returns: java.lang.String }
components:
  - name: app.AppComponent
    modules: [app.NamesModule, app.MoreNamesModule]
    methods:
      - { name: names, returns: "Set<java.lang.String>" }
"#,
    );
    let graph = root_graph(&set).unwrap();

    let aggregate = graph.binding(&key("Set<java.lang.String>")).expect("aggregate bound");
    assert_eq!(aggregate.kind, BindingKind::MultiboundSet);
    assert_eq!(aggregate.dependencies.len(), 3);
    assert_eq!(graph.dependencies_of(&aggregate.key).count(), 3);
    assert!(validate(&graph, &ValidationOptions::default()).is_empty());
}

#[test]
fn test_declared_empty_multibinding() {
    let set = load(
        r#"
modules:
  - name: app.PluginModule
    methods:
      - name: plugins
        annotations: [Multibinds]
        abstract: true
        returns: "Map<java.lang.String, app.Plugin>"
components:
  - name: app.AppComponent
    modules: [app.PluginModule]
    methods:
      - { name: plugins, returns: "Map<java.lang.String, Provider<app.Plugin>>" }
"#,
    );
    let graph = root_graph(&set).unwrap();

    let map = graph
        .binding(&key("Map<java.lang.String, Provider<app.Plugin>>"))
        .expect("provider map bound");
    assert_eq!(map.kind, BindingKind::MultiboundMap);
    assert!(map.dependencies.is_empty());
    assert!(validate(&graph, &ValidationOptions::default()).is_empty());
}

#[test]
fn test_provider_map_requests_are_deferred() {
    let set = load(
        r#"
modules:
  - name: app.PluginModule
    methods:
      - name: plugin
        annotations: [Provides, IntoMap]
        mapKeys: [{ annotation: StringKey, value: '"a"' }]
        returns: app.Plugin
components:
  - name: app.AppComponent
    modules: [app.PluginModule]
    methods:
      - { name: plugins, returns: "Map<java.lang.String, Provider<app.Plugin>>" }
"#,
    );
    let graph = root_graph(&set).unwrap();
    let map = graph
        .binding(&key("Map<java.lang.String, Provider<app.Plugin>>"))
        .unwrap();

    assert_eq!(map.dependencies.len(), 1);
    assert_eq!(map.dependencies[0].kind, RequestKind::Provider);
}

#[test]
fn test_provider_cycle_is_accepted() {
    let set = load(
        r#"
types:
  - name: app.A
    inject:
      - { name: b, type: app.B }
  - name: app.B
    inject:
      - { name: a, type: "Provider<app.A>" }
components:
  - name: app.AppComponent
    methods:
      - { name: a, returns: app.A }
"#,
    );
    let graph = root_graph(&set).unwrap();

    assert_eq!(graph.binding_count(), 2);
    assert!(validate(&graph, &ValidationOptions::default()).is_empty());
}

#[test]
fn test_direct_cycle_names_path() {
    let set = load(
        r#"
types:
  - name: app.A
    inject:
      - { name: b, type: app.B }
  - name: app.B
    inject:
      - { name: a, type: app.A }
components:
  - name: app.AppComponent
    methods:
      - { name: a, returns: app.A }
"#,
    );
    let diagnostics = validate(&root_graph(&set).unwrap(), &ValidationOptions::default());

    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].kind, ErrorKind::CyclicDependency);
    assert!(diagnostics[0].message.ends_with("app.A -> app.B -> app.A"));
}

#[test]
fn test_unresolved_dependency_defers_graph() {
    let set = load(
        r#"
types:
  - name: app.Generated
    resolved: false
  - name: app.Screen
    inject:
      - { name: generated, type: app.Generated }
components:
  - name: app.AppComponent
    methods:
      - { name: screen, returns: app.Screen }
"#,
    );
    let deferred = root_graph(&set).unwrap_err();
    assert_eq!(deferred.awaiting, "app.Generated");
}

#[test]
fn test_optional_binding_depends_on_present_value() {
    let yaml = r#"
types:
  - name: app.Clock
    inject: []
modules:
  - name: app.OptionalModule
    methods:
      - { name: clock, annotations: [BindsOptionalOf], abstract: true, returns: app.Clock }
components:
  - name: app.AppComponent
    modules: [app.OptionalModule]
    methods:
      - { name: clock, returns: "Optional<app.Clock>" }
"#;
    let present = root_graph(&load(yaml)).unwrap();
    let optional = present.binding(&key("Optional<app.Clock>")).unwrap();
    assert_eq!(optional.kind, BindingKind::Optional);
    assert_eq!(optional.dependencies.len(), 1);

    let absent = root_graph(&load(&yaml.replace("    inject: []\n", ""))).unwrap();
    let optional = absent.binding(&key("Optional<app.Clock>")).unwrap();
    assert!(optional.dependencies.is_empty());
    assert!(validate(&absent, &ValidationOptions::default()).is_empty());
}

#[test]
fn test_component_dependency_provisions() {
    let set = load(
        r#"
types:
  - name: app.Backend
    kind: interface
    methods:
      - { name: clock, returns: app.Clock }
components:
  - name: app.AppComponent
    dependencies: [app.Backend]
    creator:
      name: app.AppComponent.Factory
      kind: factory
      params:
        - { name: backend, type: app.Backend }
    methods:
      - { name: clock, returns: app.Clock }
"#,
    );
    let graph = root_graph(&set).unwrap();

    let clock = graph.binding(&key("app.Clock")).unwrap();
    assert_eq!(clock.kind, BindingKind::ComponentProvision);
    let backend = graph.binding(&key("app.Backend")).unwrap();
    assert_eq!(backend.kind, BindingKind::ComponentDependency);
    assert!(validate(&graph, &ValidationOptions::default()).is_empty());
}

const HIERARCHY: &str = r#"
types:
  - name: app.Database
    scopes: [Singleton]
    inject: []
  - name: app.Session
    scopes: [SessionScope]
    inject:
      - { name: db, type: app.Database }
  - name: app.Screen
    inject:
      - { name: session, type: app.Session }
      - { name: db, type: app.Database }
modules:
  - name: app.AppModule
    methods:
      - { name: appName, annotations: [Provides, IntoSet], returns: java.lang.String }
  - name: app.SessionModule
    methods:
      - { name: sessionName, annotations: [Provides, IntoSet], returns: java.lang.String }
components:
  - name: app.AppComponent
    scopes: [Singleton]
    modules: [app.AppModule]
    methods:
      - { name: database, returns: app.Database }
      - { name: session, returns: app.SessionComponent }
  - name: app.SessionComponent
    kind: subcomponent
    scopes: [SessionScope]
    modules: [app.SessionModule]
    methods:
      - { name: screen, returns: app.Screen }
      - { name: names, returns: "Set<java.lang.String>" }
"#;

#[test]
fn test_subcomponent_shares_ancestor_bindings() {
    let set = load(HIERARCHY);
    let tree = tree(&set);
    let root = tree.graph().expect("root built");
    let child = tree.children[0].graph().expect("child built");

    assert_eq!(tree.children[0].path.to_string(), "app.AppComponent/app.SessionComponent");
    let database = key("app.Database");
    assert!(child.resolution(&database).unwrap().is_inherited());
    assert!(Arc::ptr_eq(
        root.binding(&database).unwrap(),
        child.binding(&database).unwrap()
    ));

    let Some(Resolution::Bound { owner, .. }) = child.resolution(&key("app.Session")) else {
        panic!("session should be bound");
    };
    assert_eq!(owner, &tree.children[0].path);

    for node in tree.walk() {
        let graph = node.graph().unwrap();
        assert!(validate(graph, &ValidationOptions::default()).is_empty());
    }
}

#[test]
fn test_subcomponent_multibinding_includes_ancestor_contributions() {
    let set = load(HIERARCHY);
    let tree = tree(&set);
    let child = tree.children[0].graph().unwrap();

    let names = child.binding(&key("Set<java.lang.String>")).unwrap();
    assert_eq!(names.dependencies.len(), 2);
}

#[test]
fn test_pending_subcomponent_defers_component() {
    let set = load(
        r#"
components:
  - name: app.AppComponent
    modules: [app.ChildModule]
modules:
  - name: app.ChildModule
    subcomponents: [app.LaterComponent]
"#,
    );
    let tree = tree(&set);
    assert!(matches!(tree.node, TreeNode::Deferred(_)));
    assert!(tree.children.is_empty());
}

#[test]
fn test_subcomponent_binding_duplicates_ancestor_binding() {
    let set = load(
        r#"
modules:
  - name: app.ParentModule
    methods:
      - { name: foo, annotations: [Provides], returns: app.Foo }
  - name: app.ChildModule
    methods:
      - { name: otherFoo, annotations: [Provides], returns: app.Foo }
components:
  - name: app.AppComponent
    modules: [app.ParentModule]
    methods:
      - { name: foo, returns: app.Foo }
      - { name: child, returns: app.ChildComponent }
  - name: app.ChildComponent
    kind: subcomponent
    modules: [app.ChildModule]
    methods:
      - { name: foo, returns: app.Foo }
"#,
    );
    let tree = tree(&set);
    let root = tree.graph().expect("root built");
    assert!(validate(root, &ValidationOptions::default()).is_empty());

    let child = tree.children[0].graph().expect("child built");
    assert!(matches!(
        child.resolution(&key("app.Foo")),
        Some(Resolution::Duplicate { .. })
    ));
    let diagnostics = validate(child, &ValidationOptions::default());
    let duplicates: Vec<_> = diagnostics
        .iter()
        .filter(|d| d.kind == ErrorKind::DuplicateBinding)
        .collect();
    assert_eq!(duplicates.len(), 1);
    let sites: Vec<String> = duplicates[0]
        .labels
        .iter()
        .map(|l| l.declaration.to_string())
        .collect();
    assert!(sites.contains(&"app.ParentModule#foo()".to_string()));
    assert!(sites.contains(&"app.ChildModule#otherFoo()".to_string()));
}

#[test]
fn test_scoped_injection_resolves_dependencies_in_owner() {
    let set = load(
        r#"
types:
  - name: app.Cache
    scopes: [Singleton]
    inject:
      - { name: repository, type: app.Repository }
  - name: app.Repository
    inject:
      - { name: user, type: app.User }
modules:
  - name: app.SessionModule
    methods:
      - { name: user, annotations: [Provides], returns: app.User }
components:
  - name: app.AppComponent
    scopes: [Singleton]
    methods:
      - { name: session, returns: app.SessionComponent }
  - name: app.SessionComponent
    kind: subcomponent
    scopes: [SessionScope]
    modules: [app.SessionModule]
    methods:
      - { name: cache, returns: app.Cache }
"#,
    );
    let tree = tree(&set);
    let child = tree.children[0].graph().expect("child built");

    assert!(matches!(child.resolution(&key("app.Cache")), Some(Resolution::Invalid)));
    assert!(child.resolution(&key("app.User")).is_none());
    let missing: Vec<_> = validate(child, &ValidationOptions::default())
        .into_iter()
        .filter(|d| d.kind == ErrorKind::MissingBinding)
        .collect();
    assert_eq!(missing.len(), 1);
    assert!(missing[0].message.starts_with("missing binding for app.User"));
    assert!(missing[0].message.contains("app.AppComponent"));
}

#[test]
fn test_scoped_injection_owned_by_ancestor_when_satisfied() {
    let set = load(
        r#"
types:
  - name: app.Cache
    scopes: [Singleton]
    inject:
      - { name: clock, type: app.Clock }
modules:
  - name: app.AppModule
    methods:
      - { name: clock, annotations: [Provides], returns: app.Clock }
components:
  - name: app.AppComponent
    scopes: [Singleton]
    modules: [app.AppModule]
    methods:
      - { name: session, returns: app.SessionComponent }
  - name: app.SessionComponent
    kind: subcomponent
    scopes: [SessionScope]
    methods:
      - { name: cache, returns: app.Cache }
"#,
    );
    let tree = tree(&set);
    let child = tree.children[0].graph().expect("child built");

    let Some(Resolution::Bound { owner, .. }) = child.resolution(&key("app.Cache")) else {
        panic!("cache should be bound");
    };
    assert_eq!(owner, &tree.path);
    assert!(validate(child, &ValidationOptions::default()).is_empty());
}

#[test]
fn test_install_binding_binds_supertype() {
    let set = load(
        r#"
types:
  - name: app.Clock
    kind: interface
  - name: app.SystemClock
    supertypes: [app.Clock]
    inject: []
    installBinding: { component: app.AppComponent }
components:
  - name: app.AppComponent
    methods:
      - { name: clock, returns: app.Clock }
"#,
    );
    let graph = root_graph(&set).expect("graph built");

    let clock = graph.binding(&key("app.Clock")).expect("clock bound");
    assert_eq!(clock.kind, BindingKind::Delegate);
    assert_eq!(clock.dependencies[0].key, key("app.SystemClock"));
    assert!(graph.binding(&key("app.SystemClock")).is_some());
    assert!(validate(&graph, &ValidationOptions::default()).is_empty());
}
