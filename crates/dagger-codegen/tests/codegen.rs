//! Generation over validated graphs.

use std::sync::Arc;

use indexmap::IndexSet;

use dagger_codegen::{
    CodegenOptions, ComponentImplementation, EntryPointBody, FactoryBody, generate,
    initialization_levels,
};
use dagger_graph::{BindingGraph, ValidationOptions, build_graph, build_tree, validate};
use dagger_model::declaration::DeclarationSet;
use dagger_model::parse::{ParseOptions, parse_component};
use dagger_model::{BindingKey, ComponentPath, RequestKind, TypeRef};

fn load(yaml: &str) -> DeclarationSet {
    serde_yaml::from_str(yaml).expect("valid declaration yaml")
}

fn graph(set: &DeclarationSet) -> BindingGraph {
    let index = set.index();
    let decl = &set.components[0];
    let spec = parse_component(decl, &index, ParseOptions::default()).expect("component parses");
    build_graph(Arc::new(spec), ComponentPath::root(&decl.name), None, &index).expect("builds")
}

fn key(ty: &str) -> BindingKey {
    BindingKey::of(TypeRef::parse(ty).unwrap())
}

const PROVIDER_CYCLE: &str = r#"
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
"#;

#[test]
fn test_provider_cycle_generates_both_factories() {
    let graph = graph(&load(PROVIDER_CYCLE));
    assert!(validate(&graph, &ValidationOptions::default()).is_empty());

    let implementation = generate(&graph, &CodegenOptions::default()).unwrap();
    assert_eq!(implementation.factories.len(), 2);

    let b = implementation.factory(&key("app.B")).unwrap();
    assert_eq!(b.parameters[0].kind, RequestKind::Provider);
    assert_eq!(b.factory.as_deref(), Some("B_Factory"));
}

#[test]
fn test_deferred_edge_imposes_no_order() {
    let set = load(
        r#"
types:
  - name: app.A
    inject:
      - { name: b, type: "Lazy<app.B>" }
  - name: app.B
    inject:
      - { name: a, type: "Provider<app.A>" }
components:
  - name: app.AppComponent
    methods:
      - { name: a, returns: app.A }
"#,
    );
    let graph = graph(&set);
    let local: IndexSet<BindingKey> = graph.resolutions().keys().cloned().collect();
    let levels = initialization_levels(&graph, &local).unwrap();

    assert_eq!(levels.len(), 1);
    assert_eq!(levels[0].keys, vec![key("app.A"), key("app.B")]);
}

#[test]
fn test_generation_is_deterministic() {
    let yaml = r#"
types:
  - name: app.Zebra
    inject: []
  - name: app.Apple
    inject: []
  - name: app.Main
    inject:
      - { name: z, type: app.Zebra }
      - { name: a, type: app.Apple }
modules:
  - name: app.NamesModule
    methods:
      - { name: one, annotations: [Provides, IntoSet], returns: java.lang.String }
      - { name: two, annotations: [Provides, IntoSet], returns: java.lang.String }
      - { name: three, annotations: [Provides, IntoSet], returns: java.lang.String }
components:
  - name: app.AppComponent
    modules: [app.NamesModule]
    methods:
      - { name: main, returns: app.Main }
      - { name: names, returns: "Set<java.lang.String>" }
"#;
    let render = || {
        let implementation = generate(&graph(&load(yaml)), &CodegenOptions::default()).unwrap();
        serde_json::to_string_pretty(&implementation).unwrap()
    };
    let first = render();
    for _ in 0..5 {
        assert_eq!(render(), first);
    }

    let implementation: ComponentImplementation = serde_json::from_str(&first).unwrap();
    let names = implementation.factory(&key("Set<java.lang.String>")).unwrap();
    assert_eq!(names.parameters.len(), 3);
    assert_eq!(implementation.factories[0].key, key("app.Apple"));
}

#[test]
fn test_subcomponent_implementation() {
    let set = load(
        r#"
types:
  - name: app.Database
    scopes: [Singleton]
    inject: []
  - name: app.Screen
    inject:
      - { name: db, type: app.Database }
components:
  - name: app.AppComponent
    scopes: [Singleton]
    methods:
      - { name: database, returns: app.Database }
      - { name: session, returns: app.SessionComponent }
  - name: app.SessionComponent
    kind: subcomponent
    methods:
      - { name: screen, returns: app.Screen }
"#,
    );
    let tree = build_tree(&set.components[0], &set.index(), ParseOptions::default());
    let root = generate(tree.graph().unwrap(), &CodegenOptions::default()).unwrap();
    let child = generate(tree.children[0].graph().unwrap(), &CodegenOptions::default()).unwrap();

    assert_eq!(root.subcomponents, vec!["DaggerAppComponent.SessionComponentImpl"]);
    assert_eq!(
        root.entry_points[1].body,
        EntryPointBody::SubcomponentFactory {
            component: "DaggerAppComponent.SessionComponentImpl".to_string()
        }
    );
    assert_eq!(child.parent.as_deref(), Some("DaggerAppComponent"));
    assert_eq!(child.factories.len(), 1);

    let screen = &child.factories[0];
    assert_eq!(screen.body, FactoryBody::DirectCall);
    assert_eq!(screen.parameters[0].provided_by, ComponentPath::root("app.AppComponent"));
}
