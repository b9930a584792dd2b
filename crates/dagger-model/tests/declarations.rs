//! Declaration parsing tests driven by YAML declaration records.
//!
//! These tests exercise the public parsing API the way the compiler uses
//! it: a whole declaration set is deserialized, indexed, and its modules and
//! components parsed.

use dagger_model::binding::{ContributionType, DeclarationKind};
use dagger_model::component::EntryPointKind;
use dagger_model::declaration::DeclarationSet;
use dagger_model::parse::{parse_component, parse_module};
use dagger_model::{DeclarationError, ErrorKind, ParseOptions, TypeRef};

fn load(yaml: &str) -> DeclarationSet {
    serde_yaml::from_str(yaml).expect("valid declaration yaml")
}

const APP: &str = r#"
types:
  - name: app.Heater
    kind: interface
  - name: app.ElectricHeater
    supertypes: [app.Heater]
    inject: []
modules:
  - name: app.HeaterModule
    methods:
      - name: bindHeater
        annotations: [Binds]
        abstract: true
        params:
          - { name: heater, type: app.ElectricHeater }
        returns: app.Heater
      - name: provideName
        annotations: [Provides, IntoSet]
        returns: String
      - name: provideDb
        annotations: [Provides]
        qualifiers: ['Named("db")']
        scopes: [Singleton]
        params:
          - { name: url, type: String, qualifiers: ['Named("url")'] }
        returns: app.Database
components:
  - name: app.CoffeeComponent
    scopes: [Singleton]
    modules: [app.HeaterModule]
    methods:
      - name: heater
        returns: app.Heater
      - name: names
        returns: Set<String>
      - name: inject
        params:
          - { name: shop, type: app.CoffeeShop }
"#;

#[test]
fn test_module_from_yaml() {
    let set = load(APP);
    let index = set.index();
    let spec = parse_module(&set.modules[0], &index, ParseOptions::default()).unwrap();

    assert_eq!(spec.declarations.len(), 3);
    assert_eq!(spec.declarations[0].kind, DeclarationKind::Delegate);
    assert_eq!(spec.declarations[1].contribution, ContributionType::IntoSet);

    let db = &spec.declarations[2];
    assert_eq!(db.key.to_string(), "@Named(\"db\") app.Database");
    assert_eq!(db.scope.as_ref().map(|s| s.name()), Some("Singleton"));
    assert_eq!(
        db.dependencies[0].key.qualifier.as_ref().map(|q| q.0.as_str()),
        Some("Named(\"url\")")
    );
}

#[test]
fn test_component_from_yaml() {
    let set = load(APP);
    let index = set.index();
    let spec = parse_component(&set.components[0], &index, ParseOptions::default()).unwrap();

    assert_eq!(spec.modules.len(), 1);
    assert_eq!(spec.scopes.len(), 1);
    assert_eq!(spec.entry_points.len(), 3);
    match &spec.entry_points[1].kind {
        EntryPointKind::Provision(request) => {
            assert_eq!(request.key.ty, TypeRef::parse("Set<String>").unwrap())
        }
        other => panic!("unexpected entry point {:?}", other),
    }
    assert!(matches!(
        spec.entry_points[2].kind,
        EntryPointKind::MembersInjection(_)
    ));
}

#[test]
fn test_malformed_module_reports_every_method() {
    let set = load(
        r#"
modules:
  - name: app.BadModule
    methods:
      - name: both
        annotations: [Provides, Binds]
        returns: app.Foo
      - name: nothing
        annotations: [Provides]
      - name: provider
        annotations: [Provides]
        returns: Provider<app.Foo>
      - name: bindConcrete
        annotations: [Binds]
        params:
          - { name: a, type: app.A }
          - { name: b, type: app.B }
        returns: app.Foo
"#,
    );
    let index = set.index();
    let err = parse_module(&set.modules[0], &index, ParseOptions::default()).unwrap_err();
    let DeclarationError::Malformed(diagnostics) = err else {
        panic!("expected malformed declarations");
    };

    assert!(diagnostics.iter().all(|d| d.kind == ErrorKind::MalformedDeclaration));
    let members: Vec<_> = diagnostics
        .iter()
        .filter_map(|d| d.declaration.member.clone())
        .collect();
    assert!(members.contains(&"both()".to_string()));
    assert!(members.contains(&"nothing()".to_string()));
    assert!(members.contains(&"provider()".to_string()));
    // not abstract, and two parameters
    assert_eq!(
        members.iter().filter(|m| m.starts_with("bindConcrete")).count(),
        2
    );
}

#[test]
fn test_unresolved_component_dependency_defers() {
    let set = load(
        r#"
types:
  - name: app.GeneratedDeps
    kind: interface
    resolved: false
components:
  - name: app.AppComponent
    dependencies: [app.GeneratedDeps]
"#,
    );
    let index = set.index();
    let err = parse_component(&set.components[0], &index, ParseOptions::default()).unwrap_err();
    match err {
        DeclarationError::Deferred(deferred) => {
            assert_eq!(deferred.awaiting, "app.GeneratedDeps");
            assert_eq!(deferred.element.to_string(), "app.AppComponent");
        }
        other => panic!("expected deferral, got {:?}", other),
    }
}
