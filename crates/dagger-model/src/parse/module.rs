//! `@Module` parsing.

use tracing::trace;

use super::{DeclarationError, ParseOptions, ParseState, is_reserved_keyword};
use crate::binding::{BindingDeclaration, ContributionType, DeclarationKind};
use crate::component::ModuleSpec;
use crate::declaration::{
    ComponentKind, DeclarationIndex, Lookup, Marker, MethodDecl, ModuleDecl, ParamDecl, TypeDecl,
};
use crate::error::{Diagnostic, ErrorKind};
use crate::foundation::{BindingKey, DeclarationId, DependencyRequest, TypeRef};

const BINDING_MARKERS: &[Marker] = &[
    Marker::Provides,
    Marker::Binds,
    Marker::Multibinds,
    Marker::BindsOptionalOf,
];

const CONTRIBUTION_MARKERS: &[Marker] = &[Marker::IntoSet, Marker::ElementsIntoSet, Marker::IntoMap];

/// Parses a module into its binding declarations.
///
/// Every method is checked; all malformed-declaration diagnostics are
/// returned together.
pub fn parse_module(
    module: &ModuleDecl,
    index: &DeclarationIndex<'_>,
    options: ParseOptions,
) -> Result<ModuleSpec, DeclarationError> {
    let mut state = ParseState::default();
    let mut declarations = Vec::new();

    for method in &module.methods {
        if let Some(declaration) = parse_method(module, method, index, options, &mut state) {
            declarations.push(declaration);
        }
    }

    for name in &module.subcomponents {
        let id = DeclarationId::member(&module.name, format!("subcomponents={}", name));
        match index.component(name) {
            Lookup::Absent | Lookup::Unresolved => state.defer(id, name),
            Lookup::Found(sub) if sub.kind != ComponentKind::Subcomponent => {
                state.error(Diagnostic::new(
                    ErrorKind::MalformedDeclaration,
                    id,
                    format!("{} is listed as a subcomponent but is not a @Subcomponent", name),
                ));
            }
            Lookup::Found(sub) => match &sub.creator {
                Some(creator) => declarations.push(BindingDeclaration {
                    id,
                    module: module.name.clone(),
                    kind: DeclarationKind::SubcomponentCreator,
                    key: BindingKey::of(TypeRef::named(&creator.name)),
                    contribution: ContributionType::Unique,
                    map_key: None,
                    scope: None,
                    dependencies: Vec::new(),
                    nullable: false,
                }),
                None => state.error(
                    Diagnostic::new(
                        ErrorKind::MalformedDeclaration,
                        id,
                        format!(
                            "subcomponent {} is listed in a module but declares no builder or factory",
                            name
                        ),
                    )
                    .with_note("declare a @Subcomponent.Builder or @Subcomponent.Factory".to_string()),
                ),
            },
        }
    }

    trace!(module = %module.name, declarations = declarations.len(), "parsed module");

    state.finish(ModuleSpec {
        name: module.name.clone(),
        declarations,
        includes: module.includes.clone(),
    })
}

/// The module `@InstallBinding` on `ty` stands for: a single `@Binds`
/// from `ty` to its bound type, named `<Type>_HiltBindingModule`.
///
/// The bound type defaults to the only supertype of `ty`.
pub fn install_binding_module(
    ty: &TypeDecl,
    index: &DeclarationIndex<'_>,
) -> Result<ModuleSpec, DeclarationError> {
    let mut state = ParseState::default();
    let name = format!("{}_HiltBindingModule", ty.name);
    let implementation = TypeRef::named(&ty.name);

    let declared = ty.install_binding.as_ref().and_then(|b| b.bound_type.clone());
    let bound = match (declared, ty.supertypes.as_slice()) {
        (Some(bound), _) => {
            if index.is_assignable(&implementation, &bound) == Some(false) {
                state.error(Diagnostic::new(
                    ErrorKind::MalformedDeclaration,
                    ty.id(),
                    format!("@InstallBinding boundType {} is not a supertype of {}", bound, ty.name),
                ));
            }
            Some(bound)
        }
        (None, [only]) => Some(only.clone()),
        (None, []) => {
            state.error(Diagnostic::new(
                ErrorKind::MalformedDeclaration,
                ty.id(),
                format!("{} has no supertype to install a binding for", ty.name),
            ));
            None
        }
        (None, _) => {
            state.error(
                Diagnostic::new(
                    ErrorKind::MalformedDeclaration,
                    ty.id(),
                    format!(
                        "{} implements multiple interfaces and no boundType was specified",
                        ty.name
                    ),
                )
                .with_note(format!("supertypes: {}", join(&ty.supertypes))),
            );
            None
        }
    };

    let mut declarations = Vec::new();
    if let Some(bound) = bound {
        let id = DeclarationId::member(&name, format!("bind({})", ty.name));
        if index.is_unresolved(&bound) {
            state.defer(id.clone(), bound.to_string());
        }
        declarations.push(BindingDeclaration {
            id,
            module: name.clone(),
            kind: DeclarationKind::Delegate,
            key: BindingKey::of(bound),
            contribution: ContributionType::Unique,
            map_key: None,
            scope: None,
            dependencies: vec![DependencyRequest::instance(BindingKey::of(implementation))],
            nullable: false,
        });
    }

    trace!(module = %name, "synthesized install binding module");
    state.finish(ModuleSpec {
        name,
        declarations,
        includes: Vec::new(),
    })
}

fn parse_method(
    module: &ModuleDecl,
    method: &MethodDecl,
    index: &DeclarationIndex<'_>,
    options: ParseOptions,
    state: &mut ParseState,
) -> Option<BindingDeclaration> {
    let binding_markers: Vec<Marker> = BINDING_MARKERS
        .iter()
        .copied()
        .filter(|m| method.annotations.has(*m))
        .collect();
    let &[marker] = binding_markers.as_slice() else {
        if binding_markers.len() > 1 {
            let names = binding_markers
                .iter()
                .map(|m| format!("@{:?}", m))
                .collect::<Vec<_>>()
                .join(" and ");
            state.error(malformed(
                module,
                method,
                format!("{} cannot be used together on one method", names),
            ));
        }
        return None;
    };

    let before = state.diagnostics.len();
    let annotations = &method.annotations;

    if options.keyword_validation && is_reserved_keyword(&method.name) {
        state.error(malformed(
            module,
            method,
            format!("method name '{}' is a reserved keyword", method.name),
        ));
    }

    let Some(returns) = &method.returns else {
        state.error(malformed(
            module,
            method,
            format!("@{:?} methods must return a value (not void)", marker),
        ));
        return None;
    };
    if returns.is_framework_type() {
        state.error(malformed(
            module,
            method,
            format!(
                "@{:?} methods must not return framework types, found {}",
                marker, returns
            ),
        ));
    }
    if annotations.qualifiers.len() > 1 {
        state.error(malformed(
            module,
            method,
            format!(
                "may not use more than one @Qualifier, found {}",
                join(&annotations.qualifiers)
            ),
        ));
    }
    if annotations.scopes.len() > 1 {
        state.error(malformed(
            module,
            method,
            format!(
                "cannot use more than one @Scope, found {}",
                join(&annotations.scopes)
            ),
        ));
    }

    let contributions: Vec<Marker> = CONTRIBUTION_MARKERS
        .iter()
        .copied()
        .filter(|m| annotations.has(*m))
        .collect();
    if contributions.len() > 1 {
        state.error(malformed(
            module,
            method,
            "cannot have more than one multibinding contribution annotation".to_string(),
        ));
    }
    let contribution = match contributions.first() {
        Some(Marker::IntoSet) => ContributionType::IntoSet,
        Some(Marker::ElementsIntoSet) => ContributionType::ElementsIntoSet,
        Some(Marker::IntoMap) => ContributionType::IntoMap,
        _ => ContributionType::Unique,
    };

    if contribution == ContributionType::IntoMap && annotations.map_keys.len() != 1 {
        state.error(malformed(
            module,
            method,
            format!(
                "@IntoMap methods must have exactly one @MapKey annotation, found {}",
                annotations.map_keys.len()
            ),
        ));
    }
    for map_key in &annotations.map_keys {
        if map_key.is_lazy_class_key() && map_key.class_name().is_none() {
            state.error(malformed(
                module,
                method,
                format!("@LazyClassKey value must be a class literal, found {}", map_key.value),
            ));
        }
    }
    if contribution != ContributionType::IntoMap && !annotations.map_keys.is_empty() {
        state.error(malformed(
            module,
            method,
            "@MapKey annotations are only allowed on @IntoMap methods".to_string(),
        ));
    }
    if contribution == ContributionType::ElementsIntoSet && !returns.is_set() {
        state.error(malformed(
            module,
            method,
            format!("@ElementsIntoSet methods must return a Set, found {}", returns),
        ));
    }

    for param in &method.params {
        if param.annotations.qualifiers.len() > 1 {
            state.error(malformed(
                module,
                method,
                format!(
                    "parameter '{}' may not use more than one @Qualifier",
                    param.name
                ),
            ));
        }
    }

    let kind = match marker {
        Marker::Provides => {
            if method.is_abstract {
                state.error(malformed(
                    module,
                    method,
                    "@Provides methods cannot be abstract".to_string(),
                ));
            }
            DeclarationKind::Provision
        }
        Marker::Binds => {
            check_binds(module, method, returns, index, state);
            DeclarationKind::Delegate
        }
        Marker::Multibinds => {
            check_declaration_only(module, method, marker, contribution, state);
            if !returns.is_set() && !returns.is_map() {
                state.error(malformed(
                    module,
                    method,
                    format!("@Multibinds methods must return Map<K, V> or Set<T>, found {}", returns),
                ));
            }
            DeclarationKind::Multibinds
        }
        _ => {
            check_declaration_only(module, method, marker, contribution, state);
            DeclarationKind::OptionalDeclaration
        }
    };

    for ty in std::iter::once(returns).chain(method.params.iter().map(|p| &p.ty)) {
        if index.is_unresolved(ty) {
            state.defer(method.id(&module.name), ty.to_string());
        }
    }

    if state.diagnostics.len() > before {
        return None;
    }

    let qualifier = annotations.qualifier();
    let key_type = match (kind, contribution) {
        (DeclarationKind::OptionalDeclaration, _) => TypeRef::optional_of(returns.clone()),
        (_, ContributionType::IntoSet) => TypeRef::set_of(returns.clone()),
        (_, ContributionType::IntoMap) => {
            let key_type = annotations
                .map_keys
                .first()
                .map(|k| k.key_type())
                .unwrap_or_else(|| TypeRef::named("java.lang.Object"));
            TypeRef::map_of(key_type, returns.clone())
        }
        _ => returns.clone(),
    };

    Some(BindingDeclaration {
        id: method.id(&module.name),
        module: module.name.clone(),
        kind,
        key: BindingKey::qualified(key_type, qualifier),
        contribution,
        map_key: annotations.map_keys.first().cloned(),
        scope: annotations.scope(),
        dependencies: method.params.iter().map(param_request).collect(),
        nullable: annotations.is_nullable(),
    })
}

fn check_binds(
    module: &ModuleDecl,
    method: &MethodDecl,
    returns: &TypeRef,
    index: &DeclarationIndex<'_>,
    state: &mut ParseState,
) {
    if !method.is_abstract {
        state.error(malformed(module, method, "@Binds methods must be abstract".to_string()));
    }
    let [param] = method.params.as_slice() else {
        state.error(malformed(
            module,
            method,
            format!(
                "@Binds methods must have exactly one parameter, found {}",
                method.params.len()
            ),
        ));
        return;
    };
    // ElementsIntoSet delegates bind a Set to a Set, IntoSet delegates bind
    // an element; in both cases the parameter must be assignable to `returns`.
    if index.is_assignable(&param.ty, returns) == Some(false) {
        state.error(
            malformed(
                module,
                method,
                format!(
                    "@Binds parameter type {} is not assignable to the return type {}",
                    param.ty, returns
                ),
            )
            .with_note(format!("{} must be a subtype of {}", param.ty, returns)),
        );
    }
}

fn check_declaration_only(
    module: &ModuleDecl,
    method: &MethodDecl,
    marker: Marker,
    contribution: ContributionType,
    state: &mut ParseState,
) {
    if !method.is_abstract {
        state.error(malformed(
            module,
            method,
            format!("@{:?} methods must be abstract", marker),
        ));
    }
    if !method.params.is_empty() {
        state.error(malformed(
            module,
            method,
            format!("@{:?} methods cannot have parameters", marker),
        ));
    }
    if !method.annotations.scopes.is_empty() {
        state.error(malformed(
            module,
            method,
            format!("@{:?} methods cannot be scoped", marker),
        ));
    }
    if contribution.is_multibinding() {
        state.error(malformed(
            module,
            method,
            format!("@{:?} methods cannot contribute to multibindings", marker),
        ));
    }
}

pub(crate) fn param_request(param: &ParamDecl) -> DependencyRequest {
    DependencyRequest::for_type(&param.ty, param.annotations.qualifier())
        .with_element(&param.name)
        .with_nullable(param.annotations.is_nullable())
}

fn malformed(module: &ModuleDecl, method: &MethodDecl, message: String) -> Diagnostic {
    Diagnostic::new(ErrorKind::MalformedDeclaration, method.id(&module.name), message)
}

fn join<T: std::fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::declaration::{Annotations, DeclarationSet, MapKey};
    use crate::foundation::{Qualifier, Scope};

    fn method(name: &str, markers: &[Marker], params: &[(&str, &str)], returns: Option<&str>) -> MethodDecl {
        MethodDecl {
            name: name.to_string(),
            annotations: Annotations {
                annotations: markers.to_vec(),
                ..Annotations::default()
            },
            params: params
                .iter()
                .map(|(n, t)| ParamDecl::new(*n, TypeRef::parse(t).unwrap()))
                .collect(),
            returns: returns.map(|r| TypeRef::parse(r).unwrap()),
            is_abstract: markers.iter().any(|m| {
                matches!(m, Marker::Binds | Marker::Multibinds | Marker::BindsOptionalOf)
            }),
        }
    }

    fn module(methods: Vec<MethodDecl>) -> ModuleDecl {
        ModuleDecl {
            name: "app.AppModule".to_string(),
            methods,
            includes: Vec::new(),
            subcomponents: Vec::new(),
            install_in: Vec::new(),
            resolved: true,
        }
    }

    fn parse(module: &ModuleDecl) -> Result<ModuleSpec, DeclarationError> {
        let set = DeclarationSet::new();
        parse_module(module, &set.index(), ParseOptions::default())
    }

    fn malformed_messages(result: Result<ModuleSpec, DeclarationError>) -> Vec<String> {
        match result {
            Err(DeclarationError::Malformed(diagnostics)) => {
                diagnostics.into_iter().map(|d| d.message).collect()
            }
            other => panic!("expected malformed, got {:?}", other),
        }
    }

    #[test]
    fn test_provides_method() {
        let m = module(vec![method(
            "provideFoo",
            &[Marker::Provides],
            &[("bar", "app.Bar"), ("baz", "Provider<app.Baz>")],
            Some("app.Foo"),
        )]);
        let spec = parse(&m).unwrap();
        assert_eq!(spec.declarations.len(), 1);
        let decl = &spec.declarations[0];
        assert_eq!(decl.kind, DeclarationKind::Provision);
        assert_eq!(decl.key, BindingKey::of(TypeRef::named("app.Foo")));
        assert_eq!(decl.dependencies.len(), 2);
        assert!(decl.dependencies[1].is_deferred());
        assert_eq!(decl.id.to_string(), "app.AppModule#provideFoo(app.Bar,javax.inject.Provider<app.Baz>)");
    }

    #[test]
    fn test_provides_and_binds_together() {
        let m = module(vec![method(
            "foo",
            &[Marker::Provides, Marker::Binds],
            &[],
            Some("app.Foo"),
        )]);
        let messages = malformed_messages(parse(&m));
        assert_eq!(messages, vec!["@Provides and @Binds cannot be used together on one method"]);
    }

    #[test]
    fn test_all_method_problems_reported() {
        let mut two_qualifiers = method("a", &[Marker::Provides], &[], Some("app.A"));
        two_qualifiers.annotations.qualifiers = vec![Qualifier::new("Named(\"x\")"), Qualifier::new("Blue")];
        let mut two_scopes = method("b", &[Marker::Provides], &[], Some("app.B"));
        two_scopes.annotations.scopes = vec![Scope::singleton(), Scope::new("Activity")];
        let void = method("c", &[Marker::Provides], &[], None);

        let messages = malformed_messages(parse(&module(vec![two_qualifiers, two_scopes, void])));
        assert_eq!(messages.len(), 3);
        assert!(messages[0].contains("more than one @Qualifier"));
        assert!(messages[1].contains("more than one @Scope"));
        assert!(messages[2].contains("must return a value"));
    }

    #[test]
    fn test_into_set_key() {
        let m = module(vec![method(
            "a",
            &[Marker::Provides, Marker::IntoSet],
            &[],
            Some("String"),
        )]);
        let spec = parse(&m).unwrap();
        let decl = &spec.declarations[0];
        assert_eq!(decl.contribution, ContributionType::IntoSet);
        assert_eq!(decl.key.ty, TypeRef::parse("Set<String>").unwrap());
        assert!(decl.node_key().is_contribution());
    }

    #[test]
    fn test_into_map_requires_one_map_key() {
        let missing = method("a", &[Marker::Provides, Marker::IntoMap], &[], Some("app.V"));
        let mut stray = method("b", &[Marker::Provides], &[], Some("app.V"));
        stray.annotations.map_keys = vec![MapKey::new("StringKey", "\"b\"")];

        let messages = malformed_messages(parse(&module(vec![missing, stray])));
        assert!(messages[0].contains("exactly one @MapKey"));
        assert!(messages[1].contains("only allowed on @IntoMap"));
    }

    #[test]
    fn test_into_map_key_type() {
        let mut m = method("a", &[Marker::Provides, Marker::IntoMap], &[], Some("app.V"));
        m.annotations.map_keys = vec![MapKey::new("StringKey", "\"a\"")];
        let spec = parse(&module(vec![m])).unwrap();
        assert_eq!(
            spec.declarations[0].key.ty,
            TypeRef::parse("Map<java.lang.String, app.V>").unwrap()
        );
    }

    #[test]
    fn test_lazy_class_key_needs_class_literal() {
        let mut lazy = method("a", &[Marker::Provides, Marker::IntoMap], &[], Some("app.V"));
        lazy.annotations.map_keys = vec![MapKey::new("LazyClassKey", "app.Foo.class")];
        let spec = parse(&module(vec![lazy.clone()])).unwrap();
        assert_eq!(
            spec.declarations[0].key.ty,
            TypeRef::parse("Map<java.lang.Class<?>, app.V>").unwrap()
        );

        lazy.annotations.map_keys = vec![MapKey::new("LazyClassKey", "\"app.Foo\"")];
        let messages = malformed_messages(parse(&module(vec![lazy])));
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("class literal"));
    }

    #[test]
    fn test_binds_not_assignable() {
        let mut set = DeclarationSet::new();
        set.types.push(crate::declaration::TypeDecl {
            name: "app.Impl".to_string(),
            kind: Default::default(),
            supertypes: vec![TypeRef::named("app.Other")],
            annotations: Annotations::default(),
            inject: None,
            members: Vec::new(),
            install_binding: None,
            methods: Vec::new(),
            resolved: true,
        });
        set.types.push(crate::declaration::TypeDecl {
            name: "app.Other".to_string(),
            kind: Default::default(),
            supertypes: Vec::new(),
            annotations: Annotations::default(),
            inject: None,
            members: Vec::new(),
            install_binding: None,
            methods: Vec::new(),
            resolved: true,
        });
        let m = module(vec![method("bind", &[Marker::Binds], &[("impl", "app.Impl")], Some("app.Api"))]);
        let result = parse_module(&m, &set.index(), ParseOptions::default());
        let messages = malformed_messages(result);
        assert!(messages[0].contains("not assignable"));
    }

    #[test]
    fn test_multibinds_rules() {
        let mut scoped = method("plugins", &[Marker::Multibinds], &[], Some("app.Plugin"));
        scoped.annotations.scopes = vec![Scope::singleton()];
        let messages = malformed_messages(parse(&module(vec![scoped])));
        assert!(messages.iter().any(|m| m.contains("cannot be scoped")));
        assert!(messages.iter().any(|m| m.contains("must return Map<K, V> or Set<T>")));
    }

    #[test]
    fn test_optional_declaration_key() {
        let m = module(vec![method("optFoo", &[Marker::BindsOptionalOf], &[], Some("app.Foo"))]);
        let spec = parse(&m).unwrap();
        assert_eq!(spec.declarations[0].kind, DeclarationKind::OptionalDeclaration);
        assert!(spec.declarations[0].key.ty.is_optional());
    }

    #[test]
    fn test_keyword_method_name() {
        let m = module(vec![method("new", &[Marker::Provides], &[], Some("app.Foo"))]);
        let messages = malformed_messages(parse(&m));
        assert!(messages[0].contains("reserved keyword"));

        let lenient = ParseOptions {
            keyword_validation: false,
        };
        let set = DeclarationSet::new();
        assert!(parse_module(&m, &set.index(), lenient).is_ok());
    }

    #[test]
    fn test_unresolved_type_defers() {
        let mut set = DeclarationSet::new();
        set.types.push(crate::declaration::TypeDecl {
            name: "app.Generated".to_string(),
            kind: Default::default(),
            supertypes: Vec::new(),
            annotations: Annotations::default(),
            inject: None,
            members: Vec::new(),
            install_binding: None,
            methods: Vec::new(),
            resolved: false,
        });
        let m = module(vec![method("gen", &[Marker::Provides], &[], Some("app.Generated"))]);
        let result = parse_module(&m, &set.index(), ParseOptions::default());
        match result {
            Err(DeclarationError::Deferred(deferred)) => assert_eq!(deferred.awaiting, "app.Generated"),
            other => panic!("expected deferral, got {:?}", other),
        }
    }

    #[test]
    fn test_plain_methods_ignored() {
        let m = module(vec![method("helper", &[], &[], Some("app.Foo"))]);
        assert!(parse(&m).unwrap().declarations.is_empty());
    }
}
