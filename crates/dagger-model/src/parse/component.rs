//! Component parsing.

use std::collections::VecDeque;

use indexmap::IndexSet;
use tracing::debug;

use super::module::{install_binding_module, parse_module};
use super::{DeclarationError, ParseOptions, ParseState, is_reserved_keyword};
use crate::component::{
    BoundInstance, ComponentDependency, ComponentLevel, ComponentSpec, CreatorSpec,
    DependencyProvision, EntryPoint, EntryPointKind, SubcomponentRef, SubcomponentSource,
};
use crate::declaration::{
    ComponentDecl, ComponentKind, CreatorKind, DeclarationIndex, Lookup, Marker, MethodDecl,
};
use crate::error::{Diagnostic, ErrorKind};
use crate::foundation::{BindingKey, DeclarationId, DependencyRequest, TypeRef};

/// Parses a component declaration.
///
/// Installed modules are gathered from the component's module list, their
/// transitive includes, every module with `installIn` naming the component,
/// and one binding module per type whose `@InstallBinding` names it. Entry points are the component's own methods followed by the
/// methods of entry point interfaces installed in it.
pub fn parse_component(
    decl: &ComponentDecl,
    index: &DeclarationIndex<'_>,
    options: ParseOptions,
) -> Result<ComponentSpec, DeclarationError> {
    let mut state = ParseState::default();
    let level = match decl.kind {
        ComponentKind::Component => ComponentLevel::Root,
        ComponentKind::Subcomponent => ComponentLevel::Subcomponent,
    };

    if decl.annotations.scopes.iter().any(|s| s.is_reusable()) {
        state.error(Diagnostic::new(
            ErrorKind::MalformedDeclaration,
            decl.id(),
            format!("{} cannot be annotated with @Reusable", decl.name),
        ));
    }

    let mut subcomponents: Vec<SubcomponentRef> = Vec::new();
    let modules = collect_modules(decl, index, options, &mut state, &mut subcomponents);

    let dependencies = if level == ComponentLevel::Subcomponent && !decl.dependencies.is_empty() {
        state.error(Diagnostic::new(
            ErrorKind::MalformedDeclaration,
            decl.id(),
            format!("subcomponent {} cannot declare component dependencies", decl.name),
        ));
        Vec::new()
    } else {
        decl.dependencies
            .iter()
            .filter_map(|name| parse_dependency(decl, name, index, &mut state))
            .collect()
    };

    let mut entry_points = Vec::new();
    for method in &decl.methods {
        if let Some(entry) =
            classify_method(&decl.name, method, index, options, &mut state, &mut subcomponents)
        {
            entry_points.push(entry);
        }
    }
    for interface in index.entry_points_installed_in(&decl.name) {
        for method in &interface.methods {
            if let Some(entry) = classify_method(
                &interface.name,
                method,
                index,
                options,
                &mut state,
                &mut subcomponents,
            ) {
                entry_points.push(entry);
            }
        }
    }

    let mut bound_instances = Vec::new();
    let creator = decl.creator.as_ref().map(|creator| {
        for param in &creator.params {
            let id = DeclarationId::member(&creator.name, param.name.clone());
            if param.annotations.has(Marker::BindsInstance) {
                bound_instances.push(BoundInstance {
                    id,
                    key: BindingKey::qualified(param.ty.clone(), param.annotations.qualifier()),
                    nullable: param.annotations.is_nullable(),
                });
            } else if !modules.iter().any(|m| m.name == param.ty.name())
                && !decl.dependencies.iter().any(|d| d == param.ty.name())
            {
                state.error(Diagnostic::new(
                    ErrorKind::MalformedDeclaration,
                    id,
                    format!(
                        "creator parameter '{}' of type {} must be @BindsInstance, an installed module, or a component dependency",
                        param.name, param.ty
                    ),
                ));
            }
        }
        if creator.kind == CreatorKind::Factory {
            for dependency in &decl.dependencies {
                if !creator.params.iter().any(|p| p.ty.name() == dependency) {
                    state.error(Diagnostic::new(
                        ErrorKind::MalformedDeclaration,
                        DeclarationId::of_type(&creator.name),
                        format!(
                            "factory of {} is missing a parameter for the component dependency {}",
                            decl.name, dependency
                        ),
                    ));
                }
            }
        }
        CreatorSpec {
            ty: TypeRef::named(&creator.name),
            kind: creator.kind,
        }
    });

    debug!(
        component = %decl.name,
        modules = modules.len(),
        entry_points = entry_points.len(),
        "parsed component"
    );

    state.finish(ComponentSpec {
        id: decl.id(),
        ty: TypeRef::named(&decl.name),
        level,
        scopes: decl.annotations.scopes.clone(),
        modules,
        entry_points,
        dependencies,
        bound_instances,
        creator,
        subcomponents,
    })
}

fn collect_modules(
    decl: &ComponentDecl,
    index: &DeclarationIndex<'_>,
    options: ParseOptions,
    state: &mut ParseState,
    subcomponents: &mut Vec<SubcomponentRef>,
) -> Vec<crate::component::ModuleSpec> {
    let mut queue: VecDeque<String> = decl.modules.iter().cloned().collect();
    queue.extend(index.modules_installed_in(&decl.name).map(|m| m.name.clone()));
    let mut seen: IndexSet<String> = IndexSet::new();
    let mut modules = Vec::new();

    while let Some(name) = queue.pop_front() {
        if !seen.insert(name.clone()) {
            continue;
        }
        let module = match index.module(&name) {
            Lookup::Found(module) => module,
            Lookup::Unresolved | Lookup::Absent => {
                state.defer(decl.id(), &name);
                continue;
            }
        };
        for sub in &module.subcomponents {
            push_subcomponent(subcomponents, sub, SubcomponentSource::Module(name.clone()));
        }
        queue.extend(module.includes.iter().cloned());
        match parse_module(module, index, options) {
            Ok(spec) => modules.push(spec),
            Err(DeclarationError::Malformed(diagnostics)) => {
                state.diagnostics.extend(diagnostics);
            }
            Err(DeclarationError::Deferred(deferred)) => {
                state.defer(deferred.element, deferred.awaiting);
            }
        }
    }

    for ty in index.install_bindings_in(&decl.name) {
        match install_binding_module(ty, index) {
            Ok(spec) if seen.insert(spec.name.clone()) => modules.push(spec),
            Ok(_) => {}
            Err(DeclarationError::Malformed(diagnostics)) => {
                state.diagnostics.extend(diagnostics);
            }
            Err(DeclarationError::Deferred(deferred)) => {
                state.defer(deferred.element, deferred.awaiting);
            }
        }
    }
    modules
}

fn parse_dependency(
    decl: &ComponentDecl,
    name: &str,
    index: &DeclarationIndex<'_>,
    state: &mut ParseState,
) -> Option<ComponentDependency> {
    let methods: &[MethodDecl] = match (index.ty(name), index.component(name)) {
        (Lookup::Found(ty), _) => &ty.methods,
        (_, Lookup::Found(component)) => &component.methods,
        _ => {
            state.defer(decl.id(), name);
            return None;
        }
    };
    let provisions = methods
        .iter()
        .filter(|m| m.params.is_empty())
        .filter_map(|m| {
            let returns = m.returns.as_ref()?;
            Some(DependencyProvision {
                id: m.id(name),
                key: BindingKey::qualified(returns.clone(), m.annotations.qualifier()),
                nullable: m.annotations.is_nullable(),
            })
        })
        .collect();
    Some(ComponentDependency {
        ty: TypeRef::named(name),
        provisions,
    })
}

/// Classifies one component method as a provision, members-injection or
/// subcomponent factory entry point.
fn classify_method(
    owner: &str,
    method: &MethodDecl,
    index: &DeclarationIndex<'_>,
    options: ParseOptions,
    state: &mut ParseState,
    subcomponents: &mut Vec<SubcomponentRef>,
) -> Option<EntryPoint> {
    let id = method.id(owner);
    if options.keyword_validation && is_reserved_keyword(&method.name) {
        state.error(Diagnostic::new(
            ErrorKind::MalformedDeclaration,
            id.clone(),
            format!("method name '{}' is a reserved keyword", method.name),
        ));
        return None;
    }
    if method.annotations.qualifiers.len() > 1 {
        state.error(Diagnostic::new(
            ErrorKind::MalformedDeclaration,
            id.clone(),
            "may not use more than one @Qualifier".to_string(),
        ));
        return None;
    }

    for ty in method.returns.iter().chain(method.params.iter().map(|p| &p.ty)) {
        if index.is_unresolved(ty) {
            state.defer(id.clone(), ty.to_string());
            return None;
        }
    }

    if let Some(returns) = &method.returns
        && let Some(subcomponent) = subcomponent_of(returns, index)
    {
        push_subcomponent(
            subcomponents,
            &subcomponent,
            SubcomponentSource::FactoryMethod(id.clone()),
        );
        // Returning the creator is a plain provision of the creator binding.
        if returns.name() != subcomponent {
            return Some(provision(id, method, returns));
        }
        return Some(EntryPoint {
            id,
            name: method.name.clone(),
            kind: EntryPointKind::SubcomponentFactory(subcomponent),
        });
    }

    let kind = match (method.params.as_slice(), &method.returns) {
        ([], Some(returns)) => return Some(provision(id, method, returns)),
        ([param], None) => EntryPointKind::MembersInjection(param.ty.clone()),
        ([param], Some(returns)) if *returns == param.ty => {
            EntryPointKind::MembersInjection(param.ty.clone())
        }
        _ => {
            state.error(
                Diagnostic::new(
                    ErrorKind::MalformedDeclaration,
                    id,
                    format!(
                        "component method {} is ambiguous: it is neither a provision method nor a members-injection method",
                        method.signature()
                    ),
                )
                .with_note(
                    "provision methods take no parameters; members-injection methods take one parameter and return void or that parameter"
                        .to_string(),
                ),
            );
            return None;
        }
    };
    Some(EntryPoint {
        id,
        name: method.name.clone(),
        kind,
    })
}

fn provision(id: DeclarationId, method: &MethodDecl, returns: &TypeRef) -> EntryPoint {
    let request = DependencyRequest::for_type(returns, method.annotations.qualifier())
        .with_element(&method.name)
        .with_nullable(method.annotations.is_nullable());
    EntryPoint {
        id,
        name: method.name.clone(),
        kind: EntryPointKind::Provision(request),
    }
}

/// Name of the subcomponent `ty` creates, if `ty` is a subcomponent or the
/// creator of one.
fn subcomponent_of(ty: &TypeRef, index: &DeclarationIndex<'_>) -> Option<String> {
    if let Lookup::Found(component) = index.component(ty.name()) {
        return (component.kind == ComponentKind::Subcomponent).then(|| component.name.clone());
    }
    let (owner, _) = ty.name().rsplit_once('.')?;
    match index.component(owner) {
        Lookup::Found(component)
            if component.kind == ComponentKind::Subcomponent
                && component.creator.as_ref().is_some_and(|c| c.name == ty.name()) =>
        {
            Some(component.name.clone())
        }
        _ => None,
    }
}

fn push_subcomponent(refs: &mut Vec<SubcomponentRef>, name: &str, source: SubcomponentSource) {
    if !refs.iter().any(|r| r.name == name) {
        refs.push(SubcomponentRef {
            name: name.to_string(),
            source,
        });
    }
}
