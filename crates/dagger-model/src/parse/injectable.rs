//! Implicit bindings of injectable types.

use super::module::param_request;
use super::{DeclarationError, ParseState};
use crate::binding::{Binding, BindingKind};
use crate::declaration::{DeclarationIndex, TypeDecl};
use crate::error::{Diagnostic, ErrorKind};
use crate::foundation::{BindingKey, TypeRef};

/// The constructor-injection binding of `decl`, or `None` if the type has no
/// `@Inject` constructor.
///
/// The binding depends on the constructor parameters followed by the
/// injected members.
pub fn injection_binding(
    decl: &TypeDecl,
    index: &DeclarationIndex<'_>,
) -> Result<Option<Binding>, DeclarationError> {
    let Some(params) = &decl.inject else {
        return Ok(None);
    };
    let mut state = ParseState::default();
    let origin = decl.constructor_id();

    if decl.is_abstract() {
        state.error(Diagnostic::new(
            ErrorKind::MalformedDeclaration,
            origin.clone(),
            format!("@Inject constructors are not allowed on abstract type {}", decl.name),
        ));
    }
    if !decl.annotations.qualifiers.is_empty() {
        state.error(Diagnostic::new(
            ErrorKind::MalformedDeclaration,
            decl.id(),
            format!(
                "@Qualifier annotations are not allowed on @Inject types, found {} on {}",
                decl.annotations.qualifiers[0], decl.name
            ),
        ));
    }
    if decl.annotations.scopes.len() > 1 {
        state.error(Diagnostic::new(
            ErrorKind::MalformedDeclaration,
            decl.id(),
            format!("{} cannot use more than one @Scope", decl.name),
        ));
    }
    for param in params.iter().chain(&decl.members) {
        if param.annotations.qualifiers.len() > 1 {
            state.error(Diagnostic::new(
                ErrorKind::MalformedDeclaration,
                origin.clone(),
                format!("'{}' may not use more than one @Qualifier", param.name),
            ));
        }
        if index.is_unresolved(&param.ty) {
            state.defer(origin.clone(), param.ty.to_string());
        }
    }

    let dependencies = params
        .iter()
        .chain(&decl.members)
        .map(param_request)
        .collect();
    let binding = Binding::new(
        BindingKey::of(TypeRef::named(&decl.name)),
        BindingKind::Injection,
        origin,
    )
    .with_scope(decl.annotations.scope())
    .with_dependencies(dependencies);

    state.finish(Some(binding))
}

/// The `MembersInjector<T>` binding of `decl`.
pub fn members_injector_binding(
    decl: &TypeDecl,
    index: &DeclarationIndex<'_>,
) -> Result<Binding, DeclarationError> {
    let mut state = ParseState::default();
    for member in &decl.members {
        if index.is_unresolved(&member.ty) {
            state.defer(decl.id(), member.ty.to_string());
        }
    }
    let binding = Binding::new(
        BindingKey::of(TypeRef::members_injector_of(TypeRef::named(&decl.name))),
        BindingKind::MembersInjector,
        decl.id(),
    )
    .with_dependencies(decl.members.iter().map(param_request).collect());
    state.finish(binding)
}
