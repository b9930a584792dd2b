//! Dependency requests.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{BindingKey, Qualifier, TypeRef};

/// How a dependency is requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RequestKind {
    /// `T`
    Instance,
    /// `Provider<T>`
    Provider,
    /// `Lazy<T>`
    Lazy,
    /// `Provider<Lazy<T>>`
    ProviderOfLazy,
    /// Members-injection of an existing instance (`void inject(T)`).
    MembersInjection,
}

impl RequestKind {
    /// Whether resolution of the request is deferred until runtime.
    ///
    /// Deferred requests do not impose construction order and may close
    /// dependency cycles.
    pub fn is_deferred(self) -> bool {
        matches!(
            self,
            RequestKind::Provider | RequestKind::Lazy | RequestKind::ProviderOfLazy
        )
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RequestKind::Instance => "instance",
            RequestKind::Provider => "provider",
            RequestKind::Lazy => "lazy",
            RequestKind::ProviderOfLazy => "provider of lazy",
            RequestKind::MembersInjection => "members injection",
        };
        f.write_str(name)
    }
}

/// A request for a binding key made by a binding or an entry point.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DependencyRequest {
    pub key: BindingKey,
    pub kind: RequestKind,
    /// The requesting element accepts `null`.
    #[serde(default)]
    pub nullable: bool,
    /// Parameter or field name of the requesting element.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element: Option<String>,
}

impl DependencyRequest {
    /// Plain instance request for `key`.
    pub fn instance(key: BindingKey) -> Self {
        Self {
            key,
            kind: RequestKind::Instance,
            nullable: false,
            element: None,
        }
    }

    /// Request derived from a declared type, unwrapping `Provider<T>`,
    /// `Lazy<T>` and `Provider<Lazy<T>>`.
    pub fn for_type(ty: &TypeRef, qualifier: Option<Qualifier>) -> Self {
        let (kind, target) = if ty.is_provider() {
            let inner = ty.args()[0].clone();
            if inner.is_lazy() {
                (RequestKind::ProviderOfLazy, inner.args()[0].clone())
            } else {
                (RequestKind::Provider, inner)
            }
        } else if ty.is_lazy() {
            (RequestKind::Lazy, ty.args()[0].clone())
        } else {
            (RequestKind::Instance, ty.clone())
        };
        Self {
            key: BindingKey::qualified(target, qualifier),
            kind,
            nullable: false,
            element: None,
        }
    }

    pub fn with_element(mut self, element: impl Into<String>) -> Self {
        self.element = Some(element.into());
        self
    }

    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    pub fn is_deferred(&self) -> bool {
        self.kind.is_deferred()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_request_unwraps() {
        let ty = TypeRef::parse("Provider<app.Foo>").unwrap();
        let request = DependencyRequest::for_type(&ty, None);
        assert_eq!(request.kind, RequestKind::Provider);
        assert_eq!(request.key.ty, TypeRef::named("app.Foo"));
        assert!(request.is_deferred());
    }

    #[test]
    fn test_provider_of_lazy_request() {
        let ty = TypeRef::parse("Provider<Lazy<app.Foo>>").unwrap();
        let request = DependencyRequest::for_type(&ty, None);
        assert_eq!(request.kind, RequestKind::ProviderOfLazy);
        assert_eq!(request.key.ty, TypeRef::named("app.Foo"));
    }

    #[test]
    fn test_members_injector_is_a_plain_key() {
        let ty = TypeRef::parse("MembersInjector<app.Foo>").unwrap();
        let request = DependencyRequest::for_type(&ty, None);
        assert_eq!(request.kind, RequestKind::Instance);
        assert!(request.key.ty.is_members_injector());
    }
}
