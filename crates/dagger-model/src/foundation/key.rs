//! Binding keys: the unit of lookup identity.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{DeclarationId, TypeRef};

/// A qualifier annotation, stored as its source form without the `@`
/// (e.g. `Named("db")`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Qualifier(pub String);

impl Qualifier {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into().trim_start_matches('@').to_string())
    }
}

impl fmt::Display for Qualifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}

/// A `(type, optional qualifier)` pair identifying what a binding provides.
///
/// Multibinding contributions carry the identity of the contributing
/// declaration so that every contribution is its own node while the aggregate
/// lives under the contribution-free key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BindingKey {
    #[serde(rename = "type")]
    pub ty: TypeRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qualifier: Option<Qualifier>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contribution: Option<DeclarationId>,
}

impl BindingKey {
    /// Unqualified key for `ty`.
    pub fn of(ty: TypeRef) -> Self {
        Self {
            ty,
            qualifier: None,
            contribution: None,
        }
    }

    /// Key for `ty` with an optional qualifier.
    pub fn qualified(ty: TypeRef, qualifier: Option<Qualifier>) -> Self {
        Self {
            ty,
            qualifier,
            contribution: None,
        }
    }

    /// Key of one multibinding contribution to this aggregate key.
    pub fn with_contribution(&self, origin: DeclarationId) -> Self {
        Self {
            ty: self.ty.clone(),
            qualifier: self.qualifier.clone(),
            contribution: Some(origin),
        }
    }

    /// The aggregate key a contribution key belongs to.
    pub fn without_contribution(&self) -> Self {
        Self::qualified(self.ty.clone(), self.qualifier.clone())
    }

    pub fn is_contribution(&self) -> bool {
        self.contribution.is_some()
    }

    /// Same qualifier, different type.
    pub fn with_type(&self, ty: TypeRef) -> Self {
        Self::qualified(ty, self.qualifier.clone())
    }

    /// For `Map<K, Provider<V>>` returns the key of `Map<K, V>`.
    pub fn unwrap_provider_map(&self) -> Option<BindingKey> {
        if !self.ty.is_map() {
            return None;
        }
        let value = &self.ty.args()[1];
        if !value.is_provider() {
            return None;
        }
        let inner = value.single_arg()?.clone();
        Some(self.with_type(TypeRef::map_of(self.ty.args()[0].clone(), inner)))
    }

    /// Canonical string used for deterministic ordering.
    pub fn canonical(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for BindingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(qualifier) = &self.qualifier {
            write!(f, "{} ", qualifier)?;
        }
        write!(f, "{}", self.ty)?;
        if let Some(origin) = &self.contribution {
            write!(f, " [contribution {}]", origin)?;
        }
        Ok(())
    }
}
