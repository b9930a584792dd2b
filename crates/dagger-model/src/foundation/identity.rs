//! Stable declaration identities.
//!
//! Every declaration supplied by the host compiler carries an identity made of
//! the fully-qualified name of its enclosing type plus an optional member
//! signature. Identities are used as diagnostic anchors and as memoization keys
//! across incremental processing rounds.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identity of one annotated declaration.
///
/// # Examples
///
/// ```
/// # use dagger_model::foundation::DeclarationId;
/// let id = DeclarationId::member("app.AppModule", "provideClock()");
/// assert_eq!(id.to_string(), "app.AppModule#provideClock()");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeclarationId {
    /// Fully-qualified name of the enclosing type.
    pub owner: String,
    /// Member signature, absent for type-level declarations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub member: Option<String>,
}

impl DeclarationId {
    /// Identity of a type-level declaration.
    pub fn of_type(owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            member: None,
        }
    }

    /// Identity of a member of `owner`.
    pub fn member(owner: impl Into<String>, member: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            member: Some(member.into()),
        }
    }

    /// Placeholder identity for diagnostics not tied to any declaration.
    pub fn unknown() -> Self {
        Self::of_type("<unknown>")
    }

    /// Simple name of the owner (segment after the last `.`).
    pub fn owner_simple_name(&self) -> &str {
        self.owner.rsplit('.').next().unwrap_or(&self.owner)
    }
}

impl fmt::Display for DeclarationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.member {
            Some(member) => write!(f, "{}#{}", self.owner, member),
            None => write!(f, "{}", self.owner),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_identity_display() {
        assert_eq!(DeclarationId::of_type("app.Foo").to_string(), "app.Foo");
    }

    #[test]
    fn test_member_identity_display() {
        let id = DeclarationId::member("app.AppModule", "provideFoo(app.Bar)");
        assert_eq!(id.to_string(), "app.AppModule#provideFoo(app.Bar)");
        assert_eq!(id.owner_simple_name(), "AppModule");
    }
}
