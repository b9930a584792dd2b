//! Scope annotations.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A lifecycle tag attached to components and bindings.
///
/// `@Reusable` is special: a reusable binding may be memoized in whichever
/// component happens to own it and is never matched against component scopes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Scope(pub String);

impl Scope {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into().trim_start_matches('@').to_string())
    }

    pub fn singleton() -> Self {
        Self::new("Singleton")
    }

    pub fn reusable() -> Self {
        Self::new("Reusable")
    }

    pub fn name(&self) -> &str {
        &self.0
    }

    pub fn is_reusable(&self) -> bool {
        self.0 == "Reusable" || self.0 == "dagger.Reusable"
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}
