//! Declaration parsing.
//!
//! Converts raw declaration records into module and component
//! specifications. Parsing never stops at the first problem: every method of
//! a module or component is checked and all malformed-declaration
//! diagnostics are returned together.
//!
//! A declaration that references something the symbol table cannot supply
//! yet (a module, component or type still being generated) is *deferred*
//! rather than rejected. Deferral is reported through its own variant so
//! that callers never surface it as a user-facing failure.

mod component;
mod injectable;
mod keywords;
mod module;

use std::fmt;

use thiserror::Error;

use crate::error::Diagnostic;
use crate::foundation::DeclarationId;

pub use component::parse_component;
pub use injectable::{injection_binding, members_injector_binding};
pub use keywords::is_reserved_keyword;
pub use module::{install_binding_module, parse_module};

/// Why a declaration could not be turned into a specification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeclarationError {
    /// Structurally invalid annotation usage.
    #[error("{} malformed declaration(s)", .0.len())]
    Malformed(Vec<Diagnostic>),
    /// Required symbol information is not available yet.
    #[error("{0}")]
    Deferred(Deferred),
}

/// A request to retry a declaration in a later round.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Deferred {
    /// Declaration that could not be processed.
    pub element: DeclarationId,
    /// Name of the missing or unresolved symbol.
    pub awaiting: String,
}

impl Deferred {
    pub fn new(element: DeclarationId, awaiting: impl Into<String>) -> Self {
        Self {
            element,
            awaiting: awaiting.into(),
        }
    }
}

impl fmt::Display for Deferred {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} is waiting for {}", self.element, self.awaiting)
    }
}

/// Parsing switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    /// Reject method names that are reserved Java keywords.
    pub keyword_validation: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            keyword_validation: true,
        }
    }
}

/// Accumulates diagnostics and the first deferral while parsing one
/// declaration.
#[derive(Debug, Default)]
pub(crate) struct ParseState {
    pub(crate) diagnostics: Vec<Diagnostic>,
    pub(crate) deferred: Option<Deferred>,
}

impl ParseState {
    pub(crate) fn error(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub(crate) fn defer(&mut self, element: DeclarationId, awaiting: impl Into<String>) {
        if self.deferred.is_none() {
            self.deferred = Some(Deferred::new(element, awaiting));
        }
    }

    /// Deferral wins over malformed diagnostics: more symbol information may
    /// change the verdict.
    pub(crate) fn finish<T>(self, value: T) -> Result<T, DeclarationError> {
        if let Some(deferred) = self.deferred {
            return Err(DeclarationError::Deferred(deferred));
        }
        if crate::error::has_errors(&self.diagnostics) {
            return Err(DeclarationError::Malformed(self.diagnostics));
        }
        Ok(value)
    }
}
