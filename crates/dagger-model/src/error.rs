//! Compile-time diagnostics.
//!
//! Every problem found while parsing declarations, building binding graphs
//! or validating them is reported as a [`Diagnostic`]. Diagnostics are
//! accumulated, never thrown, so one processing round surfaces as many
//! independent problems as possible.
//!
//! # Design
//!
//! - `Diagnostic` - single report anchored at a declaration identity
//! - `ErrorKind` - categorizes diagnostics by the check that produced them
//! - `Severity` - error, warning, or note
//! - `DiagnosticFormatter` - renders diagnostics as text blocks
//!
//! # Examples
//!
//! ```
//! # use dagger_model::error::*;
//! # use dagger_model::foundation::DeclarationId;
//! let diagnostic = Diagnostic::new(
//!     ErrorKind::DuplicateBinding,
//!     DeclarationId::member("app.AppModule", "provideFoo()"),
//!     "app.Foo is bound multiple times".to_string(),
//! );
//! assert!(diagnostic.is_error());
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::foundation::DeclarationId;

/// A diagnostic associated with one declaration.
///
/// Each diagnostic has:
/// - Associated declaration (where the problem is reported)
/// - Kind (which check produced it)
/// - Message (human-readable explanation)
/// - Optional secondary labels (related declarations)
/// - Optional notes (additional context or suggestions)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: ErrorKind,
    pub severity: Severity,
    /// Declaration the diagnostic is reported against.
    pub declaration: DeclarationId,
    pub message: String,
    /// Related declarations (e.g. every conflicting binding site).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<Label>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
}

/// Category of a diagnostic.
///
/// # Invariant
///
/// The discriminant values must match the `ERROR_KIND_NAMES` indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum ErrorKind {
    // Declaration model
    /// Structurally invalid annotation usage
    MalformedDeclaration = 0,

    // Graph validation
    /// No binding satisfies a requested key
    MissingBinding = 1,
    /// More than one non-multibinding candidate for a key
    DuplicateBinding = 2,
    /// Unique bindings and multibinding contributions share a key
    ConflictingBindingKinds = 3,
    /// Dependency cycle with no deferred edge
    CyclicDependency = 4,
    /// Binding scope incompatible with its component
    ScopeMismatch = 5,
    /// Installed module with no reachable declaration
    OrphanedModule = 6,
    /// Nullable binding injected into a non-nullable request
    NullableMismatch = 7,
    /// Explicit binding shadows an `@Inject` constructor
    ExplicitBindingConflict = 8,

    // Orchestration
    /// Declaration still deferred when processing finished
    UnresolvedDeclaration = 9,

    /// Internal compiler error (bug in the compiler)
    Internal = 10,
}

const ERROR_KIND_NAMES: &[&str] = &[
    "malformed declaration",     // 0: MalformedDeclaration
    "missing binding",           // 1: MissingBinding
    "duplicate binding",         // 2: DuplicateBinding
    "conflicting binding kinds", // 3: ConflictingBindingKinds
    "dependency cycle",          // 4: CyclicDependency
    "scope mismatch",            // 5: ScopeMismatch
    "orphaned module",           // 6: OrphanedModule
    "nullable mismatch",         // 7: NullableMismatch
    "explicit binding conflict", // 8: ExplicitBindingConflict
    "unresolved declaration",    // 9: UnresolvedDeclaration
    "internal compiler error",   // 10: Internal
];

/// Diagnostic severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational note
    Note,
    /// Advisory, never blocks generation
    Warning,
    /// Blocks generation for the affected component
    Error,
}

/// Secondary declaration referenced by a diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub declaration: DeclarationId,
    pub message: String,
}

impl Diagnostic {
    /// Creates a new error diagnostic.
    pub fn new(kind: ErrorKind, declaration: DeclarationId, message: String) -> Self {
        Self::with_severity(kind, Severity::Error, declaration, message)
    }

    /// Creates a new warning diagnostic.
    pub fn warning(kind: ErrorKind, declaration: DeclarationId, message: String) -> Self {
        Self::with_severity(kind, Severity::Warning, declaration, message)
    }

    /// Creates a new note diagnostic.
    pub fn note(kind: ErrorKind, declaration: DeclarationId, message: String) -> Self {
        Self::with_severity(kind, Severity::Note, declaration, message)
    }

    /// Creates a diagnostic with an explicit severity.
    pub fn with_severity(
        kind: ErrorKind,
        severity: Severity,
        declaration: DeclarationId,
        message: String,
    ) -> Self {
        Self {
            kind,
            severity,
            declaration,
            message,
            labels: Vec::new(),
            notes: Vec::new(),
        }
    }

    /// Adds a secondary labeled declaration.
    pub fn with_label(mut self, declaration: DeclarationId, message: String) -> Self {
        self.labels.push(Label {
            declaration,
            message,
        });
        self
    }

    /// Adds a note or hint.
    pub fn with_note(mut self, note: String) -> Self {
        self.notes.push(note);
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl ErrorKind {
    /// Human-readable name for this kind.
    pub fn name(self) -> &'static str {
        ERROR_KIND_NAMES[self as usize]
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Note => write!(f, "note"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {}: {}",
            self.severity,
            self.kind.name(),
            self.message
        )
    }
}

impl std::error::Error for Diagnostic {}

/// Returns true if any diagnostic in `diagnostics` is an error.
pub fn has_errors(diagnostics: &[Diagnostic]) -> bool {
    diagnostics.iter().any(Diagnostic::is_error)
}

/// Formats diagnostics as multi-line text blocks.
///
/// ```text
/// error: missing binding: app.Foo cannot be provided ...
///   --> app.AppComponent#foo()
///    = note: requested here
///      at app.Bar
///    = help: add a binding for app.Foo
/// ```
#[derive(Debug, Clone, Copy)]
pub struct DiagnosticFormatter {
    show_labels: bool,
}

impl Default for DiagnosticFormatter {
    fn default() -> Self {
        Self { show_labels: true }
    }
}

impl DiagnosticFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Header and location only.
    pub fn compact() -> Self {
        Self { show_labels: false }
    }

    /// Formats a single diagnostic.
    pub fn format(&self, diagnostic: &Diagnostic) -> String {
        let mut output = String::new();

        output.push_str(&format!(
            "{}: {}: {}\n",
            diagnostic.severity,
            diagnostic.kind.name(),
            diagnostic.message
        ));
        output.push_str(&format!("  --> {}\n", diagnostic.declaration));

        if self.show_labels {
            for label in &diagnostic.labels {
                output.push_str(&format!("   = note: {}\n", label.message));
                output.push_str(&format!("     at {}\n", label.declaration));
            }
            for note in &diagnostic.notes {
                output.push_str(&format!("   = help: {}\n", note));
            }
        }

        output
    }

    /// Formats multiple diagnostics separated by blank lines.
    pub fn format_all(&self, diagnostics: &[Diagnostic]) -> String {
        diagnostics
            .iter()
            .map(|d| self.format(d))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
