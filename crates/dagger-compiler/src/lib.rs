//! Dagger compiler facade.
//!
//! Ties the phase crates together: declarations come in through a
//! [`DeclarationManifest`] or an in-memory [`DeclarationSet`], a
//! [`Processor`] runs them through graph building, validation and code
//! generation round by round, and every component ends up generated,
//! failed or deferred in a [`RoundReport`].
//!
//! ```no_run
//! use dagger_compiler::{CompilerOptions, DeclarationManifest, compile};
//!
//! let manifest = DeclarationManifest::load("declarations.yaml").unwrap();
//! let report = compile(&manifest.declarations, &CompilerOptions::default());
//! if report.has_errors() {
//!     eprintln!("{}", report.format_diagnostics());
//! }
//! ```

pub mod manifest;
pub mod options;
pub mod processor;

pub use manifest::{DeclarationManifest, ManifestError, ManifestResult};
pub use options::{API_VERSION, CompilerOptions, OptionsError, OptionsResult, ValidationLevel};
pub use processor::{
    ComponentOutcome, ComponentReport, Processor, RoundKind, RoundReport, compile,
};

pub use dagger_codegen::{ComponentImplementation, FactorySpecification};
pub use dagger_model::declaration::DeclarationSet;
pub use dagger_model::error::{Diagnostic, DiagnosticFormatter, ErrorKind, Severity};
