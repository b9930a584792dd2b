//! Declaration manifests.
//!
//! A manifest is the YAML form of one round's [`DeclarationSet`]:
//!
//! ```yaml
//! apiVersion: dagger/v1
//! kind: Declarations
//!
//! types:
//!   - name: app.Heater
//!     kind: interface
//! modules:
//!   - name: app.HeaterModule
//!     methods: [...]
//! components:
//!   - name: app.CoffeeComponent
//!     modules: [app.HeaterModule]
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use dagger_model::declaration::DeclarationSet;

use crate::options::API_VERSION;

/// Errors that can occur when loading a manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read manifest file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("failed to parse manifest YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("invalid apiVersion: expected 'dagger/v1', got '{0}'")]
    InvalidApiVersion(String),

    #[error("invalid kind: expected 'Declarations', got '{0}'")]
    InvalidKind(String),
}

pub type ManifestResult<T> = Result<T, ManifestError>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeclarationManifest {
    #[serde(default = "default_api_version")]
    pub api_version: String,

    #[serde(default = "default_kind")]
    pub kind: String,

    #[serde(flatten)]
    pub declarations: DeclarationSet,
}

fn default_api_version() -> String {
    API_VERSION.to_string()
}

fn default_kind() -> String {
    "Declarations".to_string()
}

impl DeclarationManifest {
    pub fn new(declarations: DeclarationSet) -> Self {
        Self {
            api_version: default_api_version(),
            kind: default_kind(),
            declarations,
        }
    }

    /// Load a manifest from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> ManifestResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse a manifest from a YAML string.
    pub fn from_yaml(yaml: &str) -> ManifestResult<Self> {
        let manifest: DeclarationManifest = serde_yaml::from_str(yaml)?;
        manifest.validate_schema()?;
        Ok(manifest)
    }

    fn validate_schema(&self) -> ManifestResult<()> {
        if self.api_version != API_VERSION {
            return Err(ManifestError::InvalidApiVersion(self.api_version.clone()));
        }
        if self.kind != "Declarations" {
            return Err(ManifestError::InvalidKind(self.kind.clone()));
        }
        Ok(())
    }

    pub fn into_declarations(self) -> DeclarationSet {
        self.declarations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const MANIFEST: &str = r#"
apiVersion: dagger/v1
kind: Declarations
types:
  - name: app.Clock
    inject: []
components:
  - name: app.AppComponent
    methods:
      - name: clock
        returns: app.Clock
"#;

    #[test]
    fn test_manifest_from_yaml() {
        let manifest = DeclarationManifest::from_yaml(MANIFEST).unwrap();
        assert_eq!(manifest.api_version, API_VERSION);
        let declarations = manifest.into_declarations();
        assert_eq!(declarations.types.len(), 1);
        assert_eq!(declarations.components[0].name, "app.AppComponent");
    }

    #[test]
    fn test_header_is_optional() {
        let manifest = DeclarationManifest::from_yaml("types: []").unwrap();
        assert_eq!(manifest.kind, "Declarations");
        assert!(manifest.declarations.is_empty());
    }

    #[test]
    fn test_invalid_header() {
        assert!(matches!(
            DeclarationManifest::from_yaml("apiVersion: v0\n"),
            Err(ManifestError::InvalidApiVersion(v)) if v == "v0"
        ));
        assert!(matches!(
            DeclarationManifest::from_yaml("kind: CompilerOptions\n"),
            Err(ManifestError::InvalidKind(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(MANIFEST.as_bytes()).unwrap();

        let manifest = DeclarationManifest::load(file.path()).unwrap();
        assert_eq!(manifest.declarations.components.len(), 1);

        let missing = DeclarationManifest::load(file.path().with_extension("missing"));
        assert!(matches!(missing, Err(ManifestError::IoError(_))));
    }
}
