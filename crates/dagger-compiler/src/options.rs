//! Compiler options.
//!
//! Options are read from a YAML document:
//!
//! ```yaml
//! apiVersion: dagger/v1
//! kind: CompilerOptions
//!
//! fastInit: false
//! switchingThreshold: 64
//! casesPerSwitch: 100
//! keysPerComponentShard: 3500
//! nullableValidation: error
//! orphanedModuleValidation: warning
//! explicitBindingConflictsWithInject: none
//! keywordValidation: true
//! parallelComponents: true
//! ```
//!
//! Every field is optional; missing fields take the defaults shown.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use dagger_codegen::CodegenOptions;
use dagger_graph::ValidationOptions;
use dagger_model::error::Severity;
use dagger_model::parse::ParseOptions;

pub const API_VERSION: &str = "dagger/v1";

/// Errors that can occur when loading compiler options.
#[derive(Debug, Error)]
pub enum OptionsError {
    #[error("failed to read options file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("failed to parse options YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("invalid apiVersion: expected 'dagger/v1', got '{0}'")]
    InvalidApiVersion(String),

    #[error("invalid kind: expected 'CompilerOptions', got '{0}'")]
    InvalidKind(String),

    #[error("invalid value for {field}: {message}")]
    InvalidValue {
        field: &'static str,
        message: String,
    },
}

pub type OptionsResult<T> = Result<T, OptionsError>;

/// Reporting level of a configurable check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationLevel {
    Error,
    Warning,
    None,
}

impl ValidationLevel {
    pub fn severity(self) -> Option<Severity> {
        match self {
            ValidationLevel::Error => Some(Severity::Error),
            ValidationLevel::Warning => Some(Severity::Warning),
            ValidationLevel::None => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompilerOptions {
    pub api_version: String,
    pub kind: String,
    /// Always use switch dispatch.
    pub fast_init: bool,
    pub switching_threshold: usize,
    pub cases_per_switch: usize,
    pub keys_per_component_shard: usize,
    pub nullable_validation: ValidationLevel,
    /// `warning` or `none`.
    pub orphaned_module_validation: ValidationLevel,
    pub explicit_binding_conflicts_with_inject: ValidationLevel,
    pub keyword_validation: bool,
    /// Process independent root components in parallel.
    pub parallel_components: bool,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        let codegen = CodegenOptions::default();
        Self {
            api_version: API_VERSION.to_string(),
            kind: "CompilerOptions".to_string(),
            fast_init: codegen.fast_init,
            switching_threshold: codegen.switching_threshold,
            cases_per_switch: codegen.cases_per_switch,
            keys_per_component_shard: codegen.keys_per_component_shard,
            nullable_validation: ValidationLevel::Error,
            orphaned_module_validation: ValidationLevel::Warning,
            explicit_binding_conflicts_with_inject: ValidationLevel::None,
            keyword_validation: true,
            parallel_components: true,
        }
    }
}

impl CompilerOptions {
    /// Load options from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> OptionsResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse options from a YAML string.
    pub fn from_yaml(yaml: &str) -> OptionsResult<Self> {
        let options: CompilerOptions = serde_yaml::from_str(yaml)?;
        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> OptionsResult<()> {
        if self.api_version != API_VERSION {
            return Err(OptionsError::InvalidApiVersion(self.api_version.clone()));
        }
        if self.kind != "CompilerOptions" {
            return Err(OptionsError::InvalidKind(self.kind.clone()));
        }
        if self.cases_per_switch == 0 {
            return Err(OptionsError::InvalidValue {
                field: "casesPerSwitch",
                message: "must be at least 1".to_string(),
            });
        }
        if self.keys_per_component_shard == 0 {
            return Err(OptionsError::InvalidValue {
                field: "keysPerComponentShard",
                message: "must be at least 1".to_string(),
            });
        }
        if self.orphaned_module_validation == ValidationLevel::Error {
            return Err(OptionsError::InvalidValue {
                field: "orphanedModuleValidation",
                message: "expected 'warning' or 'none'".to_string(),
            });
        }
        Ok(())
    }

    pub fn codegen(&self) -> CodegenOptions {
        CodegenOptions {
            fast_init: self.fast_init,
            switching_threshold: self.switching_threshold,
            cases_per_switch: self.cases_per_switch,
            keys_per_component_shard: self.keys_per_component_shard,
        }
    }

    pub fn validation(&self) -> ValidationOptions {
        ValidationOptions {
            nullable: self.nullable_validation.severity(),
            explicit_binding_conflicts_with_inject: self
                .explicit_binding_conflicts_with_inject
                .severity(),
            orphaned_module: self.orphaned_module_validation.severity(),
        }
    }

    pub fn parse(&self) -> ParseOptions {
        ParseOptions {
            keyword_validation: self.keyword_validation,
        }
    }

    pub fn with_fast_init(mut self, fast_init: bool) -> Self {
        self.fast_init = fast_init;
        self
    }

    pub fn with_parallel_components(mut self, parallel: bool) -> Self {
        self.parallel_components = parallel;
        self
    }

    pub fn with_nullable_validation(mut self, level: ValidationLevel) -> Self {
        self.nullable_validation = level;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_from_yaml() {
        let yaml = r#"
apiVersion: dagger/v1
kind: CompilerOptions
fastInit: true
casesPerSwitch: 10
nullableValidation: warning
explicitBindingConflictsWithInject: error
"#;
        let options = CompilerOptions::from_yaml(yaml).unwrap();
        assert!(options.fast_init);
        assert_eq!(options.cases_per_switch, 10);
        assert_eq!(options.switching_threshold, 64);

        let validation = options.validation();
        assert_eq!(validation.nullable, Some(Severity::Warning));
        assert_eq!(
            validation.explicit_binding_conflicts_with_inject,
            Some(Severity::Error)
        );
        assert_eq!(validation.orphaned_module, Some(Severity::Warning));
        assert!(options.codegen().fast_init);
    }

    #[test]
    fn test_missing_header_uses_defaults() {
        let options = CompilerOptions::from_yaml("keywordValidation: false").unwrap();
        assert_eq!(options.api_version, API_VERSION);
        assert!(!options.parse().keyword_validation);
    }

    #[test]
    fn test_invalid_api_version() {
        let result = CompilerOptions::from_yaml("apiVersion: dagger/v2\nkind: CompilerOptions\n");
        assert!(matches!(result, Err(OptionsError::InvalidApiVersion(_))));
    }

    #[test]
    fn test_invalid_kind() {
        let result = CompilerOptions::from_yaml("apiVersion: dagger/v1\nkind: Declarations\n");
        assert!(matches!(result, Err(OptionsError::InvalidKind(_))));
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            CompilerOptions::from_yaml("casesPerSwitch: 0"),
            Err(OptionsError::InvalidValue { field: "casesPerSwitch", .. })
        ));
        assert!(matches!(
            CompilerOptions::from_yaml("orphanedModuleValidation: error"),
            Err(OptionsError::InvalidValue { field: "orphanedModuleValidation", .. })
        ));
        assert!(matches!(
            CompilerOptions::from_yaml("nullableValidation: sometimes"),
            Err(OptionsError::YamlError(_))
        ));
    }
}
