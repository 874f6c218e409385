//! Checker configuration, loadable from TOML.
//!
//! ```toml
//! literal_mismatch_severity = "warning"
//! comparison_severity = "warning"
//! assignment_severity = "error"
//! report_branch_mismatch = true
//! ```

use std::path::Path;

use serde::Deserialize;

use crate::error::Severity;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TypeckConfig {
    /// Severity of a literal checked against a type it cannot have.
    pub literal_mismatch_severity: Severity,
    /// Severity of `==`/`!=` between operands of provably different types.
    pub comparison_severity: Severity,
    /// Severity of an assignment whose value does not fit its target.
    pub assignment_severity: Severity,
    /// Whether the two branches of a conditional must agree.
    pub report_branch_mismatch: bool,
}

impl Default for TypeckConfig {
    fn default() -> Self {
        TypeckConfig {
            literal_mismatch_severity: Severity::Warning,
            comparison_severity: Severity::Warning,
            assignment_severity: Severity::Error,
            report_branch_mismatch: true,
        }
    }
}

impl TypeckConfig {
    pub fn from_file(path: &Path) -> Result<TypeckConfig, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<TypeckConfig, String> {
        toml::from_str(content).map_err(|e| format!("Failed to parse checker config: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config = TypeckConfig::from_toml_str("").unwrap();
        assert_eq!(config, TypeckConfig::default());
        assert_eq!(config.literal_mismatch_severity, Severity::Warning);
        assert_eq!(config.assignment_severity, Severity::Error);
        assert!(config.report_branch_mismatch);
    }

    #[test]
    fn overrides_are_applied() {
        let toml = r#"
comparison_severity = "error"
report_branch_mismatch = false
"#;
        let config = TypeckConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.comparison_severity, Severity::Error);
        assert!(!config.report_branch_mismatch);
        assert_eq!(config.literal_mismatch_severity, Severity::Warning);
    }

    #[test]
    fn unknown_keys_and_bad_values_are_rejected() {
        let err = TypeckConfig::from_toml_str("strict = true").unwrap_err();
        assert!(err.starts_with("Failed to parse checker config"), "{}", err);

        assert!(TypeckConfig::from_toml_str("comparison_severity = \"fatal\"").is_err());
    }

    #[test]
    fn missing_file_reports_path() {
        let err = TypeckConfig::from_file(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(err.contains("/definitely/not/here.toml"), "{}", err);
    }
}
