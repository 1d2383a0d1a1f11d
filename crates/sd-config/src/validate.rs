//! Semantic validation of detection settings.
//!
//! Findings here are advisory: a loaded configuration is never rejected,
//! callers decide whether to warn or refuse an operation.

use crate::detection::{DetectionConfig, GroupMapping};
use thiserror::Error;

/// Validation result type.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Detection configuration validation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Semantic validation failed: {0}")]
    SemanticError(String),
}

impl ValidationError {
    /// Error code for structured error reporting.
    pub fn code(&self) -> u32 {
        match self {
            ValidationError::InvalidValue { .. } => 65,
            ValidationError::SemanticError(_) => 63,
        }
    }
}

/// Validate a group mapping for the active pattern family.
///
/// Indices are 1-based, so 0 is never valid. Fields in use must not share
/// a capture group.
pub fn validate_group_mapping(
    mapping: &GroupMapping,
    environment_extraction: bool,
) -> ValidationResult<()> {
    let mut fields = vec![("store", mapping.store), ("workstation", mapping.workstation)];
    if environment_extraction {
        fields.insert(0, ("env", mapping.env));
    }

    for (name, index) in &fields {
        if *index == 0 {
            return Err(ValidationError::InvalidValue {
                field: format!("hostname_detection.group_mapping.{}", name),
                message: "Group indices are 1-based, got 0".to_string(),
            });
        }
    }

    for (i, (a, ia)) in fields.iter().enumerate() {
        for (b, ib) in fields.iter().skip(i + 1) {
            if ia == ib {
                return Err(ValidationError::SemanticError(format!(
                    "group_mapping.{} and group_mapping.{} both reference group {}",
                    a, b, ia
                )));
            }
        }
    }

    Ok(())
}

/// Validate path-bearing fields that end up inside generated scripts.
fn validate_script_safe(field: &str, value: &str) -> ValidationResult<()> {
    if value.contains(['\n', '\r', '\0']) {
        return Err(ValidationError::InvalidValue {
            field: field.to_string(),
            message: "Must not contain line breaks or NUL characters".to_string(),
        });
    }
    Ok(())
}

/// Collect every finding for a detection configuration.
pub fn validate_detection(config: &DetectionConfig) -> Vec<ValidationError> {
    let mut findings = Vec::new();

    if let Err(e) = validate_group_mapping(
        &config.hostname_detection.group_mapping,
        config.hostname_detection.environment_extraction_enabled,
    ) {
        findings.push(e);
    }

    if let Err(e) = validate_script_safe("base_directory", &config.base_directory) {
        findings.push(e);
    }
    for (component, name) in &config.custom_filenames {
        if let Err(e) = validate_script_safe(&format!("custom_filenames.{}", component), name) {
            findings.push(e);
        }
        if name.contains(['/', '\\']) {
            findings.push(ValidationError::InvalidValue {
                field: format!("custom_filenames.{}", component),
                message: "Filename must not contain path separators".to_string(),
            });
        }
    }
    for (component, path) in &config.detection_files {
        if let Err(e) = validate_script_safe(&format!("detection_files.{}", component), path) {
            findings.push(e);
        }
    }

    if config.file_detection_enabled
        && !config.use_base_directory
        && config.detection_files.values().all(|p| p.is_empty())
    {
        findings.push(ValidationError::SemanticError(
            "file detection is enabled but no detection_files are configured".to_string(),
        ));
    }

    findings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::ComponentId;

    #[test]
    fn test_default_config_is_clean() {
        assert!(validate_detection(&DetectionConfig::default()).is_empty());
    }

    #[test]
    fn test_zero_index_rejected() {
        let mapping = GroupMapping {
            env: 1,
            store: 0,
            workstation: 2,
        };
        let err = validate_group_mapping(&mapping, false).unwrap_err();
        assert_eq!(err.code(), 65);
    }

    #[test]
    fn test_env_collision_only_checked_when_enabled() {
        let mapping = GroupMapping::for_family(false);
        assert_eq!(mapping.env, mapping.store);
        assert!(validate_group_mapping(&mapping, false).is_ok());
        assert!(validate_group_mapping(&mapping, true).is_err());
    }

    #[test]
    fn test_newline_in_path_flagged() {
        let mut config = DetectionConfig::default();
        config
            .detection_files
            .insert(ComponentId::Pos, "/tmp/a\nrm -rf /".to_string());
        let findings = validate_detection(&config);
        assert!(findings
            .iter()
            .any(|f| matches!(f, ValidationError::InvalidValue { field, .. } if field == "detection_files.POS")));
    }

    #[test]
    fn test_explicit_mode_without_files_flagged() {
        let mut config = DetectionConfig::default();
        config.use_base_directory = false;
        let findings = validate_detection(&config);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].code(), 63);
    }
}
