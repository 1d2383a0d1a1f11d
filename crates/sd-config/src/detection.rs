//! Typed detection configuration.
//!
//! Mirrors the `detection_config` object of the persisted application
//! settings. Full loads use [`DetectionConfig`] with serde defaults;
//! partial updates use [`PartialDetectionConfig`], where every field is
//! optional and only present keys overwrite stored values.

use crate::component::{ComponentId, Dialect};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Windows hostname template for `<prefix>-<store>-<workstation>`.
pub const WINDOWS_TWO_GROUP_TEMPLATE: &str = r"^[^-]+-(\d{4})-(\d{3})$";
/// POSIX ERE hostname template for `<prefix>-<store>-<workstation>`.
pub const POSIX_TWO_GROUP_TEMPLATE: &str = r"^[^-]+-([0-9]{4})-([0-9]{3})$";
/// Windows hostname template for `<env><store>-<workstation>`.
pub const WINDOWS_THREE_GROUP_TEMPLATE: &str = r"^([A-Za-z]+)(\d{4})-(\d{3})$";
/// POSIX ERE hostname template for `<env><store>-<workstation>`.
pub const POSIX_THREE_GROUP_TEMPLATE: &str = r"^([A-Za-z]+)([0-9]{4})-([0-9]{3})$";

/// Default hostname pattern for a dialect and pattern family.
pub fn hostname_template(dialect: Dialect, environment_extraction: bool) -> &'static str {
    match (dialect, environment_extraction) {
        (Dialect::Windows, false) => WINDOWS_TWO_GROUP_TEMPLATE,
        (Dialect::Posix, false) => POSIX_TWO_GROUP_TEMPLATE,
        (Dialect::Windows, true) => WINDOWS_THREE_GROUP_TEMPLATE,
        (Dialect::Posix, true) => POSIX_THREE_GROUP_TEMPLATE,
    }
}

/// Whether `pattern` is one of the built-in templates for `dialect`.
pub fn is_hostname_template(dialect: Dialect, pattern: &str) -> bool {
    pattern == hostname_template(dialect, false) || pattern == hostname_template(dialect, true)
}

/// Root detection configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    pub file_detection_enabled: bool,
    /// Derive file paths from `base_directory` + per-component filename.
    pub use_base_directory: bool,
    /// Empty means "not configured yet"; a platform default is filled in
    /// lazily on the first path lookup.
    pub base_directory: String,
    pub custom_filenames: BTreeMap<ComponentId, String>,
    /// Explicit per-component station file paths, used only when
    /// `use_base_directory` is false.
    pub detection_files: BTreeMap<ComponentId, String>,
    pub hostname_detection: HostnamePolicy,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            file_detection_enabled: true,
            use_base_directory: true,
            base_directory: String::new(),
            custom_filenames: ComponentId::all()
                .iter()
                .map(|c| (*c, c.default_station_filename()))
                .collect(),
            detection_files: BTreeMap::new(),
            hostname_detection: HostnamePolicy::default(),
        }
    }
}

/// How the identity string (hostname) is parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostnamePolicy {
    pub windows_regex: String,
    pub linux_regex: String,
    #[serde(rename = "test_hostname")]
    pub test_identity_string: String,
    pub group_mapping: GroupMapping,
    /// Selects the 3-group family (env, store, workstation) over the
    /// 2-group family (store, workstation).
    pub environment_extraction_enabled: bool,
}

impl Default for HostnamePolicy {
    fn default() -> Self {
        Self {
            windows_regex: WINDOWS_TWO_GROUP_TEMPLATE.to_string(),
            linux_regex: POSIX_TWO_GROUP_TEMPLATE.to_string(),
            test_identity_string: "SHOP-1234-101".to_string(),
            group_mapping: GroupMapping::for_family(false),
            environment_extraction_enabled: false,
        }
    }
}

impl HostnamePolicy {
    pub fn regex(&self, dialect: Dialect) -> &str {
        match dialect {
            Dialect::Windows => &self.windows_regex,
            Dialect::Posix => &self.linux_regex,
        }
    }

    pub fn regex_mut(&mut self, dialect: Dialect) -> &mut String {
        match dialect {
            Dialect::Windows => &mut self.windows_regex,
            Dialect::Posix => &mut self.linux_regex,
        }
    }
}

/// 1-based capture group indices for each logical field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupMapping {
    pub env: usize,
    pub store: usize,
    pub workstation: usize,
}

impl Default for GroupMapping {
    fn default() -> Self {
        Self::for_family(false)
    }
}

impl GroupMapping {
    /// Capture groups a pattern of the 2-group or 3-group family declares.
    pub fn family_group_count(environment_extraction: bool) -> usize {
        if environment_extraction {
            3
        } else {
            2
        }
    }

    /// Default mapping for the 2-group or 3-group pattern family.
    pub fn for_family(environment_extraction: bool) -> Self {
        if environment_extraction {
            Self {
                env: 1,
                store: 2,
                workstation: 3,
            }
        } else {
            Self {
                env: 1,
                store: 1,
                workstation: 2,
            }
        }
    }

    pub fn get(&self, field: GroupField) -> usize {
        match field {
            GroupField::Env => self.env,
            GroupField::Store => self.store,
            GroupField::Workstation => self.workstation,
        }
    }

    pub fn set(&mut self, field: GroupField, index: usize) {
        match field {
            GroupField::Env => self.env = index,
            GroupField::Store => self.store = index,
            GroupField::Workstation => self.workstation = index,
        }
    }

    /// Highest group index referenced by the fields in use.
    pub fn highest_index(&self, environment_extraction: bool) -> usize {
        let base = self.store.max(self.workstation);
        if environment_extraction {
            base.max(self.env)
        } else {
            base
        }
    }
}

/// Logical field extracted from the identity string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupField {
    Env,
    Store,
    Workstation,
}

impl fmt::Display for GroupField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupField::Env => write!(f, "env"),
            GroupField::Store => write!(f, "store"),
            GroupField::Workstation => write!(f, "workstation"),
        }
    }
}

impl FromStr for GroupField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "env" | "environment" => Ok(GroupField::Env),
            "store" => Ok(GroupField::Store),
            "workstation" | "ws" => Ok(GroupField::Workstation),
            _ => Err(format!("unknown group field: {}", s)),
        }
    }
}

/// Partial update of [`DetectionConfig`].
///
/// Component maps are keyed by raw strings so that documents carrying
/// unknown component names still deserialize; unknown keys are skipped
/// when the update is applied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialDetectionConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_detection_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_base_directory: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_directory: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_filenames: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detection_files: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostname_detection: Option<PartialHostnamePolicy>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialHostnamePolicy {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub windows_regex: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub linux_regex: Option<String>,
    #[serde(rename = "test_hostname", skip_serializing_if = "Option::is_none")]
    pub test_identity_string: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_mapping: Option<PartialGroupMapping>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment_extraction_enabled: Option<bool>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialGroupMapping {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub env: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workstation: Option<usize>,
}

fn stringify_keys(map: &BTreeMap<ComponentId, String>) -> BTreeMap<String, String> {
    map.iter()
        .map(|(k, v)| (k.as_str().to_string(), v.clone()))
        .collect()
}

impl From<&DetectionConfig> for PartialDetectionConfig {
    fn from(config: &DetectionConfig) -> Self {
        Self {
            file_detection_enabled: Some(config.file_detection_enabled),
            use_base_directory: Some(config.use_base_directory),
            base_directory: Some(config.base_directory.clone()),
            custom_filenames: Some(stringify_keys(&config.custom_filenames)),
            detection_files: Some(stringify_keys(&config.detection_files)),
            hostname_detection: Some(PartialHostnamePolicy::from(&config.hostname_detection)),
        }
    }
}

impl From<DetectionConfig> for PartialDetectionConfig {
    fn from(config: DetectionConfig) -> Self {
        Self::from(&config)
    }
}

impl From<&HostnamePolicy> for PartialHostnamePolicy {
    fn from(policy: &HostnamePolicy) -> Self {
        Self {
            windows_regex: Some(policy.windows_regex.clone()),
            linux_regex: Some(policy.linux_regex.clone()),
            test_identity_string: Some(policy.test_identity_string.clone()),
            group_mapping: Some(PartialGroupMapping {
                env: Some(policy.group_mapping.env),
                store: Some(policy.group_mapping.store),
                workstation: Some(policy.group_mapping.workstation),
            }),
            environment_extraction_enabled: Some(policy.environment_extraction_enabled),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_family_defaults_cover_exactly_the_family_groups() {
        for environment_extraction in [false, true] {
            let mapping = GroupMapping::for_family(environment_extraction);
            assert_eq!(
                mapping.highest_index(environment_extraction),
                GroupMapping::family_group_count(environment_extraction)
            );
        }
        assert_eq!(GroupMapping::family_group_count(false), 2);
        assert_eq!(GroupMapping::family_group_count(true), 3);
    }

    #[test]
    fn test_default_config_serializes_to_persisted_shape() {
        let value = serde_json::to_value(DetectionConfig::default()).unwrap();
        assert_eq!(value["file_detection_enabled"], true);
        assert_eq!(value["use_base_directory"], true);
        assert_eq!(value["base_directory"], "");
        assert_eq!(value["custom_filenames"]["POS"], "POS.station");
        assert!(value["detection_files"].as_object().unwrap().is_empty());
        let hostname = &value["hostname_detection"];
        assert_eq!(hostname["test_hostname"], "SHOP-1234-101");
        assert_eq!(hostname["group_mapping"]["store"], 1);
        assert_eq!(hostname["group_mapping"]["workstation"], 2);
        assert_eq!(hostname["environment_extraction_enabled"], false);
    }

    #[test]
    fn test_missing_keys_fall_back_to_defaults() {
        let config: DetectionConfig =
            serde_json::from_str(r#"{"base_directory": "/srv/stations"}"#).unwrap();
        assert_eq!(config.base_directory, "/srv/stations");
        assert!(config.file_detection_enabled);
        assert_eq!(config.hostname_detection, HostnamePolicy::default());
    }

    #[test]
    fn test_partial_skips_absent_fields_when_serialized() {
        let partial = PartialDetectionConfig {
            base_directory: Some("X".to_string()),
            ..Default::default()
        };
        let json = serde_json::to_string(&partial).unwrap();
        assert_eq!(json, r#"{"base_directory":"X"}"#);
    }

    #[test]
    fn test_partial_accepts_unknown_component_keys() {
        let partial: PartialDetectionConfig =
            serde_json::from_str(r#"{"custom_filenames": {"BOGUS": "x.station"}}"#).unwrap();
        let names = partial.custom_filenames.unwrap();
        assert_eq!(names.get("BOGUS").map(String::as_str), Some("x.station"));
    }

    #[test]
    fn test_group_mapping_families() {
        let two = GroupMapping::for_family(false);
        assert_eq!((two.store, two.workstation), (1, 2));
        assert_eq!(two.highest_index(false), 2);

        let three = GroupMapping::for_family(true);
        assert_eq!((three.env, three.store, three.workstation), (1, 2, 3));
        assert_eq!(three.highest_index(true), 3);
    }

    #[test]
    fn test_templates_are_recognized() {
        assert!(is_hostname_template(Dialect::Posix, POSIX_THREE_GROUP_TEMPLATE));
        assert!(is_hostname_template(Dialect::Windows, WINDOWS_TWO_GROUP_TEMPLATE));
        assert!(!is_hostname_template(Dialect::Posix, WINDOWS_TWO_GROUP_TEMPLATE));
        assert!(!is_hostname_template(Dialect::Windows, "^custom$"));
    }
}
