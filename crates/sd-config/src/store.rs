//! Detection configuration store.
//!
//! Owns the single [`DetectionConfig`] instance and exposes typed
//! accessors. Writes keyed by component name return `false` for names
//! outside the component catalogue instead of failing.

use crate::component::{ComponentId, Dialect};
use crate::detection::{
    hostname_template, is_hostname_template, DetectionConfig, GroupField, GroupMapping,
    PartialDetectionConfig, PartialHostnamePolicy,
};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Mutable holder for the detection configuration.
#[derive(Debug, Clone)]
pub struct DetectionStore {
    config: DetectionConfig,
    /// Platform the installer is being configured for. Drives the lazy
    /// base-directory default and the path separator.
    target: Dialect,
}

impl Default for DetectionStore {
    fn default() -> Self {
        Self::new(Dialect::host())
    }
}

impl DetectionStore {
    /// Create a store with default configuration for `target`.
    pub fn new(target: Dialect) -> Self {
        Self {
            config: DetectionConfig::default(),
            target,
        }
    }

    /// Create a store around an existing configuration.
    pub fn with_config(config: DetectionConfig, target: Dialect) -> Self {
        Self { config, target }
    }

    pub fn target(&self) -> Dialect {
        self.target
    }

    pub fn set_target(&mut self, target: Dialect) {
        self.target = target;
    }

    // ---- station files -------------------------------------------------

    /// Set the explicit station file path for a component.
    pub fn set_file_path(&mut self, component: &str, path: &str) -> bool {
        match parse_component(component) {
            Some(id) => {
                self.config.detection_files.insert(id, path.to_string());
                true
            }
            None => false,
        }
    }

    /// Station file path for a component.
    ///
    /// With a base directory this joins the base directory and the
    /// component's filename. An empty base directory is replaced by the
    /// target platform's default first; the assignment is persisted in
    /// the config, so later calls reuse it.
    pub fn get_file_path(&mut self, component: ComponentId) -> String {
        if !self.config.use_base_directory {
            return self
                .config
                .detection_files
                .get(&component)
                .cloned()
                .unwrap_or_default();
        }

        if self.config.base_directory.is_empty() {
            let default_dir = self.target.default_base_directory();
            info!(
                target_platform = %self.target,
                base_directory = default_dir,
                "No base directory configured; using platform default"
            );
            self.config.base_directory = default_dir.to_string();
        }

        let filename = self.get_custom_filename(component);
        join_path(&self.config.base_directory, &filename, self.target)
    }

    pub fn set_custom_filename(&mut self, component: &str, filename: &str) -> bool {
        match parse_component(component) {
            Some(id) => {
                self.config
                    .custom_filenames
                    .insert(id, filename.to_string());
                true
            }
            None => false,
        }
    }

    /// Configured filename, or `<component>.station` when unset or empty.
    pub fn get_custom_filename(&self, component: ComponentId) -> String {
        match self.config.custom_filenames.get(&component) {
            Some(name) if !name.is_empty() => name.clone(),
            _ => component.default_station_filename(),
        }
    }

    pub fn set_base_directory(&mut self, directory: &str) {
        self.config.base_directory = directory.to_string();
    }

    /// Raw base directory; empty until set or lazily defaulted.
    pub fn get_base_directory(&self) -> &str {
        &self.config.base_directory
    }

    pub fn use_base_directory(&mut self, enabled: bool) {
        self.config.use_base_directory = enabled;
    }

    pub fn is_using_base_directory(&self) -> bool {
        self.config.use_base_directory
    }

    pub fn enable_file_detection(&mut self, enabled: bool) {
        self.config.file_detection_enabled = enabled;
    }

    pub fn is_file_detection_enabled(&self) -> bool {
        self.config.file_detection_enabled
    }

    // ---- hostname detection -------------------------------------------

    pub fn get_hostname_regex(&self, dialect: Dialect) -> &str {
        self.config.hostname_detection.regex(dialect)
    }

    pub fn set_hostname_regex(&mut self, pattern: &str, dialect: Dialect) {
        *self.config.hostname_detection.regex_mut(dialect) = pattern.to_string();
    }

    pub fn get_test_identity_string(&self) -> &str {
        &self.config.hostname_detection.test_identity_string
    }

    pub fn set_test_identity_string(&mut self, value: &str) {
        self.config.hostname_detection.test_identity_string = value.to_string();
    }

    pub fn get_group_mapping(&self, field: GroupField) -> usize {
        self.config.hostname_detection.group_mapping.get(field)
    }

    pub fn set_group_mapping(&mut self, field: GroupField, index: usize) {
        self.config
            .hostname_detection
            .group_mapping
            .set(field, index);
    }

    pub fn get_all_group_mappings(&self) -> GroupMapping {
        self.config.hostname_detection.group_mapping
    }

    pub fn is_environment_extraction_enabled(&self) -> bool {
        self.config.hostname_detection.environment_extraction_enabled
    }

    /// Switch between the 2-group and 3-group pattern families.
    ///
    /// Patterns that are still a built-in template (or empty) are replaced
    /// by the template of the new family and the group mapping is reset to
    /// the family default. Hand-written patterns are left alone; a
    /// mismatch then shows up when the pattern is tested.
    pub fn set_environment_extraction(&mut self, enabled: bool) {
        let policy = &mut self.config.hostname_detection;
        if policy.environment_extraction_enabled == enabled {
            return;
        }
        policy.environment_extraction_enabled = enabled;

        for dialect in Dialect::ALL {
            let current = policy.regex(dialect);
            if current.is_empty() || is_hostname_template(dialect, current) {
                *policy.regex_mut(dialect) = hostname_template(dialect, enabled).to_string();
            } else {
                debug!(%dialect, "Keeping custom hostname pattern across family switch");
            }
        }
        policy.group_mapping = GroupMapping::for_family(enabled);
    }

    // ---- whole-document access ----------------------------------------

    /// Deep copy of the current configuration.
    pub fn get_config(&self) -> DetectionConfig {
        self.config.clone()
    }

    /// Merge a partial configuration; only present keys overwrite.
    pub fn set_config(&mut self, partial: PartialDetectionConfig) {
        let config = &mut self.config;

        if let Some(enabled) = partial.file_detection_enabled {
            config.file_detection_enabled = enabled;
        }
        if let Some(enabled) = partial.use_base_directory {
            config.use_base_directory = enabled;
        }
        if let Some(dir) = partial.base_directory {
            config.base_directory = dir;
        }
        if let Some(names) = partial.custom_filenames {
            merge_component_map(&mut config.custom_filenames, names, "custom_filenames");
        }
        if let Some(files) = partial.detection_files {
            merge_component_map(&mut config.detection_files, files, "detection_files");
        }
        if let Some(hostname) = partial.hostname_detection {
            self.merge_hostname(hostname);
        }
    }

    fn merge_hostname(&mut self, partial: PartialHostnamePolicy) {
        let policy = &mut self.config.hostname_detection;

        if let Some(pattern) = partial.windows_regex {
            policy.windows_regex = pattern;
        }
        if let Some(pattern) = partial.linux_regex {
            policy.linux_regex = pattern;
        }
        if let Some(sample) = partial.test_identity_string {
            policy.test_identity_string = sample;
        }
        if let Some(mapping) = partial.group_mapping {
            if let Some(env) = mapping.env {
                policy.group_mapping.env = env;
            }
            if let Some(store) = mapping.store {
                policy.group_mapping.store = store;
            }
            if let Some(workstation) = mapping.workstation {
                policy.group_mapping.workstation = workstation;
            }
        }
        if let Some(enabled) = partial.environment_extraction_enabled {
            policy.environment_extraction_enabled = enabled;
        }
    }
}

fn parse_component(name: &str) -> Option<ComponentId> {
    match name.parse::<ComponentId>() {
        Ok(id) => Some(id),
        Err(err) => {
            warn!(error = %err, "Ignoring write for unknown component");
            None
        }
    }
}

fn merge_component_map(
    target: &mut BTreeMap<ComponentId, String>,
    updates: BTreeMap<String, String>,
    field: &str,
) {
    for (key, value) in updates {
        match key.parse::<ComponentId>() {
            Ok(id) => {
                target.insert(id, value);
            }
            Err(err) => warn!(field, error = %err, "Skipping unknown component key"),
        }
    }
}

/// Join a directory and filename with the dialect's separator.
///
/// Trailing separators of either flavour on `dir` are collapsed so that
/// `C:\stations\` and `C:\stations` yield the same path.
pub fn join_path(dir: &str, filename: &str, dialect: Dialect) -> String {
    let sep = dialect.path_separator();
    let trimmed = dir.trim_end_matches(['/', '\\']);
    if trimmed.is_empty() && !dir.is_empty() {
        return format!("{}{}", sep, filename);
    }
    format!("{}{}{}", trimmed, sep, filename)
}
