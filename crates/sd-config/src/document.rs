//! Persisted application settings.
//!
//! The settings file is a JSON object owned by the wider installer
//! configuration. Only the `detection_config` key belongs to this crate;
//! every other key is carried through a load/save cycle untouched.

use crate::detection::{DetectionConfig, PartialDetectionConfig};
use crate::error::{ConfigError, Result};
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;
use tracing::debug;

/// Key of the detection section inside the settings document.
pub const DETECTION_SECTION: &str = "detection_config";

/// A loaded settings document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PersistedDocument {
    root: Map<String, Value>,
}

impl PersistedDocument {
    /// Load a settings document. A missing file yields an empty document.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "Settings file not found; starting empty");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let value: Value = serde_json::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_value(value)
    }

    /// Wrap an already-parsed document.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(root) => Ok(Self { root }),
            other => Err(ConfigError::Shape(format!(
                "expected a JSON object at the top level, found {}",
                json_kind(&other)
            ))),
        }
    }

    pub fn as_value(&self) -> Value {
        Value::Object(self.root.clone())
    }

    /// The detection section as a partial update, if present.
    pub fn detection_partial(&self) -> Result<Option<PartialDetectionConfig>> {
        match self.root.get(DETECTION_SECTION) {
            None | Some(Value::Null) => Ok(None),
            Some(section @ Value::Object(_)) => serde_json::from_value(section.clone())
                .map(Some)
                .map_err(ConfigError::Section),
            Some(other) => Err(ConfigError::Shape(format!(
                "{} must be an object, found {}",
                DETECTION_SECTION,
                json_kind(other)
            ))),
        }
    }

    /// Replace the detection section with `config`.
    pub fn set_detection(&mut self, config: &DetectionConfig) -> Result<()> {
        let value = serde_json::to_value(config).map_err(ConfigError::Section)?;
        self.root.insert(DETECTION_SECTION.to_string(), value);
        Ok(())
    }

    /// Write the document, creating parent directories as needed.
    ///
    /// The file is written next to the target and renamed into place.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| ConfigError::io(parent, e))?;
            }
        }

        let mut content = serde_json::to_string_pretty(&self.root).map_err(ConfigError::Section)?;
        content.push('\n');

        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, content).map_err(|e| ConfigError::io(&tmp, e))?;
        fs::rename(&tmp, path).map_err(|e| ConfigError::io(path, e))?;
        debug!(path = %path.display(), "Settings saved");
        Ok(())
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
