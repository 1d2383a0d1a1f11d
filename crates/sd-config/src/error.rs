//! Errors raised while loading or saving persisted settings.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for settings I/O.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur while reading or writing the settings document.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in settings file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid settings document: {0}")]
    Shape(String),

    #[error("Invalid detection_config section: {0}")]
    Section(#[source] serde_json::Error),

    #[error(
        "unknown component '{0}' (expected one of: {known})",
        known = crate::ComponentId::known_list()
    )]
    UnknownComponent(String),
}

impl ConfigError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConfigError::Io {
            path: path.into(),
            source,
        }
    }
}
