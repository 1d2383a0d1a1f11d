//! Settings file discovery.
//!
//! Resolution order: CLI argument → `SD_CONFIG` → `SD_CONFIG_DIR` →
//! XDG config directory → built-in defaults.

use std::path::{Path, PathBuf};

/// Where the settings file was found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ConfigSource {
    /// Explicitly provided via CLI argument.
    CliArgument,

    /// Set via environment variable.
    Environment,

    /// Found in XDG config directory.
    XdgConfig,

    /// Using built-in defaults.
    #[default]
    BuiltinDefault,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::CliArgument => write!(f, "CLI argument"),
            ConfigSource::Environment => write!(f, "environment variable"),
            ConfigSource::XdgConfig => write!(f, "XDG config"),
            ConfigSource::BuiltinDefault => write!(f, "builtin default"),
        }
    }
}

/// Resolved settings location.
#[derive(Debug, Clone, Default)]
pub struct ConfigLocation {
    /// Settings file to read (None when running on defaults).
    pub path: Option<PathBuf>,
    pub source: ConfigSource,
}

impl ConfigLocation {
    /// File that a save should write to.
    ///
    /// Falls back to the XDG location when running on defaults.
    pub fn save_target(&self) -> Option<PathBuf> {
        self.path
            .clone()
            .or_else(|| xdg_config_dir().map(|d| d.join(SETTINGS_FILENAME)))
    }
}

/// Environment variable names.
pub const ENV_CONFIG_PATH: &str = "SD_CONFIG";
pub const ENV_CONFIG_DIR: &str = "SD_CONFIG_DIR";

/// Standard settings file name.
pub const SETTINGS_FILENAME: &str = "station-detect.json";

/// Application name for XDG directories.
const APP_NAME: &str = "station-detect";

/// Resolve the settings file path.
///
/// An explicit CLI path or `SD_CONFIG` is taken as-is even when the file
/// does not exist yet, since it is also where changes get saved. The
/// directory-based sources only count when the file is present.
pub fn resolve_settings(cli_path: Option<&Path>) -> ConfigLocation {
    if let Some(path) = cli_path {
        return ConfigLocation {
            path: Some(path.to_path_buf()),
            source: ConfigSource::CliArgument,
        };
    }

    if let Ok(env_path) = std::env::var(ENV_CONFIG_PATH) {
        if !env_path.is_empty() {
            return ConfigLocation {
                path: Some(PathBuf::from(env_path)),
                source: ConfigSource::Environment,
            };
        }
    }

    if let Ok(config_dir) = std::env::var(ENV_CONFIG_DIR) {
        let path = PathBuf::from(config_dir).join(SETTINGS_FILENAME);
        if path.exists() {
            return ConfigLocation {
                path: Some(path),
                source: ConfigSource::Environment,
            };
        }
    }

    if let Some(dir) = xdg_config_dir() {
        let path = dir.join(SETTINGS_FILENAME);
        if path.exists() {
            return ConfigLocation {
                path: Some(path),
                source: ConfigSource::XdgConfig,
            };
        }
    }

    ConfigLocation::default()
}

/// Get the XDG config directory for station-detect.
pub fn xdg_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_source_display() {
        assert_eq!(format!("{}", ConfigSource::CliArgument), "CLI argument");
        assert_eq!(
            format!("{}", ConfigSource::Environment),
            "environment variable"
        );
        assert_eq!(format!("{}", ConfigSource::XdgConfig), "XDG config");
        assert_eq!(
            format!("{}", ConfigSource::BuiltinDefault),
            "builtin default"
        );
    }

    #[test]
    fn test_cli_path_wins_even_if_missing() {
        let location = resolve_settings(Some(Path::new("/nonexistent/settings.json")));
        assert_eq!(location.source, ConfigSource::CliArgument);
        assert_eq!(
            location.save_target(),
            Some(PathBuf::from("/nonexistent/settings.json"))
        );
    }

    #[test]
    fn test_xdg_config_dir() {
        if let Some(path) = xdg_config_dir() {
            assert!(path.ends_with(APP_NAME));
        }
    }
}
