//! Where the `sd` log settings come from.
//!
//! Precedence, highest first: `--log-level` / `--log-format`, `SD_LOG` /
//! `SD_LOG_FORMAT`, `RUST_LOG`, then the defaults (`info`, human).
//! `SD_LOG_TIMESTAMPS` adds wall-clock times to human output.

use std::fmt;
use std::str::FromStr;

pub const ENV_LOG_LEVEL: &str = "SD_LOG";
pub const ENV_LOG_FORMAT: &str = "SD_LOG_FORMAT";
pub const ENV_LOG_TIMESTAMPS: &str = "SD_LOG_TIMESTAMPS";
const ENV_RUST_LOG: &str = "RUST_LOG";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Human,
    /// One JSON object per line.
    Jsonl,
}

impl LogFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            LogFormat::Human => "human",
            LogFormat::Jsonl => "jsonl",
        }
    }
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "human" | "pretty" => Ok(LogFormat::Human),
            "jsonl" | "json" => Ok(LogFormat::Jsonl),
            _ => Err(format!("unknown log format '{s}' (expected human or jsonl)")),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Verbosity, ordered from most to least verbose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
    Off,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::Off => "off",
        }
    }

    /// Most verbose level named anywhere in a `RUST_LOG` directive list,
    /// e.g. `warn,sd_core=debug` gives `Debug`.
    fn from_rust_log(directives: &str) -> Option<Self> {
        directives
            .split(',')
            .filter_map(|directive| {
                let level = directive.rsplit('=').next().unwrap_or(directive);
                level.trim().parse::<LogLevel>().ok()
            })
            .min()
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let level = match s.to_ascii_lowercase().as_str() {
            "trace" => LogLevel::Trace,
            "debug" => LogLevel::Debug,
            "info" => LogLevel::Info,
            "warn" | "warning" => LogLevel::Warn,
            "error" => LogLevel::Error,
            "off" | "quiet" => LogLevel::Off,
            _ => return Err(format!("unknown log level '{s}'")),
        };
        Ok(level)
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default)]
pub struct LogConfig {
    pub format: LogFormat,
    pub level: LogLevel,
    pub timestamps: bool,
}

impl LogConfig {
    pub fn from_env(cli_level: Option<LogLevel>, cli_format: Option<LogFormat>) -> Self {
        Self::from_lookup(|key| std::env::var(key).ok(), cli_level, cli_format)
    }

    /// [`LogConfig::from_env`] over an arbitrary variable lookup.
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
        cli_level: Option<LogLevel>,
        cli_format: Option<LogFormat>,
    ) -> Self {
        // An unparsable SD_LOG still shadows RUST_LOG.
        let env_level = match lookup(ENV_LOG_LEVEL) {
            Some(value) => value.parse().ok(),
            None => lookup(ENV_RUST_LOG).and_then(|value| LogLevel::from_rust_log(&value)),
        };
        let env_format = lookup(ENV_LOG_FORMAT).and_then(|value| value.parse().ok());
        let timestamps = lookup(ENV_LOG_TIMESTAMPS)
            .map(|value| matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        LogConfig {
            format: cli_format.or(env_format).unwrap_or_default(),
            level: cli_level.or(env_level).unwrap_or_default(),
            timestamps,
        }
    }

    /// `EnvFilter` directive enabling `level` for the workspace crates only.
    pub fn filter_directive(&self) -> String {
        format!("sd_core={level},sd_config={level},sd={level}", level = self.level)
    }
}
