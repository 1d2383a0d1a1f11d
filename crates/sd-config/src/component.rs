//! Installable components and script dialects.
//!
//! Both sets are closed: the installer only knows how to deploy the
//! components listed here, and only emits scripts for the two dialects.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A deployable component that discovers its own station identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ComponentId {
    /// Point-of-sale client.
    #[serde(rename = "POS")]
    Pos,
    /// Web device manager.
    #[serde(rename = "WDM")]
    Wdm,
    #[serde(rename = "FLOW-SERVICE")]
    FlowService,
    #[serde(rename = "LPA-SERVICE")]
    LpaService,
    #[serde(rename = "STOREHUB-SERVICE")]
    StorehubService,
    #[serde(rename = "RCS-SERVICE")]
    RcsService,
}

impl ComponentId {
    const ALL: [ComponentId; 6] = [
        ComponentId::Pos,
        ComponentId::Wdm,
        ComponentId::FlowService,
        ComponentId::LpaService,
        ComponentId::StorehubService,
        ComponentId::RcsService,
    ];

    /// Every known component, in catalogue order.
    pub fn all() -> &'static [ComponentId] {
        &Self::ALL
    }

    /// Comma-separated list of every identifier, for error messages.
    pub fn known_list() -> String {
        let names: Vec<&str> = Self::ALL.iter().map(|c| c.as_str()).collect();
        names.join(", ")
    }

    /// Stable identifier as used in persisted settings and scripts.
    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentId::Pos => "POS",
            ComponentId::Wdm => "WDM",
            ComponentId::FlowService => "FLOW-SERVICE",
            ComponentId::LpaService => "LPA-SERVICE",
            ComponentId::StorehubService => "STOREHUB-SERVICE",
            ComponentId::RcsService => "RCS-SERVICE",
        }
    }

    /// Station filename used when no custom filename is configured.
    pub fn default_station_filename(&self) -> String {
        format!("{}.station", self.as_str())
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComponentId {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ConfigError::UnknownComponent(wanted.to_string()))
    }
}

/// Target script dialect.
///
/// `Posix` scripts run under a POSIX shell and match with POSIX ERE
/// (`grep -E`, `[[ =~ ]]`). `Windows` scripts run under PowerShell and
/// match with the .NET regex engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    Posix,
    Windows,
}

impl Dialect {
    /// Both dialects, POSIX first.
    pub const ALL: [Dialect; 2] = [Dialect::Posix, Dialect::Windows];

    /// Dialect matching the platform this binary was built for.
    pub fn host() -> Self {
        if cfg!(windows) {
            Dialect::Windows
        } else {
            Dialect::Posix
        }
    }

    /// Path separator used when joining station file paths.
    pub fn path_separator(&self) -> char {
        match self {
            Dialect::Posix => '/',
            Dialect::Windows => '\\',
        }
    }

    /// Base directory assigned when none has been configured.
    pub fn default_base_directory(&self) -> &'static str {
        match self {
            Dialect::Posix => "/usr/local/gkretail/stations",
            Dialect::Windows => r"C:\gkretail\stations",
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dialect::Posix => write!(f, "posix"),
            Dialect::Windows => write!(f, "windows"),
        }
    }
}

impl FromStr for Dialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "posix" | "linux" | "sh" | "bash" => Ok(Dialect::Posix),
            "windows" | "win" | "powershell" | "ps1" => Ok(Dialect::Windows),
            _ => Err(format!("unknown dialect: {}", s)),
        }
    }
}
