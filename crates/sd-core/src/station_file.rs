//! Station file grammar.
//!
//! A station file is plain text with one `Key=Value` pair per line.
//! Recognized keys are `StoreID`, `WorkstationID` and `Environment`;
//! anything else is ignored. Keys are case-sensitive prefixes, trailing
//! ASCII blanks from [`TRAILING_WHITESPACE`] (including `\r` from CRLF
//! files) are dropped, and a later line overrides an earlier one. The generated fragments implement the
//! same rules in shell; this is the reference used for inspection and
//! parity checks.

use serde::{Deserialize, Serialize};
use std::path::Path;

pub const STORE_KEY: &str = "StoreID=";
pub const WORKSTATION_KEY: &str = "WorkstationID=";
pub const ENVIRONMENT_KEY: &str = "Environment=";

/// Characters stripped from the end of each line. Non-ASCII spaces such
/// as U+00A0 are part of the value.
pub const TRAILING_WHITESPACE: [char; 5] = [' ', '\t', '\r', '\x0B', '\x0C'];

/// Values read from a station file. Empty values are reported as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StationFile {
    pub store_id: Option<String>,
    pub workstation_id: Option<String>,
    pub environment: Option<String>,
}

/// Identity a fragment would publish after reading a station file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileIdentity {
    pub store_id: String,
    pub workstation_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
}

impl StationFile {
    /// Parse station file content.
    pub fn parse(content: &str) -> Self {
        let mut store = None;
        let mut workstation = None;
        let mut environment = None;

        for raw in content.split('\n') {
            let line = raw.trim_end_matches(TRAILING_WHITESPACE);
            if let Some(value) = line.strip_prefix(STORE_KEY) {
                store = Some(value.to_string());
            } else if let Some(value) = line.strip_prefix(WORKSTATION_KEY) {
                workstation = Some(value.to_string());
            } else if let Some(value) = line.strip_prefix(ENVIRONMENT_KEY) {
                environment = Some(value.to_string());
            }
        }

        Self {
            store_id: store.filter(|v| !v.is_empty()),
            workstation_id: workstation.filter(|v| !v.is_empty()),
            environment: environment.filter(|v| !v.is_empty()),
        }
    }

    /// Read and parse a station file from disk.
    pub fn read(path: &Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        Ok(Self::parse(&String::from_utf8_lossy(&bytes)))
    }

    /// Identity this file resolves to.
    ///
    /// Requires a store value and a purely numeric workstation value.
    /// The environment is only carried when `with_environment` is set,
    /// matching fragments generated without multi-environment support.
    pub fn identity(&self, with_environment: bool) -> Option<FileIdentity> {
        let store_id = self.store_id.as_ref()?;
        let workstation_id = self.workstation_id.as_ref()?;
        if !workstation_id.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        Some(FileIdentity {
            store_id: store_id.clone(),
            workstation_id: workstation_id.clone(),
            environment: if with_environment {
                self.environment.clone()
            } else {
                None
            },
        })
    }
}
