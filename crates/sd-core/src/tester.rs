//! Hostname pattern tester.
//!
//! Runs a hostname pattern against a sample identity string and extracts
//! the logical fields through the configured group mapping. Every outcome,
//! including invalid patterns, is returned as a [`PatternTestResult`];
//! nothing here returns an error to the caller.

use crate::dialect::{compile, engine_name, validate_for_dialect, DialectIssue};
use once_cell::sync::Lazy;
use regex::Regex;
use sd_config::{DetectionStore, Dialect, GroupMapping, HostnamePolicy};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// 4 digits, 1 letter + 3 digits, or 2 letters + 2 digits.
static STORE_SHAPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:[0-9]{4}|[A-Za-z][0-9]{3}|[A-Za-z]{2}[0-9]{2})$")
        .expect("static store shape pattern")
});

static WORKSTATION_SHAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]+$").expect("static workstation shape pattern"));

static TRAILING_STORE_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([0-9]{4})$").expect("static store suffix pattern"));

/// Characters that mark a compound store value such as `0099-1234`.
const STORE_SEPARATORS: [char; 3] = ['-', '_', '.'];

/// Category of a failed test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestFailure {
    /// The pattern uses constructs the dialect's engine cannot run.
    IncompatibleDialect,
    /// The pattern does not compile.
    InvalidPattern,
    /// The pattern did not match the identity string.
    NoMatch,
    /// The mapping references a group the pattern does not have.
    InsufficientGroups,
    /// Group count disagrees with the environment-extraction toggle.
    GroupCountMismatch,
    /// Matched, but the extracted values are not valid store/workstation ids.
    InvalidShape,
}

/// Result of testing a pattern against an identity string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternTestResult {
    pub success: bool,
    pub store_id: String,
    /// Store number after compound-format normalization.
    pub store_number: String,
    pub workstation_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    pub is_valid_store: bool,
    pub is_valid_workstation: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<TestFailure>,
}

impl PatternTestResult {
    fn failed(failure: TestFailure, error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            failure: Some(failure),
            ..Default::default()
        }
    }
}

/// Tests hostname patterns with a fixed group mapping.
#[derive(Debug, Clone)]
pub struct PatternTester {
    mapping: GroupMapping,
    environment_extraction: bool,
    shape_checks: Option<bool>,
}

impl PatternTester {
    pub fn new(mapping: GroupMapping, environment_extraction: bool) -> Self {
        Self {
            mapping,
            environment_extraction,
            shape_checks: None,
        }
    }

    pub fn from_policy(policy: &HostnamePolicy) -> Self {
        Self::new(policy.group_mapping, policy.environment_extraction_enabled)
    }

    /// Force store/workstation shape validation on or off.
    ///
    /// By default the POSIX dialect validates shapes and normalizes
    /// compound store values; the Windows dialect only requires the mapped
    /// groups to be non-empty.
    pub fn with_shape_checks(mut self, enabled: bool) -> Self {
        self.shape_checks = Some(enabled);
        self
    }

    fn shape_checks_for(&self, dialect: Dialect) -> bool {
        self.shape_checks.unwrap_or(dialect == Dialect::Posix)
    }

    /// Test `pattern` against `identity` as `dialect` would run it.
    pub fn test(&self, pattern: &str, dialect: Dialect, identity: &str) -> PatternTestResult {
        let check = validate_for_dialect(pattern, dialect);
        if !check.compatible {
            let reason = check.reason.unwrap_or_default();
            return match check.issue {
                Some(DialectIssue::InvalidPattern) => PatternTestResult::failed(
                    TestFailure::InvalidPattern,
                    format!("Invalid regular expression: {}", reason),
                ),
                _ => PatternTestResult::failed(
                    TestFailure::IncompatibleDialect,
                    format!(
                        "Pattern is not compatible with the {} engine: {}",
                        engine_name(dialect),
                        reason
                    ),
                ),
            };
        }

        let re = match compile(pattern) {
            Ok(re) => re,
            Err(e) => {
                return PatternTestResult::failed(
                    TestFailure::InvalidPattern,
                    format!("Invalid regular expression: {}", e),
                )
            }
        };

        let group_count = re.captures_len().saturating_sub(1);
        if let Some(result) = self.check_groups(group_count) {
            return result;
        }

        let caps = match re.captures(identity) {
            Ok(Some(caps)) => caps,
            Ok(None) => {
                debug!(%dialect, identity, "Pattern did not match");
                return PatternTestResult::failed(
                    TestFailure::NoMatch,
                    format!("Pattern did not match identity string '{}'", identity),
                );
            }
            Err(e) => {
                return PatternTestResult::failed(
                    TestFailure::InvalidPattern,
                    format!("Pattern could not be evaluated: {}", e),
                )
            }
        };

        let group = |index: usize| -> String {
            caps.get(index)
                .map(|m| m.as_str().to_string())
                .unwrap_or_default()
        };

        let store_raw = group(self.mapping.store);
        let workstation_raw = group(self.mapping.workstation);
        let environment = self
            .environment_extraction
            .then(|| group(self.mapping.env));

        let shape_checks = self.shape_checks_for(dialect);
        let store_number = if dialect == Dialect::Posix {
            normalize_store_number(&store_raw)
        } else {
            store_raw.clone()
        };

        let (is_valid_store, is_valid_workstation) = if shape_checks {
            (
                is_valid_store_number(&store_number),
                is_valid_workstation_id(&workstation_raw),
            )
        } else {
            (!store_raw.is_empty(), !workstation_raw.is_empty())
        };

        let success = is_valid_store && is_valid_workstation;
        let error = if success {
            None
        } else {
            Some(shape_error(
                &store_number,
                &workstation_raw,
                is_valid_store,
                is_valid_workstation,
            ))
        };

        PatternTestResult {
            success,
            store_id: store_raw,
            store_number,
            workstation_id: workstation_raw,
            environment,
            is_valid_store,
            is_valid_workstation,
            error,
            failure: (!success).then_some(TestFailure::InvalidShape),
        }
    }

    /// Reject mappings that point past the pattern's groups, and patterns
    /// whose group count does not fit the active family.
    fn check_groups(&self, group_count: usize) -> Option<PatternTestResult> {
        let mut used = vec![self.mapping.store, self.mapping.workstation];
        if self.environment_extraction {
            used.push(self.mapping.env);
        }
        if used.contains(&0) {
            return Some(PatternTestResult::failed(
                TestFailure::InsufficientGroups,
                "Insufficient capture groups: group mapping indices start at 1",
            ));
        }

        let highest = self.mapping.highest_index(self.environment_extraction);
        if highest > group_count {
            return Some(PatternTestResult::failed(
                TestFailure::InsufficientGroups,
                format!(
                    "Insufficient capture groups: mapping references group {} but the pattern has {}",
                    highest, group_count
                ),
            ));
        }

        let expected = GroupMapping::family_group_count(self.environment_extraction);
        if group_count != expected {
            return Some(PatternTestResult::failed(
                TestFailure::GroupCountMismatch,
                format!(
                    "Environment extraction is {}: expected {} capture groups, the pattern has {}",
                    if self.environment_extraction { "enabled" } else { "disabled" },
                    expected,
                    group_count
                ),
            ));
        }

        None
    }
}

/// Test the configured pattern and sample string for `dialect`.
pub fn test_configured(store: &DetectionStore, dialect: Dialect) -> PatternTestResult {
    let config = store.get_config();
    PatternTester::from_policy(&config.hostname_detection).test(
        store.get_hostname_regex(dialect),
        dialect,
        store.get_test_identity_string(),
    )
}

/// Reduce a compound store value (e.g. `0099-1234`) to its trailing
/// 4-digit store number. Values without a separator are kept as-is.
pub fn normalize_store_number(raw: &str) -> String {
    if raw.contains(STORE_SEPARATORS) {
        if let Some(caps) = TRAILING_STORE_NUMBER.captures(raw) {
            return caps[1].to_string();
        }
    }
    raw.to_string()
}

pub fn is_valid_store_number(value: &str) -> bool {
    STORE_SHAPE.is_match(value)
}

pub fn is_valid_workstation_id(value: &str) -> bool {
    WORKSTATION_SHAPE.is_match(value)
}

fn shape_error(store: &str, workstation: &str, store_ok: bool, workstation_ok: bool) -> String {
    let mut problems = Vec::new();
    if !store_ok {
        problems.push(format!(
            "store '{}' is not a valid store number (4 digits, 1 letter + 3 digits, or 2 letters + 2 digits)",
            store
        ));
    }
    if !workstation_ok {
        problems.push(format!(
            "workstation '{}' is not a valid workstation id (digits only)",
            workstation
        ));
    }
    problems.join("; ")
}
