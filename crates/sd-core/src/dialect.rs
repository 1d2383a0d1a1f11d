//! Regex dialect compatibility checks.
//!
//! Hostname patterns are executed by two different engines: POSIX ERE in
//! the shell fragment and .NET regex in the PowerShell fragment. A pattern
//! using a construct ERE does not understand does not fail loudly there;
//! it silently matches the wrong thing. This module rejects those
//! constructs up front with a structural scan of the pattern.
//!
//! The scan is a heuristic, not a grammar: it may miss exotic constructs
//! but must never flag plain bracket expressions such as `[0-9]`.

use fancy_regex::Regex;
use sd_config::Dialect;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Why a pattern was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DialectIssue {
    /// The host engine could not compile the pattern at all.
    InvalidPattern,
    /// Pattern wrapped in `/.../` delimiters.
    DelimiterWrapped,
    /// `(?P<name>...)`, `(?<name>...)` or `(?'name'...)`.
    NamedGroup,
    /// `\p{..}` / `\P{..}`.
    UnicodeProperty,
    /// `(?=..)`, `(?!..)`, `(?<=..)`, `(?<!..)`.
    Lookaround,
    /// `\d`, `\w`, `\s` and their negations.
    PerlShorthand,
    /// Any other `(?...)` group syntax, e.g. non-capturing groups or
    /// inline flags.
    ExtendedGroup,
}

impl fmt::Display for DialectIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DialectIssue::InvalidPattern => "invalid_pattern",
            DialectIssue::DelimiterWrapped => "delimiter_wrapped",
            DialectIssue::NamedGroup => "named_group",
            DialectIssue::UnicodeProperty => "unicode_property",
            DialectIssue::Lookaround => "lookaround",
            DialectIssue::PerlShorthand => "perl_shorthand",
            DialectIssue::ExtendedGroup => "extended_group",
        };
        f.write_str(name)
    }
}

/// Outcome of [`validate_for_dialect`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialectCheck {
    pub compatible: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue: Option<DialectIssue>,
}

impl DialectCheck {
    fn ok() -> Self {
        Self {
            compatible: true,
            reason: None,
            issue: None,
        }
    }

    fn rejected(issue: DialectIssue, reason: impl Into<String>) -> Self {
        Self {
            compatible: false,
            reason: Some(reason.into()),
            issue: Some(issue),
        }
    }
}

/// Human name of the regex engine a dialect runs on.
pub fn engine_name(dialect: Dialect) -> &'static str {
    match dialect {
        Dialect::Posix => "POSIX ERE",
        Dialect::Windows => ".NET",
    }
}

/// Compile a pattern with the host validation engine.
pub fn compile(pattern: &str) -> Result<Regex, String> {
    Regex::new(pattern).map_err(|e| e.to_string())
}

/// Number of capture groups a pattern declares (excluding group 0).
pub fn count_capture_groups(pattern: &str) -> Result<usize, String> {
    compile(pattern).map(|re| re.captures_len().saturating_sub(1))
}

/// Check whether `pattern` can run under `dialect`'s engine.
///
/// The pattern is always compiled with the host engine first; a compile
/// error is reported as incompatible for both dialects. The Windows
/// engine accepts everything the host engine does.
pub fn validate_for_dialect(pattern: &str, dialect: Dialect) -> DialectCheck {
    if let Err(e) = compile(pattern) {
        debug!(%dialect, error = %e, "Pattern failed to compile");
        return DialectCheck::rejected(DialectIssue::InvalidPattern, e);
    }

    match dialect {
        Dialect::Windows => DialectCheck::ok(),
        Dialect::Posix => match scan_posix(pattern) {
            Some((issue, reason)) => {
                debug!(%issue, "Pattern rejected for POSIX ERE");
                DialectCheck::rejected(issue, reason)
            }
            None => DialectCheck::ok(),
        },
    }
}

fn is_delimiter_wrapped(pattern: &str) -> bool {
    if pattern.len() < 2 || !pattern.starts_with('/') {
        return false;
    }
    match pattern.rfind('/') {
        Some(end) if end > 0 => pattern[end + 1..].chars().all(|c| c.is_ascii_alphabetic()),
        _ => false,
    }
}

/// Find the first construct POSIX ERE cannot execute.
fn scan_posix(pattern: &str) -> Option<(DialectIssue, String)> {
    if is_delimiter_wrapped(pattern) {
        return Some((
            DialectIssue::DelimiterWrapped,
            "Remove the surrounding /.../ delimiters; POSIX ERE takes the bare pattern".to_string(),
        ));
    }

    let chars: Vec<char> = pattern.chars().collect();
    let mut i = 0;
    let mut in_class = false;
    // Position of the first character inside the current bracket
    // expression; a `]` there is a literal, not the closing bracket.
    let mut class_start = 0;

    while i < chars.len() {
        let c = chars[i];

        if c == '\\' {
            if let Some(&next) = chars.get(i + 1) {
                if let Some(hit) = check_escape(next) {
                    return Some(hit);
                }
            }
            i += 2;
            continue;
        }

        if in_class {
            if c == '[' && matches!(chars.get(i + 1), Some(':' | '.' | '=')) {
                // [:digit:], [.x.], [=e=] run to the matching terminator.
                let term = chars[i + 1];
                let mut j = i + 2;
                while j + 1 < chars.len() && !(chars[j] == term && chars[j + 1] == ']') {
                    j += 1;
                }
                i = j + 2;
                continue;
            }
            if c == ']' && i != class_start {
                in_class = false;
            }
            i += 1;
            continue;
        }

        match c {
            '[' => {
                in_class = true;
                class_start = if chars.get(i + 1) == Some(&'^') { i + 2 } else { i + 1 };
            }
            '(' if chars.get(i + 1) == Some(&'?') => {
                return Some(classify_group(&chars[i + 2..]));
            }
            _ => {}
        }
        i += 1;
    }

    None
}

fn check_escape(next: char) -> Option<(DialectIssue, String)> {
    match next {
        'd' | 'D' | 'w' | 'W' | 's' | 'S' => {
            let replacement = match next {
                'd' => "[0-9]",
                'D' => "[^0-9]",
                'w' => "[[:alnum:]_]",
                'W' => "[^[:alnum:]_]",
                's' => "[[:space:]]",
                _ => "[^[:space:]]",
            };
            Some((
                DialectIssue::PerlShorthand,
                format!(
                    "\\{} is not supported by POSIX ERE; use {} instead",
                    next, replacement
                ),
            ))
        }
        'p' | 'P' => Some((
            DialectIssue::UnicodeProperty,
            format!(
                "Unicode property classes (\\{}{{...}}) are not supported by POSIX ERE",
                next
            ),
        )),
        _ => None,
    }
}

/// Classify the group syntax following `(?`.
fn classify_group(rest: &[char]) -> (DialectIssue, String) {
    match rest {
        ['=' | '!', ..] | ['<', '=' | '!', ..] => (
            DialectIssue::Lookaround,
            "Lookahead/lookbehind assertions are not supported by POSIX ERE".to_string(),
        ),
        ['P', '<', ..] | ['<', ..] | ['\'', ..] => (
            DialectIssue::NamedGroup,
            "Named groups are not supported by POSIX ERE; use plain (...) groups and the group mapping"
                .to_string(),
        ),
        _ => (
            DialectIssue::ExtendedGroup,
            "(?...) group syntax is not supported by POSIX ERE; use plain (...) groups".to_string(),
        ),
    }
}
