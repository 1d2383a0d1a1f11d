//! Station identity detection engine.
//!
//! This crate provides:
//! - Regex dialect checks for POSIX ERE and .NET hostname patterns
//! - The hostname pattern tester with store/workstation shape rules
//! - Station file parsing
//! - Script fragment generation for POSIX shell and PowerShell installers
//! - The in-process identity resolution chain
//! - Logging, exit codes and errors for the `sd` CLI

pub mod dialect;
pub mod error;
pub mod exit_codes;
pub mod generate;
pub mod logging;
pub mod output;
pub mod resolution;
pub mod station_file;
pub mod tester;

pub use dialect::{count_capture_groups, validate_for_dialect, DialectCheck, DialectIssue};
pub use error::{CoreError, Result};
pub use exit_codes::ExitCode;
pub use generate::{generate, generate_all, Fragment};
pub use resolution::{
    resolve_identity, IdentityPrompt, IdentitySource, NoPrompt, PromptAnswer, Resolution,
    ResolutionInputs, ResolvedIdentity,
};
pub use station_file::{FileIdentity, StationFile};
pub use tester::{PatternTestResult, PatternTester, TestFailure};
