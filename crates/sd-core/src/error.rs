//! Errors surfaced by CLI commands.

use crate::exit_codes::ExitCode;
use sd_config::ConfigError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write output: {0}")]
    Output(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl CoreError {
    pub fn exit_code(&self) -> ExitCode {
        match self {
            CoreError::Config(ConfigError::Io { .. }) => ExitCode::IoError,
            CoreError::Config(ConfigError::UnknownComponent(_)) => ExitCode::ArgsError,
            CoreError::Config(_) => ExitCode::ConfigError,
            CoreError::Io { .. } | CoreError::Output(_) => ExitCode::IoError,
            CoreError::Json(_) => ExitCode::InternalError,
            CoreError::InvalidArgument(_) => ExitCode::ArgsError,
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
