//! Error types for the tk-app wiring layer.

use std::path::PathBuf;

use tk_signals::SignalError;

/// Application error type shared by the host driver and the CLI.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Failed to read config file: {path}")]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write config file: {path}")]
    ConfigWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid config: {field} = {value} ({reason})")]
    InvalidConfig {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Signal graph error: {0}")]
    Signal(#[from] SignalError),

    #[error("Output error: {0}")]
    Output(String),
}

/// Result type for tk-app operations.
pub type AppResult<T> = Result<T, AppError>;

impl From<tk_core::TkError> for AppError {
    fn from(err: tk_core::TkError) -> Self {
        AppError::Signal(SignalError::from(err))
    }
}
