//! Error types for configuration loading and validation.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid JSON in {}: {message}", .path.display())]
    InvalidJson {
        path: PathBuf,
        message: String,
    },

    #[error("invalid config value for '{field}': {hint}")]
    InvalidValue {
        field: String,
        hint: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
