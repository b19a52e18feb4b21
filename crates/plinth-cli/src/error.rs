//! Error handling for the plinth CLI.
//!
//! Domain errors from the config and core crates convert automatically via
//! `#[from]`; at the binary boundary everything becomes a miette report.

use thiserror::Error;

/// Top-level CLI error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] plinth_config::ConfigError),

    /// Errors from the registry, watcher or build pipeline
    #[error("{0}")]
    Core(#[from] plinth_core::Error),

    /// Invalid command-line arguments or options
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// No project matches the given serve path or namespace
    #[error("Project not found: {0}\n\nHint: pass a serve path (e.g. /app) or a namespace")]
    ProjectNotFound(String),

    /// Development server errors
    #[error("Server error: {0}")]
    Server(String),

    /// I/O errors from file system operations
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic errors with custom messages
    #[error("{0}")]
    Custom(String),
}

/// Result type alias using `CliError` as the default error type.
pub type Result<T, E = CliError> = std::result::Result<T, E>;

/// Convert a CliError to a miette Report for terminal rendering.
pub fn cli_error_to_miette(err: CliError) -> miette::Report {
    match err {
        CliError::Core(plinth_core::Error::Stage { stage, message }) => miette::miette!(
            "Build stage '{}' failed: {}\n\nHint: earlier stages' output is left in place",
            stage,
            message
        ),
        CliError::Config(e) => miette::miette!("Configuration error: {}", e),
        other => miette::miette!("{}", other),
    }
}
