//! Error types for the registry, watcher and build pipeline.

use thiserror::Error;

/// Core error type.
///
/// Discovery failures are deliberately not represented here: a malformed
/// manifest is logged and skipped at the call site, never surfaced as an
/// error from a workspace scan.
#[derive(Debug, Error)]
pub enum Error {
    /// Manifest file is missing required fields or is not valid JSON.
    #[error("invalid manifest: {0}")]
    Manifest(String),

    /// File watcher errors
    #[error("file watcher error: {0}")]
    Watch(#[from] notify::Error),

    /// A build stage failed; remaining stages were skipped.
    #[error("build stage '{stage}' failed: {message}")]
    Stage {
        stage: &'static str,
        message: String,
    },

    /// Stylesheet parsing or printing errors
    #[error("style error: {0}")]
    Style(String),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(#[from] plinth_config::ConfigError),

    /// I/O errors from file system operations
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic errors with custom messages
    #[error("{0}")]
    Custom(String),
}

/// Result type alias using [`Error`] as the default error type.
pub type Result<T, E = Error> = std::result::Result<T, E>;
