//! plinth CLI - workspace dev server and build pipeline.
//!
//! This crate provides the command-line interface over `plinth-core`:
//!
//! - [`error`] - CLI error types with miette reporting at the boundary
//! - [`logger`] - structured logging with tracing
//! - [`ui`] - terminal status messages and build progress
//! - [`cli`] - clap command definitions
//! - `commands` - command implementations
//! - [`server`] - server lifecycle, HTTP routing and the reload channel

pub mod cli;
pub mod commands;
pub mod error;
pub mod logger;
pub mod server;
pub mod ui;

pub use error::{CliError, Result};
