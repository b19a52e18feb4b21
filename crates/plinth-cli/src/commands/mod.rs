//! CLI command implementations.

mod build;
mod serve;

pub use build::execute as build_execute;
pub use serve::execute as serve_execute;

use std::path::PathBuf;

use crate::error::{CliError, Result};

/// Resolve the workspace root from an optional `--root` argument.
pub(crate) fn workspace_root(root: Option<PathBuf>) -> Result<PathBuf> {
    let root = match root {
        Some(root) => root,
        None => std::env::current_dir()?,
    };
    if !root.is_dir() {
        return Err(CliError::InvalidArgument(format!(
            "workspace root is not a directory: {}",
            root.display()
        )));
    }
    // canonical paths keep serve-path derivation stable
    Ok(root.canonicalize()?)
}
