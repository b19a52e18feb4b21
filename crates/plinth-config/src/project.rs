//! Per-project tool configuration and build task switches.
//!
//! Each project may carry a `plinth.json` in its base folder holding
//! deployment and build overrides. The file is read and written wholesale
//! (full read-modify-write); unrecognized keys survive a rewrite.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};
use crate::settings::WorkspaceSettings;

/// Per-project overrides, stored in `<project-base>/plinth.json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProjectConfig {
    /// Override for the build output folder name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dist_folder: Option<String>,

    /// Folder handed to remote deployment; defaults to the dist folder.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deploy_folder: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub build_clean: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build_copy: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build_replace_strings: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build_compile_styles: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build_transpile: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build_debug_copies: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build_compress: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build_preload: Option<bool>,

    /// Override for the string-replacement extension set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replace_extensions: Option<Vec<String>>,

    /// Keys this tool does not recognize; preserved across rewrites.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ProjectConfig {
    /// Read a project config file.
    ///
    /// A missing file is not an error: the project simply has no overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but is not valid JSON.
    pub fn read(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| ConfigError::InvalidJson {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Write the whole config back to disk.
    ///
    /// Always a full rewrite; the on-disk file is never partially patched.
    pub fn write(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            ConfigError::InvalidJson {
                path: path.to_path_buf(),
                message: e.to_string(),
            }
        })?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Effective extension set for the string-replacement stage.
    pub fn replace_extensions<'a>(&'a self, settings: &'a WorkspaceSettings) -> &'a [String] {
        self.replace_extensions
            .as_deref()
            .unwrap_or(&settings.replace_extensions)
    }
}

/// Resolved per-stage switches for one build invocation.
///
/// Immutable once resolved. When a project's source and destination trees
/// coincide, every task that would delete or rewrite existing files is
/// force-disabled; style compilation stays available since it only creates
/// new stylesheet outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildTaskConfig {
    pub clean: bool,
    pub copy: bool,
    pub replace_strings: bool,
    pub compile_styles: bool,
    pub transpile: bool,
    pub debug_copies: bool,
    pub compress: bool,
    pub preload: bool,
}

impl BuildTaskConfig {
    /// Merge workspace settings with per-project overrides.
    ///
    /// Merge order: workspace defaults < per-project file. `same_tree`
    /// marks a build whose destination equals its source.
    pub fn resolve(
        settings: &WorkspaceSettings,
        project: &ProjectConfig,
        same_tree: bool,
    ) -> Self {
        let mut tasks = Self {
            clean: project.build_clean.unwrap_or(settings.build_clean),
            copy: project.build_copy.unwrap_or(settings.build_copy),
            replace_strings: project
                .build_replace_strings
                .unwrap_or(settings.build_replace_strings),
            compile_styles: project
                .build_compile_styles
                .unwrap_or(settings.build_compile_styles),
            transpile: project.build_transpile.unwrap_or(settings.build_transpile),
            debug_copies: project
                .build_debug_copies
                .unwrap_or(settings.build_debug_copies),
            compress: project.build_compress.unwrap_or(settings.build_compress),
            preload: project.build_preload.unwrap_or(settings.build_preload),
        };

        if same_tree {
            tasks.clean = false;
            tasks.copy = false;
            tasks.replace_strings = false;
            tasks.transpile = false;
            tasks.debug_copies = false;
            tasks.compress = false;
            tasks.preload = false;
        }

        tasks
    }
}
