//! Workspace-wide settings.
//!
//! A flat key/value store with recognized keys, loaded from multiple sources.
//! Priority: environment variables > `plinth.config.json` > defaults.

use std::fmt;
use std::path::Path;

use figment::{
    providers::{Env, Format as _, Json, Serialized},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// Serving protocol for the development server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Http,
    Https,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Http => write!(f, "http"),
            Protocol::Https => write!(f, "https"),
        }
    }
}

/// Workspace-wide configuration.
///
/// Folder names are structural: they identify where project sources live
/// relative to each project's base folder and are stripped when deriving
/// serve paths.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkspaceSettings {
    /// Folder name holding application/component sources (e.g. "webapp").
    pub src_folder: String,

    /// Folder name holding library sources (e.g. "src").
    pub library_folder: String,

    /// Folder name receiving build output.
    pub dist_folder: String,

    /// Listening port for the development server.
    pub port: u16,

    /// Serving protocol.
    pub protocol: Protocol,

    /// Open the default browser once the server has started.
    pub open_browser: bool,

    /// Name announced to reload clients during the handshake.
    pub server_name: String,

    /// Debounce delay for style rebuilds, in milliseconds.
    pub style_debounce_ms: u64,

    /// Coalescing window for reload notifications, in milliseconds.
    pub reload_debounce_ms: u64,

    /// File extensions that qualify as watch/reload triggers.
    pub watch_extensions: Vec<String>,

    /// File extensions scanned for `<% KEY %>` placeholders.
    pub replace_extensions: Vec<String>,

    /// Extension of style source files handed to the style compiler.
    pub style_source_extension: String,

    /// chrono format pattern for the computed `DATE` placeholder.
    pub date_pattern: String,

    /// Compatibility version controlling the preload wrapper format.
    pub compat_version: u32,

    /// Patterns ignored by file watchers (merged with per-project exclusions).
    pub watch_ignore: Vec<String>,

    /// Per-stage enable flags for the build pipeline.
    pub build_clean: bool,
    pub build_copy: bool,
    pub build_replace_strings: bool,
    pub build_compile_styles: bool,
    pub build_transpile: bool,
    pub build_debug_copies: bool,
    pub build_compress: bool,
    pub build_preload: bool,
}

impl Default for WorkspaceSettings {
    fn default() -> Self {
        Self {
            src_folder: "webapp".to_string(),
            library_folder: "src".to_string(),
            dist_folder: "dist".to_string(),
            port: 3000,
            protocol: Protocol::Http,
            open_browser: false,
            server_name: "plinth".to_string(),
            style_debounce_ms: 500,
            reload_debounce_ms: 500,
            watch_extensions: vec![
                "js".to_string(),
                "json".to_string(),
                "xml".to_string(),
                "html".to_string(),
                "properties".to_string(),
                "css".to_string(),
                "less".to_string(),
            ],
            replace_extensions: vec![
                "js".to_string(),
                "json".to_string(),
                "html".to_string(),
                "xml".to_string(),
            ],
            style_source_extension: "less".to_string(),
            date_pattern: "%Y-%m-%d %H:%M:%S".to_string(),
            compat_version: 2,
            watch_ignore: vec![
                "node_modules".to_string(),
                ".git".to_string(),
                "*.log".to_string(),
                ".DS_Store".to_string(),
            ],
            build_clean: true,
            build_copy: true,
            build_replace_strings: true,
            build_compile_styles: true,
            build_transpile: true,
            build_debug_copies: true,
            build_compress: true,
            build_preload: true,
        }
    }
}

impl WorkspaceSettings {
    /// Load settings for a workspace root.
    ///
    /// Priority: `PLINTH_*` environment variables > `plinth.config.json`
    /// in the workspace root > built-in defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but does not deserialize
    /// into the recognized keys.
    pub fn load(root: &Path) -> Result<Self> {
        let mut figment = Figment::new().merge(Serialized::defaults(Self::default()));

        let config_file = root.join("plinth.config.json");
        if config_file.exists() {
            figment = figment.merge(Json::file(config_file));
        }

        figment = figment.merge(Env::prefixed("PLINTH_"));

        figment.extract().map_err(|e| {
            ConfigError::InvalidValue {
                field: "workspace configuration".to_string(),
                hint: format!("check plinth.config.json syntax and field types ({e})"),
            }
        })
    }

    /// Base URL the server is reachable at.
    pub fn base_url(&self) -> String {
        format!("{}://127.0.0.1:{}", self.protocol, self.port)
    }

    /// The structural folder names stripped from serve paths.
    pub fn structural_folders(&self) -> [&str; 3] {
        [
            self.src_folder.as_str(),
            self.library_folder.as_str(),
            self.dist_folder.as_str(),
        ]
    }

    /// Whether an extension (without dot) is a qualifying watch trigger.
    pub fn is_watch_extension(&self, ext: &str) -> bool {
        self.watch_extensions.iter().any(|e| e == ext)
    }
}
