//! Configuration for the plinth workspace dev server.
//!
//! Two layers: workspace-wide settings (a flat key/value store, loaded from
//! `plinth.config.json` with environment overrides) and per-project tool
//! config files holding build/deployment overrides. Merge order is always
//! defaults < workspace config < per-project file.

pub mod error;
pub mod project;
pub mod settings;

pub use error::{ConfigError, Result};
pub use project::{BuildTaskConfig, ProjectConfig};
pub use settings::{Protocol, WorkspaceSettings};
