//! Core of the plinth workspace dev server.
//!
//! This crate tracks a workspace of component/library projects and turns
//! their source trees into deployable artifact trees:
//!
//! - [`registry`] - project discovery, identity and serve-path routing
//! - [`project`] - per-project entity with its own watcher and debounced
//!   rebuild triggers
//! - [`pipeline`] - the ordered, configurable build stage sequence
//! - [`toolchain`] - seam for the external style/minify/transpile engines
//! - [`watcher`] - filtered filesystem watching
//!
//! The HTTP server and the reload channel live in the CLI crate and reach
//! back into this one through the traits in [`context`].

pub mod context;
pub mod error;
pub mod manifest;
pub mod pipeline;
pub mod project;
pub mod registry;
pub mod toolchain;
pub mod watcher;

pub use context::{ChangeNotifier, ServeContext, ServeMode, WatchContext};
pub use error::{Error, Result};
pub use manifest::{Manifest, ProjectType, MANIFEST_FILE};
pub use project::{Project, ProjectPaths, SourcePriority, PROJECT_CONFIG_FILE};
pub use registry::{serve_path_for, ProjectMap, Registry};
pub use toolchain::{BasicToolchain, Toolchain};
