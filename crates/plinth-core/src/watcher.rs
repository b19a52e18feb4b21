//! File system watcher with filtering for project trees.
//!
//! Watches a directory recursively and forwards relevant changes through a
//! channel, ignoring dotfiles, dependency-manager folders and any sibling
//! project's base path.

use std::path::{Path, PathBuf};

use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::error::Result;

/// File change event type.
#[derive(Debug, Clone)]
pub enum FileChange {
    /// File was created
    Created(PathBuf),
    /// File was modified
    Modified(PathBuf),
    /// File was removed
    Removed(PathBuf),
}

impl FileChange {
    /// Get the path affected by this change.
    pub fn path(&self) -> &Path {
        match self {
            FileChange::Created(p) | FileChange::Modified(p) | FileChange::Removed(p) => p,
        }
    }
}

/// Exclusion rules applied to watcher events before they reach a handler.
///
/// Patterns are glob-lite, as accepted by the workspace `watchIgnore`
/// setting: `*.ext` matches on suffix, anything else matches a path
/// segment prefix. `excluded_roots` carries absolute paths (other
/// projects' base folders) whose whole subtree is ignored.
#[derive(Debug, Clone)]
pub struct WatchFilter {
    root: PathBuf,
    patterns: Vec<String>,
    excluded_roots: Vec<PathBuf>,
}

impl WatchFilter {
    pub fn new(root: PathBuf, patterns: Vec<String>, excluded_roots: Vec<PathBuf>) -> Self {
        Self {
            root,
            patterns,
            excluded_roots,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Check if a path should be ignored.
    fn should_ignore(&self, path: &Path) -> bool {
        // Only react to files within the watched root
        if !path.starts_with(&self.root) {
            return true;
        }

        for excluded in &self.excluded_roots {
            if path != excluded.as_path() && path.starts_with(excluded) {
                return true;
            }
        }

        let rel_path = match path.strip_prefix(&self.root) {
            Ok(p) => p,
            Err(_) => return true,
        };

        let path_str = rel_path.to_string_lossy();

        for pattern in &self.patterns {
            if let Some(ext) = pattern.strip_prefix('*') {
                // Extension pattern like "*.log"
                if path_str.ends_with(ext) {
                    return true;
                }
            } else if path_str.starts_with(pattern.as_str())
                || path_str.contains(&format!("/{pattern}"))
            {
                // Directory pattern like "node_modules"
                return true;
            }
        }

        // Ignore hidden files and directories
        for component in rel_path.components() {
            if let Some(name) = component.as_os_str().to_str() {
                if name.starts_with('.') && name != "." && name != ".." {
                    return true;
                }
            }
        }

        false
    }
}

/// File watcher feeding filtered change events into a channel.
pub struct FileWatcher {
    /// Underlying notify watcher; dropping it stops event delivery.
    _watcher: RecommendedWatcher,
    root: PathBuf,
}

impl FileWatcher {
    /// Create a watcher for the filter's root directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the watcher cannot be created or the directory
    /// does not exist.
    pub fn new(filter: WatchFilter) -> Result<(Self, mpsc::Receiver<FileChange>)> {
        let root = filter.root().to_path_buf();
        if !root.exists() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("watch root does not exist: {}", root.display()),
            )
            .into());
        }

        let (tx, rx) = mpsc::channel(100);

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            if let Ok(event) = res {
                for path in &event.paths {
                    if filter.should_ignore(path) {
                        continue;
                    }

                    let change = match event.kind {
                        notify::EventKind::Create(_) => FileChange::Created(path.clone()),
                        notify::EventKind::Modify(_) => FileChange::Modified(path.clone()),
                        notify::EventKind::Remove(_) => FileChange::Removed(path.clone()),
                        _ => continue,
                    };

                    // Send event (non-blocking from notify's thread)
                    let _ = tx.blocking_send(change);
                }
            }
        })?;

        watcher.watch(&root, RecursiveMode::Recursive)?;

        Ok((
            Self {
                _watcher: watcher,
                root,
            },
            rx,
        ))
    }

    /// Get the root directory being watched.
    pub fn root(&self) -> &Path {
        &self.root
    }
}
