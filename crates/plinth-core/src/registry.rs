//! Authoritative project registry for a workspace.
//!
//! The registry owns the canonical project collection, keyed by serve
//! path. Watcher callbacks never touch the map directly; they call back
//! into registry methods. Workspace scans are serialized and coalesced:
//! concurrent calls ride on the scan already in flight instead of
//! triggering a duplicate one.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio::task::JoinHandle;
use walkdir::WalkDir;

use plinth_config::WorkspaceSettings;

use crate::context::WatchContext;
use crate::error::Result;
use crate::manifest::{Manifest, MANIFEST_FILE};
use crate::project::{Project, SourcePriority};
use crate::watcher::{FileChange, FileWatcher, WatchFilter};

/// The full set of registered projects, keyed by serve path.
pub type ProjectMap = HashMap<String, Arc<Project>>;

struct WorkspaceWatch {
    /// Dropping the watcher stops event delivery.
    _watcher: FileWatcher,
    task: JoinHandle<()>,
}

/// Project registry for one workspace root.
pub struct Registry {
    root: PathBuf,
    settings: WorkspaceSettings,
    projects: RwLock<ProjectMap>,
    /// Serializes scans; waiters coalesce onto the scan in flight.
    scan_lock: tokio::sync::Mutex<()>,
    /// Bumped once per completed scan.
    scan_epoch: AtomicU64,
    /// Workspace-level watcher picking up manifests that appear or vanish.
    workspace_watch: Mutex<Option<WorkspaceWatch>>,
}

impl Registry {
    pub fn new(root: PathBuf, settings: WorkspaceSettings) -> Self {
        Self {
            root,
            settings,
            projects: RwLock::new(HashMap::new()),
            scan_lock: tokio::sync::Mutex::new(()),
            scan_epoch: AtomicU64::new(0),
            workspace_watch: Mutex::new(None),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn settings(&self) -> &WorkspaceSettings {
        &self.settings
    }

    /// Discover every project in the workspace.
    ///
    /// A call arriving while a scan is in flight waits for it and returns
    /// that scan's result instead of starting a duplicate. Once at least
    /// one scan has completed, further calls return the registered set
    /// unless `force_refresh` is set.
    pub async fn discover_all(&self, force_refresh: bool) -> Result<ProjectMap> {
        let epoch_before = self.scan_epoch.load(Ordering::Acquire);
        let _guard = self.scan_lock.lock().await;
        let epoch_now = self.scan_epoch.load(Ordering::Acquire);

        // a scan completed while this call waited: coalesce onto it
        if epoch_now != epoch_before {
            return Ok(self.snapshot());
        }

        if !force_refresh && epoch_now > 0 {
            return Ok(self.snapshot());
        }

        self.scan();
        self.scan_epoch.fetch_add(1, Ordering::Release);
        Ok(self.snapshot())
    }

    /// One pass over the workspace: construct new entities, update
    /// existing ones in place, evict those whose manifest disappeared.
    ///
    /// A malformed manifest never aborts the scan; each file is parsed
    /// independently and failures are logged and skipped.
    fn scan(&self) {
        let manifests = self.find_manifests();
        tracing::debug!(count = manifests.len(), "workspace scan found manifests");

        let mut fresh: ProjectMap = HashMap::new();
        for manifest_path in manifests {
            let Some(candidate) = self.make_or_update(&manifest_path) else {
                continue;
            };

            match fresh.entry(candidate.serve_path().to_string()) {
                Entry::Occupied(mut entry) => {
                    let existing = Arc::clone(entry.get());
                    if wins_over(&candidate, &existing) {
                        log_collision(&candidate, &existing);
                        existing.close();
                        entry.insert(candidate);
                    } else {
                        log_collision(&existing, &candidate);
                        candidate.close();
                    }
                }
                Entry::Vacant(entry) => {
                    entry.insert(candidate);
                }
            }
        }

        let mut map = self.projects.write();
        for (serve_path, old) in map.iter() {
            let survives = fresh
                .get(serve_path)
                .is_some_and(|p| Arc::ptr_eq(p, old));
            if !survives {
                tracing::info!(serve_path = %serve_path, "project gone, evicting");
                old.close();
            }
        }
        *map = fresh;
    }

    fn find_manifests(&self) -> Vec<PathBuf> {
        WalkDir::new(&self.root)
            .into_iter()
            .filter_entry(|e| !is_ignored_dir(e))
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.file_type().is_file() && e.file_name().to_str() == Some(MANIFEST_FILE)
            })
            .map(|e| e.into_path())
            .collect()
    }

    /// Parse one manifest into a project entity, reusing (and mutating in
    /// place) an already-registered entity for the same working folder so
    /// its watcher and timers survive.
    fn make_or_update(&self, manifest_path: &Path) -> Option<Arc<Project>> {
        let manifest = match Manifest::read(manifest_path) {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!(
                    path = %manifest_path.display(),
                    error = %e,
                    "ignoring invalid manifest"
                );
                return None;
            }
        };

        let working = manifest_path.parent()?;
        if let Some(existing) = self.find_by_working(working) {
            existing.update_identity(manifest);
            return Some(existing);
        }

        match Project::new(&self.root, manifest_path, manifest, &self.settings) {
            Ok(project) => Some(project),
            Err(e) => {
                tracing::warn!(
                    path = %manifest_path.display(),
                    error = %e,
                    "failed to construct project"
                );
                None
            }
        }
    }

    /// Incremental insert used when a new manifest appears.
    ///
    /// On serve-path collision the project with the higher source priority
    /// survives and the loser is closed and evicted; equal priority is
    /// last write wins.
    pub fn add_project(&self, manifest_path: &Path) -> Option<Arc<Project>> {
        let candidate = self.make_or_update(manifest_path)?;

        let mut map = self.projects.write();
        match map.entry(candidate.serve_path().to_string()) {
            Entry::Occupied(mut entry) => {
                if Arc::ptr_eq(entry.get(), &candidate) {
                    // same entity, identity already refreshed in place
                    return Some(candidate);
                }
                let existing = Arc::clone(entry.get());
                if wins_over(&candidate, &existing) {
                    log_collision(&candidate, &existing);
                    existing.close();
                    entry.insert(Arc::clone(&candidate));
                    Some(candidate)
                } else {
                    log_collision(&existing, &candidate);
                    candidate.close();
                    None
                }
            }
            Entry::Vacant(entry) => {
                tracing::info!(
                    serve_path = %candidate.serve_path(),
                    namespace = %candidate.namespace(),
                    "project registered"
                );
                entry.insert(Arc::clone(&candidate));
                Some(candidate)
            }
        }
    }

    /// Close a project's watcher and evict it from the map.
    ///
    /// Routing resolves projects per request, so dependent components pick
    /// the removal up without an explicit rewire.
    pub fn remove_project(&self, project: &Arc<Project>) {
        let removed = {
            let mut map = self.projects.write();
            match map.get(project.serve_path()) {
                Some(current) if Arc::ptr_eq(current, project) => {
                    map.remove(project.serve_path());
                    true
                }
                _ => false,
            }
        };
        project.close();
        if removed {
            tracing::info!(serve_path = %project.serve_path(), "project removed");
        }
    }

    /// Map an absolute filesystem path to its canonical serve path.
    pub fn resolve_serve_path(&self, fs_path: &Path) -> String {
        serve_path_for(&self.root, fs_path, &self.settings)
    }

    /// Find the project serving a request path, together with the path
    /// remainder below its serve path. Longest serve path wins.
    pub fn resolve_project_for_request(
        &self,
        request_path: &str,
    ) -> Option<(Arc<Project>, String)> {
        let map = self.projects.read();
        let mut best: Option<(&String, &Arc<Project>)> = None;

        for (serve_path, project) in map.iter() {
            if !request_matches(serve_path, request_path) {
                continue;
            }
            if best.map_or(true, |(current, _)| serve_path.len() > current.len()) {
                best = Some((serve_path, project));
            }
        }

        best.map(|(serve_path, project)| {
            let rest = request_path[serve_path.len()..]
                .trim_start_matches('/')
                .to_string();
            (Arc::clone(project), rest)
        })
    }

    pub fn get(&self, serve_path: &str) -> Option<Arc<Project>> {
        self.projects.read().get(serve_path).cloned()
    }

    /// Look a project up by serve path or namespace, for command surfaces.
    pub fn find(&self, needle: &str) -> Option<Arc<Project>> {
        let map = self.projects.read();
        map.values()
            .find(|p| {
                p.serve_path() == needle
                    || p.serve_path().trim_start_matches('/') == needle
                    || p.namespace() == needle
            })
            .cloned()
    }

    fn find_by_working(&self, working: &Path) -> Option<Arc<Project>> {
        let map = self.projects.read();
        map.values()
            .find(|p| p.paths().working == working)
            .cloned()
    }

    pub fn snapshot(&self) -> ProjectMap {
        self.projects.read().clone()
    }

    pub fn len(&self) -> usize {
        self.projects.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.projects.read().is_empty()
    }

    /// Start every project's watcher plus the workspace-level manifest
    /// watcher. A watcher that fails to start is fatal only to its
    /// project.
    pub fn start_watchers(self: &Arc<Self>, ctx: &Arc<WatchContext>) {
        let projects = self.snapshot();
        for project in projects.values() {
            let excluded = projects
                .values()
                .filter(|other| !Arc::ptr_eq(other, project))
                .map(|other| other.paths().base.clone())
                .collect();
            if let Err(e) = project.start_watching(ctx, excluded) {
                tracing::warn!(
                    serve_path = %project.serve_path(),
                    error = %e,
                    "watcher failed to start; project will not rebuild or reload on changes"
                );
            }
        }
        self.start_workspace_watcher(ctx);
    }

    /// Close all watchers and cancel pending timers. Projects stay
    /// registered.
    pub fn stop_watchers(&self) {
        if let Some(watch) = self.workspace_watch.lock().take() {
            watch.task.abort();
        }
        for project in self.projects.read().values() {
            project.close();
        }
    }

    fn start_workspace_watcher(self: &Arc<Self>, ctx: &Arc<WatchContext>) {
        let filter = WatchFilter::new(
            self.root.clone(),
            self.settings.watch_ignore.clone(),
            Vec::new(),
        );
        match FileWatcher::new(filter) {
            Ok((watcher, mut rx)) => {
                let registry = Arc::downgrade(self);
                let ctx = Arc::clone(ctx);
                let task = tokio::spawn(async move {
                    while let Some(change) = rx.recv().await {
                        let Some(registry) = registry.upgrade() else {
                            break;
                        };
                        registry.handle_workspace_change(&ctx, &change);
                    }
                });
                *self.workspace_watch.lock() = Some(WorkspaceWatch {
                    _watcher: watcher,
                    task,
                });
            }
            Err(e) => {
                tracing::warn!(error = %e, "workspace watcher failed to start");
            }
        }
    }

    /// React to manifests appearing or vanishing anywhere in the
    /// workspace. Manifests of already-registered projects are covered by
    /// the projects' own watchers.
    fn handle_workspace_change(self: &Arc<Self>, ctx: &Arc<WatchContext>, change: &FileChange) {
        let path = change.path();
        if path.file_name().and_then(|n| n.to_str()) != Some(MANIFEST_FILE) {
            return;
        }
        let Some(working) = path.parent() else {
            return;
        };

        match change {
            FileChange::Removed(_) => {
                if let Some(project) = self.find_by_working(working) {
                    // projects with a live watcher evict themselves
                    if !project.is_watching() {
                        self.remove_project(&project);
                    }
                }
            }
            FileChange::Created(_) | FileChange::Modified(_) => {
                if self.find_by_working(working).is_some() {
                    return;
                }
                if let Some(project) = self.add_project(path) {
                    if ctx.serve.is_serving() && !project.is_watching() {
                        let excluded = self
                            .snapshot()
                            .values()
                            .filter(|other| !Arc::ptr_eq(other, &project))
                            .map(|other| other.paths().base.clone())
                            .collect();
                        if let Err(e) = project.start_watching(ctx, excluded) {
                            tracing::warn!(
                                serve_path = %project.serve_path(),
                                error = %e,
                                "watcher failed to start for new project"
                            );
                        }
                    }
                }
            }
        }
    }
}

/// Collision tiebreak: plain source outranks generated output; equal
/// priority is last write wins (the candidate).
fn wins_over(candidate: &Arc<Project>, existing: &Arc<Project>) -> bool {
    candidate.priority() >= existing.priority()
}

fn log_collision(winner: &Arc<Project>, loser: &Arc<Project>) {
    if winner.priority() == loser.priority()
        && winner.priority() == SourcePriority::Source
    {
        tracing::warn!(
            serve_path = %winner.serve_path(),
            kept = %winner.paths().base.display(),
            evicted = %loser.paths().base.display(),
            "two source projects collide on one serve path, keeping the later one"
        );
    } else {
        tracing::info!(
            serve_path = %winner.serve_path(),
            kept = %winner.paths().base.display(),
            evicted = %loser.paths().base.display(),
            "serve path collision resolved by source priority"
        );
    }
}

fn is_ignored_dir(entry: &walkdir::DirEntry) -> bool {
    if !entry.file_type().is_dir() || entry.depth() == 0 {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    name == "node_modules" || name.starts_with('.')
}

/// Does a serve path own a request path?
fn request_matches(serve_path: &str, request_path: &str) -> bool {
    if serve_path == "/" {
        return true;
    }
    request_path == serve_path
        || request_path
            .strip_prefix(serve_path)
            .is_some_and(|rest| rest.starts_with('/'))
}

/// Derive the canonical serve path for a filesystem path.
///
/// Pure and deterministic: strips the workspace root, then drops any
/// configured structural folder segment (source, library and dist folder
/// names).
pub fn serve_path_for(root: &Path, fs_path: &Path, settings: &WorkspaceSettings) -> String {
    let rel = fs_path.strip_prefix(root).unwrap_or(fs_path);
    let structural = settings.structural_folders();

    let mut segments: Vec<String> = Vec::new();
    for component in rel.components() {
        if let Component::Normal(os) = component {
            let name = os.to_string_lossy();
            if structural.contains(&name.as_ref()) {
                continue;
            }
            segments.push(name.into_owned());
        }
    }

    format!("/{}", segments.join("/"))
}
