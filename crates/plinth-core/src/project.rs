//! Project entity: identity, paths and watcher-driven rebuild triggers.
//!
//! Each project exclusively owns its file watcher handle and its debounce
//! timers; no other component mutates them. At most one pending timer of
//! each kind (style rebuild, full build) exists per project: a new
//! qualifying event cancels and reschedules rather than queuing, so one
//! burst of rapid saves produces exactly one rebuild observing the latest
//! file state.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tokio::task::JoinHandle;

use plinth_config::{ProjectConfig, WorkspaceSettings};

use crate::context::{ServeMode, WatchContext};
use crate::error::{Error, Result};
use crate::manifest::{Manifest, ProjectType, MANIFEST_FILE};
use crate::pipeline::{self, styles, NullReporter};
use crate::watcher::{FileChange, FileWatcher, WatchFilter};

/// Per-project tool config file name.
pub const PROJECT_CONFIG_FILE: &str = "plinth.json";

/// Debounce delay for watcher-driven full rebuilds.
const FULL_BUILD_DEBOUNCE: Duration = Duration::from_millis(500);

/// Discovery priority of a project at a given serve path.
///
/// Plain source folders outrank generated/intermediate output: when two
/// projects collide on a serve path, the `Source` one survives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SourcePriority {
    Generated,
    Source,
}

/// The filesystem locations belonging to one project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectPaths {
    /// Where the user edits source (the folder holding the manifest).
    pub working: PathBuf,
    /// The folder that owns the project; used for serve-path derivation.
    pub base: PathBuf,
    /// Build output tree.
    pub dist: PathBuf,
    /// Artifact set handed to remote deployment.
    pub deploy: PathBuf,
    /// Per-project tool configuration file.
    pub config: PathBuf,
}

struct WatchHandle {
    /// Dropping the watcher stops event delivery.
    _watcher: FileWatcher,
    task: JoinHandle<()>,
}

/// One discovered component/library unit.
pub struct Project {
    serve_path: String,
    paths: ProjectPaths,
    priority: SourcePriority,
    identity: RwLock<Manifest>,
    watch: Mutex<Option<WatchHandle>>,
    style_timer: Mutex<Option<JoinHandle<()>>>,
    build_timer: Mutex<Option<JoinHandle<()>>>,
}

impl Project {
    /// Build a project entity from an already-parsed manifest.
    pub fn new(
        root: &Path,
        manifest_path: &Path,
        manifest: Manifest,
        settings: &WorkspaceSettings,
    ) -> Result<Arc<Self>> {
        let working = manifest_path
            .parent()
            .ok_or_else(|| Error::Manifest("manifest has no parent folder".to_string()))?
            .to_path_buf();

        let working_name = working
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("");
        let base = if settings.structural_folders().contains(&working_name) {
            working
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| working.clone())
        } else {
            working.clone()
        };

        let rel_working = working.strip_prefix(root).unwrap_or(&working);
        let priority = if rel_working
            .components()
            .any(|c| c.as_os_str().to_string_lossy() == settings.dist_folder.as_str())
        {
            SourcePriority::Generated
        } else {
            SourcePriority::Source
        };

        let config = base.join(PROJECT_CONFIG_FILE);
        let project_config = ProjectConfig::read(&config).unwrap_or_else(|e| {
            tracing::warn!(path = %config.display(), error = %e, "unreadable project config");
            ProjectConfig::default()
        });

        let dist_name = project_config
            .dist_folder
            .clone()
            .unwrap_or_else(|| settings.dist_folder.clone());
        let dist = base.join(dist_name);
        let deploy = project_config
            .deploy_folder
            .as_ref()
            .map(|d| base.join(d))
            .unwrap_or_else(|| dist.clone());

        let serve_path = crate::registry::serve_path_for(root, &base, settings);

        Ok(Arc::new(Self {
            serve_path,
            paths: ProjectPaths {
                working,
                base,
                dist,
                deploy,
                config,
            },
            priority,
            identity: RwLock::new(manifest),
            watch: Mutex::new(None),
            style_timer: Mutex::new(None),
            build_timer: Mutex::new(None),
        }))
    }

    /// Read the manifest at `manifest_path` and build a project from it.
    pub fn discover(
        root: &Path,
        manifest_path: &Path,
        settings: &WorkspaceSettings,
    ) -> Result<Arc<Self>> {
        let manifest = Manifest::read(manifest_path)?;
        Self::new(root, manifest_path, manifest, settings)
    }

    pub fn serve_path(&self) -> &str {
        &self.serve_path
    }

    pub fn paths(&self) -> &ProjectPaths {
        &self.paths
    }

    pub fn priority(&self) -> SourcePriority {
        self.priority
    }

    pub fn namespace(&self) -> String {
        self.identity.read().namespace.clone()
    }

    pub fn project_type(&self) -> ProjectType {
        self.identity.read().project_type
    }

    pub fn is_library(&self) -> bool {
        self.identity.read().is_library()
    }

    /// The tree the server exposes for this project in a given mode.
    pub fn served_root(&self, mode: ServeMode) -> &Path {
        match mode {
            ServeMode::Dev => &self.paths.working,
            ServeMode::Prod => &self.paths.dist,
        }
    }

    /// Location of this project's manifest file.
    pub fn manifest_path(&self) -> PathBuf {
        self.paths.working.join(MANIFEST_FILE)
    }

    /// Swap identity in place after a manifest change. Watcher and timers
    /// survive the update.
    pub fn update_identity(&self, manifest: Manifest) {
        *self.identity.write() = manifest;
    }

    /// Whether a watcher is currently attached.
    pub fn is_watching(&self) -> bool {
        self.watch.lock().is_some()
    }

    /// Start this project's file watcher.
    ///
    /// `excluded_roots` carries every other registered project's base path
    /// so a project never re-triggers on sibling output.
    ///
    /// # Errors
    ///
    /// A watcher that fails to start is fatal only to this project: the
    /// caller logs the error and the project simply will not rebuild or
    /// reload on changes.
    pub fn start_watching(
        self: &Arc<Self>,
        ctx: &Arc<WatchContext>,
        excluded_roots: Vec<PathBuf>,
    ) -> Result<()> {
        let filter = WatchFilter::new(
            self.paths.working.clone(),
            ctx.settings.watch_ignore.clone(),
            excluded_roots,
        );
        let (watcher, mut rx) = FileWatcher::new(filter)?;

        let project = Arc::clone(self);
        let ctx = Arc::clone(ctx);
        let task = tokio::spawn(async move {
            while let Some(change) = rx.recv().await {
                if !project.handle_change(&ctx, &change) {
                    break;
                }
            }
        });

        *self.watch.lock() = Some(WatchHandle {
            _watcher: watcher,
            task,
        });
        Ok(())
    }

    /// React to one watcher event. Returns `false` when the project has
    /// removed itself and its event loop must end.
    fn handle_change(self: &Arc<Self>, ctx: &Arc<WatchContext>, change: &FileChange) -> bool {
        let path = change.path();

        if path == self.manifest_path() {
            return self.handle_manifest_change(ctx, change);
        }

        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return true;
        };
        let ext = ext.to_ascii_lowercase();

        if !ctx.serve.is_serving() {
            return true;
        }

        match ctx.serve.mode() {
            ServeMode::Prod => {
                if ctx.settings.is_watch_extension(&ext) {
                    self.schedule_full_build(ctx);
                }
            }
            ServeMode::Dev => {
                if ext == ctx.settings.style_source_extension
                    && ctx.settings.build_compile_styles
                {
                    self.schedule_style_rebuild(ctx);
                } else if ctx.settings.is_watch_extension(&ext) {
                    ctx.notify(path);
                }
            }
        }

        true
    }

    fn handle_manifest_change(
        self: &Arc<Self>,
        ctx: &Arc<WatchContext>,
        change: &FileChange,
    ) -> bool {
        if let FileChange::Removed(_) = change {
            tracing::info!(serve_path = %self.serve_path, "manifest removed, evicting project");
            self.evict(ctx);
            return false;
        }

        match Manifest::read(&self.manifest_path()) {
            Ok(manifest) => {
                tracing::debug!(
                    serve_path = %self.serve_path,
                    namespace = %manifest.namespace,
                    "manifest changed, identity updated in place"
                );
                self.update_identity(manifest);
                true
            }
            Err(e) => {
                tracing::warn!(
                    serve_path = %self.serve_path,
                    error = %e,
                    "manifest no longer valid, evicting project"
                );
                self.evict(ctx);
                false
            }
        }
    }

    fn evict(self: &Arc<Self>, ctx: &Arc<WatchContext>) {
        if let Some(registry) = ctx.registry.upgrade() {
            registry.remove_project(self);
        } else {
            self.close();
        }
    }

    /// (Re)schedule the style-rebuild timer, replacing any pending one.
    pub fn schedule_style_rebuild(self: &Arc<Self>, ctx: &Arc<WatchContext>) {
        let project = Arc::clone(self);
        let ctx_task = Arc::clone(ctx);
        let delay = Duration::from_millis(ctx.settings.style_debounce_ms);

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if !ctx_task.serve.is_serving() {
                return;
            }
            project.run_style_rebuild(&ctx_task);
        });

        if let Some(previous) = self.style_timer.lock().replace(handle) {
            previous.abort();
        }
    }

    /// (Re)schedule the full-build timer, replacing any pending one.
    pub fn schedule_full_build(self: &Arc<Self>, ctx: &Arc<WatchContext>) {
        let project = Arc::clone(self);
        let ctx_task = Arc::clone(ctx);

        let handle = tokio::spawn(async move {
            tokio::time::sleep(FULL_BUILD_DEBOUNCE).await;
            if !ctx_task.serve.is_serving() {
                return;
            }
            project.run_full_build(&ctx_task);
        });

        if let Some(previous) = self.build_timer.lock().replace(handle) {
            previous.abort();
        }
    }

    fn run_style_rebuild(&self, ctx: &WatchContext) {
        let out_root = self.served_root(ctx.serve.mode()).to_path_buf();
        let outcome = styles::compile_tree(
            &self.paths.working,
            &out_root,
            ctx.toolchain.as_ref(),
            &ctx.settings.style_source_extension,
        );
        tracing::info!(
            namespace = %self.namespace(),
            written = outcome.written.len(),
            failed = outcome.failed,
            "style rebuild finished"
        );
        if let Some(last) = outcome.written.last() {
            ctx.notify(last);
        }
    }

    fn run_full_build(&self, ctx: &WatchContext) {
        match pipeline::build_project(
            self,
            &ctx.settings,
            ctx.toolchain.as_ref(),
            1,
            &NullReporter,
        ) {
            Ok(summary) => {
                tracing::info!(
                    namespace = %self.namespace(),
                    duration_ms = summary.duration_ms,
                    "rebuild completed"
                );
                ctx.notify(&self.paths.dist);
            }
            Err(e) => {
                tracing::error!(namespace = %self.namespace(), error = %e, "rebuild failed");
            }
        }
    }

    /// Cancel any pending debounce timers.
    pub fn cancel_timers(&self) {
        if let Some(timer) = self.style_timer.lock().take() {
            timer.abort();
        }
        if let Some(timer) = self.build_timer.lock().take() {
            timer.abort();
        }
    }

    /// Close the watcher and cancel timers. The entity itself stays valid;
    /// eviction from the registry is the registry's job.
    pub fn close(&self) {
        if let Some(handle) = self.watch.lock().take() {
            handle.task.abort();
        }
        self.cancel_timers();
    }
}

impl fmt::Debug for Project {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Project")
            .field("serve_path", &self.serve_path)
            .field("namespace", &self.namespace())
            .field("priority", &self.priority)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{ChangeNotifier, ServeContext};
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Weak;

    struct TestServe {
        mode: ServeMode,
    }

    impl ServeContext for TestServe {
        fn mode(&self) -> ServeMode {
            self.mode
        }

        fn is_serving(&self) -> bool {
            true
        }
    }

    #[derive(Default)]
    struct CountingNotifier {
        count: AtomicUsize,
    }

    impl ChangeNotifier for CountingNotifier {
        fn notify(&self, _path: &Path) {
            self.count.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn test_context(mode: ServeMode, notifier: Arc<CountingNotifier>) -> Arc<WatchContext> {
        Arc::new(WatchContext {
            settings: WorkspaceSettings::default(),
            registry: Weak::new(),
            serve: Arc::new(TestServe { mode }),
            notifier,
            toolchain: Arc::new(crate::toolchain::BasicToolchain),
        })
    }

    fn write_manifest(dir: &Path, namespace: &str, project_type: &str) {
        fs::create_dir_all(dir).unwrap();
        fs::write(
            dir.join(MANIFEST_FILE),
            format!(r#"{{"namespace":"{namespace}","type":"{project_type}"}}"#),
        )
        .unwrap();
    }

    #[test]
    fn test_paths_for_source_folder_layout() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path();
        let working = root.join("proj/webapp");
        write_manifest(&working, "a.b", "application");

        let settings = WorkspaceSettings::default();
        let project =
            Project::discover(root, &working.join(MANIFEST_FILE), &settings).unwrap();

        assert_eq!(project.serve_path(), "/proj");
        assert_eq!(project.paths().working, working);
        assert_eq!(project.paths().base, root.join("proj"));
        assert_eq!(project.paths().dist, root.join("proj/dist"));
        assert_eq!(project.paths().deploy, root.join("proj/dist"));
        assert_eq!(project.priority(), SourcePriority::Source);
        assert_eq!(project.namespace(), "a.b");
        assert!(!project.is_library());
    }

    #[test]
    fn test_manifest_directly_in_base_folder() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path();
        let working = root.join("cards/weather");
        write_manifest(&working, "cards.weather", "card");

        let settings = WorkspaceSettings::default();
        let project =
            Project::discover(root, &working.join(MANIFEST_FILE), &settings).unwrap();

        assert_eq!(project.serve_path(), "/cards/weather");
        assert_eq!(project.paths().base, working);
        assert_eq!(project.paths().working, working);
    }

    #[test]
    fn test_generated_tree_has_lower_priority() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path();
        let working = root.join("proj/dist");
        write_manifest(&working, "a.b", "application");

        let settings = WorkspaceSettings::default();
        let project =
            Project::discover(root, &working.join(MANIFEST_FILE), &settings).unwrap();

        assert_eq!(project.priority(), SourcePriority::Generated);
        assert_eq!(project.serve_path(), "/proj");
    }

    #[test]
    fn test_update_identity_in_place() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path();
        let working = root.join("proj/webapp");
        write_manifest(&working, "a.b", "application");

        let settings = WorkspaceSettings::default();
        let project =
            Project::discover(root, &working.join(MANIFEST_FILE), &settings).unwrap();

        project.update_identity(Manifest {
            namespace: "a.b.renamed".to_string(),
            project_type: ProjectType::Library,
        });
        assert_eq!(project.namespace(), "a.b.renamed");
        assert!(project.is_library());
        // the entity itself survives: same serve path, same trees
        assert_eq!(project.serve_path(), "/proj");
    }

    #[tokio::test(start_paused = true)]
    async fn test_style_rebuild_debounce_coalesces() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path();
        let working = root.join("proj/webapp");
        write_manifest(&working, "a.b", "application");
        fs::write(working.join("app.less"), ".a { color: red; }").unwrap();

        let settings = WorkspaceSettings::default();
        let project =
            Project::discover(root, &working.join(MANIFEST_FILE), &settings).unwrap();

        let notifier = Arc::new(CountingNotifier::default());
        let ctx = test_context(ServeMode::Dev, Arc::clone(&notifier));

        // a burst of rapid saves reschedules instead of queuing
        project.schedule_style_rebuild(&ctx);
        project.schedule_style_rebuild(&ctx);
        project.schedule_style_rebuild(&ctx);

        tokio::time::sleep(Duration::from_millis(600)).await;
        tokio::task::yield_now().await;

        assert_eq!(notifier.count.load(Ordering::SeqCst), 1);
        // DEV mode compiles into the working tree
        assert!(working.join("app.css").exists());
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_build_debounce_coalesces() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path();
        let working = root.join("proj/webapp");
        write_manifest(&working, "a.b", "application");
        fs::write(working.join("App.js"), "const a = 1;\n").unwrap();

        let settings = WorkspaceSettings::default();
        let project =
            Project::discover(root, &working.join(MANIFEST_FILE), &settings).unwrap();

        let notifier = Arc::new(CountingNotifier::default());
        let ctx = test_context(ServeMode::Prod, Arc::clone(&notifier));

        project.schedule_full_build(&ctx);
        project.schedule_full_build(&ctx);

        tokio::time::sleep(Duration::from_millis(600)).await;
        tokio::task::yield_now().await;

        assert_eq!(notifier.count.load(Ordering::SeqCst), 1);
        assert!(project.paths().dist.join("App.js").exists());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_timers_prevents_rebuild() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path();
        let working = root.join("proj/webapp");
        write_manifest(&working, "a.b", "application");

        let settings = WorkspaceSettings::default();
        let project =
            Project::discover(root, &working.join(MANIFEST_FILE), &settings).unwrap();

        let notifier = Arc::new(CountingNotifier::default());
        let ctx = test_context(ServeMode::Prod, Arc::clone(&notifier));

        project.schedule_full_build(&ctx);
        project.cancel_timers();

        tokio::time::sleep(Duration::from_millis(600)).await;
        tokio::task::yield_now().await;

        assert_eq!(notifier.count.load(Ordering::SeqCst), 0);
    }
}
