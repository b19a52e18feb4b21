//! Server lifecycle state machine.
//!
//! One process-wide [`Server`] owns the explicit state value; every
//! transition goes through the methods here and readers take snapshots.
//! Calls arriving in an unexpected state are no-ops, never errors, which
//! also keeps two starts (or two stops) from proceeding concurrently.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;

use plinth_config::WorkspaceSettings;
use plinth_core::pipeline::{self, NullReporter};
use plinth_core::{
    BasicToolchain, ChangeNotifier, Registry, ServeContext, ServeMode, Toolchain, WatchContext,
};

use crate::error::{CliError, Result};
use crate::ui;

use super::reload::ReloadChannel;
use super::routes;

/// Explicit lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    Stopped,
    Starting,
    Started,
    Stopping,
}

impl std::fmt::Display for ServerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServerState::Stopped => write!(f, "stopped"),
            ServerState::Starting => write!(f, "starting"),
            ServerState::Started => write!(f, "started"),
            ServerState::Stopping => write!(f, "stopping"),
        }
    }
}

/// The development server lifecycle component.
pub struct Server {
    settings: WorkspaceSettings,
    registry: Arc<Registry>,
    reload: Arc<ReloadChannel>,
    toolchain: Arc<dyn Toolchain>,
    state: Mutex<ServerState>,
    mode: Mutex<ServeMode>,
    shutdown: Mutex<Option<tokio::sync::oneshot::Sender<()>>>,
    serve_task: Mutex<Option<JoinHandle<()>>>,
    bound_addr: Mutex<Option<SocketAddr>>,
    /// Set during restart to suppress the open-browser side effect.
    restarting: AtomicBool,
}

impl Server {
    pub fn new(root: PathBuf, settings: WorkspaceSettings) -> Arc<Self> {
        let registry = Arc::new(Registry::new(root, settings.clone()));
        let reload = ReloadChannel::new(
            settings.server_name.clone(),
            Duration::from_millis(settings.reload_debounce_ms),
        );

        Arc::new(Self {
            settings,
            registry,
            reload,
            toolchain: Arc::new(BasicToolchain),
            state: Mutex::new(ServerState::Stopped),
            mode: Mutex::new(ServeMode::Dev),
            shutdown: Mutex::new(None),
            serve_task: Mutex::new(None),
            bound_addr: Mutex::new(None),
            restarting: AtomicBool::new(false),
        })
    }

    /// Current state snapshot.
    pub fn state(&self) -> ServerState {
        *self.state.lock()
    }

    /// Currently selected serving mode.
    pub fn serve_mode(&self) -> ServeMode {
        *self.mode.lock()
    }

    /// Address the listener is bound to, when started.
    pub fn bound_addr(&self) -> Option<SocketAddr> {
        *self.bound_addr.lock()
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Start serving in the given mode. No-op unless currently stopped.
    ///
    /// Any failure along the way (discovery, a PROD build, the port bind)
    /// rolls the state machine back to stopped rather than leaving it
    /// stuck in starting.
    pub async fn start(self: &Arc<Self>, mode: ServeMode) -> Result<()> {
        {
            let mut state = self.state.lock();
            if *state != ServerState::Stopped {
                ui::info(&format!("Server is {}; start ignored", *state));
                return Ok(());
            }
            *state = ServerState::Starting;
        }
        *self.mode.lock() = mode;

        match self.start_inner(mode).await {
            Ok(addr) => {
                *self.state.lock() = ServerState::Started;
                let url = format!("{}://{}", self.settings.protocol, addr);
                ui::success(&format!("Server started in {mode} mode at {url}"));
                if self.settings.open_browser && !self.restarting.load(Ordering::SeqCst) {
                    open_browser(&url);
                }
                Ok(())
            }
            Err(e) => {
                self.teardown().await;
                *self.state.lock() = ServerState::Stopped;
                Err(e)
            }
        }
    }

    async fn start_inner(self: &Arc<Self>, mode: ServeMode) -> Result<SocketAddr> {
        let projects = self.registry.discover_all(true).await?;
        ui::info(&format!("Discovered {} project(s)", projects.len()));

        if mode == ServeMode::Prod {
            self.build_all_serial(&projects)?;
        }

        let ctx = Arc::new(WatchContext {
            settings: self.settings.clone(),
            registry: Arc::downgrade(&self.registry),
            serve: Arc::clone(self) as Arc<dyn ServeContext>,
            notifier: Arc::clone(&self.reload) as Arc<dyn ChangeNotifier>,
            toolchain: Arc::clone(&self.toolchain),
        });

        let app = routes::build_router(
            Arc::clone(&self.registry),
            Arc::clone(&self.reload),
            mode,
        );

        let addr = find_available_port(self.settings.port)?;
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| CliError::Server(format!("Failed to bind to {addr}: {e}")))?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| CliError::Server(format!("Failed to read bound address: {e}")))?;

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
        *self.shutdown.lock() = Some(shutdown_tx);

        let task = tokio::spawn(async move {
            let serve = axum::serve(listener, app).with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            });
            if let Err(e) = serve.await {
                ui::error(&format!("Server error: {e}"));
            }
        });
        *self.serve_task.lock() = Some(task);
        *self.bound_addr.lock() = Some(local_addr);

        self.registry.start_watchers(&ctx);

        Ok(local_addr)
    }

    /// Serial PROD build over every project; short-circuits on the first
    /// failure while recording which projects already succeeded.
    fn build_all_serial(&self, projects: &plinth_core::ProjectMap) -> Result<()> {
        let mut serve_paths: Vec<_> = projects.keys().collect();
        serve_paths.sort();

        let mut succeeded: Vec<&str> = Vec::new();
        for serve_path in serve_paths {
            let project = &projects[serve_path];
            match pipeline::build_project(
                project,
                &self.settings,
                self.toolchain.as_ref(),
                0,
                &NullReporter,
            ) {
                Ok(summary) => {
                    ui::success(&format!(
                        "Built {} in {}ms",
                        serve_path, summary.duration_ms
                    ));
                    succeeded.push(serve_path.as_str());
                }
                Err(e) => {
                    tracing::error!(
                        failed = %serve_path,
                        succeeded = ?succeeded,
                        "aborting remaining builds"
                    );
                    return Err(e.into());
                }
            }
        }
        Ok(())
    }

    /// Stop serving. No-op unless currently started.
    pub async fn stop(&self) -> Result<()> {
        {
            let mut state = self.state.lock();
            if *state != ServerState::Started {
                ui::info(&format!("Server is {}; stop ignored", *state));
                return Ok(());
            }
            *state = ServerState::Stopping;
        }

        self.teardown().await;
        *self.state.lock() = ServerState::Stopped;
        ui::success("Server stopped");
        Ok(())
    }

    /// Tear down watchers, the reload channel and the listener. Pending
    /// watcher timers die with their projects' watchers; an in-flight
    /// build finishes on its own but its notification is suppressed once
    /// the state has left started.
    async fn teardown(&self) {
        self.registry.stop_watchers();
        self.reload.reset();

        if let Some(tx) = self.shutdown.lock().take() {
            let _ = tx.send(());
        }
        let task = self.serve_task.lock().take();
        if let Some(task) = task {
            let _ = task.await;
        }
        *self.bound_addr.lock() = None;
    }

    /// Stop, then start again with the previously active mode. The
    /// open-browser side effect is suppressed.
    pub async fn restart(self: &Arc<Self>) -> Result<()> {
        let mode = *self.mode.lock();
        self.restarting.store(true, Ordering::SeqCst);
        let result = async {
            self.stop().await?;
            self.start(mode).await
        }
        .await;
        self.restarting.store(false, Ordering::SeqCst);
        result
    }

    /// Start or stop depending on the current state; transitional states
    /// ignore the call.
    pub async fn toggle(self: &Arc<Self>) -> Result<()> {
        let state = *self.state.lock();
        match state {
            ServerState::Stopped => {
                let mode = *self.mode.lock();
                self.start(mode).await
            }
            ServerState::Started => self.stop().await,
            _ => {
                ui::info(&format!("Server is {state}; toggle ignored"));
                Ok(())
            }
        }
    }
}

impl ServeContext for Server {
    fn mode(&self) -> ServeMode {
        *self.mode.lock()
    }

    fn is_serving(&self) -> bool {
        *self.state.lock() == ServerState::Started
    }
}

/// Find an available port starting from the requested one.
///
/// Tries the requested port first, then the next ten. Port 0 asks the OS
/// for an ephemeral port.
fn find_available_port(requested_port: u16) -> Result<SocketAddr> {
    use std::net::TcpListener;

    let addr = SocketAddr::from(([127, 0, 0, 1], requested_port));
    if TcpListener::bind(addr).is_ok() {
        return Ok(addr);
    }

    for offset in 1..=10 {
        let port = requested_port.saturating_add(offset);
        let addr = SocketAddr::from(([127, 0, 0, 1], port));
        if TcpListener::bind(addr).is_ok() {
            ui::warning(&format!(
                "Port {requested_port} is busy, using port {port} instead"
            ));
            return Ok(addr);
        }
    }

    Err(CliError::Server(format!(
        "Ports {}-{} are all in use. Try a different port.",
        requested_port,
        requested_port.saturating_add(10)
    )))
}

/// Open the server URL in the default browser.
fn open_browser(url: &str) {
    use std::process::Command;

    let result = if cfg!(target_os = "macos") {
        Command::new("open").arg(url).spawn()
    } else if cfg!(target_os = "windows") {
        Command::new("cmd").args(["/C", "start", url]).spawn()
    } else {
        Command::new("xdg-open").arg(url).spawn()
    };

    match result {
        Ok(_) => ui::info(&format!("Opened browser at {url}")),
        Err(e) => ui::warning(&format!("Failed to open browser: {e}")),
    }
}
