//! Browser reload channel.
//!
//! A small stateful broadcast endpoint over WebSockets. Clients perform a
//! one-message handshake (`{"command":"hello"}`), then receive coalesced
//! change notifications: everything arriving within the configured window
//! collapses into a single `reload` message carrying the most recent path.
//! A failed send only drops that one client; the browser reconnects and
//! requests a fresh page.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use plinth_core::ChangeNotifier;

use super::routes::AppState;

/// Protocol versions announced in the handshake reply.
pub const PROTOCOL_VERSIONS: &[&str] = &["official-7"];

struct Pending {
    /// Overwritten by every notification inside the window.
    last_path: Arc<Mutex<PathBuf>>,
    flush: JoinHandle<()>,
}

/// Broadcast channel owning the set of connected reload clients.
pub struct ReloadChannel {
    me: Weak<ReloadChannel>,
    server_name: String,
    window: Duration,
    clients: RwLock<HashMap<usize, mpsc::Sender<String>>>,
    next_client_id: RwLock<usize>,
    pending: Mutex<Option<Pending>>,
}

impl ReloadChannel {
    pub fn new(server_name: String, window: Duration) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            me: me.clone(),
            server_name,
            window,
            clients: RwLock::new(HashMap::new()),
            next_client_id: RwLock::new(0),
            pending: Mutex::new(None),
        })
    }

    /// Register a new client; returns its id and the message receiver.
    pub fn register_client(&self) -> (usize, mpsc::Receiver<String>) {
        let id = {
            let mut next_id = self.next_client_id.write();
            let id = *next_id;
            *next_id += 1;
            id
        };

        let (tx, rx) = mpsc::channel(100);
        self.clients.write().insert(id, tx);
        (id, rx)
    }

    pub fn unregister_client(&self, id: usize) {
        self.clients.write().remove(&id);
    }

    pub fn client_count(&self) -> usize {
        self.clients.read().len()
    }

    /// The handshake reply sent after a client's `hello`.
    pub fn hello_reply(&self) -> String {
        serde_json::json!({
            "command": "hello",
            "protocols": PROTOCOL_VERSIONS,
            "serverName": self.server_name,
        })
        .to_string()
    }

    fn reload_message(path: &Path) -> String {
        serde_json::json!({
            "command": "reload",
            "path": path.display().to_string(),
            "liveCSS": true,
            "liveImg": true,
        })
        .to_string()
    }

    /// Send a message to every connected client, pruning the ones whose
    /// connection errored.
    pub async fn broadcast(&self, message: String) {
        let clients = self.clients.read().clone();

        let mut failed_ids = Vec::new();
        for (id, tx) in clients {
            if tx.send(message.clone()).await.is_err() {
                failed_ids.push(id);
            }
        }

        for id in failed_ids {
            tracing::warn!(client = id, "dropping reload client after failed send");
            self.unregister_client(id);
        }
    }

    /// Drop all clients and any pending notification. Used on server
    /// teardown; closing the senders ends each client's socket task.
    pub fn reset(&self) {
        if let Some(pending) = self.pending.lock().take() {
            pending.flush.abort();
        }
        self.clients.write().clear();
    }
}

impl ChangeNotifier for ReloadChannel {
    /// Record a change without sending immediately: the first notification
    /// opens the coalescing window, later ones only overwrite the path.
    fn notify(&self, path: &Path) {
        let mut pending = self.pending.lock();
        if let Some(p) = pending.as_ref() {
            *p.last_path.lock() = path.to_path_buf();
            return;
        }

        let Some(channel) = self.me.upgrade() else {
            return;
        };
        let last_path = Arc::new(Mutex::new(path.to_path_buf()));
        let last_for_flush = Arc::clone(&last_path);
        let window = self.window;

        let flush = tokio::spawn(async move {
            tokio::time::sleep(window).await;
            let path = {
                channel.pending.lock().take();
                last_for_flush.lock().clone()
            };
            channel.broadcast(ReloadChannel::reload_message(&path)).await;
        });

        *pending = Some(Pending { last_path, flush });
    }
}

/// Upgrade handler for the reload endpoint.
pub async fn ws_handler(
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let channel = Arc::clone(&state.reload);
    ws.on_upgrade(move |socket| handle_socket(channel, socket))
}

async fn handle_socket(channel: Arc<ReloadChannel>, mut socket: WebSocket) {
    // one-message handshake
    let hello_ok = loop {
        match socket.recv().await {
            Some(Ok(Message::Text(text))) => {
                let is_hello = serde_json::from_str::<serde_json::Value>(text.as_str())
                    .ok()
                    .and_then(|v| {
                        v.get("command")
                            .and_then(|c| c.as_str())
                            .map(|c| c == "hello")
                    })
                    .unwrap_or(false);
                break is_hello;
            }
            Some(Ok(Message::Ping(_) | Message::Pong(_))) => continue,
            _ => break false,
        }
    };

    if !hello_ok {
        tracing::debug!("reload client failed handshake");
        return;
    }

    if socket
        .send(Message::Text(channel.hello_reply().into()))
        .await
        .is_err()
    {
        return;
    }

    let (id, mut rx) = channel.register_client();
    tracing::debug!(client = id, "reload client connected");

    let mut keep_alive = tokio::time::interval(Duration::from_secs(30));
    keep_alive.tick().await; // the first tick completes immediately

    loop {
        tokio::select! {
            outgoing = rx.recv() => {
                match outgoing {
                    Some(message) => {
                        if socket.send(Message::Text(message.into())).await.is_err() {
                            break;
                        }
                    }
                    // channel was reset during server teardown
                    None => break,
                }
            }
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    _ => {}
                }
            }
            _ = keep_alive.tick() => {
                if socket.send(Message::Ping(Vec::new().into())).await.is_err() {
                    break;
                }
            }
        }
    }

    channel.unregister_client(id);
    tracing::debug!(client = id, "reload client disconnected");
}
