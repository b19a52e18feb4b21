//! HTTP routing for the development server.
//!
//! Projects are resolved per request from the registry, so projects added
//! or evicted while the server runs are picked up without a rewire. The
//! serving mode is fixed when the router is built; switching modes takes a
//! stop/start cycle.

use std::path::Path;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, HeaderValue, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;

use plinth_core::{Registry, ServeMode};

use super::reload::{self, ReloadChannel};

/// Shared state for request handlers.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<Registry>,
    pub reload: Arc<ReloadChannel>,
    pub mode: ServeMode,
}

/// Build the router serving every registered project plus the reload
/// endpoint.
pub fn build_router(
    registry: Arc<Registry>,
    reload: Arc<ReloadChannel>,
    mode: ServeMode,
) -> Router {
    let state = AppState {
        registry,
        reload,
        mode,
    };

    Router::new()
        .route("/__plinth_reload__", get(reload::ws_handler))
        .route("/__plinth_reload__.js", get(reload_client_script))
        .route("/favicon.ico", get(handle_favicon))
        .fallback(get(serve_project_file))
        .layer(
            // allow all origins for local development
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-cache"),
        ))
        .with_state(state)
}

/// Serve the reload client script.
async fn reload_client_script() -> impl IntoResponse {
    const RELOAD_SCRIPT: &str = include_str!("../../assets/reload-client.js");

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/javascript")
        .body(Body::from(RELOAD_SCRIPT))
        .unwrap()
}

/// Handle favicon requests with 204 No Content.
async fn handle_favicon() -> impl IntoResponse {
    StatusCode::NO_CONTENT
}

/// Resolve a request path to a project file and serve it from disk.
async fn serve_project_file(State(state): State<AppState>, uri: Uri) -> Response {
    let request_path = uri.path();

    let Some((project, rest)) = state.registry.resolve_project_for_request(request_path)
    else {
        return not_found(request_path);
    };

    // reject traversal out of the served tree
    if rest.split('/').any(|segment| segment == "..") {
        return not_found(request_path);
    }

    let root = project.served_root(state.mode);
    let mut file_path = if rest.is_empty() {
        root.to_path_buf()
    } else {
        root.join(&rest)
    };
    if file_path.is_dir() {
        file_path = file_path.join("index.html");
    }

    match tokio::fs::read(&file_path).await {
        Ok(content) => {
            let content_type = content_type_for(&file_path);
            let body = if content_type.starts_with("text/html") {
                inject_reload_script(&content)
            } else {
                content
            };
            Response::builder()
                .status(StatusCode::OK)
                .header(header::CONTENT_TYPE, content_type)
                .body(Body::from(body))
                .unwrap()
        }
        Err(e) => {
            tracing::debug!(path = %file_path.display(), error = %e, "file not served");
            not_found(request_path)
        }
    }
}

fn not_found(path: &str) -> Response {
    Response::builder()
        .status(StatusCode::NOT_FOUND)
        .header(header::CONTENT_TYPE, "text/plain")
        .body(Body::from(format!("File not found: {path}")))
        .unwrap()
}

/// Inject the reload client script before the closing </body> tag.
fn inject_reload_script(content: &[u8]) -> Vec<u8> {
    let html = String::from_utf8_lossy(content);
    let script_tag = r#"<script src="/__plinth_reload__.js"></script>"#;

    if let Some(pos) = html.rfind("</body>") {
        let mut result = String::with_capacity(html.len() + script_tag.len() + 10);
        result.push_str(&html[..pos]);
        result.push_str("\n  ");
        result.push_str(script_tag);
        result.push('\n');
        result.push_str(&html[pos..]);
        return result.into_bytes();
    }

    // no body tag: append at the end
    let mut result = html.to_string();
    result.push('\n');
    result.push_str(script_tag);
    result.into_bytes()
}

/// Determine content type from file extension.
fn content_type_for(path: &Path) -> &'static str {
    let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or("");

    match extension {
        "js" | "mjs" => "application/javascript",
        "json" => "application/json",
        "map" => "application/json",
        "html" => "text/html; charset=utf-8",
        "css" => "text/css",
        "xml" => "application/xml",
        "properties" => "text/plain; charset=utf-8",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "svg" => "image/svg+xml",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "wasm" => "application/wasm",
        _ => "application/octet-stream",
    }
}
