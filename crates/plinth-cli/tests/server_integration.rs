//! Integration tests for the development server's HTTP surface.

use std::fs;
use std::net::SocketAddr;
use std::path::Path;

use tokio::io::{AsyncReadExt, AsyncWriteExt};

use plinth_cli::server::Server;
use plinth_config::WorkspaceSettings;
use plinth_core::ServeMode;

fn write_manifest(dir: &Path, namespace: &str, project_type: &str) {
    fs::create_dir_all(dir).unwrap();
    fs::write(
        dir.join("manifest.json"),
        format!(r#"{{"namespace":"{namespace}","type":"{project_type}"}}"#),
    )
    .unwrap();
}

fn test_settings() -> WorkspaceSettings {
    let mut settings = WorkspaceSettings::default();
    settings.port = 0;
    settings
}

async fn http_get(addr: SocketAddr, path: &str) -> String {
    let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
    let request = format!("GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n");
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut response = Vec::new();
    stream.read_to_end(&mut response).await.unwrap();
    String::from_utf8_lossy(&response).to_string()
}

#[tokio::test]
async fn dev_mode_serves_raw_sources_with_reload_script() {
    let temp = tempfile::tempdir().unwrap();
    let working = temp.path().join("app/webapp");
    write_manifest(&working, "my.app", "application");
    fs::write(
        working.join("index.html"),
        "<html><body><h1>hello</h1></body></html>",
    )
    .unwrap();
    fs::write(working.join("App.js"), "const a = 1;\n").unwrap();

    let server = Server::new(temp.path().to_path_buf(), test_settings());
    server.start(ServeMode::Dev).await.unwrap();
    let addr = server.bound_addr().unwrap();

    let response = http_get(addr, "/app/index.html").await;
    assert!(response.starts_with("HTTP/1.1 200"));
    assert!(response.contains("<h1>hello</h1>"));
    // reload client injected into served HTML
    assert!(response.contains("__plinth_reload__.js"));
    assert!(response.contains("cache-control: no-cache"));

    // raw source served verbatim in DEV mode
    let response = http_get(addr, "/app/App.js").await;
    assert!(response.starts_with("HTTP/1.1 200"));
    assert!(response.contains("const a = 1;"));

    let response = http_get(addr, "/nowhere/index.html").await;
    assert!(response.starts_with("HTTP/1.1 404"));

    // traversal out of the served tree is rejected
    let response = http_get(addr, "/app/../secret.txt").await;
    assert!(!response.starts_with("HTTP/1.1 200"));

    server.stop().await.unwrap();
}

#[tokio::test]
async fn prod_mode_serves_built_artifacts() {
    let temp = tempfile::tempdir().unwrap();
    let working = temp.path().join("app/webapp");
    write_manifest(&working, "my.app", "application");
    fs::write(working.join("Component.js"), "// note\nconst Component = {};\n").unwrap();

    let server = Server::new(temp.path().to_path_buf(), test_settings());
    server.start(ServeMode::Prod).await.unwrap();
    let addr = server.bound_addr().unwrap();

    // PROD serves the dist tree: compressed artifact, no comment line
    let response = http_get(addr, "/app/Component.js").await;
    assert!(response.starts_with("HTTP/1.1 200"));
    assert!(response.contains("const Component"));
    assert!(!response.contains("// note"));

    // the unminified debug copy sits next to it
    let response = http_get(addr, "/app/Component-debug.js").await;
    assert!(response.contains("// note"));

    server.stop().await.unwrap();
}

#[tokio::test]
async fn reload_client_script_is_served() {
    let temp = tempfile::tempdir().unwrap();
    write_manifest(&temp.path().join("app/webapp"), "my.app", "application");

    let server = Server::new(temp.path().to_path_buf(), test_settings());
    server.start(ServeMode::Dev).await.unwrap();
    let addr = server.bound_addr().unwrap();

    let response = http_get(addr, "/__plinth_reload__.js").await;
    assert!(response.starts_with("HTTP/1.1 200"));
    assert!(response.contains("hello"));

    server.stop().await.unwrap();
}
