//! `plinth serve` - run the development server until interrupted.

use tokio::signal;

use plinth_config::WorkspaceSettings;
use plinth_core::ServeMode;

use crate::cli::ServeArgs;
use crate::error::Result;
use crate::server::Server;
use crate::ui;

/// Execute the serve command.
///
/// Loads workspace settings, starts the server lifecycle in the requested
/// mode and blocks until Ctrl+C, then stops it cleanly.
pub async fn execute(args: ServeArgs) -> Result<()> {
    let root = super::workspace_root(args.root)?;
    let mut settings = WorkspaceSettings::load(&root)?;
    if let Some(port) = args.port {
        settings.port = port;
    }
    if args.open {
        settings.open_browser = true;
    }

    let mode = if args.prod {
        ServeMode::Prod
    } else {
        ServeMode::Dev
    };

    ui::info(&format!("Workspace: {}", root.display()));
    let server = Server::new(root, settings);
    server.start(mode).await?;

    ui::info("Press Ctrl+C to stop");
    signal::ctrl_c().await?;

    ui::info("Shutting down...");
    server.stop().await?;
    Ok(())
}
