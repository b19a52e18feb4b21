//! Command-line interface definition.
//!
//! - `plinth serve` - development server over raw sources (`--prod` builds
//!   first and serves the artifact trees)
//! - `plinth build [PROJECT]` - build one project, or every project when
//!   no argument is given

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// plinth - workspace dev server and build pipeline for component projects
#[derive(Parser, Debug)]
#[command(
    name = "plinth",
    version,
    about = "Workspace dev server and build pipeline for component projects",
    long_about = "plinth discovers component and library projects in a workspace,\n\
                  builds them through a configurable multi-stage pipeline and serves\n\
                  them with live style recompilation and browser reload."
)]
pub struct Cli {
    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the development server
    Serve(ServeArgs),
    /// Run the build pipeline
    Build(BuildArgs),
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Serve built artifact trees instead of raw sources
    #[arg(long)]
    pub prod: bool,

    /// Listening port (overrides workspace configuration)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Open the browser once the server has started
    #[arg(long)]
    pub open: bool,

    /// Workspace root (defaults to the current directory)
    #[arg(long)]
    pub root: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct BuildArgs {
    /// Serve path or namespace of a single project to build
    pub project: Option<String>,

    /// Workspace root (defaults to the current directory)
    #[arg(long)]
    pub root: Option<PathBuf>,
}
