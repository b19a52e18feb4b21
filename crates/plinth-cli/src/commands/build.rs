//! `plinth build` - run the build pipeline without serving.

use std::sync::Arc;

use plinth_config::{BuildTaskConfig, ProjectConfig, WorkspaceSettings};
use plinth_core::pipeline::{self, NullReporter};
use plinth_core::{BasicToolchain, Project, Registry};

use crate::cli::BuildArgs;
use crate::error::{CliError, Result};
use crate::ui;

/// Execute the build command.
///
/// With a project argument, builds that one project with a progress bar.
/// Without one, builds every discovered project as a batch: failures are
/// reported per project and the command fails if any build failed.
pub async fn execute(args: BuildArgs) -> Result<()> {
    let root = super::workspace_root(args.root)?;
    let settings = WorkspaceSettings::load(&root)?;
    let registry = Arc::new(Registry::new(root, settings.clone()));

    let projects = registry.discover_all(true).await?;
    if projects.is_empty() {
        return Err(CliError::InvalidArgument(
            "no projects found in workspace".to_string(),
        ));
    }

    match args.project {
        Some(name) => {
            let project = registry
                .find(&name)
                .ok_or_else(|| CliError::ProjectNotFound(name.clone()))?;
            build_one(&project, &settings)
        }
        None => build_all(&projects, &settings),
    }
}

fn build_one(project: &Project, settings: &WorkspaceSettings) -> Result<()> {
    let paths = project.paths();
    let project_config = ProjectConfig::read(&paths.config).unwrap_or_default();
    let tasks = BuildTaskConfig::resolve(
        settings,
        &project_config,
        paths.working == paths.dist,
    );

    ui::info(&format!(
        "Building {} ({})",
        project.serve_path(),
        project.namespace()
    ));

    let progress = ui::StageProgress::new(pipeline::total_weight(&tasks, 1));
    let summary = pipeline::build_project(project, settings, &BasicToolchain, 1, &progress)?;
    progress.finish("done");

    ui::success(&format!(
        "Built {} in {}ms ({} stages)",
        project.serve_path(),
        summary.duration_ms,
        summary.stages_run
    ));
    Ok(())
}

fn build_all(projects: &plinth_core::ProjectMap, settings: &WorkspaceSettings) -> Result<()> {
    let mut serve_paths: Vec<_> = projects.keys().collect();
    serve_paths.sort();

    let mut failures = 0usize;
    for serve_path in serve_paths {
        let project = &projects[serve_path];
        // batch builds carry no per-stage progress (multiplier 0)
        match pipeline::build_project(project, settings, &BasicToolchain, 0, &NullReporter) {
            Ok(summary) => {
                ui::success(&format!("Built {} in {}ms", serve_path, summary.duration_ms));
            }
            Err(e) => {
                failures += 1;
                ui::error(&format!("Build failed for {serve_path}: {e}"));
            }
        }
    }

    if failures > 0 {
        return Err(CliError::Custom(format!(
            "{failures} project build(s) failed"
        )));
    }
    Ok(())
}
