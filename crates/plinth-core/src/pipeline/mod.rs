//! Ordered, configurable build pipeline.
//!
//! A build is a fixed sequence of stages, each independently toggleable via
//! [`BuildTaskConfig`] and each operating on the destination tree
//! accumulated by the stages before it. The stage table is an explicit
//! array of plain functions so every stage stays unit-testable in
//! isolation.
//!
//! Per-stage progress weights feed an external [`ProgressReporter`] only;
//! they have no effect on ordering or correctness.

pub mod compress;
pub mod preload;
pub mod replace;
pub mod styles;
pub mod transpile;
pub mod tree;

use std::path::{Path, PathBuf};
use std::time::Instant;

use plinth_config::{BuildTaskConfig, ProjectConfig, WorkspaceSettings};
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::project::Project;
use crate::toolchain::Toolchain;

/// Everything a build stage needs.
pub struct BuildContext<'a> {
    /// Source tree the build reads from.
    pub src: &'a Path,
    /// Destination tree the build writes to.
    pub dest: &'a Path,
    /// Project namespace, e.g. `my.company.app`.
    pub namespace: &'a str,
    pub is_library: bool,
    pub settings: &'a WorkspaceSettings,
    pub project_config: &'a ProjectConfig,
    pub tasks: BuildTaskConfig,
    pub toolchain: &'a dyn Toolchain,
}

/// Receiver for stage progress, implemented by the terminal UI.
pub trait ProgressReporter: Send + Sync {
    /// Called before a stage runs with its effective weight
    /// (stage weight × multiplier).
    fn stage(&self, name: &str, weight: u64);
}

/// Reporter that discards all progress.
pub struct NullReporter;

impl ProgressReporter for NullReporter {
    fn stage(&self, _name: &str, _weight: u64) {}
}

/// Outcome of one pipeline invocation.
#[derive(Debug, Clone, Copy)]
pub struct BuildSummary {
    pub stages_run: usize,
    pub duration_ms: u64,
}

struct Stage {
    name: &'static str,
    weight: u64,
    enabled: fn(&BuildTaskConfig) -> bool,
    run: fn(&BuildContext) -> Result<()>,
}

/// The fixed stage order. Intermediates cleanup is tied to `copy` as well
/// as `compile_styles`: style sources only ever land in the destination
/// tree through the copy stage, and the extra condition keeps the stage
/// away from builds whose destination is the source tree itself.
const STAGES: &[Stage] = &[
    Stage {
        name: "clean",
        weight: 1,
        enabled: |t| t.clean,
        run: tree::clean,
    },
    Stage {
        name: "copy",
        weight: 3,
        enabled: |t| t.copy,
        run: tree::copy,
    },
    Stage {
        name: "replace-strings",
        weight: 1,
        enabled: |t| t.replace_strings,
        run: replace::run,
    },
    Stage {
        name: "compile-styles",
        weight: 2,
        enabled: |t| t.compile_styles,
        run: styles::run,
    },
    Stage {
        name: "transpile",
        weight: 2,
        enabled: |t| t.transpile,
        run: transpile::run,
    },
    Stage {
        name: "debug-copies",
        weight: 1,
        enabled: |t| t.debug_copies,
        run: tree::debug_copies,
    },
    Stage {
        name: "compress",
        weight: 3,
        enabled: |t| t.compress,
        run: compress::run,
    },
    Stage {
        name: "clean-intermediates",
        weight: 1,
        enabled: |t| t.compile_styles && t.copy,
        run: tree::clean_intermediates,
    },
    Stage {
        name: "preload",
        weight: 2,
        enabled: |t| t.preload,
        run: preload::run,
    },
];

/// Sum of the enabled stages' weights, scaled by the multiplier.
pub fn total_weight(tasks: &BuildTaskConfig, multiplier: u64) -> u64 {
    STAGES
        .iter()
        .filter(|s| (s.enabled)(tasks))
        .map(|s| s.weight * multiplier)
        .sum()
}

/// Run the pipeline for one project.
///
/// Stages run in their fixed order; a failing stage aborts the remaining
/// ones and surfaces as a single error naming the stage. Output already
/// written by completed stages is left in place.
pub fn build(
    ctx: &BuildContext<'_>,
    multiplier: u64,
    reporter: &dyn ProgressReporter,
) -> Result<BuildSummary> {
    let started = Instant::now();
    let mut stages_run = 0;

    for stage in STAGES {
        if !(stage.enabled)(&ctx.tasks) {
            tracing::debug!(stage = stage.name, "stage disabled, skipping");
            continue;
        }

        reporter.stage(stage.name, stage.weight * multiplier);
        tracing::debug!(stage = stage.name, namespace = ctx.namespace, "running stage");

        (stage.run)(ctx).map_err(|e| Error::Stage {
            stage: stage.name,
            message: e.to_string(),
        })?;
        stages_run += 1;
    }

    Ok(BuildSummary {
        stages_run,
        duration_ms: started.elapsed().as_millis() as u64,
    })
}

/// Resolve configuration for a project and run the pipeline on it.
///
/// Reads the per-project config file fresh on every invocation so edits to
/// it take effect without a server restart.
pub fn build_project(
    project: &Project,
    settings: &WorkspaceSettings,
    toolchain: &dyn Toolchain,
    multiplier: u64,
    reporter: &dyn ProgressReporter,
) -> Result<BuildSummary> {
    let paths = project.paths();
    let project_config = ProjectConfig::read(&paths.config).unwrap_or_else(|e| {
        tracing::warn!(
            path = %paths.config.display(),
            error = %e,
            "unreadable project config, using workspace defaults"
        );
        ProjectConfig::default()
    });

    let same_tree = paths.working == paths.dist;
    let tasks = BuildTaskConfig::resolve(settings, &project_config, same_tree);
    let namespace = project.namespace();

    let ctx = BuildContext {
        src: &paths.working,
        dest: &paths.dist,
        namespace: &namespace,
        is_library: project.is_library(),
        settings,
        project_config: &project_config,
        tasks,
        toolchain,
    };

    build(&ctx, multiplier, reporter)
}

/// All regular files below a root, walk errors skipped.
pub(crate) fn walk_files(root: &Path) -> impl Iterator<Item = PathBuf> {
    WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
}

/// Extension of a path, lowercased, without the dot.
pub(crate) fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use plinth_config::ProjectConfig;

    #[test]
    fn test_total_weight_counts_enabled_stages() {
        let settings = WorkspaceSettings::default();
        let all = BuildTaskConfig::resolve(&settings, &ProjectConfig::default(), false);
        let full = total_weight(&all, 1);
        assert_eq!(full, 16);
        assert_eq!(total_weight(&all, 2), full * 2);
        // batch builds contribute nothing
        assert_eq!(total_weight(&all, 0), 0);
    }

    #[test]
    fn test_total_weight_same_tree() {
        let settings = WorkspaceSettings::default();
        let tasks = BuildTaskConfig::resolve(&settings, &ProjectConfig::default(), true);
        // only compile-styles remains; clean-intermediates needs copy too
        assert_eq!(total_weight(&tasks, 1), 2);
    }
}
