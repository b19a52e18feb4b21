//! Tree-level stages: clean, copy, debug copies and intermediates cleanup.

use std::fs;

use super::{extension, walk_files, BuildContext};
use crate::error::Result;

/// Recursively remove and recreate the destination tree.
///
/// Skipped entirely when the destination is the source tree.
pub(crate) fn clean(ctx: &BuildContext) -> Result<()> {
    if ctx.dest == ctx.src {
        return Ok(());
    }
    if ctx.dest.exists() {
        fs::remove_dir_all(ctx.dest)?;
    }
    fs::create_dir_all(ctx.dest)?;
    Ok(())
}

/// Mirror the full source tree into the destination.
pub(crate) fn copy(ctx: &BuildContext) -> Result<()> {
    fs::create_dir_all(ctx.dest)?;

    for entry in walkdir::WalkDir::new(ctx.src) {
        let entry = entry.map_err(std::io::Error::from)?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();

        // Guard against a destination nested inside the source tree
        if ctx.dest != ctx.src && path.starts_with(ctx.dest) {
            continue;
        }

        let Ok(rel) = path.strip_prefix(ctx.src) else {
            continue;
        };
        let target = ctx.dest.join(rel);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(path, &target)?;
    }

    Ok(())
}

/// Copy every script in the source tree to the destination under a
/// `-debug` suffixed name, preserving an unminified reading copy next to
/// the production file.
pub(crate) fn debug_copies(ctx: &BuildContext) -> Result<()> {
    for path in walk_files(ctx.src) {
        if extension(&path).as_deref() != Some("js") {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        if stem.ends_with("-debug") {
            continue;
        }
        if ctx.dest != ctx.src && path.starts_with(ctx.dest) {
            continue;
        }

        let Ok(rel) = path.strip_prefix(ctx.src) else {
            continue;
        };
        let target = ctx.dest.join(rel).with_file_name(format!("{stem}-debug.js"));
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(&path, &target)?;
    }

    Ok(())
}

/// Remove leftover style-source files from the destination tree.
pub(crate) fn clean_intermediates(ctx: &BuildContext) -> Result<()> {
    let style_ext = ctx.settings.style_source_extension.to_ascii_lowercase();
    for path in walk_files(ctx.dest) {
        if extension(&path).as_deref() == Some(style_ext.as_str()) {
            fs::remove_file(&path)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use plinth_config::{BuildTaskConfig, ProjectConfig, WorkspaceSettings};
    use std::path::Path;

    fn context<'a>(
        src: &'a Path,
        dest: &'a Path,
        settings: &'a WorkspaceSettings,
        project_config: &'a ProjectConfig,
    ) -> BuildContext<'a> {
        BuildContext {
            src,
            dest,
            namespace: "test.app",
            is_library: false,
            settings,
            project_config,
            tasks: BuildTaskConfig::resolve(settings, project_config, false),
            toolchain: &crate::toolchain::BasicToolchain,
        }
    }

    #[test]
    fn test_copy_mirrors_tree() {
        let temp = tempfile::tempdir().unwrap();
        let src = temp.path().join("webapp");
        let dest = temp.path().join("dist");
        fs::create_dir_all(src.join("view")).unwrap();
        fs::write(src.join("index.js"), "code").unwrap();
        fs::write(src.join("view/Main.xml"), "<View/>").unwrap();

        let settings = WorkspaceSettings::default();
        let project_config = ProjectConfig::default();
        copy(&context(&src, &dest, &settings, &project_config)).unwrap();

        assert_eq!(fs::read_to_string(dest.join("index.js")).unwrap(), "code");
        assert_eq!(
            fs::read_to_string(dest.join("view/Main.xml")).unwrap(),
            "<View/>"
        );
    }

    #[test]
    fn test_clean_skips_same_tree() {
        let temp = tempfile::tempdir().unwrap();
        let src = temp.path().join("webapp");
        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("index.js"), "code").unwrap();

        let settings = WorkspaceSettings::default();
        let project_config = ProjectConfig::default();
        clean(&context(&src, &src, &settings, &project_config)).unwrap();

        assert!(src.join("index.js").exists());
    }

    #[test]
    fn test_clean_removes_destination() {
        let temp = tempfile::tempdir().unwrap();
        let src = temp.path().join("webapp");
        let dest = temp.path().join("dist");
        fs::create_dir_all(&src).unwrap();
        fs::create_dir_all(&dest).unwrap();
        fs::write(dest.join("stale.js"), "old").unwrap();

        let settings = WorkspaceSettings::default();
        let project_config = ProjectConfig::default();
        clean(&context(&src, &dest, &settings, &project_config)).unwrap();

        assert!(dest.exists());
        assert!(!dest.join("stale.js").exists());
    }

    #[test]
    fn test_debug_copies() {
        let temp = tempfile::tempdir().unwrap();
        let src = temp.path().join("webapp");
        let dest = temp.path().join("dist");
        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("App.js"), "code").unwrap();
        fs::write(src.join("data.json"), "{}").unwrap();

        let settings = WorkspaceSettings::default();
        let project_config = ProjectConfig::default();
        debug_copies(&context(&src, &dest, &settings, &project_config)).unwrap();

        assert_eq!(
            fs::read_to_string(dest.join("App-debug.js")).unwrap(),
            "code"
        );
        assert!(!dest.join("data-debug.json").exists());
    }

    #[test]
    fn test_clean_intermediates_removes_style_sources() {
        let temp = tempfile::tempdir().unwrap();
        let src = temp.path().join("webapp");
        let dest = temp.path().join("dist");
        fs::create_dir_all(&dest).unwrap();
        fs::create_dir_all(&src).unwrap();
        fs::write(dest.join("style.less"), ".a {}").unwrap();
        fs::write(dest.join("style.css"), ".a {}").unwrap();

        let settings = WorkspaceSettings::default();
        let project_config = ProjectConfig::default();
        clean_intermediates(&context(&src, &dest, &settings, &project_config)).unwrap();

        assert!(!dest.join("style.less").exists());
        assert!(dest.join("style.css").exists());
    }
}
