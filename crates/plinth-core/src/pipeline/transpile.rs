//! Transpilation stage.
//!
//! Rewrites higher-level-language sources in the destination tree to the
//! base runtime language in place, renaming the file extension.

use std::fs;

use super::{extension, walk_files, BuildContext};
use crate::error::Result;

pub(crate) fn run(ctx: &BuildContext) -> Result<()> {
    let source_ext = ctx.toolchain.transpile_extension().to_ascii_lowercase();
    let target_ext = ctx.toolchain.transpile_target_extension();

    // Collect first; the walk must not observe its own renames.
    let candidates: Vec<_> = walk_files(ctx.dest)
        .filter(|p| extension(p).as_deref() == Some(source_ext.as_str()))
        .collect();

    for path in candidates {
        let source = fs::read_to_string(&path)?;
        let output = ctx.toolchain.transpile(&source)?;
        let target = path.with_extension(target_ext);
        fs::write(&target, output)?;
        fs::remove_file(&path)?;
        tracing::debug!(from = %path.display(), to = %target.display(), "transpiled");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use plinth_config::{BuildTaskConfig, ProjectConfig, WorkspaceSettings};
    use std::path::Path;

    #[test]
    fn test_transpile_renames_sources() {
        let temp = tempfile::tempdir().unwrap();
        let dest = temp.path();
        fs::write(dest.join("App.ts"), "const a = 1;").unwrap();
        fs::write(dest.join("util.js"), "const b = 2;").unwrap();

        let settings = WorkspaceSettings::default();
        let project_config = ProjectConfig::default();
        let ctx = BuildContext {
            src: Path::new("/nonexistent"),
            dest,
            namespace: "test.app",
            is_library: false,
            settings: &settings,
            project_config: &project_config,
            tasks: BuildTaskConfig::resolve(&settings, &project_config, false),
            toolchain: &crate::toolchain::BasicToolchain,
        };
        run(&ctx).unwrap();

        assert!(!dest.join("App.ts").exists());
        assert_eq!(fs::read_to_string(dest.join("App.js")).unwrap(), "const a = 1;");
        assert_eq!(fs::read_to_string(dest.join("util.js")).unwrap(), "const b = 2;");
    }
}
