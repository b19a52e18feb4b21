//! Compression stage.
//!
//! Minifies scripts (skipping debug copies), normalizes JSON, collapses
//! XML whitespace and minifies stylesheets. Markup carrying a `<pre` tag
//! is left alone since its whitespace is significant. Failures are
//! isolated per file: a single unparseable artifact is logged and kept
//! as-is rather than failing the build.

use std::fs;
use std::sync::LazyLock;

use regex::Regex;

use super::{extension, walk_files, BuildContext};
use crate::error::Result;

static INTER_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r">\s+<").expect("valid pattern"));

pub(crate) fn run(ctx: &BuildContext) -> Result<()> {
    for path in walk_files(ctx.dest) {
        let Some(ext) = extension(&path) else {
            continue;
        };

        let Ok(content) = fs::read_to_string(&path) else {
            continue;
        };

        let minified = match ext.as_str() {
            "js" => {
                let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("");
                if stem.ends_with("-debug") {
                    continue;
                }
                match ctx.toolchain.minify_script(&content) {
                    Ok(min) => min,
                    Err(e) => {
                        tracing::warn!(file = %path.display(), error = %e, "script minification failed");
                        continue;
                    }
                }
            }
            "json" => match serde_json::from_str::<serde_json::Value>(&content) {
                Ok(value) => serde_json::to_string(&value).unwrap_or(content.clone()),
                Err(e) => {
                    tracing::warn!(file = %path.display(), error = %e, "JSON normalization failed");
                    continue;
                }
            },
            "xml" => {
                if content.contains("<pre") {
                    continue;
                }
                minify_xml(&content)
            }
            "css" => match ctx.toolchain.minify_stylesheet(&content) {
                Ok(min) => min,
                Err(e) => {
                    tracing::warn!(file = %path.display(), error = %e, "stylesheet minification failed");
                    continue;
                }
            },
            _ => continue,
        };

        if minified != content {
            fs::write(&path, minified)?;
        }
    }

    Ok(())
}

/// Collapse whitespace between tags and trim the document.
fn minify_xml(content: &str) -> String {
    INTER_TAG.replace_all(content.trim(), "><").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use plinth_config::{BuildTaskConfig, ProjectConfig, WorkspaceSettings};
    use std::path::Path;

    fn context<'a>(
        dest: &'a Path,
        settings: &'a WorkspaceSettings,
        project_config: &'a ProjectConfig,
    ) -> BuildContext<'a> {
        BuildContext {
            src: dest,
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
    fn test_json_is_normalized() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("data.json");
        fs::write(&path, "{\n  \"a\": 1,\n  \"b\": [1, 2]\n}\n").unwrap();

        let settings = WorkspaceSettings::default();
        let project_config = ProjectConfig::default();
        run(&context(temp.path(), &settings, &project_config)).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), r#"{"a":1,"b":[1,2]}"#);
    }

    #[test]
    fn test_invalid_json_is_left_alone() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("broken.json");
        fs::write(&path, "{ nope").unwrap();

        let settings = WorkspaceSettings::default();
        let project_config = ProjectConfig::default();
        run(&context(temp.path(), &settings, &project_config)).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "{ nope");
    }

    #[test]
    fn test_xml_whitespace_is_collapsed() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("view.xml");
        fs::write(&path, "<View>\n    <Button/>\n</View>\n").unwrap();

        let settings = WorkspaceSettings::default();
        let project_config = ProjectConfig::default();
        run(&context(temp.path(), &settings, &project_config)).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "<View><Button/></View>");
    }

    #[test]
    fn test_xml_with_pre_tag_is_skipped() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("doc.xml");
        let original = "<Doc>\n  <pre>  spaced  </pre>\n</Doc>";
        fs::write(&path, original).unwrap();

        let settings = WorkspaceSettings::default();
        let project_config = ProjectConfig::default();
        run(&context(temp.path(), &settings, &project_config)).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), original);
    }

    #[test]
    fn test_debug_copies_are_not_minified() {
        let temp = tempfile::tempdir().unwrap();
        let plain = temp.path().join("App.js");
        let debug = temp.path().join("App-debug.js");
        let code = "// comment\nconst a = 1;\n";
        fs::write(&plain, code).unwrap();
        fs::write(&debug, code).unwrap();

        let settings = WorkspaceSettings::default();
        let project_config = ProjectConfig::default();
        run(&context(temp.path(), &settings, &project_config)).unwrap();

        assert_eq!(fs::read_to_string(&plain).unwrap(), "const a = 1;\n");
        assert_eq!(fs::read_to_string(&debug).unwrap(), code);
    }
}
