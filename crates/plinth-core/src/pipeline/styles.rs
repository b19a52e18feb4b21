//! Style compilation stage.
//!
//! Two independent sub-paths share one walk: a library theme source file
//! (`library.source.<ext>`) produces a normal and a right-to-left
//! stylesheet plus a parameters file, while component-local style files
//! each produce a single stylesheet. Both are best-effort per matched
//! file: one bad file never blocks the others.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::{Captures, Regex};

use super::{extension, walk_files, BuildContext};
use crate::error::Result;
use crate::toolchain::Toolchain;

/// Outcome of one style compilation pass.
#[derive(Debug, Default)]
pub struct StyleOutcome {
    /// Stylesheets and parameter files written.
    pub written: Vec<PathBuf>,
    /// Matched files that failed to compile or write.
    pub failed: usize,
}

pub(crate) fn run(ctx: &BuildContext) -> Result<()> {
    let outcome = compile_tree(
        ctx.dest,
        ctx.dest,
        ctx.toolchain,
        &ctx.settings.style_source_extension,
    );
    tracing::debug!(
        written = outcome.written.len(),
        failed = outcome.failed,
        "style compilation finished"
    );
    Ok(())
}

/// Compile every style source below `input_root`, writing results to the
/// mirrored location below `output_root`.
///
/// Used by the pipeline stage (dest → dest) and by live style rebuilds
/// (working tree → currently served tree).
pub fn compile_tree(
    input_root: &Path,
    output_root: &Path,
    toolchain: &dyn Toolchain,
    style_ext: &str,
) -> StyleOutcome {
    let style_ext = style_ext.to_ascii_lowercase();
    let theme_source = format!("library.source.{style_ext}");
    let mut outcome = StyleOutcome::default();

    for path in walk_files(input_root) {
        if extension(&path).as_deref() != Some(style_ext.as_str()) {
            continue;
        }

        let source = match fs::read_to_string(&path) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(file = %path.display(), error = %e, "unreadable style source");
                outcome.failed += 1;
                continue;
            }
        };

        let css = match toolchain.compile_style(&source, &path) {
            Ok(css) => css,
            Err(e) => {
                tracing::warn!(file = %path.display(), error = %e, "style compilation failed");
                outcome.failed += 1;
                continue;
            }
        };

        let Ok(rel) = path.strip_prefix(input_root) else {
            continue;
        };

        let is_theme = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.eq_ignore_ascii_case(&theme_source));

        let results = if is_theme {
            let dir = output_root.join(rel.parent().unwrap_or_else(|| Path::new("")));
            vec![
                (dir.join("library.css"), css.clone()),
                (dir.join("library-RTL.css"), rtl_flip(&css)),
                (dir.join("library-parameters.json"), extract_parameters(&css)),
            ]
        } else {
            vec![(output_root.join(rel).with_extension("css"), css)]
        };

        for (target, content) in results {
            if let Err(e) = write_output(&target, &content) {
                tracing::warn!(file = %target.display(), error = %e, "failed to write stylesheet");
                outcome.failed += 1;
            } else {
                outcome.written.push(target);
            }
        }
    }

    outcome
}

fn write_output(target: &Path, content: &str) -> Result<()> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(target, content)?;
    Ok(())
}

static DIRECTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(left|right)\b").expect("valid pattern"));

/// Produce the right-to-left variant of a stylesheet.
///
/// Textual direction swap on word boundaries; identifiers like
/// `copyright` are left alone.
pub fn rtl_flip(css: &str) -> String {
    DIRECTION
        .replace_all(css, |caps: &Captures| {
            if &caps[1] == "left" {
                "right"
            } else {
                "left"
            }
        })
        .into_owned()
}

static PARAMETER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"--([A-Za-z0-9_-]+)\s*:\s*([^;}]+)").expect("valid pattern"));

/// Extract theme parameters (custom properties) as a JSON document.
pub fn extract_parameters(css: &str) -> String {
    let mut map = serde_json::Map::new();
    for caps in PARAMETER.captures_iter(css) {
        map.insert(
            caps[1].to_string(),
            serde_json::Value::String(caps[2].trim().to_string()),
        );
    }
    serde_json::to_string_pretty(&serde_json::Value::Object(map))
        .unwrap_or_else(|_| "{}".to_string())
}
