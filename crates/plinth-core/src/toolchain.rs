//! Seam for the external transform engines the pipeline consumes.
//!
//! Style compilation, minification and transpilation are collaborators of
//! the build pipeline, not part of it: every stage that needs one goes
//! through the [`Toolchain`] trait so engines can be swapped without
//! touching stage logic. [`BasicToolchain`] is the bundled default.

use std::path::Path;

use lightningcss::printer::PrinterOptions;
use lightningcss::stylesheet::{MinifyOptions, ParserOptions, StyleSheet};

use crate::error::{Error, Result};

/// External pure functions consumed by build stages.
pub trait Toolchain: Send + Sync {
    /// Compile one style source file into a plain stylesheet.
    fn compile_style(&self, source: &str, path: &Path) -> Result<String>;

    /// Minify a script file.
    fn minify_script(&self, source: &str) -> Result<String>;

    /// Minify a stylesheet.
    fn minify_stylesheet(&self, source: &str) -> Result<String>;

    /// Transpile a higher-level source file to the base runtime language.
    fn transpile(&self, source: &str) -> Result<String>;

    /// Extension of transpilable source files (without dot).
    fn transpile_extension(&self) -> &str {
        "ts"
    }

    /// Extension given to transpiled output files.
    fn transpile_target_extension(&self) -> &str {
        "js"
    }
}

/// Default toolchain.
///
/// Stylesheets go through lightningcss; script minification and
/// transpilation are conservative text-level passes, kept deliberately
/// modest since real engines plug in behind the trait.
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicToolchain;

impl BasicToolchain {
    fn parse_and_print(&self, source: &str, filename: String, minify: bool) -> Result<String> {
        let mut stylesheet = StyleSheet::parse(
            source,
            ParserOptions {
                filename,
                ..ParserOptions::default()
            },
        )
        .map_err(|e| Error::Style(format!("failed to parse stylesheet: {e:?}")))?;

        if minify {
            stylesheet
                .minify(MinifyOptions::default())
                .map_err(|e| Error::Style(format!("failed to minify stylesheet: {e:?}")))?;
        }

        let result = stylesheet
            .to_css(PrinterOptions {
                minify,
                ..PrinterOptions::default()
            })
            .map_err(|e| Error::Style(format!("failed to print stylesheet: {e:?}")))?;

        Ok(result.code)
    }
}

impl Toolchain for BasicToolchain {
    fn compile_style(&self, source: &str, path: &Path) -> Result<String> {
        self.parse_and_print(source, path.display().to_string(), false)
    }

    fn minify_stylesheet(&self, source: &str) -> Result<String> {
        self.parse_and_print(source, String::new(), true)
    }

    fn minify_script(&self, source: &str) -> Result<String> {
        // Line-level pass: drops comment-only and blank lines, trims
        // trailing whitespace. Never touches code inside a line.
        let mut out = String::with_capacity(source.len());
        for line in source.lines() {
            let trimmed = line.trim_end();
            if trimmed.is_empty() {
                continue;
            }
            let stripped = trimmed.trim_start();
            if stripped.starts_with("//") && !stripped.starts_with("//!") {
                continue;
            }
            out.push_str(trimmed);
            out.push('\n');
        }
        Ok(out)
    }

    fn transpile(&self, source: &str) -> Result<String> {
        // Identity transform; a real transpiler is a drop-in replacement.
        Ok(source.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minify_stylesheet() {
        let toolchain = BasicToolchain;
        let css = ".a {\n  color: #ff0000;\n}\n";
        let minified = toolchain.minify_stylesheet(css).unwrap();
        assert!(minified.len() < css.len());
        assert!(minified.contains(".a"));
        assert!(!minified.contains('\n'));
    }

    #[test]
    fn test_compile_style_normalizes() {
        let toolchain = BasicToolchain;
        let css = ".btn   {   color :  blue ; }";
        let compiled = toolchain
            .compile_style(css, Path::new("style.less"))
            .unwrap();
        assert!(compiled.contains(".btn"));
        assert!(compiled.contains("color"));
    }

    #[test]
    fn test_compile_style_rejects_garbage() {
        let toolchain = BasicToolchain;
        assert!(toolchain
            .compile_style("not a stylesheet {{{{", Path::new("broken.less"))
            .is_err());
    }

    #[test]
    fn test_minify_script_strips_comments_and_blanks() {
        let toolchain = BasicToolchain;
        let js = "// header comment\nconst a = 1;\n\n  // inline note\nconst b = 2;  \n";
        let minified = toolchain.minify_script(js).unwrap();
        assert_eq!(minified, "const a = 1;\nconst b = 2;\n");
    }

    #[test]
    fn test_transpile_is_identity() {
        let toolchain = BasicToolchain;
        let src = "const x: number = 1;";
        assert_eq!(toolchain.transpile(src).unwrap(), src);
    }
}
