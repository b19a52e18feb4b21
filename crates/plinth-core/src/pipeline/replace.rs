//! String replacement stage.
//!
//! Scans a configurable extension set for `<% KEY %>` placeholders. Known
//! computed keys are resolved once per build and reused across all files;
//! unknown keys are left untouched. A file is rewritten only when at least
//! one substitution actually changed its contents.

use std::collections::HashMap;
use std::fs;
use std::sync::LazyLock;

use chrono::{Local, Utc};
use regex::{Captures, Regex};

use super::{extension, walk_files, BuildContext};
use crate::error::Result;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<%\s*([A-Za-z0-9_.]+)\s*%>").expect("valid pattern"));

/// Computed replacement values, resolved once per build invocation.
struct Replacements {
    values: HashMap<&'static str, String>,
}

impl Replacements {
    fn compute(date_pattern: &str) -> Self {
        let mut values = HashMap::new();
        values.insert("TIMESTAMP", Utc::now().timestamp().to_string());
        values.insert("ISODATE", Utc::now().to_rfc3339());
        values.insert("DATE", format_date(date_pattern));
        Self { values }
    }

    fn get(&self, key: &str) -> Option<&String> {
        self.values.get(key)
    }
}

/// Format the current local time with a user-supplied chrono pattern.
///
/// An invalid pattern falls back to a plain ISO day so a bad config value
/// cannot abort the build.
fn format_date(pattern: &str) -> String {
    use chrono::format::{Item, StrftimeItems};

    let items: Vec<Item> = StrftimeItems::new(pattern).collect();
    if items.iter().any(|i| matches!(i, Item::Error)) {
        tracing::warn!(pattern, "invalid date pattern, falling back to %Y-%m-%d");
        return Local::now().format("%Y-%m-%d").to_string();
    }
    Local::now().format_with_items(items.into_iter()).to_string()
}

pub(crate) fn run(ctx: &BuildContext) -> Result<()> {
    let replacements = Replacements::compute(&ctx.settings.date_pattern);
    let extensions = ctx.project_config.replace_extensions(ctx.settings);

    for path in walk_files(ctx.dest) {
        let Some(ext) = extension(&path) else {
            continue;
        };
        if !extensions.iter().any(|e| e.eq_ignore_ascii_case(&ext)) {
            continue;
        }

        let Ok(content) = fs::read_to_string(&path) else {
            tracing::debug!(path = %path.display(), "skipping non-utf8 file");
            continue;
        };

        let rewritten = PLACEHOLDER.replace_all(&content, |caps: &Captures| {
            match replacements.get(&caps[1]) {
                Some(value) => value.clone(),
                // unknown key: keep the placeholder verbatim
                None => caps[0].to_string(),
            }
        });

        if rewritten != content {
            fs::write(&path, rewritten.as_bytes())?;
        }
    }

    Ok(())
}
