//! Preload bundling stage.
//!
//! Aggregates a project's resource files into a single preload module
//! keyed by module name under the project namespace, so clients fetch one
//! file instead of many. The compatibility version switches the emitted
//! wrapper format.

use std::fs;

use super::{extension, walk_files, BuildContext};
use crate::error::{Error, Result};

/// Resource extensions included in the bundle.
const BUNDLED_EXTENSIONS: &[&str] = &["js", "json", "xml", "properties"];

pub(crate) fn run(ctx: &BuildContext) -> Result<()> {
    let entry_name = if ctx.is_library {
        "library.js"
    } else {
        "Component.js"
    };

    if !ctx.src.join(entry_name).exists() {
        tracing::info!(
            namespace = ctx.namespace,
            entry = entry_name,
            "no bundle entry file, skipping preload"
        );
        return Ok(());
    }

    let out_name = if ctx.is_library {
        "library-preload.js"
    } else {
        "Component-preload.js"
    };
    let out_path = ctx.dest.join(out_name);
    let namespace_path = ctx.namespace.replace('.', "/");

    let mut modules = serde_json::Map::new();
    for path in walk_files(ctx.dest) {
        let Some(ext) = extension(&path) else {
            continue;
        };
        if !BUNDLED_EXTENSIONS.contains(&ext.as_str()) {
            continue;
        }

        let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
        if file_name == out_name || file_name.ends_with("-debug.js") {
            continue;
        }

        let Ok(rel) = path.strip_prefix(ctx.dest) else {
            continue;
        };
        let Ok(content) = fs::read_to_string(&path) else {
            tracing::debug!(file = %path.display(), "skipping binary resource");
            continue;
        };

        let rel_name = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        modules.insert(
            format!("{namespace_path}/{rel_name}"),
            serde_json::Value::String(content),
        );
    }

    let bundle_name = format!(
        "{namespace_path}/{}",
        out_name.trim_end_matches(".js")
    );
    let name_json = serde_json::to_string(&bundle_name)
        .map_err(|e| Error::Custom(format!("failed to encode bundle name: {e}")))?;
    let payload = serde_json::to_string_pretty(&serde_json::Value::Object(modules))
        .map_err(|e| Error::Custom(format!("failed to encode bundle modules: {e}")))?;

    let wrapped = if ctx.settings.compat_version >= 2 {
        format!("define.preload({{\n\"name\": {name_json},\n\"modules\": {payload}\n}});\n")
    } else {
        format!("registerModulePreload({name_json}, {payload});\n")
    };

    fs::write(&out_path, wrapped)?;
    tracing::debug!(bundle = %out_path.display(), "preload bundle written");
    Ok(())
}
