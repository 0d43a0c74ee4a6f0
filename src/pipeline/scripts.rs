// src/pipeline/scripts.rs

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::config::model::ConfigFile;
use crate::errors::{PipelineError, Result};
use crate::exec::run_compiler;
use crate::pipeline::{concat_files, ensure_dir, path_arg, write_file};

/// Concatenate the configured vendor scripts and minify the result into
/// `build/js/<vendor_bundle>`.
///
/// Only the minified bundle is published; the concatenated intermediate is
/// staged out of sight.
pub async fn vendors(cfg: &ConfigFile) -> Result<()> {
    let inputs = cfg.vendor_script_paths();
    let out_dir = cfg.build_js_dir();
    ensure_dir(&out_dir).await?;
    ensure_dir(&cfg.stage_dir()).await?;

    let combined = concat_files(&inputs).await?;
    let staged = cfg.stage_dir().join("vendors.js");
    write_file(&staged, &combined).await?;

    let target = out_dir.join(&cfg.output.vendor_bundle);
    minify_js(cfg, &staged, &target).await?;

    info!(bundle = %target.display(), scripts = inputs.len(), "vendor bundle built");
    Ok(())
}

/// Concatenate the app scripts into `build/js/<bundle>.js` plus a minified
/// `<bundle>.min.js` next to it.
pub async fn bundle(cfg: &ConfigFile) -> Result<()> {
    let sources = list_scripts(cfg).await?;
    let out_dir = cfg.build_js_dir();
    ensure_dir(&out_dir).await?;

    if sources.is_empty() {
        warn!(dir = %cfg.scripts_dir().display(), "no app scripts found; writing empty bundles");
    }

    let combined = concat_files(&sources).await?;
    let plain = out_dir.join(cfg.js_bundle_name());
    write_file(&plain, &combined).await?;

    let minified = out_dir.join(cfg.js_min_bundle_name());
    minify_js(cfg, &plain, &minified).await?;

    info!(bundle = %plain.display(), scripts = sources.len(), "app bundle built");
    Ok(())
}

/// Non-recursive listing of `scripts_dir`, filtered by the configured
/// extension, in stable name order.
pub(crate) async fn list_scripts(cfg: &ConfigFile) -> Result<Vec<PathBuf>> {
    let dir = cfg.scripts_dir();
    let mut entries = tokio::fs::read_dir(&dir)
        .await
        .map_err(|e| PipelineError::io(&dir, e))?;

    let mut sources = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| PipelineError::io(&dir, e))?
    {
        let path = entry.path();
        let file_type = entry
            .file_type()
            .await
            .map_err(|e| PipelineError::io(&path, e))?;
        let wanted_ext = Some(cfg.paths.script_extension.as_str());
        if file_type.is_file() && path.extension().and_then(|e| e.to_str()) == wanted_ext {
            sources.push(path);
        }
    }

    sources.sort();
    Ok(sources)
}

async fn minify_js(cfg: &ConfigFile, input: &Path, output: &Path) -> Result<()> {
    let extra = vec![path_arg(input), "-o".to_string(), path_arg(output)];
    run_compiler(&cfg.tools.jsmin, &extra, &[]).await
}
