// src/pipeline/styles.rs

use tracing::info;

use crate::config::model::ConfigFile;
use crate::errors::{PipelineError, Result};
use crate::exec::run_compiler;
use crate::pipeline::{ensure_dir, path_arg};

/// Compile the stylesheet entry, prefix it for the configured browsers and
/// minify the result into `build/css/<bundle>.css`.
///
/// Each stage writes into `.musashi/stage/` so a failure partway through
/// never leaves a half-processed file in `build/`.
pub async fn run(cfg: &ConfigFile) -> Result<()> {
    let entry = cfg.stylesheet_entry();
    tokio::fs::metadata(&entry)
        .await
        .map_err(|e| PipelineError::io(&entry, e))?;

    ensure_dir(&cfg.build_css_dir()).await?;
    ensure_dir(&cfg.stage_dir()).await?;

    let compiled = cfg.stage_dir().join(cfg.css_bundle_name());
    let prefixed = cfg
        .stage_dir()
        .join(format!("{}.prefixed.css", cfg.output.bundle_name));
    let target = cfg.build_css_dir().join(cfg.css_bundle_name());

    // sass <entry> <staged.css>
    run_compiler(
        &cfg.tools.sass,
        &[path_arg(&entry), path_arg(&compiled)],
        &[],
    )
    .await?;

    // The prefixer reads its browser targets from the environment.
    let browsers = cfg.styles.browsers.join(", ");
    run_compiler(
        &cfg.tools.autoprefixer,
        &[path_arg(&compiled), "-o".to_string(), path_arg(&prefixed)],
        &[("BROWSERSLIST", browsers)],
    )
    .await?;

    // cssmin -o <final> <staged.prefixed.css>
    run_compiler(
        &cfg.tools.cssmin,
        &["-o".to_string(), path_arg(&target), path_arg(&prefixed)],
        &[],
    )
    .await?;

    info!(stylesheet = %target.display(), "styles built");
    Ok(())
}
