// src/pipeline/styleguide.rs

use tracing::info;

use crate::config::model::ConfigFile;
use crate::errors::{PipelineError, Result};
use crate::exec::run_generator;
use crate::pipeline::path_arg;

/// Run the style-guide generator with its YAML config.
///
/// The generator resolves the source/destination paths inside its YAML
/// relative to its working directory, so it runs from the project root.
pub async fn run(cfg: &ConfigFile) -> Result<()> {
    let config_path = cfg.styleguide_config();
    tokio::fs::metadata(&config_path)
        .await
        .map_err(|e| PipelineError::io(&config_path, e))?;

    run_generator(
        &cfg.tools.styleguide,
        &[path_arg(&config_path)],
        Some(&cfg.root),
    )
    .await?;

    info!(dir = %cfg.styleguide_dir().display(), "style guide generated");
    Ok(())
}
