// src/pipeline/clean.rs

use std::path::Path;

use tracing::{debug, info};

use crate::config::model::ConfigFile;
use crate::errors::{PipelineError, Result};

/// Delete the build outputs and staged intermediates.
///
/// Idempotent: directories that are already absent are not an error, so
/// `clean` can run on a pristine checkout or twice in a row.
pub async fn run(cfg: &ConfigFile) -> Result<()> {
    for dir in [cfg.build_dir(), cfg.styleguide_dir(), cfg.stage_dir()] {
        remove_dir_if_present(&dir).await?;
    }
    Ok(())
}

pub(crate) async fn remove_dir_if_present(dir: &Path) -> Result<()> {
    match tokio::fs::remove_dir_all(dir).await {
        Ok(()) => {
            info!(dir = %dir.display(), "removed");
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(dir = %dir.display(), "already absent");
            Ok(())
        }
        Err(e) => Err(PipelineError::io(dir, e)),
    }
}
