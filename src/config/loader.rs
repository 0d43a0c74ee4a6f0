// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::ConfigFile;
use crate::config::validate::validate_config;
use crate::errors::{PipelineError, Result};

/// Load a configuration file from a given path.
///
/// This only performs TOML deserialization and fills in the project root; it
/// does **not** perform semantic validation. Use [`load_or_default`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|e| PipelineError::io(path, e))?;

    let mut config: ConfigFile = toml::from_str(&contents)?;
    config.root = config_root_dir(path);

    Ok(config)
}

/// Resolve and validate the effective configuration.
///
/// - `--config <PATH>` given: the file must exist; a missing file is an error.
/// - No flag: `Musashi.toml` in the current directory is used if present,
///   otherwise the built-in defaults apply.
pub fn load_or_default(cli_path: Option<&Path>) -> Result<ConfigFile> {
    let config = match cli_path {
        Some(path) => load_from_path(path)?,
        None => {
            let path = default_config_path();
            if path.is_file() {
                load_from_path(&path)?
            } else {
                debug!(
                    path = %path.display(),
                    "no config file found, running on built-in defaults"
                );
                ConfigFile::default()
            }
        }
    };

    validate_config(&config)?;
    Ok(config)
}

/// Default config path: `Musashi.toml` in the current working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Musashi.toml")
}

/// Figure out the project root for a given config path.
///
/// - If the config path has a non-empty parent (e.g. "configs/Musashi.toml"),
///   we use that directory.
/// - If it's just a bare filename like "Musashi.toml" (parent = ""),
///   we fall back to the current working directory "."
fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}
