// src/config/mod.rs

//! Configuration loading and validation for musashi.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate invariants the type system can't express (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_from_path, load_or_default};
pub use model::{
    ConfigFile, DeploySection, OutputSection, PathsSection, ServerSection, StylesSection,
    ToolSpec, ToolsSection, WatchBindingConfig, WatchSection,
};
pub use validate::{validate_config, validate_watch_tasks};
