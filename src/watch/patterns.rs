// src/watch/patterns.rs

use std::fmt;

use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::config::model::{ConfigFile, WatchBindingConfig};
use crate::errors::{PipelineError, Result};
use crate::registry::TaskName;

/// What a binding does when one of its files changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reaction {
    /// Broadcast a reload to connected browsers.
    Reload,
    /// Run these tasks in order, then broadcast a reload.
    RunTasks(Vec<TaskName>),
}

/// Compiled watch/exclude glob patterns for a single binding.
///
/// The patterns are relative to the project root; the watcher passes
/// relative paths (e.g. `"assets/sass/base.scss"`) into `matches`.
#[derive(Clone)]
pub struct WatchBinding {
    patterns: Vec<String>,
    watch_set: GlobSet,
    exclude_set: Option<GlobSet>,
    reaction: Reaction,
}

impl fmt::Debug for WatchBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchBinding")
            .field("patterns", &self.patterns)
            .field("reaction", &self.reaction)
            .finish_non_exhaustive()
    }
}

impl WatchBinding {
    pub fn reaction(&self) -> &Reaction {
        &self.reaction
    }

    /// Human-readable label for logs.
    pub fn label(&self) -> String {
        self.patterns.join(", ")
    }

    /// Returns true if this binding is interested in the given path
    /// (relative to project root).
    pub fn matches(&self, rel_path: &str) -> bool {
        if !self.watch_set.is_match(rel_path) {
            return false;
        }
        if let Some(exclude) = &self.exclude_set {
            if exclude.is_match(rel_path) {
                return false;
            }
        }
        true
    }
}

/// Compile every `[[watch.bindings]]` entry, merging the global
/// `[watch].exclude` list into each binding's own excludes.
pub fn compile_bindings(cfg: &ConfigFile) -> Result<Vec<WatchBinding>> {
    cfg.watch
        .bindings
        .iter()
        .map(|binding| compile_binding(binding, &cfg.watch.exclude))
        .collect()
}

fn compile_binding(
    config: &WatchBindingConfig,
    global_exclude: &[String],
) -> Result<WatchBinding> {
    let watch_set = build_globset(&config.patterns)?;

    let mut exclude_patterns = config.exclude.clone();
    exclude_patterns.extend(global_exclude.iter().cloned());
    let exclude_set = if exclude_patterns.is_empty() {
        None
    } else {
        Some(build_globset(&exclude_patterns)?)
    };

    let reaction = if config.tasks.is_empty() {
        Reaction::Reload
    } else {
        Reaction::RunTasks(config.tasks.clone())
    };

    Ok(WatchBinding {
        patterns: config.patterns.clone(),
        watch_set,
        exclude_set,
        reaction,
    })
}

/// Build a GlobSet from simple string patterns.
fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = Glob::new(pat)
            .map_err(|e| PipelineError::Config(format!("invalid glob pattern {pat:?}: {e}")))?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| PipelineError::Config(format!("building globset: {e}")))
}
