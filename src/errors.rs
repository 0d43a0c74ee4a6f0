// src/errors.rs

//! Crate-wide error type and helpers.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Error taxonomy for the pipeline.
///
/// The variant decides how the serve session treats a failure: build tool
/// failures (`Compile`, `Lint`, `Tool`) are reported and the session keeps
/// watching, while `Config` and `Io` always terminate the process.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    /// A compiler or minifier rejected its input.
    #[error("{tool}: {detail}")]
    Compile { tool: String, detail: String },

    /// The linter reported problems in the source tree.
    #[error("lint failed with {errors} problem(s)\n{report}")]
    Lint { errors: usize, report: String },

    /// An external tool exited with a non-zero status for a reason that is
    /// neither a compile nor a lint diagnostic (e.g. the style guide
    /// generator or git).
    #[error("{tool} exited with status {status}: {detail}")]
    Tool {
        tool: String,
        status: i32,
        detail: String,
    },

    #[error("io error: {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("file watcher error: {0}")]
    Watch(#[from] notify::Error),

    /// A task's action failed; wraps the underlying cause so callers can
    /// still classify it.
    #[error("task '{task}' failed: {source}")]
    TaskFailed {
        task: String,
        #[source]
        source: Box<PipelineError>,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PipelineError {
    /// Wrap a `std::io::Error` together with the path that produced it.
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Whether a serve session should survive this error and keep watching.
    ///
    /// Broken source files produce `Compile`/`Lint`/`Tool` errors and are the
    /// whole point of watching; everything else means the environment itself
    /// is broken and a restart is required.
    pub fn is_recoverable_in_watch(&self) -> bool {
        match self {
            Self::Compile { .. } | Self::Lint { .. } | Self::Tool { .. } => true,
            Self::TaskFailed { source, .. } => source.is_recoverable_in_watch(),
            Self::Config(_)
            | Self::Toml(_)
            | Self::Io { .. }
            | Self::Watch(_)
            | Self::Other(_) => false,
        }
    }

    /// Name of the task this error was attributed to, if any.
    pub fn failing_task(&self) -> Option<&str> {
        match self {
            Self::TaskFailed { task, .. } => Some(task),
            _ => None,
        }
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, PipelineError>;
