// src/pipeline/mod.rs

//! The build tasks themselves: what `vendors`, `styles`, `scripts`, `lint`,
//! `styleguide`, `clean` and `deploy` do, plus the registry wiring.

pub mod clean;
pub mod deploy;
pub mod lint;
pub mod scripts;
pub mod styleguide;
pub mod styles;

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::model::ConfigFile;
use crate::errors::{PipelineError, Result};
use crate::registry::{Task, TaskFuture, TaskRegistry};

/// Register the full task catalogue over `cfg` and validate it.
pub fn build_registry(cfg: &Arc<ConfigFile>) -> Result<TaskRegistry> {
    let mut registry = TaskRegistry::new();

    registry.register(Task::action(
        "clean",
        &[],
        "Remove the build and style guide output directories",
        action(cfg, |cfg| async move { clean::run(&cfg).await }),
    ))?;

    registry.register(Task::action(
        "vendors",
        &[],
        "Concatenate and minify the vendor scripts",
        action(cfg, |cfg| async move { scripts::vendors(&cfg).await }),
    ))?;

    registry.register(Task::action(
        "styles",
        &[],
        "Compile, prefix and minify the stylesheet",
        action(cfg, |cfg| async move { styles::run(&cfg).await }),
    ))?;

    registry.register(Task::action(
        "scripts",
        &[],
        "Concatenate the app scripts and minify a copy",
        action(cfg, |cfg| async move { scripts::bundle(&cfg).await }),
    ))?;

    registry.register(Task::action(
        "lint",
        &[],
        "Lint the app scripts",
        action(cfg, |cfg| async move { lint::run(&cfg).await }),
    ))?;

    registry.register(Task::action(
        "styleguide",
        &[],
        "Generate the style guide",
        action(cfg, |cfg| async move { styleguide::run(&cfg).await }),
    ))?;

    registry.register(Task::action(
        "deploy",
        &[],
        "Publish the style guide to the pages branch",
        action(cfg, |cfg| async move { deploy::run(&cfg).await }),
    ))?;

    registry.register(Task::serve(
        "serve",
        &["styles"],
        "Serve the style guide with live reload",
    ))?;

    registry.register(Task::sequence(
        "default",
        &["clean"],
        "Clean, then build everything",
        &["vendors", "styles", "lint", "scripts", "styleguide"],
    ))?;

    registry.validate()?;
    Ok(registry)
}

/// Adapt an `async fn(Arc<ConfigFile>)` into a task action closure.
fn action<F, Fut>(cfg: &Arc<ConfigFile>, f: F) -> impl Fn() -> TaskFuture + Send + Sync + 'static
where
    F: Fn(Arc<ConfigFile>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    let cfg = Arc::clone(cfg);
    move || Box::pin(f(Arc::clone(&cfg))) as TaskFuture
}

/// Create `dir` and any missing parents.
pub(crate) async fn ensure_dir(dir: &Path) -> Result<()> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| PipelineError::io(dir, e))
}

/// Read and concatenate `inputs` in order.
///
/// A newline is kept between files so that concatenated scripts can't run
/// into each other.
pub(crate) async fn concat_files(inputs: &[PathBuf]) -> Result<String> {
    let mut combined = String::new();
    for path in inputs {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| PipelineError::io(path, e))?;
        combined.push_str(&contents);
        if !combined.ends_with('\n') {
            combined.push('\n');
        }
    }
    Ok(combined)
}

pub(crate) async fn write_file(path: &Path, contents: &str) -> Result<()> {
    tokio::fs::write(path, contents)
        .await
        .map_err(|e| PipelineError::io(path, e))
}

pub(crate) fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
