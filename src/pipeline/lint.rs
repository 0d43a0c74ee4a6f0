// src/pipeline/lint.rs

use regex::Regex;
use tracing::info;

use crate::config::model::ConfigFile;
use crate::errors::{PipelineError, Result};
use crate::exec::run_tool;
use crate::pipeline::{path_arg, scripts};

/// Lint the app scripts.
///
/// A clean run succeeds silently. Any reported problem becomes a `Lint`
/// error carrying the linter's report, which fails one-shot runs but is
/// advisory in a serve session.
pub async fn run(cfg: &ConfigFile) -> Result<()> {
    let sources = scripts::list_scripts(cfg).await?;
    if sources.is_empty() {
        info!("no app scripts to lint");
        return Ok(());
    }

    let args: Vec<String> = sources.iter().map(|p| path_arg(p)).collect();
    let output = run_tool(&cfg.tools.lint, &args, &[], None).await?;
    if output.success() {
        info!(scripts = sources.len(), "lint clean");
        return Ok(());
    }

    let report = output.diagnostics();
    let errors = parse_problem_count(&report);
    Err(PipelineError::Lint { errors, report })
}

/// Pull the problem count out of the linter's report.
///
/// The stock jshint reporter ends with a line like `2 errors`; when the
/// report doesn't match, the exit status already told us there is at least
/// one problem.
fn parse_problem_count(report: &str) -> usize {
    let Ok(re) = Regex::new(r"(?m)^\s*(\d+)\s+errors?\b") else {
        return 1;
    };
    re.captures_iter(report)
        .filter_map(|caps| caps.get(1)?.as_str().parse::<usize>().ok())
        .last()
        .unwrap_or(1)
}
