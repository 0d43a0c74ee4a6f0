// src/exec/tool.rs

//! Running external build tools as child processes.
//!
//! Every compiler, minifier, linter and generator the pipeline uses is an
//! external command described by a [`ToolSpec`] in the config. Task code
//! appends per-call arguments (input/output paths) to the configured base
//! arguments and classifies non-zero exits into the error taxonomy.

use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, info};

use crate::config::model::ToolSpec;
use crate::errors::{PipelineError, Result};

/// Captured output of a finished tool process.
#[derive(Debug)]
pub struct ToolOutput {
    /// Exit code; `-1` when the process was killed by a signal.
    pub status: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.status == 0
    }

    /// The more useful diagnostic stream: stderr when present, stdout
    /// otherwise.
    pub fn diagnostics(&self) -> String {
        let err = self.stderr.trim();
        if err.is_empty() {
            self.stdout.trim().to_string()
        } else {
            err.to_string()
        }
    }
}

/// Run a tool to completion, capturing stdout and stderr.
///
/// A spawn failure (tool binary missing, not executable) is an `Io` error
/// naming the command; a non-zero exit is **not** an error at this level,
/// callers classify it.
pub async fn run_tool(
    spec: &ToolSpec,
    extra_args: &[String],
    envs: &[(&str, String)],
    cwd: Option<&Path>,
) -> Result<ToolOutput> {
    info!(cmd = %spec.cmd, "running tool");
    debug!(cmd = %spec.cmd, base_args = ?spec.args, extra_args = ?extra_args, "tool argv");

    let mut cmd = Command::new(&spec.cmd);
    cmd.args(&spec.args)
        .args(extra_args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    for (key, value) in envs {
        cmd.env(key, value);
    }
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }

    let output = cmd
        .output()
        .await
        .map_err(|e| PipelineError::io(Path::new(&spec.cmd), e))?;

    let status = output.status.code().unwrap_or(-1);
    let result = ToolOutput {
        status,
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    };

    debug!(cmd = %spec.cmd, status, "tool finished");
    Ok(result)
}

/// Run a compile-class tool (compiler, prefixer, minifier); a non-zero exit
/// means the input was rejected and becomes a `Compile` error.
pub async fn run_compiler(
    spec: &ToolSpec,
    extra_args: &[String],
    envs: &[(&str, String)],
) -> Result<()> {
    let output = run_tool(spec, extra_args, envs, None).await?;
    if output.success() {
        if !output.stdout.trim().is_empty() {
            debug!(tool = %spec.cmd, "stdout: {}", output.stdout.trim());
        }
        Ok(())
    } else {
        Err(PipelineError::Compile {
            tool: spec.cmd.clone(),
            detail: output.diagnostics(),
        })
    }
}

/// Run a generator-class tool (style-guide generator, git); a non-zero exit
/// becomes a `Tool` error carrying the exit status.
pub async fn run_generator(
    spec: &ToolSpec,
    extra_args: &[String],
    cwd: Option<&Path>,
) -> Result<()> {
    let output = run_tool(spec, extra_args, &[], cwd).await?;
    if output.success() {
        if !output.stdout.trim().is_empty() {
            debug!(tool = %spec.cmd, "stdout: {}", output.stdout.trim());
        }
        Ok(())
    } else {
        Err(PipelineError::Tool {
            tool: spec.cmd.clone(),
            status: output.status,
            detail: output.diagnostics(),
        })
    }
}
