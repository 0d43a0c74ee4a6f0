// src/pipeline/deploy.rs

//! Publishing the generated style guide to a git branch.
//!
//! The style guide tree is copied into a scratch checkout under
//! `.musashi/deploy`, committed as a single orphan commit, and force-pushed
//! to the configured remote's URL. The project's own repository is never
//! touched.

use std::path::Path;

use tracing::info;

use crate::config::model::ConfigFile;
use crate::errors::{PipelineError, Result};
use crate::exec::{run_generator, run_tool};
use crate::pipeline::{clean, ensure_dir};

pub async fn run(cfg: &ConfigFile) -> Result<()> {
    let source = cfg.styleguide_dir();
    let meta = tokio::fs::metadata(&source)
        .await
        .map_err(|e| PipelineError::io(&source, e))?;
    if !meta.is_dir() {
        return Err(PipelineError::io(
            &source,
            std::io::Error::other("not a directory"),
        ));
    }

    let remote_url = resolve_remote_url(cfg).await?;

    let stage = cfg.deploy_stage_dir();
    clean::remove_dir_if_present(&stage).await?;
    ensure_dir(&stage).await?;
    copy_tree(&source, &stage).await?;

    let branch = cfg.deploy.branch.as_str();
    git(cfg, &["init", "--quiet", "--initial-branch", branch], &stage).await?;
    git(cfg, &["add", "--all"], &stage).await?;
    git(
        cfg,
        &[
            "-c",
            "user.name=musashi",
            "-c",
            "user.email=musashi@localhost",
            "commit",
            "--quiet",
            "--message",
            &cfg.deploy.message,
        ],
        &stage,
    )
    .await?;
    git(
        cfg,
        &["push", "--quiet", "--force", &remote_url, branch],
        &stage,
    )
    .await?;

    info!(
        remote = %cfg.deploy.remote,
        branch = %branch,
        "style guide published"
    );
    Ok(())
}

/// Ask git for the URL of the configured remote in the project repository.
async fn resolve_remote_url(cfg: &ConfigFile) -> Result<String> {
    let key = format!("remote.{}.url", cfg.deploy.remote);
    let output = run_tool(
        &cfg.tools.git,
        &["config".to_string(), "--get".to_string(), key],
        &[],
        Some(&cfg.root),
    )
    .await?;

    let url = output.stdout.trim().to_string();
    if !output.success() || url.is_empty() {
        return Err(PipelineError::Tool {
            tool: cfg.tools.git.cmd.clone(),
            status: output.status,
            detail: format!(
                "could not resolve remote '{}'; is the project a git repository with that remote?",
                cfg.deploy.remote
            ),
        });
    }
    Ok(url)
}

async fn git(cfg: &ConfigFile, args: &[&str], cwd: &Path) -> Result<()> {
    let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
    run_generator(&cfg.tools.git, &args, Some(cwd)).await
}

/// Copy a directory tree. Symlinks and other special files are skipped.
async fn copy_tree(src: &Path, dst: &Path) -> Result<()> {
    let src = src.to_path_buf();
    let dst = dst.to_path_buf();
    tokio::task::spawn_blocking(move || copy_tree_blocking(&src, &dst))
        .await
        .map_err(|e| PipelineError::from(anyhow::anyhow!("deploy copy task failed: {e}")))?
}

fn copy_tree_blocking(src: &Path, dst: &Path) -> Result<()> {
    let mut stack = vec![(src.to_path_buf(), dst.to_path_buf())];

    while let Some((from, to)) = stack.pop() {
        std::fs::create_dir_all(&to).map_err(|e| PipelineError::io(&to, e))?;

        let entries = std::fs::read_dir(&from).map_err(|e| PipelineError::io(&from, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| PipelineError::io(&from, e))?;
            let from_path = entry.path();
            let to_path = to.join(entry.file_name());
            let file_type = entry
                .file_type()
                .map_err(|e| PipelineError::io(&from_path, e))?;

            if file_type.is_dir() {
                stack.push((from_path, to_path));
            } else if file_type.is_file() {
                std::fs::copy(&from_path, &to_path)
                    .map_err(|e| PipelineError::io(&from_path, e))?;
            }
        }
    }

    Ok(())
}
