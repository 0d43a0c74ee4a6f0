// src/lib.rs

pub mod cli;
pub mod config;
pub mod diagnostics;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod pipeline;
pub mod registry;
pub mod serve;
pub mod watch;

use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::cli::CliArgs;
use crate::config::{load_or_default, validate_watch_tasks};
use crate::engine::Orchestrator;
use crate::errors::{PipelineError, Result};
use crate::registry::{TaskKind, TaskRegistry};

/// Task run when none is named on the command line.
pub const DEFAULT_TASK: &str = "default";

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading and validation
/// - the task registry over that config
/// - the orchestrator
/// - the serve session for the `serve` task
pub async fn run(args: CliArgs) -> Result<()> {
    let mut cfg = load_or_default(args.config.as_deref().map(Path::new))?;

    if let Some(port) = args.port {
        cfg.server.port = port;
    }

    let cfg = Arc::new(cfg);
    let registry = Arc::new(pipeline::build_registry(&cfg)?);
    validate_watch_tasks(&cfg, &registry)?;

    if args.list {
        print_task_list(&registry);
        return Ok(());
    }

    let tasks: Vec<String> = if args.tasks.is_empty() {
        vec![DEFAULT_TASK.to_string()]
    } else {
        args.tasks.clone()
    };

    let mut orchestrator = Orchestrator::new(Arc::clone(&registry));

    for name in &tasks {
        let Some(task) = registry.get(name) else {
            return Err(PipelineError::Config(format!(
                "unknown task '{name}' (see --list)"
            )));
        };
        let is_serve = matches!(task.kind, TaskKind::Serve);

        info!(task = %name, "starting task");
        if is_serve {
            serve::run_serve(&cfg, &mut orchestrator, name).await?;
        } else {
            orchestrator.run(name).await?;
        }
        info!(task = %name, "task finished");
    }

    Ok(())
}

/// `--list` output: every task with its prerequisites and body.
fn print_task_list(registry: &TaskRegistry) {
    println!("tasks ({}):", registry.len());
    for task in registry.iter() {
        println!("  - {}", task.name);
        println!("      {}", task.description);
        if !task.prerequisites.is_empty() {
            println!("      after: {:?}", task.prerequisites);
        }
        if let TaskKind::Sequence(body) = &task.kind {
            println!("      then: {body:?}");
        }
    }
}
