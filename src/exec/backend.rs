// src/exec/backend.rs

//! Pluggable executor backend abstraction.
//!
//! The orchestrator talks to an `ExecutorBackend` instead of spawning actions
//! directly. Production code uses [`ActionExecutor`], which runs each action
//! on its own Tokio task; tests can provide a backend that records dispatches
//! and emits completions synchronously.

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::engine::{TaskCompletion, TaskOutcome};
use crate::errors::Result;
use crate::registry::{TaskAction, TaskName};

/// A task the scheduler has released for execution.
pub struct ScheduledAction {
    pub run_id: u64,
    pub name: TaskName,
    pub action: TaskAction,
}

impl fmt::Debug for ScheduledAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScheduledAction")
            .field("run_id", &self.run_id)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Trait abstracting how scheduled actions are executed.
pub trait ExecutorBackend: Send {
    /// Dispatch the given actions for execution.
    ///
    /// The implementation is free to:
    /// - spawn the action futures concurrently (production)
    /// - simulate completion and emit `TaskCompletion`s (tests)
    fn spawn_ready_tasks(
        &mut self,
        tasks: Vec<ScheduledAction>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Production backend: one Tokio task per action, completions reported over
/// the orchestrator's event channel.
pub struct ActionExecutor {
    events_tx: mpsc::Sender<TaskCompletion>,
}

impl ActionExecutor {
    pub fn new(events_tx: mpsc::Sender<TaskCompletion>) -> Self {
        Self { events_tx }
    }
}

impl ExecutorBackend for ActionExecutor {
    fn spawn_ready_tasks(
        &mut self,
        tasks: Vec<ScheduledAction>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        // Clone the sender so the future doesn't borrow `self` across `await`.
        let events_tx = self.events_tx.clone();

        Box::pin(async move {
            for task in tasks {
                let events_tx = events_tx.clone();
                tokio::spawn(async move {
                    debug!(task = %task.name, run_id = task.run_id, "action started");
                    let outcome = match (task.action)().await {
                        Ok(()) => TaskOutcome::Success,
                        Err(err) => TaskOutcome::Failed(err),
                    };
                    let completion = TaskCompletion {
                        run_id: task.run_id,
                        task: task.name,
                        outcome,
                    };
                    if events_tx.send(completion).await.is_err() {
                        warn!("orchestrator receiver dropped; discarding completion");
                    }
                });
            }
            Ok(())
        })
    }
}
