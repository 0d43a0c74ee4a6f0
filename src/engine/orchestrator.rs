// src/engine/orchestrator.rs

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::engine::{TaskCompletion, TaskOutcome};
use crate::errors::{PipelineError, Result};
use crate::exec::{ActionExecutor, ExecutorBackend, ScheduledAction};
use crate::registry::{Scheduler, TaskKind, TaskName, TaskRegistry};

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Drives task runs over the registry.
///
/// One run at a time: `run` seeds the scheduler with the prerequisite
/// closure, dispatches ready tasks to the executor backend and consumes
/// completion events until every participant is terminal.
pub struct Orchestrator<E: ExecutorBackend> {
    registry: Arc<TaskRegistry>,
    scheduler: Scheduler,
    executor: E,
    events_rx: mpsc::Receiver<TaskCompletion>,
}

impl Orchestrator<ActionExecutor> {
    /// Orchestrator wired to the production executor.
    pub fn new(registry: Arc<TaskRegistry>) -> Self {
        let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let executor = ActionExecutor::new(events_tx);
        Self::with_executor(registry, executor, events_rx)
    }
}

impl<E: ExecutorBackend> Orchestrator<E> {
    /// Orchestrator over a custom backend. `events_rx` must be the receiving
    /// side of the completions the backend emits.
    pub fn with_executor(
        registry: Arc<TaskRegistry>,
        executor: E,
        events_rx: mpsc::Receiver<TaskCompletion>,
    ) -> Self {
        let scheduler = Scheduler::from_registry(&registry);
        Self {
            registry,
            scheduler,
            executor,
            events_rx,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.scheduler.is_idle()
    }

    /// Run one task to completion.
    ///
    /// Every invocation is a fresh run: the task's transitive prerequisites
    /// run again even if an earlier call already ran them. Independent
    /// prerequisites run concurrently. A failure fails all dependents and the
    /// run's result, but tasks already running are left to finish and
    /// completed outputs stay on disk.
    pub async fn run(&mut self, name: &str) -> Result<()> {
        let task = self
            .registry
            .get(name)
            .ok_or_else(|| PipelineError::Config(format!("unknown task '{name}'")))?;

        match &task.kind {
            TaskKind::Action(_) => {
                let roots = vec![name.to_string()];
                self.run_graph(&roots).await
            }
            TaskKind::Sequence(body) => {
                let prereqs = task.prerequisites.clone();
                let body = body.clone();
                info!(task = %name, steps = ?body, "running sequence task");
                self.run_graph(&prereqs).await?;
                self.run_sequence(&body).await
            }
            TaskKind::Serve => {
                // Only the prerequisites run here; the session itself is
                // driven by `serve::run_serve`.
                let prereqs = task.prerequisites.clone();
                self.run_graph(&prereqs).await
            }
        }
    }

    /// Run tasks strictly one after another, each with its prerequisites,
    /// stopping at the first failure.
    pub async fn run_sequence(&mut self, names: &[TaskName]) -> Result<()> {
        for name in names {
            let Some(task) = self.registry.get(name) else {
                return Err(PipelineError::Config(format!("unknown task '{name}'")));
            };
            if !matches!(task.kind, TaskKind::Action(_)) {
                return Err(PipelineError::Config(format!(
                    "sequence step '{name}' is not a plain build task"
                )));
            }
            self.run_graph(std::slice::from_ref(name)).await?;
        }
        Ok(())
    }

    /// One scheduler run over the prerequisite closure of `roots`.
    async fn run_graph(&mut self, roots: &[TaskName]) -> Result<()> {
        if roots.is_empty() {
            return Ok(());
        }

        let participants = self.registry.closure_of(roots)?;
        let run_id = self.scheduler.start_run(participants);
        let ready = self.scheduler.ready_tasks();
        self.dispatch(run_id, ready).await?;

        let mut first_failure: Option<PipelineError> = None;

        while !self.scheduler.is_idle() {
            let Some(completion) = self.events_rx.recv().await else {
                return Err(anyhow::anyhow!("executor event channel closed mid-run").into());
            };

            if completion.run_id != run_id {
                debug!(
                    task = %completion.task,
                    run_id = completion.run_id,
                    "completion from an abandoned run; ignoring"
                );
                continue;
            }

            let TaskCompletion { task, outcome, .. } = completion;
            match outcome {
                TaskOutcome::Success => {
                    let newly_ready = self.scheduler.handle_completion(&task, true);
                    self.dispatch(run_id, newly_ready).await?;
                }
                TaskOutcome::Failed(err) => {
                    self.scheduler.handle_completion(&task, false);
                    warn!(task = %task, error = %err, "task failed");
                    if first_failure.is_none() {
                        first_failure = Some(PipelineError::TaskFailed {
                            task: task.clone(),
                            source: Box::new(err),
                        });
                    }
                }
            }
        }

        match first_failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Resolve task names to their actions and hand them to the backend.
    async fn dispatch(&mut self, run_id: u64, names: Vec<TaskName>) -> Result<()> {
        if names.is_empty() {
            return Ok(());
        }

        let mut batch = Vec::with_capacity(names.len());
        for name in names {
            let task = self
                .registry
                .get(&name)
                .ok_or_else(|| PipelineError::Config(format!("unknown task '{name}'")))?;
            let TaskKind::Action(action) = &task.kind else {
                return Err(PipelineError::Config(format!(
                    "task '{name}' has no runnable action"
                )));
            };
            batch.push(ScheduledAction {
                run_id,
                name,
                action: Arc::clone(action),
            });
        }

        debug!(run_id, tasks = batch.len(), "dispatching ready tasks");
        self.executor.spawn_ready_tasks(batch).await
    }
}
