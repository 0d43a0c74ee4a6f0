use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use musashi::engine::{TaskCompletion, TaskOutcome};
use musashi::errors::{PipelineError, Result};
use musashi::exec::{ExecutorBackend, ScheduledAction};

/// A fake executor that:
/// - records which tasks were dispatched, in dispatch order
/// - immediately reports a completion for each, echoing its `run_id`.
///
/// Tasks named via [`FakeExecutor::failing`] complete with a compile-style
/// failure instead of success.
pub struct FakeExecutor {
    events_tx: mpsc::Sender<TaskCompletion>,
    executed: Arc<Mutex<Vec<String>>>,
    failing: Vec<String>,
}

impl FakeExecutor {
    pub fn new(
        events_tx: mpsc::Sender<TaskCompletion>,
        executed: Arc<Mutex<Vec<String>>>,
    ) -> Self {
        Self {
            events_tx,
            executed,
            failing: Vec::new(),
        }
    }

    /// Make `task` complete with a failure.
    pub fn failing(mut self, task: &str) -> Self {
        self.failing.push(task.to_string());
        self
    }
}

impl ExecutorBackend for FakeExecutor {
    fn spawn_ready_tasks(
        &mut self,
        tasks: Vec<ScheduledAction>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let tx = self.events_tx.clone();
        let executed = Arc::clone(&self.executed);
        let failing = self.failing.clone();

        Box::pin(async move {
            for t in tasks {
                {
                    let mut guard = executed.lock().unwrap();
                    guard.push(t.name.clone());
                }

                let outcome = if failing.contains(&t.name) {
                    TaskOutcome::Failed(PipelineError::Compile {
                        tool: t.name.clone(),
                        detail: "forced failure".to_string(),
                    })
                } else {
                    TaskOutcome::Success
                };

                tx.send(TaskCompletion {
                    run_id: t.run_id,
                    task: t.name.clone(),
                    outcome,
                })
                .await
                .map_err(anyhow::Error::from)?;
            }
            Ok(())
        })
    }
}
