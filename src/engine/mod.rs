// src/engine/mod.rs

//! Orchestration: running task graphs and queueing watch reactions.

pub mod orchestrator;
pub mod pending;

pub use orchestrator::Orchestrator;
pub use pending::PendingReactions;

use crate::errors::PipelineError;
use crate::registry::TaskName;

/// Result of running one task action.
#[derive(Debug)]
pub enum TaskOutcome {
    Success,
    Failed(PipelineError),
}

impl TaskOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

/// Completion event sent by the executor back to the orchestrator.
///
/// `run_id` lets the orchestrator drop stragglers from an abandoned run.
#[derive(Debug)]
pub struct TaskCompletion {
    pub run_id: u64,
    pub task: TaskName,
    pub outcome: TaskOutcome,
}
