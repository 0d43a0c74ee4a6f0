// src/registry/scheduler.rs

use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::registry::task::TaskName;
use crate::registry::TaskRegistry;

/// Per-run state of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunState {
    /// Task participates in this run but is waiting on prerequisites.
    Pending,
    /// Task has been dispatched to the executor and is currently running.
    Running,
    /// Task completed successfully in this run.
    DoneSuccess,
    /// Task failed in this run (or was blocked by a failed prerequisite).
    DoneFailed,
}

/// Pure per-run state machine over the prerequisite graph.
///
/// The scheduler knows nothing about actions or IO; it tracks which tasks
/// participate in the current run, decides when a task is ready (all
/// prerequisites `DoneSuccess`), and fails dependents when a prerequisite
/// fails. The orchestrator drives it with completion events and dispatches
/// whatever it hands back.
pub struct Scheduler {
    /// Direct prerequisites per task, copied from the registry.
    prereqs: HashMap<TaskName, Vec<TaskName>>,
    /// Direct dependents per task, inverted from `prereqs`.
    dependents: HashMap<TaskName, Vec<TaskName>>,

    /// Per-run state; tasks absent from the map do not participate.
    state: HashMap<TaskName, RunState>,

    /// Monotonically increasing run ID.
    run_counter: u64,
    /// Currently active run ID, or `None` if there is no active run.
    current_run_id: Option<u64>,
}

impl Scheduler {
    /// Construct a scheduler from a validated [`TaskRegistry`].
    pub fn from_registry(registry: &TaskRegistry) -> Self {
        let mut prereqs: HashMap<TaskName, Vec<TaskName>> = HashMap::new();
        let mut dependents: HashMap<TaskName, Vec<TaskName>> = HashMap::new();

        for task in registry.iter() {
            prereqs.insert(task.name.clone(), task.prerequisites.clone());
            dependents.entry(task.name.clone()).or_default();
        }

        for task in registry.iter() {
            for dep in &task.prerequisites {
                dependents
                    .entry(dep.clone())
                    .or_default()
                    .push(task.name.clone());
            }
        }

        Self {
            prereqs,
            dependents,
            state: HashMap::new(),
            run_counter: 0,
            current_run_id: None,
        }
    }

    /// Returns `true` if there is currently no active run.
    pub fn is_idle(&self) -> bool {
        self.current_run_id.is_none()
    }

    pub fn current_run_id(&self) -> Option<u64> {
        self.current_run_id
    }

    /// Begin a new run over `participants` and return its run ID.
    ///
    /// `participants` must be prerequisite-closed (every prerequisite of a
    /// participant is itself a participant); the orchestrator guarantees this
    /// by seeding runs from [`TaskRegistry::closure_of`]. A prerequisite
    /// outside the run is treated as satisfied.
    pub fn start_run(&mut self, participants: impl IntoIterator<Item = TaskName>) -> u64 {
        self.run_counter += 1;
        self.current_run_id = Some(self.run_counter);

        self.state.clear();
        for name in participants {
            self.state.insert(name, RunState::Pending);
        }

        debug!(
            run_id = self.run_counter,
            tasks = self.state.len(),
            "scheduler: starting new run"
        );
        self.run_counter
    }

    /// Collect the tasks that can be dispatched right now.
    ///
    /// Marks them `Running`; each name is handed out exactly once per run.
    pub fn ready_tasks(&mut self) -> Vec<TaskName> {
        // Iterate twice: first to decide, then to mutate, to avoid borrowing
        // conflicts.
        let mut candidates: Vec<TaskName> = self
            .state
            .iter()
            .filter_map(|(name, state)| {
                if *state == RunState::Pending && self.prereqs_satisfied(name) {
                    Some(name.clone())
                } else {
                    None
                }
            })
            .collect();

        // Deterministic dispatch order.
        candidates.sort();

        for name in &candidates {
            if let Some(state) = self.state.get_mut(name) {
                debug!(task = %name, "prerequisites satisfied; marking Running");
                *state = RunState::Running;
            }
        }

        candidates
    }

    /// Handle completion of a task, returning tasks that became ready.
    ///
    /// - On success, mark it `DoneSuccess` and release dependents whose
    ///   prerequisites are now all satisfied.
    /// - On failure, mark it `DoneFailed` and fail every transitively
    ///   dependent participant that has not already finished.
    pub fn handle_completion(&mut self, task: &str, success: bool) -> Vec<TaskName> {
        if self.current_run_id.is_none() {
            warn!(task = %task, "completion with no active run; ignoring");
            return Vec::new();
        }

        let mut newly_ready = Vec::new();

        match self.state.get_mut(task) {
            Some(state) => {
                if success {
                    *state = RunState::DoneSuccess;
                    debug!(task = %task, "task completed successfully");
                    newly_ready = self.ready_tasks();
                } else {
                    *state = RunState::DoneFailed;
                    warn!(task = %task, "task failed; failing dependents in this run");
                    self.mark_dependents_failed(task);
                }
            }
            None => {
                warn!(task = %task, "completion for task outside this run; ignoring");
            }
        }

        self.maybe_finish_run();
        newly_ready
    }

    /// Whether all prerequisites of `name` are satisfied in the current run.
    fn prereqs_satisfied(&self, name: &str) -> bool {
        let Some(deps) = self.prereqs.get(name) else {
            return true;
        };

        for dep in deps {
            match self.state.get(dep) {
                Some(RunState::DoneSuccess) => {}
                Some(RunState::DoneFailed) => return false,
                Some(RunState::Pending) | Some(RunState::Running) => return false,
                // Not a participant; see `start_run`.
                None => {}
            }
        }

        true
    }

    /// Mark all participating dependents (and their transitive dependents)
    /// of a failed task as `DoneFailed` for this run.
    fn mark_dependents_failed(&mut self, failed_task: &str) {
        let mut stack: Vec<TaskName> = self
            .dependents
            .get(failed_task)
            .cloned()
            .unwrap_or_default();

        while let Some(name) = stack.pop() {
            let Some(state) = self.state.get_mut(&name) else {
                continue;
            };
            if matches!(*state, RunState::Pending | RunState::Running) {
                warn!(
                    task = %name,
                    failed_prerequisite = %failed_task,
                    "marking task failed because a prerequisite failed"
                );
                *state = RunState::DoneFailed;
                if let Some(next) = self.dependents.get(&name) {
                    stack.extend(next.iter().cloned());
                }
            }
        }
    }

    /// Clear `current_run_id` once every participant is terminal.
    fn maybe_finish_run(&mut self) {
        if self.current_run_id.is_none() {
            return;
        }

        let any_active = self
            .state
            .values()
            .any(|state| matches!(state, RunState::Pending | RunState::Running));

        if !any_active {
            info!(
                run_id = self.current_run_id,
                "scheduler: all tasks terminal; run finished"
            );
            self.current_run_id = None;
        }
    }
}
