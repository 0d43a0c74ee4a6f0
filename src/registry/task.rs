// src/registry/task.rs

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::errors::Result;

/// Task names are plain strings (e.g. `"styles"`).
pub type TaskName = String;

/// Future returned by a task action.
pub type TaskFuture = Pin<Box<dyn Future<Output = Result<()>> + Send>>;

/// A task's body: each invocation produces a fresh future.
///
/// Shared behind `Arc` so the executor can run actions on spawned tasks
/// while the registry keeps ownership of the catalogue.
pub type TaskAction = Arc<dyn Fn() -> TaskFuture + Send + Sync>;

/// What running a task actually means.
pub enum TaskKind {
    /// A unit of build work dispatched to the executor.
    Action(TaskAction),
    /// After the prerequisites, run these tasks strictly one after another.
    Sequence(Vec<TaskName>),
    /// After the prerequisites, hand control to the serve session.
    Serve,
}

impl fmt::Debug for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Action(_) => f.write_str("Action(..)"),
            Self::Sequence(body) => f.debug_tuple("Sequence").field(body).finish(),
            Self::Serve => f.write_str("Serve"),
        }
    }
}

/// A registered task: name, prerequisites and body.
#[derive(Debug)]
pub struct Task {
    pub name: TaskName,
    /// Tasks that must complete successfully before this one starts.
    pub prerequisites: Vec<TaskName>,
    /// One-line description shown by `--list`.
    pub description: String,
    pub kind: TaskKind,
}

impl Task {
    /// Build a plain action task.
    pub fn action<F>(
        name: impl Into<TaskName>,
        prerequisites: &[&str],
        description: impl Into<String>,
        body: F,
    ) -> Self
    where
        F: Fn() -> TaskFuture + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            prerequisites: to_names(prerequisites),
            description: description.into(),
            kind: TaskKind::Action(Arc::new(body)),
        }
    }

    /// Build a sequence task (prerequisites first, then the body in order).
    pub fn sequence(
        name: impl Into<TaskName>,
        prerequisites: &[&str],
        description: impl Into<String>,
        body: &[&str],
    ) -> Self {
        Self {
            name: name.into(),
            prerequisites: to_names(prerequisites),
            description: description.into(),
            kind: TaskKind::Sequence(to_names(body)),
        }
    }

    /// Build the serve entry point task.
    pub fn serve(
        name: impl Into<TaskName>,
        prerequisites: &[&str],
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            prerequisites: to_names(prerequisites),
            description: description.into(),
            kind: TaskKind::Serve,
        }
    }
}

fn to_names(names: &[&str]) -> Vec<TaskName> {
    names.iter().map(|s| s.to_string()).collect()
}
