// src/registry/mod.rs

//! The task catalogue and the per-run scheduling state machine.
//!
//! `task` defines what a task is, `registry` is the explicit name -> task
//! catalogue (with graph validation), and `scheduler` tracks a single run
//! over the prerequisite graph.

pub mod registry;
pub mod scheduler;
pub mod task;

pub use registry::TaskRegistry;
pub use scheduler::Scheduler;
pub use task::{Task, TaskAction, TaskFuture, TaskKind, TaskName};
