// src/exec/mod.rs

//! Execution of task actions and external tool processes.

pub mod backend;
pub mod tool;

pub use backend::{ActionExecutor, ExecutorBackend, ScheduledAction};
pub use tool::{run_compiler, run_generator, run_tool, ToolOutput};
