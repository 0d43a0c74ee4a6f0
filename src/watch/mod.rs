// src/watch/mod.rs

//! File watching for the serve session.
//!
//! `patterns` compiles the configured bindings into glob sets, `watcher`
//! bridges notify events into binding fires, and `hash` implements the
//! optional unchanged-content skip.

pub mod hash;
pub mod patterns;
pub mod watcher;

pub use hash::HashMemo;
pub use patterns::{compile_bindings, Reaction, WatchBinding};
pub use watcher::{spawn_watcher, WatchFire, WatcherHandle};
