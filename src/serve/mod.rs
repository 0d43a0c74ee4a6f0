// src/serve/mod.rs

//! Local style guide server with live reload.
//!
//! `serve` builds the stylesheets, serves the generated style guide over
//! HTTP and keeps a WebSocket open to every connected browser. A watch
//! session drives rebuilds and reload broadcasts from filesystem changes.

pub mod hub;
pub mod server;
pub mod session;
pub mod static_files;

pub use hub::ReloadHub;
pub use session::{run_serve, ServeSession};
pub use static_files::StaticSite;
