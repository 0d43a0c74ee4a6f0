// src/diagnostics.rs

//! Developer notification channel for recoverable watch-mode failures.
//!
//! A serve session survives broken stylesheets and lint findings; instead of
//! exiting it reports through a [`DiagnosticsSink`]. The production sink
//! prints to stderr with a terminal bell; tests install a recording sink.

use crate::errors::PipelineError;

/// Where recoverable watch-mode failures are reported.
pub trait DiagnosticsSink: Send + Sync {
    /// Report a failure that did not end the session. `context` names what
    /// was being attempted (a binding label, "initial build", ...).
    fn report(&self, context: &str, error: &PipelineError);
}

/// Production sink: a stderr report prefixed with the terminal bell.
pub struct TerminalSink;

impl DiagnosticsSink for TerminalSink {
    fn report(&self, context: &str, error: &PipelineError) {
        // \x07 rings the bell.
        eprintln!("\x07musashi: {context}: {error}");
        eprintln!("musashi: still watching; fix the source and save again");
    }
}

/// Sink that swallows every report.
pub struct NullSink;

impl DiagnosticsSink for NullSink {
    fn report(&self, _context: &str, _error: &PipelineError) {}
}
