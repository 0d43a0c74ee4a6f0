// src/watch/watcher.rs

use std::path::{Path, PathBuf};
use std::sync::Arc;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::errors::Result;
use crate::watch::patterns::WatchBinding;

/// A watch binding matched a changed path. `binding` indexes into the
/// session's binding list; `path` is root-relative, for logging.
#[derive(Debug, Clone)]
pub struct WatchFire {
    pub binding: usize,
    pub path: String,
}

/// Handle for the filesystem watcher.
///
/// This exists mainly so the underlying `RecommendedWatcher` is kept alive
/// for as long as needed. Dropping this handle stops file watching; the serve
/// session then sees its fire channel close and ends.
pub struct WatcherHandle {
    _inner: RecommendedWatcher,
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle").finish()
    }
}

/// Spawn a filesystem watcher observing `root` recursively, sending a
/// [`WatchFire`] into `fires_tx` for every binding that matches a changed
/// path.
///
/// Glob patterns are evaluated against paths relative to `root`.
pub fn spawn_watcher(
    root: impl Into<PathBuf>,
    bindings: Vec<WatchBinding>,
    fires_tx: mpsc::Sender<WatchFire>,
) -> Result<WatcherHandle> {
    let root = root.into();
    // Canonicalize once so event paths relativize against a stable base.
    let root = root.canonicalize().unwrap_or_else(|_| root.clone());

    let bindings = Arc::new(bindings);

    // Channel from the blocking notify callback into the async world.
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<Event>();

    // Closure called synchronously by notify whenever an event arrives.
    let mut watcher = RecommendedWatcher::new(
        {
            let event_tx = event_tx.clone();
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if let Err(err) = event_tx.send(event) {
                        // Can't log via tracing from this thread reliably.
                        eprintln!("musashi: failed to forward notify event: {err}");
                    }
                }
                Err(err) => {
                    eprintln!("musashi: file watch error: {err}");
                }
            }
        },
        Config::default(),
    )?;

    watcher.watch(&root, RecursiveMode::Recursive)?;

    info!(root = %root.display(), "file watcher started");

    // Async task that consumes notify events and emits binding fires.
    let async_root = root.clone();
    let async_bindings = Arc::clone(&bindings);
    tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            debug!(?event, "received notify event");

            for path in &event.paths {
                let Some(rel_str) = relative_str(&async_root, path) else {
                    warn!(
                        path = %path.display(),
                        root = %async_root.display(),
                        "could not relativize event path; ignoring"
                    );
                    continue;
                };

                for (idx, binding) in async_bindings.iter().enumerate() {
                    if !binding.matches(&rel_str) {
                        continue;
                    }
                    debug!(
                        binding = %binding.label(),
                        path = %rel_str,
                        "watch match -> binding fired"
                    );
                    let fire = WatchFire {
                        binding: idx,
                        path: rel_str.clone(),
                    };
                    if fires_tx.send(fire).await.is_err() {
                        // Session is gone; stop forwarding.
                        debug!("fire channel closed; watcher loop ending");
                        return;
                    }
                }
            }
        }

        debug!("file watcher loop ended");
    });

    Ok(WatcherHandle { _inner: watcher })
}

/// Convert a path into a string relative to `root`, with forward slashes.
///
/// Falls back to canonicalizing both sides, which covers platforms where the
/// watcher reports through a different absolute prefix (symlinked temp
/// directories, macOS `/private/var`). Returns `None` if the path is not
/// under `root` either way.
fn relative_str(root: &Path, path: &Path) -> Option<String> {
    if let Ok(rel) = path.strip_prefix(root) {
        return Some(rel.to_string_lossy().replace('\\', "/"));
    }

    if let (Ok(root_canon), Ok(path_canon)) = (root.canonicalize(), path.canonicalize()) {
        if let Ok(rel) = path_canon.strip_prefix(&root_canon) {
            return Some(rel.to_string_lossy().replace('\\', "/"));
        }
    }

    None
}
