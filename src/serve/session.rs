// src/serve/session.rs

//! The watch-build-reload loop behind the `serve` task.
//!
//! A session owns the reaction side of watching: the filesystem watcher sends
//! [`WatchFire`]s into a channel, the session coalesces them through
//! [`PendingReactions`] and runs each binding's reaction in order. Reload
//! bindings broadcast straight to the browsers; task bindings rebuild first
//! and only broadcast on success.
//!
//! Failure policy: tool and lint failures are reported through the
//! [`DiagnosticsSink`] and the session keeps watching. Anything else (io,
//! config, the watcher itself) ends the session with the error.

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::config::model::ConfigFile;
use crate::diagnostics::{DiagnosticsSink, TerminalSink};
use crate::engine::{Orchestrator, PendingReactions};
use crate::errors::Result;
use crate::exec::ExecutorBackend;
use crate::serve::hub::ReloadHub;
use crate::serve::server::build_router;
use crate::serve::static_files::StaticSite;
use crate::watch::{compile_bindings, spawn_watcher, HashMemo, Reaction, WatchBinding, WatchFire};

const WATCH_CHANNEL_CAPACITY: usize = 64;

/// One live serve session: bindings, reload hub and the orchestrator that
/// runs rebuild reactions.
pub struct ServeSession<'a, E: ExecutorBackend> {
    orchestrator: &'a mut Orchestrator<E>,
    bindings: Vec<WatchBinding>,
    hub: ReloadHub,
    memo: Option<HashMemo>,
    sink: Arc<dyn DiagnosticsSink>,
}

impl<'a, E: ExecutorBackend> ServeSession<'a, E> {
    pub fn new(
        orchestrator: &'a mut Orchestrator<E>,
        bindings: Vec<WatchBinding>,
        hub: ReloadHub,
        memo: Option<HashMemo>,
        sink: Arc<dyn DiagnosticsSink>,
    ) -> Self {
        Self {
            orchestrator,
            bindings,
            hub,
            memo,
            sink,
        }
    }

    /// Consume watch fires until interrupted.
    ///
    /// Stops cleanly on ctrl-c or when the fire channel closes (the watcher
    /// went away). While a reaction runs, further fires queue up in the
    /// channel and get coalesced before the next round.
    pub async fn run(&mut self, mut fires_rx: mpsc::Receiver<WatchFire>) -> Result<()> {
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        let mut pending = PendingReactions::new();

        loop {
            tokio::select! {
                _ = &mut ctrl_c => {
                    info!("interrupt received; stopping serve session");
                    return Ok(());
                }
                fire = fires_rx.recv() => {
                    let Some(fire) = fire else {
                        debug!("watch channel closed; stopping serve session");
                        return Ok(());
                    };
                    self.enqueue(&mut pending, fire);
                    // Editors save in bursts; drain the rest of the burst
                    // before reacting so one save means one rebuild.
                    while let Ok(fire) = fires_rx.try_recv() {
                        self.enqueue(&mut pending, fire);
                    }
                    for idx in pending.drain() {
                        self.react(idx).await?;
                    }
                }
            }
        }
    }

    fn enqueue(&self, pending: &mut PendingReactions, fire: WatchFire) {
        let Some(binding) = self.bindings.get(fire.binding) else {
            warn!(binding = fire.binding, "fire for unknown binding; dropping");
            return;
        };
        debug!(path = %fire.path, binding = %binding.label(), "change detected");
        pending.record(fire.binding);
    }

    /// Run one binding's reaction.
    async fn react(&mut self, idx: usize) -> Result<()> {
        let binding = self.bindings[idx].clone();

        if let Some(memo) = &mut self.memo {
            if memo.is_unchanged(idx, &binding).await {
                info!(binding = %binding.label(), "content unchanged; skipping reaction");
                return Ok(());
            }
        }

        match binding.reaction() {
            Reaction::Reload => {
                let clients = self.hub.notify_reload();
                info!(binding = %binding.label(), clients, "reload broadcast");
                Ok(())
            }
            Reaction::RunTasks(tasks) => {
                info!(binding = %binding.label(), tasks = ?tasks, "change triggers rebuild");
                match self.orchestrator.run_sequence(tasks).await {
                    Ok(()) => {
                        let clients = self.hub.notify_reload();
                        info!(clients, "rebuild finished; reload broadcast");
                        Ok(())
                    }
                    Err(err) if err.is_recoverable_in_watch() => {
                        self.sink.report(&binding.label(), &err);
                        Ok(())
                    }
                    Err(err) => Err(err),
                }
            }
        }
    }
}

/// Run the full serve task: initial build, style guide server, watch loop.
///
/// `task` is the serve task's registry name; its prerequisites form the
/// initial build. An initial build that fails on a broken source file is
/// reported and the session starts anyway, so serving recovers as soon as
/// the file is fixed and saved.
pub async fn run_serve<E: ExecutorBackend>(
    cfg: &ConfigFile,
    orchestrator: &mut Orchestrator<E>,
    task: &str,
) -> Result<()> {
    let sink: Arc<dyn DiagnosticsSink> = Arc::new(TerminalSink);

    info!(task = %task, "running initial build");
    if let Err(err) = orchestrator.run(task).await {
        if err.is_recoverable_in_watch() {
            sink.report("initial build", &err);
        } else {
            return Err(err);
        }
    }

    let bindings = compile_bindings(cfg)?;
    let memo = cfg.watch.use_hash.then(|| HashMemo::new(&cfg.root));

    let styleguide_dir = cfg.styleguide_dir();
    if !styleguide_dir.is_dir() {
        warn!(
            dir = %styleguide_dir.display(),
            "style guide directory missing; serving will 404 until it is generated"
        );
    }

    let hub = ReloadHub::new();
    let router = build_router(StaticSite::new(&styleguide_dir), hub.clone());

    let (fires_tx, fires_rx) = mpsc::channel(WATCH_CHANNEL_CAPACITY);
    let _watcher = spawn_watcher(&cfg.root, bindings.clone(), fires_tx)?;

    let addr = format!("{}:{}", cfg.server.host, cfg.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| anyhow::anyhow!("cannot bind http://{addr}: {e}"))?;
    info!("serving style guide at http://{addr}");

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let server = tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
    });

    let mut session = ServeSession::new(orchestrator, bindings, hub, memo, sink);
    let result = session.run(fires_rx).await;

    // Dropping the sender resolves the shutdown future.
    drop(shutdown_tx);
    match server.await {
        Ok(Ok(())) => {}
        Ok(Err(err)) => warn!(error = %err, "http server shut down with error"),
        Err(err) => warn!(error = %err, "http server task failed"),
    }

    result
}
