// tests/serve_session.rs
//
// The serve session loop, driven by hand-fed watch fires instead of a real
// filesystem watcher. Dropping the fire sender ends the session, which is
// how every test gets out of the loop.

use std::error::Error;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;

use musashi::config::ConfigFile;
use musashi::diagnostics::{DiagnosticsSink, NullSink};
use musashi::engine::{Orchestrator, TaskCompletion};
use musashi::errors::PipelineError;
use musashi::registry::TaskRegistry;
use musashi::serve::{ReloadHub, ServeSession};
use musashi::watch::{compile_bindings, WatchFire};
use musashi_test_utils::builders::RegistryBuilder;
use musashi_test_utils::fake_executor::FakeExecutor;
use musashi_test_utils::{init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

/// Sink that records reports instead of printing them.
#[derive(Default)]
struct RecordingSink {
    reports: Mutex<Vec<String>>,
}

impl RecordingSink {
    fn reports(&self) -> Vec<String> {
        self.reports.lock().unwrap().clone()
    }
}

impl DiagnosticsSink for RecordingSink {
    fn report(&self, context: &str, error: &PipelineError) {
        self.reports
            .lock()
            .unwrap()
            .push(format!("{context}: {error}"));
    }
}

/// Registry with the two tasks the default scss binding runs.
fn styles_registry() -> TaskRegistry {
    RegistryBuilder::new()
        .task("styles", &[])
        .task("styleguide", &[])
        .build()
}

fn fire(binding: usize, path: &str) -> WatchFire {
    WatchFire {
        binding,
        path: path.to_string(),
    }
}

// Binding indices in the default config: 0 = `**/*.html` (reload),
// 1 = `assets/sass/**/*.scss` (styles + styleguide).

#[tokio::test]
async fn scss_change_rebuilds_then_broadcasts() -> TestResult {
    with_timeout(async {
        init_tracing();

        let (events_tx, events_rx) = mpsc::channel::<TaskCompletion>(16);
        let executed = Arc::new(Mutex::new(Vec::new()));
        let executor = FakeExecutor::new(events_tx, Arc::clone(&executed));
        let mut orchestrator =
            Orchestrator::with_executor(Arc::new(styles_registry()), executor, events_rx);

        let bindings = compile_bindings(&ConfigFile::default())?;
        let hub = ReloadHub::new();
        let mut reloads = hub.subscribe();

        let (fires_tx, fires_rx) = mpsc::channel(8);
        fires_tx.send(fire(1, "assets/sass/base.scss")).await?;
        drop(fires_tx);

        let mut session =
            ServeSession::new(&mut orchestrator, bindings, hub, None, Arc::new(NullSink));
        session.run(fires_rx).await?;

        assert_eq!(
            executed.lock().unwrap().clone(),
            vec!["styles".to_string(), "styleguide".to_string()]
        );
        assert!(reloads.try_recv().is_ok());
        assert!(reloads.try_recv().is_err());
        Ok(())
    })
    .await
}

#[tokio::test]
async fn html_change_broadcasts_without_building() -> TestResult {
    with_timeout(async {
        init_tracing();

        let (events_tx, events_rx) = mpsc::channel::<TaskCompletion>(16);
        let executed = Arc::new(Mutex::new(Vec::new()));
        let executor = FakeExecutor::new(events_tx, Arc::clone(&executed));
        let mut orchestrator =
            Orchestrator::with_executor(Arc::new(styles_registry()), executor, events_rx);

        let bindings = compile_bindings(&ConfigFile::default())?;
        let hub = ReloadHub::new();
        let mut reloads = hub.subscribe();

        let (fires_tx, fires_rx) = mpsc::channel(8);
        fires_tx.send(fire(0, "styleguide/index.html")).await?;
        drop(fires_tx);

        let mut session =
            ServeSession::new(&mut orchestrator, bindings, hub, None, Arc::new(NullSink));
        session.run(fires_rx).await?;

        assert!(executed.lock().unwrap().is_empty());
        assert!(reloads.try_recv().is_ok());
        Ok(())
    })
    .await
}

#[tokio::test]
async fn burst_of_fires_coalesces_into_one_reaction_each() -> TestResult {
    with_timeout(async {
        init_tracing();

        let (events_tx, events_rx) = mpsc::channel::<TaskCompletion>(16);
        let executed = Arc::new(Mutex::new(Vec::new()));
        let executor = FakeExecutor::new(events_tx, Arc::clone(&executed));
        let mut orchestrator =
            Orchestrator::with_executor(Arc::new(styles_registry()), executor, events_rx);

        let bindings = compile_bindings(&ConfigFile::default())?;
        let hub = ReloadHub::new();
        let mut reloads = hub.subscribe();

        // One editor save often produces several events for the same binding.
        let (fires_tx, fires_rx) = mpsc::channel(8);
        fires_tx.send(fire(1, "assets/sass/base.scss")).await?;
        fires_tx.send(fire(1, "assets/sass/_colors.scss")).await?;
        fires_tx.send(fire(1, "assets/sass/base.scss")).await?;
        fires_tx.send(fire(0, "styleguide/index.html")).await?;
        drop(fires_tx);

        let mut session =
            ServeSession::new(&mut orchestrator, bindings, hub, None, Arc::new(NullSink));
        session.run(fires_rx).await?;

        // The scss binding ran once despite three fires.
        assert_eq!(
            executed.lock().unwrap().clone(),
            vec!["styles".to_string(), "styleguide".to_string()]
        );
        // One broadcast per reaction: rebuild + html reload.
        assert!(reloads.try_recv().is_ok());
        assert!(reloads.try_recv().is_ok());
        assert!(reloads.try_recv().is_err());
        Ok(())
    })
    .await
}

#[tokio::test]
async fn recoverable_build_failure_is_reported_and_the_session_continues() -> TestResult {
    with_timeout(async {
        init_tracing();

        let (events_tx, events_rx) = mpsc::channel::<TaskCompletion>(16);
        let executed = Arc::new(Mutex::new(Vec::new()));
        let executor =
            FakeExecutor::new(events_tx, Arc::clone(&executed)).failing("styles");
        let mut orchestrator =
            Orchestrator::with_executor(Arc::new(styles_registry()), executor, events_rx);

        let bindings = compile_bindings(&ConfigFile::default())?;
        let hub = ReloadHub::new();
        let mut reloads = hub.subscribe();
        let sink = Arc::new(RecordingSink::default());
        let sink_dyn: Arc<dyn DiagnosticsSink> = sink.clone();

        let (fires_tx, fires_rx) = mpsc::channel(8);
        fires_tx.send(fire(1, "assets/sass/broken.scss")).await?;
        fires_tx.send(fire(0, "styleguide/index.html")).await?;
        drop(fires_tx);

        let mut session = ServeSession::new(&mut orchestrator, bindings, hub, None, sink_dyn);
        session.run(fires_rx).await?;

        // The rebuild failed and was reported against the binding.
        let reports = sink.reports();
        assert_eq!(reports.len(), 1);
        assert!(reports[0].contains("assets/sass/**/*.scss"));
        assert!(reports[0].contains("styles"));

        // No broadcast for the failed rebuild, but the later html reaction
        // still went through: the session survived the failure.
        assert!(reloads.try_recv().is_ok());
        assert!(reloads.try_recv().is_err());

        // The sequence stopped at the failing step.
        assert_eq!(executed.lock().unwrap().clone(), vec!["styles".to_string()]);
        Ok(())
    })
    .await
}

#[tokio::test]
async fn fatal_failure_ends_the_session() -> TestResult {
    with_timeout(async {
        init_tracing();

        // Real executor so the action's io error flows through unchanged.
        let registry = Arc::new(
            RegistryBuilder::new()
                .fatal_task("styles", &[])
                .task("styleguide", &[])
                .build(),
        );
        let mut orchestrator = Orchestrator::new(registry);

        let bindings = compile_bindings(&ConfigFile::default())?;
        let hub = ReloadHub::new();
        let sink = Arc::new(RecordingSink::default());
        let sink_dyn: Arc<dyn DiagnosticsSink> = sink.clone();

        let (fires_tx, fires_rx) = mpsc::channel(8);
        fires_tx.send(fire(1, "assets/sass/base.scss")).await?;

        let mut session = ServeSession::new(&mut orchestrator, bindings, hub, None, sink_dyn);
        let err = session.run(fires_rx).await.unwrap_err();

        assert!(!err.is_recoverable_in_watch());
        assert_eq!(err.failing_task(), Some("styles"));
        assert!(sink.reports().is_empty());
        Ok(())
    })
    .await
}

#[tokio::test]
async fn closed_fire_channel_stops_the_session_cleanly() -> TestResult {
    with_timeout(async {
        init_tracing();

        let (events_tx, events_rx) = mpsc::channel::<TaskCompletion>(16);
        let executed = Arc::new(Mutex::new(Vec::new()));
        let executor = FakeExecutor::new(events_tx, Arc::clone(&executed));
        let mut orchestrator =
            Orchestrator::with_executor(Arc::new(styles_registry()), executor, events_rx);

        let bindings = compile_bindings(&ConfigFile::default())?;
        let (fires_tx, fires_rx) = mpsc::channel::<WatchFire>(8);
        drop(fires_tx);

        let mut session = ServeSession::new(
            &mut orchestrator,
            bindings,
            ReloadHub::new(),
            None,
            Arc::new(NullSink),
        );
        session.run(fires_rx).await?;

        assert!(executed.lock().unwrap().is_empty());
        Ok(())
    })
    .await
}

#[tokio::test]
async fn fire_for_an_unknown_binding_is_dropped() -> TestResult {
    with_timeout(async {
        init_tracing();

        let (events_tx, events_rx) = mpsc::channel::<TaskCompletion>(16);
        let executed = Arc::new(Mutex::new(Vec::new()));
        let executor = FakeExecutor::new(events_tx, Arc::clone(&executed));
        let mut orchestrator =
            Orchestrator::with_executor(Arc::new(styles_registry()), executor, events_rx);

        let bindings = compile_bindings(&ConfigFile::default())?;
        let (fires_tx, fires_rx) = mpsc::channel(8);
        fires_tx.send(fire(7, "whatever")).await?;
        drop(fires_tx);

        let mut session = ServeSession::new(
            &mut orchestrator,
            bindings,
            ReloadHub::new(),
            None,
            Arc::new(NullSink),
        );
        session.run(fires_rx).await?;

        assert!(executed.lock().unwrap().is_empty());
        Ok(())
    })
    .await
}

#[tokio::test]
async fn session_keeps_reacting_across_separate_bursts() -> TestResult {
    with_timeout(async {
        init_tracing();

        let (events_tx, events_rx) = mpsc::channel::<TaskCompletion>(16);
        let executed = Arc::new(Mutex::new(Vec::new()));
        let executor = FakeExecutor::new(events_tx, Arc::clone(&executed));
        let registry = Arc::new(styles_registry());
        let bindings = compile_bindings(&ConfigFile::default())?;

        let hub = ReloadHub::new();
        let mut reloads = hub.subscribe();
        let hub_for_session = hub.clone();

        let (fires_tx, fires_rx) = mpsc::channel(8);
        let session_task = tokio::spawn(async move {
            let mut orchestrator = Orchestrator::with_executor(registry, executor, events_rx);
            let mut session = ServeSession::new(
                &mut orchestrator,
                bindings,
                hub_for_session,
                None,
                Arc::new(NullSink),
            );
            session.run(fires_rx).await
        });

        fires_tx.send(fire(1, "assets/sass/base.scss")).await?;
        wait_until(|| executed.lock().unwrap().len() == 2).await;

        fires_tx.send(fire(1, "assets/sass/base.scss")).await?;
        wait_until(|| executed.lock().unwrap().len() == 4).await;

        drop(fires_tx);
        session_task.await??;

        // Two distinct saves, two full rebuilds, two broadcasts.
        assert_eq!(
            executed.lock().unwrap().clone(),
            vec![
                "styles".to_string(),
                "styleguide".to_string(),
                "styles".to_string(),
                "styleguide".to_string()
            ]
        );
        assert!(reloads.try_recv().is_ok());
        assert!(reloads.try_recv().is_ok());
        assert!(reloads.try_recv().is_err());
        Ok(())
    })
    .await
}

async fn wait_until(cond: impl Fn() -> bool) {
    for _ in 0..200 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached within 1s");
}
