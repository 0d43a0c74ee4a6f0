// tests/orchestrator_fake_executor.rs

use std::error::Error;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use musashi::engine::{Orchestrator, TaskCompletion};
use musashi::errors::PipelineError;
use musashi::registry::TaskRegistry;
use musashi_test_utils::builders::RegistryBuilder;
use musashi_test_utils::fake_executor::FakeExecutor;
use musashi_test_utils::{init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

fn orchestrator_over(
    registry: TaskRegistry,
) -> (Orchestrator<FakeExecutor>, Arc<Mutex<Vec<String>>>) {
    let (events_tx, events_rx) = mpsc::channel::<TaskCompletion>(16);
    let executed = Arc::new(Mutex::new(Vec::new()));
    let executor = FakeExecutor::new(events_tx, Arc::clone(&executed));
    let orchestrator = Orchestrator::with_executor(Arc::new(registry), executor, events_rx);
    (orchestrator, executed)
}

fn diamond() -> TaskRegistry {
    RegistryBuilder::new()
        .task("assets", &[])
        .task("css", &["assets"])
        .task("js", &["assets"])
        .task("bundle", &["css", "js"])
        .build()
}

#[tokio::test]
async fn chain_runs_prerequisites_first() -> TestResult {
    with_timeout(async {
        init_tracing();

        let registry = RegistryBuilder::new()
            .task("a", &[])
            .task("b", &["a"])
            .task("c", &["b"])
            .build();
        let (mut orchestrator, executed) = orchestrator_over(registry);

        orchestrator.run("c").await?;

        let ran = executed.lock().unwrap().clone();
        assert_eq!(
            ran,
            vec!["a".to_string(), "b".to_string(), "c".to_string()]
        );
        assert!(orchestrator.is_idle());
        Ok(())
    })
    .await
}

#[tokio::test]
async fn diamond_runs_each_participant_exactly_once() -> TestResult {
    with_timeout(async {
        init_tracing();

        let (mut orchestrator, executed) = orchestrator_over(diamond());
        orchestrator.run("bundle").await?;

        // Ready batches are dispatched in name order, so the whole run is
        // deterministic: the shared root first, the join last.
        let ran = executed.lock().unwrap().clone();
        assert_eq!(
            ran,
            vec![
                "assets".to_string(),
                "css".to_string(),
                "js".to_string(),
                "bundle".to_string()
            ]
        );
        Ok(())
    })
    .await
}

#[tokio::test]
async fn every_invocation_is_a_fresh_run() -> TestResult {
    with_timeout(async {
        init_tracing();

        let (mut orchestrator, executed) = orchestrator_over(diamond());
        orchestrator.run("bundle").await?;
        orchestrator.run("bundle").await?;

        // No cross-run memoisation: all four participants ran twice.
        assert_eq!(executed.lock().unwrap().len(), 8);
        Ok(())
    })
    .await
}

#[tokio::test]
async fn running_a_mid_graph_task_runs_only_its_closure() -> TestResult {
    with_timeout(async {
        init_tracing();

        let (mut orchestrator, executed) = orchestrator_over(diamond());
        orchestrator.run("css").await?;

        let ran = executed.lock().unwrap().clone();
        assert_eq!(ran, vec!["assets".to_string(), "css".to_string()]);
        Ok(())
    })
    .await
}

#[tokio::test]
async fn failed_prerequisite_fails_the_dependent_without_running_it() -> TestResult {
    with_timeout(async {
        init_tracing();

        let registry = RegistryBuilder::new()
            .task("compile", &[])
            .task("package", &["compile"])
            .build();

        let (events_tx, events_rx) = mpsc::channel::<TaskCompletion>(16);
        let executed = Arc::new(Mutex::new(Vec::new()));
        let executor =
            FakeExecutor::new(events_tx, Arc::clone(&executed)).failing("compile");
        let mut orchestrator =
            Orchestrator::with_executor(Arc::new(registry), executor, events_rx);

        let err = orchestrator.run("package").await.unwrap_err();
        match err {
            PipelineError::TaskFailed { task, source } => {
                assert_eq!(task, "compile");
                assert!(source.is_recoverable_in_watch());
            }
            other => panic!("Expected TaskFailed, got: {other:?}"),
        }

        // The dependent never reached the executor.
        assert_eq!(executed.lock().unwrap().clone(), vec!["compile".to_string()]);
        assert!(orchestrator.is_idle());
        Ok(())
    })
    .await
}

#[tokio::test]
async fn first_failure_wins_when_several_prerequisites_fail() -> TestResult {
    with_timeout(async {
        init_tracing();

        let registry = RegistryBuilder::new()
            .task("one", &[])
            .task("two", &[])
            .task("sink", &["one", "two"])
            .build();

        let (events_tx, events_rx) = mpsc::channel::<TaskCompletion>(16);
        let executed = Arc::new(Mutex::new(Vec::new()));
        let executor = FakeExecutor::new(events_tx, Arc::clone(&executed))
            .failing("one")
            .failing("two");
        let mut orchestrator =
            Orchestrator::with_executor(Arc::new(registry), executor, events_rx);

        let err = orchestrator.run("sink").await.unwrap_err();
        // "one" completes first in dispatch order, so it is the reported cause.
        assert_eq!(err.failing_task(), Some("one"));
        Ok(())
    })
    .await
}

#[tokio::test]
async fn sequence_runs_prerequisites_then_body_in_order() -> TestResult {
    with_timeout(async {
        init_tracing();

        let registry = RegistryBuilder::new()
            .task("clean", &[])
            .task("one", &[])
            .task("two", &[])
            .task("three", &[])
            .sequence("all", &["clean"], &["one", "two", "three"])
            .build();
        let (mut orchestrator, executed) = orchestrator_over(registry);

        orchestrator.run("all").await?;

        let ran = executed.lock().unwrap().clone();
        assert_eq!(
            ran,
            vec![
                "clean".to_string(),
                "one".to_string(),
                "two".to_string(),
                "three".to_string()
            ]
        );
        Ok(())
    })
    .await
}

#[tokio::test]
async fn sequence_stops_at_the_first_failing_step() -> TestResult {
    with_timeout(async {
        init_tracing();

        let registry = RegistryBuilder::new()
            .task("one", &[])
            .task("two", &[])
            .task("three", &[])
            .sequence("all", &[], &["one", "two", "three"])
            .build();

        let (events_tx, events_rx) = mpsc::channel::<TaskCompletion>(16);
        let executed = Arc::new(Mutex::new(Vec::new()));
        let executor = FakeExecutor::new(events_tx, Arc::clone(&executed)).failing("two");
        let mut orchestrator =
            Orchestrator::with_executor(Arc::new(registry), executor, events_rx);

        let err = orchestrator.run("all").await.unwrap_err();
        assert_eq!(err.failing_task(), Some("two"));

        let ran = executed.lock().unwrap().clone();
        assert_eq!(ran, vec!["one".to_string(), "two".to_string()]);
        Ok(())
    })
    .await
}

#[tokio::test]
async fn serve_task_runs_only_its_prerequisites() -> TestResult {
    with_timeout(async {
        init_tracing();

        let registry = RegistryBuilder::new()
            .task("styles", &[])
            .serve_task("serve", &["styles"])
            .build();
        let (mut orchestrator, executed) = orchestrator_over(registry);

        orchestrator.run("serve").await?;

        assert_eq!(executed.lock().unwrap().clone(), vec!["styles".to_string()]);
        Ok(())
    })
    .await
}

#[tokio::test]
async fn running_an_unknown_task_is_a_config_error() -> TestResult {
    with_timeout(async {
        init_tracing();

        let registry = RegistryBuilder::new().task("only", &[]).build();
        let (mut orchestrator, _) = orchestrator_over(registry);

        match orchestrator.run("nope").await {
            Err(PipelineError::Config(msg)) => assert!(msg.contains("unknown task 'nope'")),
            other => panic!("Expected Config error, got: {other:?}"),
        }
        Ok(())
    })
    .await
}

#[tokio::test]
async fn run_sequence_rejects_composite_steps() -> TestResult {
    with_timeout(async {
        init_tracing();

        let registry = RegistryBuilder::new()
            .task("styles", &[])
            .sequence("all", &[], &["styles"])
            .build();
        let (mut orchestrator, _) = orchestrator_over(registry);

        let steps = vec!["all".to_string()];
        match orchestrator.run_sequence(&steps).await {
            Err(PipelineError::Config(msg)) => {
                assert!(msg.contains("not a plain build task"))
            }
            other => panic!("Expected Config error, got: {other:?}"),
        }
        Ok(())
    })
    .await
}
