#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use musashi::errors::PipelineError;
use musashi::registry::{Task, TaskFuture, TaskRegistry};

/// Builder for a `TaskRegistry` whose actions append their task name to a
/// shared log, so tests can assert on execution order.
pub struct RegistryBuilder {
    registry: TaskRegistry,
    log: Arc<Mutex<Vec<String>>>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self {
            registry: TaskRegistry::new(),
            log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Shared action log; every action task pushes its name when it runs.
    pub fn log(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.log)
    }

    /// A task that logs its name and succeeds.
    pub fn task(mut self, name: &str, after: &[&str]) -> Self {
        let log = Arc::clone(&self.log);
        let logged = name.to_string();
        self.register(Task::action(name, after, "test task", move || -> TaskFuture {
            let log = Arc::clone(&log);
            let logged = logged.clone();
            Box::pin(async move {
                log.lock().unwrap().push(logged);
                Ok(())
            })
        }));
        self
    }

    /// A task that logs its name, then fails with a compile-style error
    /// (the recoverable kind in watch mode).
    pub fn failing_task(mut self, name: &str, after: &[&str]) -> Self {
        let log = Arc::clone(&self.log);
        let logged = name.to_string();
        self.register(Task::action(
            name,
            after,
            "failing test task",
            move || -> TaskFuture {
                let log = Arc::clone(&log);
                let logged = logged.clone();
                Box::pin(async move {
                    log.lock().unwrap().push(logged.clone());
                    Err(PipelineError::Compile {
                        tool: logged,
                        detail: "forced failure".to_string(),
                    })
                })
            },
        ));
        self
    }

    /// A task that logs its name, then fails with an io error (the fatal
    /// kind in watch mode).
    pub fn fatal_task(mut self, name: &str, after: &[&str]) -> Self {
        let log = Arc::clone(&self.log);
        let logged = name.to_string();
        self.register(Task::action(
            name,
            after,
            "fatally failing test task",
            move || -> TaskFuture {
                let log = Arc::clone(&log);
                let logged = logged.clone();
                Box::pin(async move {
                    log.lock().unwrap().push(logged.clone());
                    Err(PipelineError::io(
                        logged,
                        std::io::Error::other("forced io failure"),
                    ))
                })
            },
        ));
        self
    }

    /// A task that sleeps for `delay`, then logs its name and succeeds.
    /// Useful for observing overlap between independent tasks.
    pub fn slow_task(mut self, name: &str, after: &[&str], delay: Duration) -> Self {
        let log = Arc::clone(&self.log);
        let logged = name.to_string();
        self.register(Task::action(
            name,
            after,
            "slow test task",
            move || -> TaskFuture {
                let log = Arc::clone(&log);
                let logged = logged.clone();
                Box::pin(async move {
                    tokio::time::sleep(delay).await;
                    log.lock().unwrap().push(logged);
                    Ok(())
                })
            },
        ));
        self
    }

    /// A sequence task running `body` strictly in order.
    pub fn sequence(mut self, name: &str, after: &[&str], body: &[&str]) -> Self {
        self.register(Task::sequence(name, after, "test sequence", body));
        self
    }

    /// A serve entry point task.
    pub fn serve_task(mut self, name: &str, after: &[&str]) -> Self {
        self.register(Task::serve(name, after, "test serve task"));
        self
    }

    fn register(&mut self, task: Task) {
        self.registry
            .register(task)
            .expect("duplicate task name in builder");
    }

    /// Validate and hand over the registry.
    pub fn build(self) -> TaskRegistry {
        self.registry
            .validate()
            .expect("builder produced an invalid registry");
        self.registry
    }

    /// Hand over the registry without validating, for tests that exercise
    /// `TaskRegistry::validate` itself.
    pub fn build_unchecked(self) -> TaskRegistry {
        self.registry
    }
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Write an executable `/bin/sh` stub into `dir` and return a `ToolSpec`
/// pointing at it. The stub body sees the appended per-call arguments as
/// `"$1"`, `"$2"`, ...
#[cfg(unix)]
pub fn stub_tool(dir: &std::path::Path, name: &str, body: &str) -> musashi::config::ToolSpec {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write stub tool");

    let mut perms = std::fs::metadata(&path)
        .expect("stat stub tool")
        .permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).expect("chmod stub tool");

    musashi::config::ToolSpec {
        cmd: path.to_string_lossy().into_owned(),
        args: Vec::new(),
    }
}
