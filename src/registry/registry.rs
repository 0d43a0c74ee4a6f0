// src/registry/registry.rs

use std::collections::{BTreeMap, HashSet};

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::errors::{PipelineError, Result};
use crate::registry::task::{Task, TaskKind, TaskName};

/// Explicit catalogue of every runnable task.
///
/// Registration is append-only; [`TaskRegistry::validate`] must pass before
/// the registry is handed to the orchestrator.
#[derive(Debug, Default)]
pub struct TaskRegistry {
    tasks: BTreeMap<TaskName, Task>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self {
            tasks: BTreeMap::new(),
        }
    }

    /// Register a task under its name. Duplicate names are an error.
    pub fn register(&mut self, task: Task) -> Result<()> {
        if self.tasks.contains_key(&task.name) {
            return Err(PipelineError::Config(format!(
                "task '{}' is registered twice",
                task.name
            )));
        }
        self.tasks.insert(task.name.clone(), task);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Task> {
        self.tasks.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tasks.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// All tasks in name order.
    pub fn iter(&self) -> impl Iterator<Item = &Task> {
        self.tasks.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tasks.keys().map(|s| s.as_str())
    }

    /// Direct prerequisites of a task.
    pub fn prerequisites_of(&self, name: &str) -> &[TaskName] {
        self.tasks
            .get(name)
            .map(|t| t.prerequisites.as_slice())
            .unwrap_or(&[])
    }

    /// The transitive prerequisite closure of `roots`, including the roots
    /// themselves, with duplicates removed. Order is discovery order; the
    /// scheduler re-derives readiness itself.
    pub fn closure_of(&self, roots: &[TaskName]) -> Result<Vec<TaskName>> {
        let mut seen: HashSet<TaskName> = HashSet::new();
        let mut closure = Vec::new();
        let mut stack: Vec<TaskName> = roots.to_vec();

        while let Some(name) = stack.pop() {
            if !seen.insert(name.clone()) {
                continue;
            }
            let task = self.tasks.get(&name).ok_or_else(|| {
                PipelineError::Config(format!("unknown task '{name}'"))
            })?;
            for dep in &task.prerequisites {
                stack.push(dep.clone());
            }
            closure.push(name);
        }

        Ok(closure)
    }

    /// Validate the whole catalogue.
    ///
    /// - at least one task
    /// - prerequisites and sequence bodies reference registered tasks
    /// - prerequisites and sequence bodies are plain action tasks, so that a
    ///   run never nests another composite run inside itself
    /// - the prerequisite graph is acyclic
    pub fn validate(&self) -> Result<()> {
        self.ensure_has_tasks()?;
        self.validate_references()?;
        self.validate_dag()?;
        Ok(())
    }

    fn ensure_has_tasks(&self) -> Result<()> {
        if self.tasks.is_empty() {
            return Err(PipelineError::Config(
                "task registry must contain at least one task".to_string(),
            ));
        }
        Ok(())
    }

    fn validate_references(&self) -> Result<()> {
        for (name, task) in self.tasks.iter() {
            for dep in task.prerequisites.iter() {
                if dep == name {
                    return Err(PipelineError::Config(format!(
                        "task '{name}' cannot be its own prerequisite"
                    )));
                }
                self.ensure_plain_reference(name, dep, "prerequisite")?;
            }

            if let TaskKind::Sequence(body) = &task.kind {
                if body.is_empty() {
                    return Err(PipelineError::Config(format!(
                        "sequence task '{name}' has an empty body"
                    )));
                }
                for step in body {
                    self.ensure_plain_reference(name, step, "sequence step")?;
                }
            }
        }
        Ok(())
    }

    fn ensure_plain_reference(&self, owner: &str, referenced: &str, role: &str) -> Result<()> {
        match self.tasks.get(referenced) {
            None => Err(PipelineError::Config(format!(
                "task '{owner}' has unknown {role} '{referenced}'"
            ))),
            Some(task) if !matches!(task.kind, TaskKind::Action(_)) => {
                Err(PipelineError::Config(format!(
                    "task '{owner}' has {role} '{referenced}', which is not a plain build task"
                )))
            }
            Some(_) => Ok(()),
        }
    }

    fn validate_dag(&self) -> Result<()> {
        // Edge direction: prerequisite -> task. A topological sort fails
        // exactly when the graph has a cycle.
        let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

        for name in self.tasks.keys() {
            graph.add_node(name.as_str());
        }

        for (name, task) in self.tasks.iter() {
            for dep in task.prerequisites.iter() {
                graph.add_edge(dep.as_str(), name.as_str(), ());
            }
        }

        match toposort(&graph, None) {
            Ok(_order) => Ok(()),
            Err(cycle) => {
                let node = cycle.node_id();
                Err(PipelineError::Config(format!(
                    "cycle detected in task prerequisites involving task '{node}'"
                )))
            }
        }
    }
}
