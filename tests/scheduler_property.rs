// tests/scheduler_property.rs
//
// Randomised DAGs through the scheduler state machine: whatever the graph
// shape, the roots and the set of failing tasks, a run must reach idle with
// nothing left to dispatch. Slow, so ignored by default; run with
// `cargo test -- --ignored`.

use std::collections::HashSet;

use proptest::prelude::*;

use musashi::registry::{Scheduler, TaskRegistry};
use musashi_test_utils::builders::RegistryBuilder;

// Strategy for a valid task graph. Acyclic by construction: task N may only
// depend on tasks 0..N-1.
fn random_registry(max_tasks: usize) -> impl Strategy<Value = TaskRegistry> {
    (1..=max_tasks).prop_flat_map(|num_tasks| {
        let deps_strat = proptest::collection::vec(
            proptest::collection::vec(any::<usize>(), 0..num_tasks),
            num_tasks,
        );

        deps_strat.prop_map(move |raw_deps| {
            let mut builder = RegistryBuilder::new();
            for (i, potential_deps) in raw_deps.into_iter().enumerate() {
                let name = format!("task_{i}");

                // Sanitize dependencies: only indices below i are allowed.
                let mut valid: HashSet<usize> = HashSet::new();
                for dep in potential_deps {
                    if i > 0 {
                        valid.insert(dep % i);
                    }
                }

                let dep_names: Vec<String> =
                    valid.iter().map(|d| format!("task_{d}")).collect();
                let dep_refs: Vec<&str> = dep_names.iter().map(String::as_str).collect();
                builder = builder.task(&name, &dep_refs);
            }
            builder.build()
        })
    })
}

proptest! {
    #[test]
    #[ignore]
    fn every_run_reaches_idle(
        registry in random_registry(10),
        root_indices in proptest::collection::vec(0..10usize, 1..4),
        failing_indices in proptest::collection::vec(0..10usize, 0..5),
    ) {
        let names: Vec<String> = registry.names().map(|s| s.to_string()).collect();

        let roots: Vec<String> = root_indices
            .iter()
            .filter(|&&i| i < names.len())
            .map(|&i| names[i].clone())
            .collect();
        let roots = if roots.is_empty() {
            vec![names[0].clone()]
        } else {
            roots
        };

        let failing: HashSet<String> = failing_indices
            .iter()
            .filter(|&&i| i < names.len())
            .map(|&i| names[i].clone())
            .collect();

        let participants = registry.closure_of(&roots).unwrap();
        let participant_count = participants.len();

        let mut scheduler = Scheduler::from_registry(&registry);
        scheduler.start_run(participants);

        let mut executing = scheduler.ready_tasks();
        let mut completions = 0usize;

        while !scheduler.is_idle() {
            completions += 1;
            prop_assert!(
                completions <= participant_count,
                "more completions than participants; the run cannot terminate"
            );

            // An active run with nothing executing would hang forever in
            // production; fail loudly here instead.
            let task = executing.pop().expect("active run but nothing executing");
            let success = !failing.contains(&task);
            let newly_ready = scheduler.handle_completion(&task, success);
            executing.extend(newly_ready);
        }

        prop_assert!(executing.is_empty());
        prop_assert!(scheduler.current_run_id().is_none());
    }
}
