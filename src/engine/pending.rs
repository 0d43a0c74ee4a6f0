// src/engine/pending.rs

use tracing::debug;

/// Order-preserving queue of fired watch bindings waiting for their turn.
///
/// While a reaction is running, further filesystem events keep arriving.
/// Recording them here coalesces repeat fires of the same binding, so a slow
/// build never piles up a backlog of identical reruns; the binding still runs
/// once more after the current reaction finishes.
#[derive(Debug, Default)]
pub struct PendingReactions {
    queued: Vec<usize>,
}

impl PendingReactions {
    pub fn new() -> Self {
        Self { queued: Vec::new() }
    }

    /// Record a fired binding. Returns `false` if the binding was already
    /// queued and the fire was coalesced into it.
    pub fn record(&mut self, binding: usize) -> bool {
        if self.queued.contains(&binding) {
            debug!(binding, "binding already queued; coalescing");
            return false;
        }
        self.queued.push(binding);
        true
    }

    /// Take everything queued so far, in first-fired order.
    pub fn drain(&mut self) -> Vec<usize> {
        std::mem::take(&mut self.queued)
    }

    pub fn is_empty(&self) -> bool {
        self.queued.is_empty()
    }

    pub fn len(&self) -> usize {
        self.queued.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_in_fire_order() {
        let mut pending = PendingReactions::new();
        assert!(pending.record(2));
        assert!(pending.record(0));
        assert_eq!(pending.drain(), vec![2, 0]);
        assert!(pending.is_empty());
    }

    #[test]
    fn coalesces_repeat_fires() {
        let mut pending = PendingReactions::new();
        assert!(pending.record(1));
        assert!(!pending.record(1));
        assert!(pending.record(0));
        assert!(!pending.record(1));
        assert_eq!(pending.drain(), vec![1, 0]);
    }

    #[test]
    fn drain_resets_coalescing() {
        let mut pending = PendingReactions::new();
        pending.record(3);
        pending.drain();
        // A new fire after draining queues again.
        assert!(pending.record(3));
        assert_eq!(pending.len(), 1);
    }
}
