// src/serve/hub.rs

//! Fan-out point between the serve session and connected browsers.
//!
//! The session broadcasts a [`Reload`] after a successful rebuild (or a
//! matched HTML change); every open reload socket forwards it to its browser.
//! Late subscribers only see reloads sent after they connected, and a lagging
//! client collapses the broadcasts it missed into its next reload.

use tokio::sync::broadcast;

const RELOAD_CHANNEL_CAPACITY: usize = 16;

/// The one message browsers ever receive: reload now.
#[derive(Debug, Clone, Copy)]
pub struct Reload;

/// Shared handle for broadcasting reloads to connected clients.
#[derive(Debug, Clone)]
pub struct ReloadHub {
    tx: broadcast::Sender<Reload>,
}

impl ReloadHub {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(RELOAD_CHANNEL_CAPACITY);
        Self { tx }
    }

    /// Subscription for one reload socket.
    pub fn subscribe(&self) -> broadcast::Receiver<Reload> {
        self.tx.subscribe()
    }

    /// Tell every connected browser to reload. Returns how many were told.
    pub fn notify_reload(&self) -> usize {
        self.tx.send(Reload).unwrap_or(0)
    }

    pub fn client_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for ReloadHub {
    fn default() -> Self {
        Self::new()
    }
}
