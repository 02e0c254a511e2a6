// src/livereload/mod.rs

//! Process-wide live-reload broadcast.
//!
//! Builders publish a [`ReloadEvent`] after every asset mutation during
//! watch; connected browsers are told to refresh by the websocket server in
//! [`server`]. Publishing is fire-and-forget.

use tokio::sync::broadcast;
use tracing::debug;

pub mod server;

pub use server::{serve, LiveReloadServer};

/// One changed output file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReloadEvent {
    pub path: String,
}

#[derive(Debug, Clone)]
pub struct LiveReload {
    tx: broadcast::Sender<ReloadEvent>,
}

impl LiveReload {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(64);
        Self { tx }
    }

    /// Tell every connected client that `path` changed.
    pub fn notify(&self, path: impl Into<String>) {
        let event = ReloadEvent { path: path.into() };
        // No receivers simply means no browser is connected.
        let receivers = self.tx.send(event.clone()).unwrap_or(0);
        debug!(path = %event.path, receivers, "live-reload notify");
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReloadEvent> {
        self.tx.subscribe()
    }
}

impl Default for LiveReload {
    fn default() -> Self {
        Self::new()
    }
}
