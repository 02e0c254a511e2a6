// src/engine/session.rs

use std::net::SocketAddr;

use tracing::info;

use crate::livereload::LiveReloadServer;
use crate::task::CancelToken;

/// A live watch run: every builder's watcher and rebuild queue plus the
/// optional live-reload listener. Nothing stops until [`WatchSession::stop`]
/// is called (or the process exits).
#[derive(Debug)]
pub struct WatchSession {
    cancel: CancelToken,
    livereload: Option<LiveReloadServer>,
}

impl WatchSession {
    pub fn new(cancel: CancelToken, livereload: Option<LiveReloadServer>) -> Self {
        Self { cancel, livereload }
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    pub fn livereload_addr(&self) -> Option<SocketAddr> {
        self.livereload.as_ref().map(LiveReloadServer::local_addr)
    }

    /// Tear down watchers, pending rebuilds and the live-reload server.
    pub async fn stop(self) {
        self.cancel.cancel();
        if let Some(server) = self.livereload {
            server.shutdown().await;
        }
        info!("watch session stopped");
    }
}
