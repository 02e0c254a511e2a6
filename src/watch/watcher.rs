// src/watch/watcher.rs

use std::any::Any;
use std::fmt;
use std::path::Path;

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::errors::Result;
use crate::watch::event_handler::{process_file_change, TriggerFired};
use crate::watch::patterns::TriggerProfile;

/// Keeps a watch alive. Dropping it stops watching.
pub struct WatchGuard {
    _inner: Box<dyn Any + Send>,
}

impl WatchGuard {
    pub fn new(inner: impl Any + Send) -> Self {
        Self {
            _inner: Box::new(inner),
        }
    }
}

impl fmt::Debug for WatchGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchGuard").finish()
    }
}

/// Filesystem watching primitive: emits a [`TriggerFired`] for every change
/// under `root` that matches one of `profiles`.
pub trait WatchBackend: Send + Sync + fmt::Debug {
    fn watch(
        &self,
        root: &Path,
        profiles: Vec<TriggerProfile>,
        tx: mpsc::Sender<TriggerFired>,
    ) -> Result<WatchGuard>;
}

/// [`WatchBackend`] on top of `notify`'s recommended recursive watcher.
#[derive(Debug, Clone, Default)]
pub struct NotifyBackend;

struct NotifyGuard {
    _watcher: RecommendedWatcher,
}

fn is_relevant(kind: &EventKind) -> bool {
    // Reads of our own inputs (copy, bundle) must not retrigger.
    !matches!(kind, EventKind::Access(_))
}

impl WatchBackend for NotifyBackend {
    fn watch(
        &self,
        root: &Path,
        profiles: Vec<TriggerProfile>,
        tx: mpsc::Sender<TriggerFired>,
    ) -> Result<WatchGuard> {
        // Canonicalize once so we have a stable base path.
        let root = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());

        // Channel from the blocking notify callback into the async world.
        let (event_tx, mut event_rx) = mpsc::unbounded_channel::<Event>();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    // Receiver gone means the session is shutting down.
                    let _ = event_tx.send(event);
                }
                Err(err) => {
                    eprintln!("plugin-builder: file watch error: {err}");
                }
            },
            Config::default(),
        )
        .map_err(anyhow::Error::from)?;

        watcher
            .watch(&root, RecursiveMode::Recursive)
            .map_err(anyhow::Error::from)?;

        info!("file watcher started on {:?}", root);

        // Ends once the watcher (and with it `event_tx`) is dropped.
        tokio::spawn(async move {
            while let Some(event) = event_rx.recv().await {
                if !is_relevant(&event.kind) {
                    continue;
                }
                debug!(?event, "received notify event");

                for path in &event.paths {
                    if !process_file_change(&root, path, &profiles, &tx).await {
                        return;
                    }
                }
            }
            debug!("watcher event loop finished");
        });

        Ok(WatchGuard::new(NotifyGuard { _watcher: watcher }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, ModifyKind};

    #[test]
    fn access_events_are_ignored() {
        assert!(!is_relevant(&EventKind::Access(AccessKind::Any)));
        assert!(is_relevant(&EventKind::Modify(ModifyKind::Any)));
    }
}
