// src/engine/watch_queue.rs

use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::engine::queue::{QueueState, WatchQueueState};
use crate::errors::BuildError;
use crate::task::{CancelToken, TaskHandle};
use crate::watch::{TriggerFired, WatchGuard};

/// Zero-argument factory producing the next rebuild.
pub type RebuildFactory = Box<dyn FnOnce() -> TaskHandle + Send + 'static>;

struct Inner {
    label: String,
    state: Mutex<WatchQueueState<RebuildFactory>>,
    cancel: CancelToken,
}

impl Inner {
    fn state(&self) -> MutexGuard<'_, WatchQueueState<RebuildFactory>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Per-builder single-flight rebuild scheduler used during watch sessions.
///
/// Rebuilds never overlap: a trigger arriving while one is in flight is
/// queued and started, in arrival order, once the current one settles.
/// Rebuild failures are logged and never end the session.
#[derive(Clone)]
pub struct WatchQueue {
    inner: Arc<Inner>,
}

impl fmt::Debug for WatchQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchQueue")
            .field("label", &self.inner.label)
            .field("state", &self.state())
            .finish()
    }
}

impl WatchQueue {
    pub fn new(label: impl Into<String>, cancel: CancelToken) -> Self {
        Self {
            inner: Arc::new(Inner {
                label: label.into(),
                state: Mutex::new(WatchQueueState::new()),
                cancel,
            }),
        }
    }

    pub fn state(&self) -> QueueState {
        self.inner.state().state()
    }

    pub fn pending_len(&self) -> usize {
        self.inner.state().pending_len()
    }

    /// Trigger a rebuild. Starts it now if idle, otherwise queues it.
    pub fn enqueue<F>(&self, factory: F)
    where
        F: FnOnce() -> TaskHandle + Send + 'static,
    {
        if self.inner.cancel.is_cancelled() {
            debug!(builder = %self.inner.label, "watch session stopped; ignoring trigger");
            return;
        }

        let start = self.inner.state().trigger(Box::new(factory));
        match start {
            Some(factory) => self.spawn_driver(factory),
            None => info!(
                builder = %self.inner.label,
                "watch task already running, queueing"
            ),
        }
    }

    /// Feed watch triggers into this queue until the session is cancelled
    /// or the watcher goes away. Triggers already buffered together (one
    /// save usually yields several notify events) are collapsed to one per
    /// trigger class, in first-arrival order; everything else queues FIFO. `route` maps a trigger to its rebuild;
    /// `guard` keeps the watcher alive for as long as the dispatcher runs.
    pub fn spawn_dispatcher<R>(
        &self,
        mut rx: mpsc::Receiver<TriggerFired>,
        guard: WatchGuard,
        route: R,
    ) -> JoinHandle<()>
    where
        R: Fn(&TriggerFired) -> Option<RebuildFactory> + Send + 'static,
    {
        let queue = self.clone();
        tokio::spawn(async move {
            let _guard = guard;
            loop {
                tokio::select! {
                    fired = rx.recv() => {
                        let Some(first) = fired else { break };
                        let mut burst = vec![first];
                        while let Ok(more) = rx.try_recv() {
                            burst.push(more);
                        }
                        for fired in coalesce(burst) {
                            info!(
                                builder = %queue.inner.label,
                                trigger = %fired.trigger,
                                path = %fired.path,
                                "changed"
                            );
                            match route(&fired) {
                                Some(factory) => queue.enqueue(factory),
                                None => debug!(trigger = %fired.trigger, "no rebuild registered"),
                            }
                        }
                    }
                    _ = queue.inner.cancel.cancelled() => break,
                }
            }
            debug!(builder = %queue.inner.label, "watch dispatcher stopped");
        })
    }

    /// Run `first`, then keep draining the queue until it is idle again.
    fn spawn_driver(&self, first: RebuildFactory) {
        let inner = Arc::clone(&self.inner);

        tokio::spawn(async move {
            let mut next = Some(first);

            while let Some(factory) = next.take() {
                let task = factory();
                let (name, future) = task.into_parts();

                // Isolated so a panicking rebuild cannot take the driver down.
                let mut handle = tokio::spawn(future);
                tokio::select! {
                    joined = &mut handle => {
                        let result = joined.unwrap_or_else(|join_err| {
                            Err(BuildError::TaskPanicked {
                                task: name.clone(),
                                message: join_err.to_string(),
                            })
                        });
                        if let Err(err) = result {
                            warn!(
                                builder = %inner.label,
                                task = %name,
                                error = %err,
                                "rebuild failed; still watching"
                            );
                        }
                    }
                    _ = inner.cancel.cancelled() => {
                        handle.abort();
                        debug!(builder = %inner.label, task = %name, "rebuild cancelled");
                        inner.state().clear();
                        return;
                    }
                }

                next = inner.state().settle();
            }

            debug!(builder = %inner.label, "watch queue idle");
        });
    }
}

/// Keep the first trigger of each class, preserving arrival order.
fn coalesce(burst: Vec<TriggerFired>) -> Vec<TriggerFired> {
    let mut seen = HashSet::new();
    burst
        .into_iter()
        .filter(|fired| seen.insert(fired.trigger.clone()))
        .collect()
}
