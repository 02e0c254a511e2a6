// src/task/adapter.rs

//! Task promise adapter.
//!
//! Builder operations hand back either a future or an event stream. This
//! module reduces both to a single [`TaskHandle`] that settles exactly once
//! and logs `starting` / `complete` / `error` under the operation name.

use std::path::PathBuf;

use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::errors::{BuildError, Result};
use crate::task::handle::{TaskFuture, TaskHandle};

/// Signals emitted by a stream-shaped operation.
#[derive(Debug)]
pub enum StreamEvent {
    /// One item passed through the stream (usually an output file).
    Data(PathBuf),
    End,
    Error(BuildError),
}

/// Receiving half of a stream-shaped operation.
#[derive(Debug)]
pub struct EventStream {
    rx: mpsc::UnboundedReceiver<StreamEvent>,
}

/// Sending half handed to the code doing the work.
///
/// Sends never block and are silently dropped once the adapter has settled.
#[derive(Debug, Clone)]
pub struct StreamEmitter {
    tx: mpsc::UnboundedSender<StreamEvent>,
}

impl StreamEmitter {
    pub fn data(&self, path: impl Into<PathBuf>) {
        let _ = self.tx.send(StreamEvent::Data(path.into()));
    }

    pub fn end(&self) {
        let _ = self.tx.send(StreamEvent::End);
    }

    pub fn error(&self, err: BuildError) {
        let _ = self.tx.send(StreamEvent::Error(err));
    }

    /// Forward a result: `Ok` ends the stream, `Err` fails it.
    pub fn finish(&self, result: Result<()>) {
        match result {
            Ok(()) => self.end(),
            Err(err) => self.error(err),
        }
    }
}

/// Create a connected emitter / stream pair.
pub fn event_stream() -> (StreamEmitter, EventStream) {
    let (tx, rx) = mpsc::unbounded_channel();
    (StreamEmitter { tx }, EventStream { rx })
}

/// What a builder operation returns.
pub enum TaskOutput {
    Future(TaskFuture),
    Stream(EventStream),
}

impl TaskOutput {
    pub fn future<F>(future: F) -> Self
    where
        F: std::future::Future<Output = Result<()>> + Send + 'static,
    {
        TaskOutput::Future(Box::pin(future))
    }
}

impl EventStream {
    /// Wait for the first terminal signal and drop the subscription.
    ///
    /// A stream whose emitters all go away without `End` or `Error` broke the
    /// operation contract.
    pub async fn settle(mut self, name: &str) -> Result<()> {
        let mut items = 0usize;
        while let Some(event) = self.rx.recv().await {
            match event {
                StreamEvent::Data(path) => {
                    items += 1;
                    debug!(task = %name, path = ?path, "stream item");
                }
                StreamEvent::End => {
                    debug!(task = %name, items, "stream ended");
                    return Ok(());
                }
                StreamEvent::Error(err) => return Err(err),
            }
        }
        Err(BuildError::ContractViolation(format!(
            "operation '{name}' closed its stream without signalling end or error"
        )))
    }
}

/// Wrap a builder operation into a [`TaskHandle`].
///
/// `label` is the builder's log label and `name` the operation name. The
/// operation itself is invoked lazily, when the handle is first awaited, so
/// chained steps never start early.
pub fn run_as_task<F>(label: &str, name: &str, op: F) -> TaskHandle
where
    F: FnOnce() -> TaskOutput + Send + 'static,
{
    let label = label.to_string();
    let task_name = name.to_string();

    TaskHandle::new(name, async move {
        info!(builder = %label, task = %task_name, "starting");

        let result = match op() {
            TaskOutput::Future(future) => future.await,
            TaskOutput::Stream(stream) => stream.settle(&task_name).await,
        };

        match &result {
            Ok(()) => info!(builder = %label, task = %task_name, "complete"),
            Err(err) => error!(builder = %label, task = %task_name, error = %err, "error"),
        }
        result
    })
}
