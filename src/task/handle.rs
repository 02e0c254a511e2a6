// src/task/handle.rs

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use crate::errors::Result;

/// Boxed future every build step is reduced to.
pub type TaskFuture = Pin<Box<dyn Future<Output = Result<()>> + Send + 'static>>;

/// One named asynchronous unit of work (a copy, a style pass, a bundle, a
/// watch registration).
///
/// The wrapped future settles exactly once; the name is used for logging and
/// for attributing batch failures.
pub struct TaskHandle {
    name: String,
    future: TaskFuture,
}

impl fmt::Debug for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl TaskHandle {
    pub fn new<F>(name: impl Into<String>, future: F) -> Self
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        Self {
            name: name.into(),
            future: Box::pin(future),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Chain a dependent step: `next` is only built and awaited after this
    /// handle resolved successfully. A failure here skips `next` entirely.
    pub fn then<F>(self, next: F) -> TaskHandle
    where
        F: FnOnce() -> TaskHandle + Send + 'static,
    {
        let Self { name, future } = self;
        TaskHandle {
            name: name.clone(),
            future: Box::pin(async move {
                future.await?;
                next().future.await
            }),
        }
    }

    pub fn into_parts(self) -> (String, TaskFuture) {
        (self.name, self.future)
    }

    pub fn into_future(self) -> TaskFuture {
        self.future
    }
}
