// src/task/mod.rs

//! Task handles and their aggregation.
//!
//! - [`handle`] defines the named, awaitable [`TaskHandle`].
//! - [`adapter`] turns future- or stream-shaped builder operations into
//!   handles with lifecycle logging.
//! - [`batch`] aggregates every handle of one invocation with fail-fast
//!   semantics.
//! - [`cancel`] provides the cancellation token threaded through batches and
//!   watch sessions.

pub mod adapter;
pub mod batch;
pub mod cancel;
pub mod handle;

pub use adapter::{event_stream, run_as_task, EventStream, StreamEmitter, StreamEvent, TaskOutput};
pub use batch::{BatchReport, TaskBatch};
pub use cancel::CancelToken;
pub use handle::{TaskFuture, TaskHandle};
