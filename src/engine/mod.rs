// src/engine/mod.rs

//! Orchestration engine.
//!
//! This module ties together:
//! - the per-builder watch queue (what happens when triggers arrive while a
//!   rebuild is active)
//! - the orchestrator that turns a module's manifest into one settled batch
//! - the watch session kept alive after a watch run
//!
//! The pure queue state machine lives in [`queue`]; the async shell around
//! it is [`watch_queue`].

pub mod orchestrator;
pub mod queue;
pub mod session;
pub mod watch_queue;

pub use orchestrator::{Orchestrator, RunOutcome};
pub use queue::{QueueState, WatchQueueState};
pub use session::WatchSession;
pub use watch_queue::{RebuildFactory, WatchQueue};
