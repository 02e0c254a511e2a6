// src/engine/queue.rs

//! Pure single-flight queue state machine.
//!
//! This is the synchronous core of the watch queue: it knows nothing about
//! Tokio or futures and only decides *what* should start next. The async
//! shell in [`crate::engine::watch_queue`] owns the actual rebuild futures.

use std::collections::VecDeque;

use tracing::debug;

/// Observable state of a [`WatchQueueState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueState {
    /// Nothing running, nothing pending.
    Idle,
    /// One rebuild in flight, nothing waiting.
    RunningOnly,
    /// One rebuild in flight and at least one waiting.
    RunningWithPending,
}

/// Single-flight FIFO state.
///
/// Semantics:
/// - `trigger` while idle hands the item straight back to be started.
/// - `trigger` while running appends the item to `pending`.
/// - `settle` (the running item finished) hands back the oldest pending item
///   to start next, or returns to idle.
///
/// So at most one item is ever "running", and pending items start in arrival
/// order.
#[derive(Debug)]
pub struct WatchQueueState<T> {
    running: bool,
    pending: VecDeque<T>,
}

impl<T> Default for WatchQueueState<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> WatchQueueState<T> {
    pub fn new() -> Self {
        Self {
            running: false,
            pending: VecDeque::new(),
        }
    }

    pub fn state(&self) -> QueueState {
        match (self.running, self.pending.is_empty()) {
            (false, _) => QueueState::Idle,
            (true, true) => QueueState::RunningOnly,
            (true, false) => QueueState::RunningWithPending,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Record a trigger. Returns the item if it should start immediately.
    #[must_use]
    pub fn trigger(&mut self, item: T) -> Option<T> {
        if self.running {
            self.pending.push_back(item);
            debug!(pending = self.pending.len(), "rebuild already running; queued");
            None
        } else {
            self.running = true;
            Some(item)
        }
    }

    /// The running item settled. Returns the next item to start, if any.
    #[must_use]
    pub fn settle(&mut self) -> Option<T> {
        match self.pending.pop_front() {
            Some(next) => {
                debug!(pending = self.pending.len(), "starting queued rebuild");
                Some(next)
            }
            None => {
                self.running = false;
                None
            }
        }
    }

    /// Drop everything pending and go idle (session teardown).
    pub fn clear(&mut self) {
        self.pending.clear();
        self.running = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_trigger_starts_immediately() {
        let mut q = WatchQueueState::new();
        assert_eq!(q.state(), QueueState::Idle);
        assert_eq!(q.trigger(1), Some(1));
        assert_eq!(q.state(), QueueState::RunningOnly);
    }

    #[test]
    fn triggers_while_running_queue_in_fifo_order() {
        let mut q = WatchQueueState::new();
        assert_eq!(q.trigger("a"), Some("a"));
        assert_eq!(q.trigger("b"), None);
        assert_eq!(q.state(), QueueState::RunningWithPending);
        assert_eq!(q.trigger("c"), None);
        assert_eq!(q.pending_len(), 2);

        assert_eq!(q.settle(), Some("b"));
        assert_eq!(q.state(), QueueState::RunningWithPending);
        assert_eq!(q.settle(), Some("c"));
        assert_eq!(q.state(), QueueState::RunningOnly);
        assert_eq!(q.settle(), None);
        assert_eq!(q.state(), QueueState::Idle);
    }

    #[test]
    fn trigger_after_returning_to_idle_starts_again() {
        let mut q = WatchQueueState::new();
        assert_eq!(q.trigger(1), Some(1));
        assert_eq!(q.settle(), None);
        assert_eq!(q.trigger(2), Some(2));
    }

    #[test]
    fn clear_resets_to_idle() {
        let mut q = WatchQueueState::new();
        let _ = q.trigger(1);
        let _ = q.trigger(2);
        q.clear();
        assert_eq!(q.state(), QueueState::Idle);
        assert_eq!(q.pending_len(), 0);
    }
}
