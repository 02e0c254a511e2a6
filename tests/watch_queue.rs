// tests/watch_queue.rs

mod common;

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use common::*;
use plugin_builder::engine::{QueueState, WatchQueue, WatchQueueState};
use plugin_builder::errors::BuildError;
use plugin_builder::task::{CancelToken, TaskHandle};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Trigger,
    Settle,
}

fn ops() -> impl Strategy<Value = Vec<Op>> {
    proptest::collection::vec(prop_oneof![Just(Op::Trigger), Just(Op::Settle)], 0..64)
}

proptest! {
    /// Against a trivial model: one running slot, FIFO pending list.
    #[test]
    fn queue_state_is_single_flight_fifo(ops in ops()) {
        let mut state = WatchQueueState::new();
        let mut running: Option<usize> = None;
        let mut model: VecDeque<usize> = VecDeque::new();
        let mut started = Vec::new();
        let mut next_id = 0;

        for op in ops {
            match op {
                Op::Trigger => {
                    let id = next_id;
                    next_id += 1;
                    if let Some(start) = state.trigger(id) {
                        prop_assert!(running.is_none());
                        running = Some(start);
                        started.push(start);
                    } else {
                        prop_assert!(running.is_some());
                        model.push_back(id);
                    }
                }
                Op::Settle => {
                    if running.is_none() {
                        continue;
                    }
                    running = state.settle();
                    prop_assert_eq!(running, model.pop_front());
                    if let Some(id) = running {
                        started.push(id);
                    }
                }
            }

            prop_assert_eq!(state.pending_len(), model.len());
            let expected = match (running.is_some(), model.is_empty()) {
                (false, _) => QueueState::Idle,
                (true, true) => QueueState::RunningOnly,
                (true, false) => QueueState::RunningWithPending,
            };
            prop_assert_eq!(state.state(), expected);
        }

        // Items start in the order they were triggered.
        prop_assert!(started.windows(2).all(|w| w[0] < w[1]));
    }
}

#[tokio::test]
async fn rebuilds_never_overlap_and_run_in_arrival_order() {
    init_tracing();
    let queue = WatchQueue::new("test", CancelToken::new());
    let in_flight = Arc::new(AtomicUsize::new(0));
    let max_seen = Arc::new(AtomicUsize::new(0));
    let order = Arc::new(Mutex::new(Vec::new()));

    for i in 0..5usize {
        let in_flight = Arc::clone(&in_flight);
        let max_seen = Arc::clone(&max_seen);
        let order = Arc::clone(&order);
        queue.enqueue(move || {
            TaskHandle::new(format!("rebuild-{i}"), async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                max_seen.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                order.lock().unwrap().push(i);
                in_flight.fetch_sub(1, Ordering::SeqCst);
                // A failing rebuild must not stop the queue.
                if i == 1 {
                    return Err(BuildError::Compile("broken".to_string()));
                }
                Ok(())
            })
        });
    }
    assert_eq!(queue.state(), QueueState::RunningWithPending);

    with_timeout(async {
        while queue.state() != QueueState::Idle {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;

    assert_eq!(max_seen.load(Ordering::SeqCst), 1);
    assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3, 4]);
}

#[tokio::test]
async fn cancelled_queue_ignores_new_triggers() {
    let cancel = CancelToken::new();
    let queue = WatchQueue::new("test", cancel.clone());
    cancel.cancel();

    let ran = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&ran);
    queue.enqueue(move || {
        TaskHandle::new("late", async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    });

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(ran.load(Ordering::SeqCst), 0);
    assert_eq!(queue.state(), QueueState::Idle);
}
