//! One-at-a-time task dispatch

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::oneshot;

/// Serializes submitted futures so at most one runs at a time, in
/// submission order.
///
/// [`Dispatcher::run`] splices the task onto the queue synchronously, so the
/// order in which callers invoke `run` is the order tasks execute, no matter
/// how the returned futures are awaited. Each caller sees only its own
/// task's output; a failing or cancelled predecessor delays its successor
/// but does not fail it.
pub struct Dispatcher {
    tail: Mutex<Option<oneshot::Receiver<()>>>,
    submitted: Arc<AtomicUsize>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Dispatcher {
            tail: Mutex::new(None),
            submitted: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Enqueue `task` behind everything submitted before it.
    ///
    /// The returned future resolves to the task's own output once every
    /// predecessor has finished (or been dropped) and the task itself has
    /// run. Dropping the returned future before completion gives up the
    /// task's slot without blocking successors.
    pub fn run<F: Future>(&self, task: F) -> impl Future<Output = F::Output> + use<F> {
        let (done_tx, done_rx) = oneshot::channel::<()>();
        let prev = {
            let mut tail = self
                .tail
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            tail.replace(done_rx)
        };
        self.submitted.fetch_add(1, Ordering::Relaxed);
        let count = CountGuard(Arc::clone(&self.submitted));
        async move {
            let _count = count;
            // done_tx drops when this future completes or is dropped,
            // waking the successor either way.
            let _wake_next = done_tx;
            if let Some(prev) = prev {
                let _ = prev.await;
            }
            task.await
        }
    }

    /// Tasks submitted but not yet finished, the one currently running
    /// included.
    pub fn inflight(&self) -> usize {
        self.submitted.load(Ordering::Relaxed)
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

struct CountGuard(Arc<AtomicUsize>);

impl Drop for CountGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::future::join_all;
    use std::sync::Mutex;
    use tokio::time::{Duration, sleep};

    #[tokio::test]
    async fn test_runs_in_submission_order() {
        let dispatcher = Dispatcher::new();
        let seen: Arc<Mutex<Vec<u32>>> = Arc::new(Mutex::new(Vec::new()));
        let mut futures = Vec::new();
        for i in 0..5u32 {
            let seen = seen.clone();
            futures.push(dispatcher.run(async move {
                // Later tasks sleep less; order must still hold.
                sleep(Duration::from_millis(10 * (5 - i as u64))).await;
                seen.lock().unwrap().push(i);
            }));
        }
        // Await in reverse to show completion order ignores await order.
        futures.reverse();
        join_all(futures).await;
        assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_at_most_one_task_active() {
        let dispatcher = Dispatcher::new();
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let mut futures = Vec::new();
        for _ in 0..8 {
            let active = active.clone();
            let peak = peak.clone();
            futures.push(dispatcher.run(async move {
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                sleep(Duration::from_millis(5)).await;
                active.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        join_all(futures).await;
        assert_eq!(peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_caller_sees_own_output() {
        let dispatcher = Dispatcher::new();
        let a = dispatcher.run(async { Ok::<u32, &str>(1) });
        let b = dispatcher.run(async { Err::<u32, &str>("boom") });
        let c = dispatcher.run(async { Ok::<u32, &str>(3) });
        assert_eq!(a.await, Ok(1));
        assert_eq!(b.await, Err("boom"));
        assert_eq!(c.await, Ok(3));
    }

    #[tokio::test]
    async fn test_dropped_task_does_not_block_successor() {
        let dispatcher = Dispatcher::new();
        let a = dispatcher.run(async { 1u32 });
        let b = dispatcher.run(async { 2u32 });
        drop(a);
        assert_eq!(b.await, 2);
    }

    #[tokio::test]
    async fn test_inflight_counts_submitted_not_started() {
        let dispatcher = Dispatcher::new();
        assert_eq!(dispatcher.inflight(), 0);
        let (gate_tx, gate_rx) = tokio::sync::oneshot::channel::<()>();
        let a = dispatcher.run(async move {
            let _ = gate_rx.await;
        });
        let b = dispatcher.run(async {});
        assert_eq!(dispatcher.inflight(), 2);
        let _ = gate_tx.send(());
        a.await;
        b.await;
        assert_eq!(dispatcher.inflight(), 0);
    }
}
