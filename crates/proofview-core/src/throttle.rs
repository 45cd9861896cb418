//! Trailing-edge delay gate

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Coalesces bursts of triggers into one deferred action.
///
/// [`Throttle::arm`] starts a timer and runs the action when it expires;
/// triggers that arrive while the timer is pending are dropped. The delay is
/// whatever the *first* trigger of a burst asked for. There is no leading
/// edge: the action only ever runs after the delay.
///
/// Requires a tokio runtime; `arm` spawns the timer task.
pub struct Throttle {
    inner: Arc<Inner>,
}

struct Inner {
    armed: AtomicBool,
    action: Box<dyn Fn() + Send + Sync>,
}

impl Throttle {
    pub fn new(action: impl Fn() + Send + Sync + 'static) -> Self {
        Throttle {
            inner: Arc::new(Inner {
                armed: AtomicBool::new(false),
                action: Box::new(action),
            }),
        }
    }

    /// Schedule the action to run after `delay`, unless a timer is already
    /// pending, in which case this trigger is absorbed by it.
    pub fn arm(&self, delay: Duration) {
        if self.inner.armed.swap(true, Ordering::AcqRel) {
            return;
        }
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            inner.armed.store(false, Ordering::Release);
            (inner.action)();
        });
    }

    pub fn is_armed(&self) -> bool {
        self.inner.armed.load(Ordering::Acquire)
    }
}

impl Clone for Throttle {
    fn clone(&self) -> Self {
        Throttle {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tokio::time::{self, Duration};

    #[tokio::test(start_paused = true)]
    async fn test_burst_collapses_to_one_run() {
        let runs: Arc<Mutex<Vec<u32>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = runs.clone();
        let throttle = Throttle::new(move || sink.lock().unwrap().push(1));
        for _ in 0..10 {
            throttle.arm(Duration::from_millis(200));
        }
        assert!(throttle.is_armed());
        // The sleep registers on the timer task's first poll, so yield
        // before moving the clock.
        tokio::task::yield_now().await;
        time::advance(Duration::from_millis(250)).await;
        tokio::task::yield_now().await;
        assert_eq!(runs.lock().unwrap().len(), 1);
        assert!(!throttle.is_armed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_trigger_picks_the_delay() {
        let runs: Arc<Mutex<Vec<u32>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = runs.clone();
        let throttle = Throttle::new(move || sink.lock().unwrap().push(1));
        throttle.arm(Duration::from_millis(500));
        // A shorter request while pending changes nothing.
        throttle.arm(Duration::from_millis(200));
        tokio::task::yield_now().await;
        time::advance(Duration::from_millis(300)).await;
        tokio::task::yield_now().await;
        assert!(runs.lock().unwrap().is_empty());
        time::advance(Duration::from_millis(250)).await;
        tokio::task::yield_now().await;
        assert_eq!(runs.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rearm_after_fire_runs_again() {
        let runs: Arc<Mutex<Vec<u32>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = runs.clone();
        let throttle = Throttle::new(move || sink.lock().unwrap().push(1));
        throttle.arm(Duration::from_millis(100));
        tokio::task::yield_now().await;
        time::advance(Duration::from_millis(150)).await;
        tokio::task::yield_now().await;
        throttle.arm(Duration::from_millis(100));
        tokio::task::yield_now().await;
        time::advance(Duration::from_millis(150)).await;
        tokio::task::yield_now().await;
        assert_eq!(runs.lock().unwrap().len(), 2);
    }
}
