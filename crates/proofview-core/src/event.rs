//! Synchronous typed publish/subscribe

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

type Handler<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// A typed event bus.
///
/// Handlers run synchronously, in subscription order, on the thread that
/// calls [`Event::fire`]. The handler list is snapshotted at fire time, so a
/// handler may subscribe, unsubscribe, or fire the same bus re-entrantly
/// without deadlocking or corrupting the list: handlers added during a fire
/// are not invoked for it, and handlers removed during a fire still complete
/// it. There is no buffering; a handler added after a fire never observes
/// that firing.
///
/// Cloning an `Event` yields another handle to the same bus.
pub struct Event<T> {
    registry: Arc<Registry<T>>,
}

struct Registry<T> {
    handlers: Mutex<Vec<(u64, Handler<T>)>>,
    next_id: AtomicU64,
    disposed: AtomicBool,
}

/// Type-erased removal hook so subscriptions to differently-typed buses can
/// live in one collection.
trait Detach: Send + Sync {
    fn detach(&self, id: u64);
}

impl<T> Detach for Registry<T> {
    fn detach(&self, id: u64) {
        let mut handlers = self
            .handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        handlers.retain(|(hid, _)| *hid != id);
    }
}

impl<T> Event<T> {
    pub fn new() -> Self {
        Event {
            registry: Arc::new(Registry {
                handlers: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(1),
                disposed: AtomicBool::new(false),
            }),
        }
    }

    /// Invoke every currently-subscribed handler with `value`.
    ///
    /// No-op once the bus is disposed.
    pub fn fire(&self, value: &T) {
        if self.registry.disposed.load(Ordering::Acquire) {
            return;
        }
        // Snapshot under the lock, call outside it: handlers are free to
        // touch this bus again.
        let snapshot: Vec<Handler<T>> = {
            let handlers = self
                .registry
                .handlers
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            handlers.iter().map(|(_, h)| Arc::clone(h)).collect()
        };
        for handler in snapshot {
            handler(value);
        }
    }

    /// Detach every handler and turn further [`Event::fire`] calls into
    /// no-ops. Idempotent.
    pub fn dispose(&self) {
        if self.registry.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        let mut handlers = self
            .registry
            .handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        handlers.clear();
    }

    /// Number of live subscriptions.
    #[cfg(test)]
    fn handler_count(&self) -> usize {
        self.registry
            .handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl<T: 'static> Event<T> {
    /// Subscribe. The handler stays registered until the returned
    /// [`Subscription`] is disposed or dropped, or the bus is disposed.
    pub fn on(&self, handler: impl Fn(&T) + Send + Sync + 'static) -> Subscription {
        if self.registry.disposed.load(Ordering::Acquire) {
            return Subscription::inert();
        }
        let id = self.registry.next_id.fetch_add(1, Ordering::Relaxed);
        let mut handlers = self
            .registry
            .handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        handlers.push((id, Arc::new(handler)));
        Subscription {
            registry: Arc::downgrade(&self.registry) as Weak<dyn Detach>,
            id,
        }
    }
}

impl<T> Clone for Event<T> {
    fn clone(&self) -> Self {
        Event {
            registry: Arc::clone(&self.registry),
        }
    }
}

impl<T> Default for Event<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle to one registered handler.
///
/// Dropping the subscription detaches the handler; [`Subscription::dispose`]
/// does the same explicitly and is idempotent.
pub struct Subscription {
    registry: Weak<dyn Detach>,
    id: u64,
}

impl Subscription {
    fn inert() -> Self {
        Subscription {
            registry: Weak::<Registry<()>>::new() as Weak<dyn Detach>,
            id: 0,
        }
    }

    pub fn dispose(&self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.detach(self.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}
