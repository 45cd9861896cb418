//! Message channel between the editor session and the infoview panel

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use proofview_core::Event;
use serde_json::Value;

/// One end of a duplex JSON message channel.
///
/// `post` delivers a value to the peer, `incoming` fires for every value the
/// peer posts. Delivery order is preserved per direction. After either side
/// closes, posting fails with [`PortClosed`] and no further values arrive.
pub trait MessagePort: Send + Sync {
    fn post(&self, value: Value) -> Result<(), PortClosed>;
    fn incoming(&self) -> &Event<Value>;
    fn close(&self);
}

/// The channel has been torn down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortClosed;

impl fmt::Display for PortClosed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("message port is closed")
    }
}

impl std::error::Error for PortClosed {}

/// In-process port pair that delivers messages synchronously.
///
/// This is what binds a [`session::Session`](crate::session::Session) to an
/// [`Infoview`](crate::infoview::Infoview) living in the same process. Hosts
/// that render the panel elsewhere implement [`MessagePort`] over their own
/// wire instead.
pub struct LocalPort {
    incoming: Event<Value>,
    peer: Event<Value>,
    closed: Arc<AtomicBool>,
}

impl LocalPort {
    /// Builds two connected endpoints sharing one closed flag.
    pub fn pair() -> (Arc<LocalPort>, Arc<LocalPort>) {
        let left = Event::new();
        let right = Event::new();
        let closed = Arc::new(AtomicBool::new(false));
        let a = Arc::new(LocalPort {
            incoming: left.clone(),
            peer: right.clone(),
            closed: Arc::clone(&closed),
        });
        let b = Arc::new(LocalPort {
            incoming: right,
            peer: left,
            closed,
        });
        (a, b)
    }
}

impl MessagePort for LocalPort {
    fn post(&self, value: Value) -> Result<(), PortClosed> {
        if self.closed.load(Ordering::Acquire) {
            return Err(PortClosed);
        }
        self.peer.fire(&value);
        Ok(())
    }

    fn incoming(&self) -> &Event<Value> {
        &self.incoming
    }

    fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            self.incoming.dispose();
            self.peer.dispose();
        }
    }
}
