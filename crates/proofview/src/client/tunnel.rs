//! Runs the prover protocol across the infoview message channel

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use eyre::Result;
use proofview_core::{Event, Subscription};
use proofview_proto::{FromInfoview, ToInfoview};
use serde_json::Value;
use tracing::trace;

use super::{Connection, Transport, TransportError};
use crate::port::MessagePort;

/// Transport whose frames travel over the infoview channel.
///
/// Outgoing frames are re-serialized into `server_request` strings for the
/// session to relay; inbound `server_event` / `server_error` payloads are
/// unwrapped back into frames. Every other command on the port belongs to
/// the bridge and is ignored here.
pub struct TunnelTransport {
    port: Arc<dyn MessagePort>,
}

impl TunnelTransport {
    pub fn new(port: Arc<dyn MessagePort>) -> TunnelTransport {
        TunnelTransport { port }
    }
}

impl Transport for TunnelTransport {
    fn connect(&self) -> Result<Arc<dyn Connection>> {
        Ok(Arc::new(TunnelConnection::new(Arc::clone(&self.port))))
    }
}

struct TunnelConnection {
    port: Arc<dyn MessagePort>,
    frames: Event<Value>,
    errors: Event<TransportError>,
    alive: AtomicBool,
    listener: Subscription,
}

impl TunnelConnection {
    fn new(port: Arc<dyn MessagePort>) -> TunnelConnection {
        let frames = Event::new();
        let errors = Event::new();
        let frames2 = frames.clone();
        let errors2 = errors.clone();
        let listener = port.incoming().on(move |value: &Value| {
            let message: ToInfoview = match serde_json::from_value(value.clone()) {
                Ok(message) => message,
                Err(_) => return,
            };
            match message {
                ToInfoview::ServerEvent { payload } => match serde_json::from_str(&payload) {
                    Ok(frame) => frames2.fire(&frame),
                    Err(err) => trace!(%err, "dropping undecodable server_event payload"),
                },
                ToInfoview::ServerError { payload } => match serde_json::from_str(&payload) {
                    Ok(error) => errors2.fire(&error),
                    Err(err) => trace!(%err, "dropping undecodable server_error payload"),
                },
                _ => {}
            }
        });
        TunnelConnection {
            port,
            frames,
            errors,
            alive: AtomicBool::new(true),
            listener,
        }
    }
}

impl Connection for TunnelConnection {
    fn send(&self, frame: &Value) -> Result<()> {
        let payload = serde_json::to_string(frame)?;
        let message = serde_json::to_value(FromInfoview::ServerRequest { payload })?;
        self.port.post(message)?;
        Ok(())
    }

    fn frames(&self) -> &Event<Value> {
        &self.frames
    }

    fn errors(&self) -> &Event<TransportError> {
        &self.errors
    }

    fn alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    fn dispose(&self) {
        if self.alive.swap(false, Ordering::AcqRel) {
            self.listener.dispose();
            self.frames.dispose();
            self.errors.dispose();
        }
    }
}
