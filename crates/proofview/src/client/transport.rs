//! The seam between the prover client and whatever carries its frames

use std::fmt;
use std::sync::Arc;

use eyre::Result;
use proofview_core::Event;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Produces connections to the prover.
///
/// The stdio and tunnel transports implement this; tests plug in scripted
/// ones.
pub trait Transport: Send + Sync {
    fn connect(&self) -> Result<Arc<dyn Connection>>;
}

/// One live duplex frame stream.
///
/// `frames` fires for every inbound frame in arrival order, `errors` for
/// transport-level failures. Both stop after `dispose`.
pub trait Connection: Send + Sync {
    fn send(&self, frame: &Value) -> Result<()>;
    fn frames(&self) -> &Event<Value>;
    fn errors(&self) -> &Event<TransportError>;
    fn alive(&self) -> bool;
    fn dispose(&self);
}

/// A failure of the carrier itself, as opposed to an error response from
/// the prover. Serializable because the session forwards these to the
/// infoview as `server_error` payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportError {
    pub message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> TransportError {
        TransportError {
            message: message.into(),
        }
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "transport error: {}", self.message)
    }
}

impl std::error::Error for TransportError {}
