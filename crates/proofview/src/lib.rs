//! proofview library - Editor integration for an external theorem prover
//!
//! This library connects a host editor to a prover server and keeps an
//! infoview panel in sync with both. The host side ([`session::Session`])
//! owns the prover connection, the display configuration, and the pinned
//! locations of open files; the panel side ([`infoview::Infoview`]) renders
//! goal states and messages for the cursor and for every pin. The two sides
//! talk over a [`port::MessagePort`], and the panel reaches the prover by
//! tunneling protocol frames through that same channel.

pub mod client;
pub mod editor;
pub mod infoview;
pub mod port;
pub mod providers;
pub mod session;

pub use client::{Connection, Server, Transport, TransportError};
pub use editor::{Diagnostic, Editor, FileDiagnostics, MessageKind};
pub use port::{LocalPort, MessagePort, PortClosed};
pub use session::Session;
