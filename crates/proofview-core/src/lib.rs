//! proofview-core - Building blocks for the prover/editor integration layer
//!
//! This crate provides the runtime-light primitives shared by both sides of
//! the infoview boundary:
//!
//! - [`Event`] - synchronous typed publish/subscribe with snapshot firing
//! - [`Dispatcher`] - the "one at a time" gate that serializes prover queries
//! - [`Throttle`] - trailing-edge coalescing for UI-driven re-queries
//! - the shared data model ([`Location`], [`Config`], [`Message`], [`Task`],
//!   [`PinnedLocation`]) plus the pure logic on it: edit drift, shallow
//!   config merge, message filtering and truncation, pin bookkeeping
//!
//! Everything here is independent of any particular editor or prover; the
//! `proofview` crate wires these pieces to a live connection and a host.
//!
//! # Events
//!
//! ```
//! use proofview_core::Event;
//! use std::sync::{Arc, Mutex};
//!
//! let bus: Event<u32> = Event::new();
//! let seen = Arc::new(Mutex::new(Vec::new()));
//! let sink = seen.clone();
//! let sub = bus.on(move |n| sink.lock().unwrap().push(*n));
//! bus.fire(&1);
//! bus.fire(&2);
//! sub.dispose();
//! bus.fire(&3);
//! assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
//! ```
//!
//! # Pins
//!
//! ```
//! use proofview_core::{Location, PinSet};
//!
//! let mut pins = PinSet::new();
//! let loc = Location::new("a.lean", 3, 5);
//! assert!(pins.pin(loc.clone()));
//! assert!(!pins.pin(loc.clone())); // already pinned, no-op
//! assert_eq!(pins.pins().len(), 1);
//! assert_eq!(pins.unpin_at(&loc), Some(1));
//! assert!(pins.pins().is_empty());
//! ```

mod config;
mod dispatch;
mod event;
mod loc;
mod message;
mod pin;
mod task;
mod throttle;

pub use config::{Config, ConfigPatch, TacticFilter};
pub use dispatch::Dispatcher;
pub use event::{Event, Subscription};
pub use loc::{ContentChange, Location, PinnedLocation, shift_location, shift_pins};
pub use message::{
    MAX_MESSAGE_SIZE, MAX_MESSAGES, Message, Severity, messages_equal, messages_for,
    sort_messages, truncate_messages,
};
pub use pin::PinSet;
pub use task::{ServerStatus, Task, is_done, is_loading_at};
pub use throttle::Throttle;
