//! The infoview panel: bridge, goal panes, and panel state
//!
//! Everything in here lives on the panel side of the message port. The
//! [`Bridge`] unwraps inbound commands into typed events and owns the
//! panel's own prover client (tunneled through the port); each [`Pane`]
//! projects one location into a goal state; the [`Infoview`] assembles the
//! cursor pane, the pinned panes, and the all-messages list into what a
//! renderer draws.

mod bridge;
mod pane;
mod view;

pub use bridge::Bridge;
pub use pane::{Pane, PaneSnapshot, PaneStatus};
pub use view::{Infoview, ViewSnapshot};
