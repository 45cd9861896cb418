//! Panel side of the message port

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use eyre::Result;
use proofview_core::{
    Config, Event, Location, Message, PinnedLocation, Subscription, messages_equal,
};
use proofview_proto::{FromInfoview, ToInfoview};
use serde_json::Value;
use tracing::{trace, warn};

use crate::client::{Server, TunnelTransport};
use crate::port::MessagePort;

struct BridgeState {
    config: Config,
    messages: Vec<Message>,
}

/// Unwraps inbound port commands into typed events and carries panel
/// actions back out.
///
/// The bridge also owns the panel's own prover client: a [`Server`] whose
/// transport tunnels frames through the same port as `server_request` /
/// `server_event` strings. Those two commands are handled by the tunnel,
/// not here.
pub struct Bridge {
    port: Arc<dyn MessagePort>,
    /// The panel's prover client, connected through the port.
    pub server: Arc<Server>,
    state: Arc<Mutex<BridgeState>>,
    /// Cursor moved in the editor.
    pub position: Event<Location>,
    /// Config mirror updated; fires the full merged config.
    pub config_changed: Event<Config>,
    /// Full diagnostic list replacements. Fed by both the direct message
    /// and the tunneled prover frames; a list that renders identically to
    /// the current one is dropped instead of refired.
    pub all_messages: Event<Vec<Message>>,
    pub sync_pin: Event<Vec<PinnedLocation>>,
    pub pause: Event<()>,
    pub resume: Event<()>,
    pub toggle_updating: Event<()>,
    pub copy_to_comment: Event<()>,
    pub toggle_pin: Event<()>,
    pub toggle_all_messages: Event<()>,
    /// The editor side replaced its prover connection.
    pub restarted: Event<()>,
    subs: Mutex<Vec<Subscription>>,
    disposed: AtomicBool,
}

impl Bridge {
    /// Attaches to the port and connects the tunneled client.
    pub fn new(port: Arc<dyn MessagePort>) -> Result<Arc<Bridge>> {
        let server = Arc::new(Server::new(Box::new(TunnelTransport::new(Arc::clone(
            &port,
        )))));
        let state = Arc::new(Mutex::new(BridgeState {
            config: Config::default(),
            messages: Vec::new(),
        }));

        let bridge = Arc::new(Bridge {
            port,
            server,
            state,
            position: Event::new(),
            config_changed: Event::new(),
            all_messages: Event::new(),
            sync_pin: Event::new(),
            pause: Event::new(),
            resume: Event::new(),
            toggle_updating: Event::new(),
            copy_to_comment: Event::new(),
            toggle_pin: Event::new(),
            toggle_all_messages: Event::new(),
            restarted: Event::new(),
            subs: Mutex::new(Vec::new()),
            disposed: AtomicBool::new(false),
        });
        bridge.wire();
        bridge.server.connect()?;
        Ok(bridge)
    }

    /// Ask the editor side for its config/pin/position seed. Called once
    /// the panel has its listeners in place; the answer arrives as ordinary
    /// `on_config_change` / `sync_pin` / `position` commands.
    pub fn request_seed(&self) {
        self.post(FromInfoview::RequestConfig);
    }

    fn wire(self: &Arc<Self>) {
        let mut subs = Vec::new();

        let weak = Arc::downgrade(self);
        subs.push(self.port.incoming().on(move |value: &Value| {
            if let Some(bridge) = weak.upgrade() {
                bridge.handle_command(value);
            }
        }));

        // The tunneled client's message stream joins the direct one.
        let weak = Arc::downgrade(self);
        subs.push(self.server.all_messages.on(move |msgs: &Vec<Message>| {
            if let Some(bridge) = weak.upgrade() {
                bridge.replace_messages(msgs.clone());
            }
        }));

        *self.subs.lock().unwrap_or_else(PoisonError::into_inner) = subs;
    }

    fn handle_command(&self, value: &Value) {
        let message: ToInfoview = match serde_json::from_value(value.clone()) {
            Ok(message) => message,
            Err(err) => {
                trace!(%err, "ignoring unrecognized panel command");
                return;
            }
        };
        match message {
            // Tunnel traffic; the connection has its own listener.
            ToInfoview::ServerEvent { .. } | ToInfoview::ServerError { .. } => {}
            ToInfoview::Position { loc } => self.position.fire(&loc),
            ToInfoview::OnConfigChange { config } => {
                let merged = {
                    let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
                    state.config.apply(&config);
                    state.config.clone()
                };
                self.config_changed.fire(&merged);
            }
            ToInfoview::AllMessages { messages } => self.replace_messages(messages),
            ToInfoview::ToggleAllMessages => self.toggle_all_messages.fire(&()),
            ToInfoview::SyncPin { pins } => self.sync_pin.fire(&pins),
            ToInfoview::Pause => self.pause.fire(&()),
            ToInfoview::Continue => self.resume.fire(&()),
            ToInfoview::ToggleUpdating => self.toggle_updating.fire(&()),
            ToInfoview::CopyToComment => self.copy_to_comment.fire(&()),
            ToInfoview::TogglePin => self.toggle_pin.fire(&()),
            ToInfoview::Restart => {
                // The prover starts over; everything held is void.
                self.replace_messages(Vec::new());
                self.restarted.fire(&());
            }
        }
    }

    fn post(&self, message: FromInfoview) {
        let value = match serde_json::to_value(&message) {
            Ok(value) => value,
            Err(err) => {
                warn!(%err, "failed to encode panel message");
                return;
            }
        };
        if let Err(err) = self.port.post(value) {
            trace!(%err, "dropping message for a closed port");
        }
    }

    /// The config mirror as of the last `on_config_change`.
    pub fn current_config(&self) -> Config {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.config.clone()
    }

    /// The message list as of the last replacement.
    pub fn current_messages(&self) -> Vec<Message> {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.messages.clone()
    }

    /// Store `msgs` and fan them out on [`Bridge::all_messages`], unless
    /// they render identically to the current list.
    fn replace_messages(&self, msgs: Vec<Message>) {
        {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            if messages_equal(&state.messages, &msgs) {
                return;
            }
            state.messages = msgs.clone();
        }
        self.all_messages.fire(&msgs);
    }

    // ========================================================================
    // Panel actions
    // ========================================================================

    pub fn reveal(&self, loc: &Location) {
        self.post(FromInfoview::Reveal { loc: loc.clone() });
    }

    pub fn insert_text(&self, loc: Option<Location>, text: impl Into<String>) {
        self.post(FromInfoview::InsertText {
            loc,
            text: text.into(),
        });
    }

    /// Wraps `text` in a block comment and inserts it at the editor cursor.
    pub fn insert_comment(&self, text: &str) {
        self.insert_text(None, format!("/-\n{text}\n-/\n"));
    }

    pub fn copy_text(&self, text: &str) {
        self.post(FromInfoview::CopyText {
            text: text.to_owned(),
        });
    }

    pub fn hover_position(&self, loc: &Location) {
        self.post(FromInfoview::HoverPosition { loc: loc.clone() });
    }

    pub fn stop_hover(&self) {
        self.post(FromInfoview::StopHover);
    }

    /// Pushes the panel's pin list back to the editor side.
    pub fn sync_pins(&self, pins: Vec<PinnedLocation>) {
        self.post(FromInfoview::SyncPin { pins });
    }

    /// Detaches from the port and drops the tunneled client. Idempotent.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.subs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self.server.dispose();
        self.position.dispose();
        self.config_changed.dispose();
        self.all_messages.dispose();
        self.sync_pin.dispose();
        self.pause.dispose();
        self.resume.dispose();
        self.toggle_updating.dispose();
        self.copy_to_comment.dispose();
        self.toggle_pin.dispose();
        self.toggle_all_messages.dispose();
        self.restarted.dispose();
    }
}

impl Drop for Bridge {
    fn drop(&mut self) {
        self.dispose();
    }
}
