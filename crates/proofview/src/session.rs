//! Editor-side session: config authority, pin drift, and the tunnel host

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use eyre::Result;
use proofview_core::{
    Config, ConfigPatch, ContentChange, Dispatcher, Location, Message, PinnedLocation,
    Subscription, shift_pins,
};
use proofview_proto::{FromInfoview, ToInfoview};
use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::client::{Server, Transport, TransportError};
use crate::editor::Editor;
use crate::port::MessagePort;
use crate::providers::diagnostics::DiagnosticsPublisher;
use crate::providers::progress::ProgressReporter;

struct SessionState {
    config: Config,
    pins: Vec<PinnedLocation>,
    cursor: Option<Location>,
}

/// The editor-side half of the integration.
///
/// Owns the prover client and the authoritative copies of the display
/// config, the pin list, and the last cursor position. Everything the
/// infoview needs flows out through the port; everything it asks for comes
/// back in through the same port. Must be created inside a tokio runtime:
/// document syncs run as spawned tasks.
pub struct Session {
    server: Arc<Server>,
    dispatcher: Arc<Dispatcher>,
    editor: Arc<dyn Editor>,
    port: Arc<dyn MessagePort>,
    state: Mutex<SessionState>,
    disposed: AtomicBool,
    subs: Mutex<Vec<Subscription>>,
    _diagnostics: DiagnosticsPublisher,
    _progress: ProgressReporter,
}

impl Session {
    /// Connects to the prover and starts serving the infoview port.
    pub fn new(
        transport: Box<dyn Transport>,
        editor: Arc<dyn Editor>,
        port: Arc<dyn MessagePort>,
        config: Config,
    ) -> Result<Arc<Session>> {
        let server = Arc::new(Server::new(transport));
        let diagnostics = DiagnosticsPublisher::new(&server, &editor);
        let progress = ProgressReporter::new(&server, &editor);
        let session = Arc::new(Session {
            server,
            dispatcher: Arc::new(Dispatcher::new()),
            editor,
            port,
            state: Mutex::new(SessionState {
                config,
                pins: Vec::new(),
                cursor: None,
            }),
            disposed: AtomicBool::new(false),
            subs: Mutex::new(Vec::new()),
            _diagnostics: diagnostics,
            _progress: progress,
        });
        session.wire();
        session.server.connect()?;
        Ok(session)
    }

    fn wire(self: &Arc<Self>) {
        let mut subs = Vec::new();

        let weak = Arc::downgrade(self);
        subs.push(self.port.incoming().on(move |value: &Value| {
            if let Some(session) = weak.upgrade() {
                session.handle_view_message(value);
            }
        }));

        // Tunnel host: every prover frame goes to the view verbatim, as a
        // string payload.
        let weak = Arc::downgrade(self);
        subs.push(self.server.frames.on(move |frame: &Value| {
            if let Some(session) = weak.upgrade() {
                match serde_json::to_string(frame) {
                    Ok(payload) => session.post(ToInfoview::ServerEvent { payload }),
                    Err(err) => warn!(%err, "failed to stringify prover frame"),
                }
            }
        }));

        let weak = Arc::downgrade(self);
        subs.push(self.server.error.on(move |err: &TransportError| {
            if let Some(session) = weak.upgrade() {
                match serde_json::to_string(err) {
                    Ok(payload) => session.post(ToInfoview::ServerError { payload }),
                    Err(err) => warn!(%err, "failed to stringify transport error"),
                }
            }
        }));

        let weak = Arc::downgrade(self);
        subs.push(self.server.restarted.on(move |()| {
            if let Some(session) = weak.upgrade() {
                session.post(ToInfoview::Restart);
            }
        }));

        // The view's bridge also listens for the direct message list, in
        // addition to seeing the all_messages frames through the tunnel.
        let weak = Arc::downgrade(self);
        subs.push(self.server.all_messages.on(move |msgs: &Vec<Message>| {
            if let Some(session) = weak.upgrade() {
                session.post(ToInfoview::AllMessages {
                    messages: msgs.clone(),
                });
            }
        }));

        *self.subs.lock().unwrap_or_else(PoisonError::into_inner) = subs;
    }

    fn handle_view_message(&self, value: &Value) {
        let message: FromInfoview = match serde_json::from_value(value.clone()) {
            Ok(message) => message,
            Err(err) => {
                trace!(%err, "ignoring unrecognized infoview message");
                return;
            }
        };
        match message {
            FromInfoview::RequestConfig => self.seed_view(),
            FromInfoview::InsertText { loc, text } => {
                let loc = loc.or_else(|| {
                    let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
                    state.cursor.clone()
                });
                match loc {
                    Some(loc) => self.editor.insert_text(&loc, &text),
                    None => trace!("dropping insert_text: no location and no cursor"),
                }
            }
            FromInfoview::Reveal { loc } => self.editor.reveal(&loc),
            FromInfoview::HoverPosition { loc } => self.editor.highlight_position(&loc),
            FromInfoview::StopHover => self.editor.clear_highlight(),
            FromInfoview::CopyText { text } => self.editor.copy_to_clipboard(&text),
            FromInfoview::SyncPin { pins } => {
                let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
                state.pins = pins;
            }
            FromInfoview::ServerRequest { payload } => match serde_json::from_str::<Value>(&payload)
            {
                Ok(frame) => {
                    if let Err(err) = self.server.send_raw(&frame) {
                        warn!(%err, "failed to forward tunneled prover request");
                    }
                }
                Err(err) => trace!(%err, "ignoring undecodable server_request payload"),
            },
        }
    }

    /// Answers `request_config`: the view starts from nothing and needs the
    /// full config, the pin list, and the current position.
    fn seed_view(&self) {
        let (config, pins, cursor) = {
            let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            (state.config.to_patch(), state.pins.clone(), state.cursor.clone())
        };
        self.post(ToInfoview::OnConfigChange { config });
        self.post(ToInfoview::SyncPin { pins });
        if let Some(loc) = cursor {
            self.post(ToInfoview::Position { loc });
        }
    }

    fn post(&self, message: ToInfoview) {
        let value = match serde_json::to_value(&message) {
            Ok(value) => value,
            Err(err) => {
                warn!(%err, "failed to encode infoview message");
                return;
            }
        };
        if let Err(err) = self.port.post(value) {
            trace!(%err, "dropping message for a closed infoview port");
        }
    }

    // ========================================================================
    // Host entry points
    // ========================================================================

    /// The editor cursor moved to `loc`.
    pub fn cursor_moved(&self, loc: Location) {
        {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            state.cursor = Some(loc.clone());
        }
        self.post(ToInfoview::Position { loc });
    }

    /// Applies a partial settings update and mirrors it to the view.
    pub fn update_config(&self, patch: ConfigPatch) {
        {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            state.config.apply(&patch);
        }
        self.post(ToInfoview::OnConfigChange { config: patch });
    }

    /// A buffer changed: relocate pins past the edits, tell the view if any
    /// moved, and resync the prover with the new content.
    pub fn document_changed(&self, file_name: &str, changes: &[ContentChange], new_content: &str) {
        let moved = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            if shift_pins(&mut state.pins, file_name, changes) {
                Some(state.pins.clone())
            } else {
                None
            }
        };
        if let Some(pins) = moved {
            self.post(ToInfoview::SyncPin { pins });
        }
        let server = Arc::clone(&self.server);
        let file_name = file_name.to_owned();
        let content = new_content.to_owned();
        tokio::spawn(async move {
            if let Err(err) = server.sync(&file_name, Some(content)).await {
                debug!(%err, file = %file_name, "prover sync failed");
            }
        });
    }

    /// Tears down the current prover connection and starts a fresh one.
    pub fn restart(&self) -> Result<()> {
        self.server.connect()
    }

    pub fn toggle_pin(&self) {
        self.post(ToInfoview::TogglePin);
    }

    pub fn pause(&self) {
        self.post(ToInfoview::Pause);
    }

    pub fn resume(&self) {
        self.post(ToInfoview::Continue);
    }

    pub fn toggle_updating(&self) {
        self.post(ToInfoview::ToggleUpdating);
    }

    pub fn copy_to_comment(&self) {
        self.post(ToInfoview::CopyToComment);
    }

    pub fn toggle_all_messages(&self) {
        self.post(ToInfoview::ToggleAllMessages);
    }

    /// The prover client, for the editor-side query providers.
    pub fn server(&self) -> &Arc<Server> {
        &self.server
    }

    /// The gate the editor-side point-query providers share, so their
    /// queries never overlap.
    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// Current config snapshot.
    pub fn config(&self) -> Config {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.config.clone()
    }

    /// Current pin replica, as last synced or shifted.
    pub fn pins(&self) -> Vec<PinnedLocation> {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.pins.clone()
    }

    /// Stops listening, drops the prover connection, and goes quiet.
    /// Idempotent.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.subs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self.server.dispose();
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.dispose();
    }
}
