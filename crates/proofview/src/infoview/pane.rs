//! One goal pane: a location projected into prover state

use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;

use proofview_core::{
    Config, Dispatcher, Event, Location, Message, ServerStatus, Subscription, Throttle, is_done,
    is_loading_at, messages_for,
};
use proofview_proto::InfoResponse;

use super::Bridge;
use crate::client::TransportError;

/// Update window while the prover is still elaborating around the pane's
/// location.
const LOADING_DELAY: Duration = Duration::from_millis(500);
/// Update window otherwise.
const IDLE_DELAY: Duration = Duration::from_millis(200);

/// Where a pane is in its lifecycle, for coloring the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaneStatus {
    Loading,
    Error,
    Pinned,
    Cursor,
}

/// Everything a renderer needs to draw one pane.
#[derive(Debug, Clone, PartialEq)]
pub struct PaneSnapshot {
    pub loc: Option<Location>,
    pub paused: bool,
    pub loading: bool,
    pub status: PaneStatus,
    pub response: Option<InfoResponse>,
    pub error: Option<String>,
    /// Messages attached to the pane's line, already narrowed per config.
    pub messages: Vec<Message>,
}

impl PaneSnapshot {
    /// True when the pane settled on an answer with nothing to render: no
    /// goal state, no widget, and no messages on the line. What a renderer
    /// turns into "No info found".
    pub fn nothing_to_show(&self) -> bool {
        if self.loading || self.error.is_some() || !self.messages.is_empty() {
            return false;
        }
        match &self.response {
            None => false,
            Some(response) => match &response.record {
                None => true,
                Some(record) => record.state.is_none() && record.widget.is_none(),
            },
        }
    }
}

struct PaneState {
    /// Latest location handed to the pane.
    target: Option<Location>,
    /// The location actually queried and displayed. Deviates from `target`
    /// only while paused.
    loc: Option<Location>,
    paused: bool,
    status: ServerStatus,
    response: Option<InfoResponse>,
    error: Option<String>,
    all_messages: Vec<Message>,
    config: Config,
    messages: Vec<Message>,
}

impl PaneState {
    fn loading(&self) -> bool {
        self.loc
            .as_ref()
            .is_some_and(|loc| is_loading_at(&self.status, loc))
    }

    fn refresh_messages(&mut self) {
        self.messages = match &self.loc {
            Some(loc) => messages_for(&self.all_messages, loc, &self.config),
            None => Vec::new(),
        };
    }
}

/// Projects one location into the prover's view of it.
///
/// Queries are throttled, serialized through the shared [`Dispatcher`]
/// (one info request in flight at a time, across all panes), and committed
/// only if the pane still asks for the same location when the answer
/// lands. While the prover is still elaborating around the location, a
/// successful answer is provisional: it is dropped and the query re-armed.
pub struct Pane {
    bridge: Arc<Bridge>,
    dispatcher: Arc<Dispatcher>,
    pinned: bool,
    state: Mutex<PaneState>,
    throttle: Throttle,
    /// Fires after every display-relevant state change.
    pub changed: Event<()>,
    subs: Mutex<Vec<Subscription>>,
}

impl Pane {
    pub fn new(bridge: &Arc<Bridge>, dispatcher: &Arc<Dispatcher>, pinned: bool) -> Arc<Pane> {
        let pane = Arc::new_cyclic(|weak: &Weak<Pane>| {
            let weak = weak.clone();
            let throttle = Throttle::new(move || {
                if let Some(pane) = weak.upgrade() {
                    tokio::spawn(pane.update());
                }
            });
            Pane {
                bridge: Arc::clone(bridge),
                dispatcher: Arc::clone(dispatcher),
                pinned,
                state: Mutex::new(PaneState {
                    target: None,
                    loc: None,
                    paused: false,
                    status: ServerStatus::default(),
                    response: None,
                    error: None,
                    all_messages: bridge.current_messages(),
                    config: bridge.current_config(),
                    messages: Vec::new(),
                }),
                throttle,
                changed: Event::new(),
                subs: Mutex::new(Vec::new()),
            }
        });
        pane.wire();
        pane
    }

    fn wire(self: &Arc<Self>) {
        let mut subs = Vec::new();

        let weak = Arc::downgrade(self);
        subs.push(
            self.bridge
                .server
                .status_changed
                .on(move |status: &ServerStatus| {
                    if let Some(pane) = weak.upgrade() {
                        pane.on_status(status);
                    }
                }),
        );

        let weak = Arc::downgrade(self);
        subs.push(self.bridge.all_messages.on(move |msgs: &Vec<Message>| {
            if let Some(pane) = weak.upgrade() {
                pane.on_messages(msgs);
            }
        }));

        let weak = Arc::downgrade(self);
        subs.push(self.bridge.config_changed.on(move |config: &Config| {
            if let Some(pane) = weak.upgrade() {
                pane.on_config(config);
            }
        }));

        let weak = Arc::downgrade(self);
        subs.push(self.bridge.restarted.on(move |()| {
            if let Some(pane) = weak.upgrade() {
                pane.trigger_update();
            }
        }));

        let weak = Arc::downgrade(self);
        subs.push(self.bridge.server.error.on(move |_: &TransportError| {
            if let Some(pane) = weak.upgrade() {
                pane.trigger_update();
            }
        }));

        *self.subs.lock().unwrap_or_else(PoisonError::into_inner) = subs;
    }

    /// Point the pane at a new location. While paused, the location is
    /// remembered but the display stays frozen.
    pub fn set_location(&self, loc: Option<Location>) {
        {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            state.target = loc.clone();
            if state.paused {
                return;
            }
            state.loc = loc;
            state.refresh_messages();
        }
        self.changed.fire(&());
        self.trigger_update();
    }

    /// Freeze or thaw the pane. Thawing re-adopts the latest target
    /// location and re-queries.
    pub fn set_paused(&self, paused: bool) {
        {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            if state.paused == paused {
                return;
            }
            state.paused = paused;
            if !paused {
                state.loc = state.target.clone();
                state.refresh_messages();
            }
        }
        self.changed.fire(&());
        self.trigger_update();
    }

    pub fn toggle_paused(&self) {
        let paused = {
            let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            state.paused
        };
        self.set_paused(!paused);
    }

    /// Re-query now (well, within the throttle window). No-op while paused.
    pub fn force_update(&self) {
        let paused = {
            let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            state.paused
        };
        if !paused {
            self.trigger_update();
        }
    }

    /// Arm the throttle. The window is longer while the prover is still
    /// elaborating, since answers during that phase are provisional anyway.
    fn trigger_update(&self) {
        let delay = {
            let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            if state.loading() {
                LOADING_DELAY
            } else {
                IDLE_DELAY
            }
        };
        self.throttle.arm(delay);
    }

    fn on_status(&self, status: &ServerStatus) {
        let (loading_changed, done) = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            let was = state.loading();
            state.status = status.clone();
            (was != state.loading(), is_done(status))
        };
        if loading_changed {
            self.changed.fire(&());
        }
        if done {
            self.trigger_update();
        }
    }

    fn on_messages(&self, msgs: &[Message]) {
        {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            state.all_messages = msgs.to_vec();
            state.refresh_messages();
        }
        self.changed.fire(&());
    }

    fn on_config(&self, config: &Config) {
        {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            state.config = config.clone();
            state.refresh_messages();
        }
        self.changed.fire(&());
    }

    async fn update(self: Arc<Self>) {
        let (loc, paused) = {
            let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            (state.loc.clone(), state.paused)
        };
        if paused {
            return;
        }
        let Some(loc) = loc else {
            {
                let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
                state.response = None;
                state.error = None;
            }
            self.changed.fire(&());
            return;
        };

        let server = Arc::clone(&self.bridge.server);
        let query_loc = loc.clone();
        let outcome = self
            .dispatcher
            .run(async move {
                server
                    .info(&query_loc.file_name, query_loc.line, query_loc.column)
                    .await
            })
            .await;

        match outcome {
            Ok(mut info) => {
                // Older provers omit the widget's position; stamp the query
                // location so the renderer can anchor it.
                if let Some(widget) = info.record.as_mut().and_then(|r| r.widget.as_mut()) {
                    if widget.line.is_none() {
                        widget.line = Some(loc.line);
                        widget.column = Some(loc.column);
                    }
                }
                let retrigger = {
                    let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
                    if state.paused || state.loc.as_ref() != Some(&loc) {
                        return;
                    }
                    state.error = None;
                    if state.loading() {
                        // Provisional: the prover is still chewing on this
                        // region, so ask again rather than show a stale goal.
                        true
                    } else {
                        state.response = Some(info);
                        false
                    }
                };
                self.changed.fire(&());
                if retrigger {
                    self.trigger_update();
                }
            }
            Err(err) => {
                if err.is_interrupted() {
                    // The prover dropped the query for newer input; ask
                    // again without disturbing what is on screen.
                    let stale = {
                        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
                        state.paused || state.loc.as_ref() != Some(&loc)
                    };
                    if !stale {
                        self.trigger_update();
                    }
                    return;
                }
                {
                    let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
                    if state.paused || state.loc.as_ref() != Some(&loc) {
                        return;
                    }
                    state.error = Some(err.message);
                    state.response = None;
                }
                self.changed.fire(&());
            }
        }
    }

    /// The rendered goal text, if the last answer carried one.
    pub fn goal_text(&self) -> Option<String> {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.response.as_ref()?.record.as_ref()?.state.clone()
    }

    pub fn snapshot(&self) -> PaneSnapshot {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let loading = state.loading();
        let status = if loading {
            PaneStatus::Loading
        } else if state.error.is_some() {
            PaneStatus::Error
        } else if self.pinned {
            PaneStatus::Pinned
        } else {
            PaneStatus::Cursor
        };
        PaneSnapshot {
            loc: state.loc.clone(),
            paused: state.paused,
            loading,
            status,
            response: state.response.clone(),
            error: state.error.clone(),
            messages: state.messages.clone(),
        }
    }
}
