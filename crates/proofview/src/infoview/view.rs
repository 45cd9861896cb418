//! The assembled panel: cursor pane, pinned panes, all-messages list

use std::sync::{Arc, Mutex, PoisonError};

use proofview_core::{
    Config, Dispatcher, Event, Location, Message, PinSet, PinnedLocation, Subscription,
    TacticFilter, sort_messages,
};

use super::{Bridge, Pane, PaneSnapshot};

struct PinEntry {
    key: u64,
    pane: Arc<Pane>,
    _changed_sub: Subscription,
}

struct ViewState {
    cursor: Option<Location>,
    pins: PinSet,
    pin_panes: Vec<PinEntry>,
    /// All current messages, cleared on prover restart.
    messages: Vec<Message>,
    /// What the all-messages list shows; lags `messages` while paused.
    display: Vec<Message>,
    all_messages_paused: bool,
    all_messages_open: bool,
    /// Set once the first config arrives and decides the disclosure
    /// default; later patches leave the user's toggle alone.
    disclosure_seeded: bool,
}

impl ViewState {
    fn refresh_display(&mut self) {
        if self.all_messages_paused {
            return;
        }
        self.display = match &self.cursor {
            Some(loc) => {
                let mut msgs: Vec<Message> = self
                    .messages
                    .iter()
                    .filter(|m| m.file_name == loc.file_name)
                    .cloned()
                    .collect();
                sort_messages(&mut msgs);
                msgs
            }
            None => Vec::new(),
        };
    }
}

/// Everything a renderer needs to draw the panel.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewSnapshot {
    pub cursor: PaneSnapshot,
    /// Pinned panes in pin order, each with its key.
    pub pinned: Vec<(u64, PaneSnapshot)>,
    /// Current file's messages, sorted, frozen while paused.
    pub all_messages: Vec<Message>,
    pub all_messages_open: bool,
    pub all_messages_paused: bool,
    /// The goal-state filter selected in the config, for the renderer to
    /// apply to goal text.
    pub goal_filter: Option<TacticFilter>,
}

/// The panel itself.
///
/// Owns the pin list and its key allocator: pins created here get fresh
/// keys, and the full list is pushed to the editor side on every change so
/// it can drag pins through document edits. Inbound `sync_pin` commands
/// replace the list wholesale. One pane per pin plus the cursor pane, all
/// sharing one [`Dispatcher`] so their prover queries never overlap.
pub struct Infoview {
    bridge: Arc<Bridge>,
    dispatcher: Arc<Dispatcher>,
    cursor_pane: Arc<Pane>,
    state: Mutex<ViewState>,
    /// Fires after anything a renderer shows may have changed.
    pub changed: Event<()>,
    subs: Mutex<Vec<Subscription>>,
    _cursor_sub: Subscription,
}

impl Infoview {
    pub fn new(bridge: Arc<Bridge>) -> Arc<Infoview> {
        let dispatcher = Arc::new(Dispatcher::new());
        let cursor_pane = Pane::new(&bridge, &dispatcher, false);
        let changed: Event<()> = Event::new();

        let aggregate = changed.clone();
        let cursor_sub = cursor_pane.changed.on(move |()| aggregate.fire(&()));

        let view = Arc::new(Infoview {
            state: Mutex::new(ViewState {
                cursor: None,
                pins: PinSet::new(),
                pin_panes: Vec::new(),
                messages: bridge.current_messages(),
                display: Vec::new(),
                all_messages_paused: false,
                all_messages_open: false,
                disclosure_seeded: false,
            }),
            bridge,
            dispatcher,
            cursor_pane,
            changed,
            subs: Mutex::new(Vec::new()),
            _cursor_sub: cursor_sub,
        });
        view.wire();
        view.bridge.request_seed();
        view
    }

    fn wire(self: &Arc<Self>) {
        let mut subs = Vec::new();

        let weak = Arc::downgrade(self);
        subs.push(self.bridge.position.on(move |loc: &Location| {
            if let Some(view) = weak.upgrade() {
                view.on_position(loc);
            }
        }));

        let weak = Arc::downgrade(self);
        subs.push(self.bridge.sync_pin.on(move |pins: &Vec<PinnedLocation>| {
            if let Some(view) = weak.upgrade() {
                view.on_sync_pin(pins);
            }
        }));

        let weak = Arc::downgrade(self);
        subs.push(self.bridge.toggle_pin.on(move |()| {
            if let Some(view) = weak.upgrade() {
                view.on_toggle_pin();
            }
        }));

        // Pause commands address the cursor pane; pinned panes only pause
        // through their own buttons.
        let weak = Arc::downgrade(self);
        subs.push(self.bridge.pause.on(move |()| {
            if let Some(view) = weak.upgrade() {
                view.cursor_pane.set_paused(true);
            }
        }));

        let weak = Arc::downgrade(self);
        subs.push(self.bridge.resume.on(move |()| {
            if let Some(view) = weak.upgrade() {
                view.cursor_pane.set_paused(false);
            }
        }));

        let weak = Arc::downgrade(self);
        subs.push(self.bridge.toggle_updating.on(move |()| {
            if let Some(view) = weak.upgrade() {
                view.cursor_pane.toggle_paused();
            }
        }));

        let weak = Arc::downgrade(self);
        subs.push(self.bridge.copy_to_comment.on(move |()| {
            if let Some(view) = weak.upgrade() {
                view.copy_goal_to_comment();
            }
        }));

        let weak = Arc::downgrade(self);
        subs.push(self.bridge.config_changed.on(move |config: &Config| {
            if let Some(view) = weak.upgrade() {
                view.on_config(config);
            }
        }));

        let weak = Arc::downgrade(self);
        subs.push(self.bridge.all_messages.on(move |msgs: &Vec<Message>| {
            if let Some(view) = weak.upgrade() {
                view.on_all_messages(msgs);
            }
        }));

        let weak = Arc::downgrade(self);
        subs.push(self.bridge.restarted.on(move |()| {
            if let Some(view) = weak.upgrade() {
                view.on_restarted();
            }
        }));

        let weak = Arc::downgrade(self);
        subs.push(self.bridge.toggle_all_messages.on(move |()| {
            if let Some(view) = weak.upgrade() {
                view.toggle_all_messages_open();
            }
        }));

        *self.subs.lock().unwrap_or_else(PoisonError::into_inner) = subs;
    }

    fn on_position(&self, loc: &Location) {
        {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            state.cursor = Some(loc.clone());
            state.refresh_display();
        }
        self.cursor_pane.set_location(Some(loc.clone()));
        self.changed.fire(&());
    }

    fn on_sync_pin(&self, pins: &[PinnedLocation]) {
        {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            state.pins.replace(pins.to_vec());
        }
        self.reconcile(pins);
        self.changed.fire(&());
    }

    fn on_toggle_pin(&self) {
        let pins = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            let Some(cursor) = state.cursor.clone() else {
                return;
            };
            if state.pins.unpin_at(&cursor).is_none() {
                state.pins.pin(cursor);
            }
            state.pins.pins().to_vec()
        };
        self.reconcile(&pins);
        self.bridge.sync_pins(pins);
        self.changed.fire(&());
    }

    /// Pin the current cursor location. No-op if it is already pinned or
    /// there is no cursor yet.
    pub fn pin_cursor(&self) {
        let pins = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            let Some(cursor) = state.cursor.clone() else {
                return;
            };
            if !state.pins.pin(cursor) {
                return;
            }
            state.pins.pins().to_vec()
        };
        self.reconcile(&pins);
        self.bridge.sync_pins(pins);
        self.changed.fire(&());
    }

    /// Remove one pin by key.
    pub fn unpin(&self, key: u64) {
        let pins = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            if !state.pins.unpin_key(key) {
                return;
            }
            state.pins.pins().to_vec()
        };
        self.reconcile(&pins);
        self.bridge.sync_pins(pins);
        self.changed.fire(&());
    }

    /// Bring the pane set in line with `pins`: panes keep their identity
    /// across relocations (same key, new location), vanished pins drop
    /// their panes.
    fn reconcile(&self, pins: &[PinnedLocation]) {
        let mut moved: Vec<(Arc<Pane>, Location)> = Vec::new();
        let mut stale: Vec<PinEntry> = Vec::new();
        {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            let mut existing = std::mem::take(&mut state.pin_panes);
            let mut next = Vec::with_capacity(pins.len());
            for pin in pins {
                let entry = match existing.iter().position(|e| e.key == pin.key) {
                    Some(i) => existing.remove(i),
                    None => {
                        let pane = Pane::new(&self.bridge, &self.dispatcher, true);
                        let aggregate = self.changed.clone();
                        let sub = pane.changed.on(move |()| aggregate.fire(&()));
                        PinEntry {
                            key: pin.key,
                            pane,
                            _changed_sub: sub,
                        }
                    }
                };
                moved.push((Arc::clone(&entry.pane), pin.loc.clone()));
                next.push(entry);
            }
            stale.extend(existing);
            state.pin_panes = next;
        }
        for (pane, loc) in moved {
            pane.set_location(Some(loc));
        }
        drop(stale);
    }

    fn copy_goal_to_comment(&self) {
        if let Some(goal) = self.cursor_pane.goal_text() {
            if !goal.is_empty() {
                self.bridge.insert_comment(&goal);
            }
        }
    }

    /// The first config to arrive is the seed answer; it decides whether
    /// the all-messages list starts open. However the port delivers it.
    fn on_config(&self, config: &Config) {
        {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            if !state.disclosure_seeded {
                state.disclosure_seeded = true;
                state.all_messages_open = !config.info_view_auto_open_show_goal;
            }
        }
        self.changed.fire(&());
    }

    fn on_all_messages(&self, msgs: &[Message]) {
        {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            state.messages = msgs.to_vec();
            state.refresh_display();
        }
        self.changed.fire(&());
    }

    fn on_restarted(&self) {
        {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            state.messages.clear();
            state.refresh_display();
        }
        self.changed.fire(&());
    }

    /// Flip the all-messages disclosure. Driven by the editor command and
    /// by the renderer's own summary click.
    pub fn toggle_all_messages_open(&self) {
        {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            state.all_messages_open = !state.all_messages_open;
        }
        self.changed.fire(&());
    }

    /// Freeze or thaw the all-messages list. Thawing catches up with the
    /// current messages.
    pub fn toggle_all_messages_paused(&self) {
        {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            state.all_messages_paused = !state.all_messages_paused;
            state.refresh_display();
        }
        self.changed.fire(&());
    }

    pub fn cursor_pane(&self) -> &Arc<Pane> {
        &self.cursor_pane
    }

    pub fn pinned_panes(&self) -> Vec<(u64, Arc<Pane>)> {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state
            .pin_panes
            .iter()
            .map(|e| (e.key, Arc::clone(&e.pane)))
            .collect()
    }

    pub fn bridge(&self) -> &Arc<Bridge> {
        &self.bridge
    }

    pub fn snapshot(&self) -> ViewSnapshot {
        let cursor = self.cursor_pane.snapshot();
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        ViewSnapshot {
            cursor,
            pinned: state
                .pin_panes
                .iter()
                .map(|e| (e.key, e.pane.snapshot()))
                .collect(),
            all_messages: state.display.clone(),
            all_messages_open: state.all_messages_open,
            all_messages_paused: state.all_messages_paused,
            goal_filter: self.bridge.current_config().active_filter().cloned(),
        }
    }

    /// Detach from the bridge. The panes stop updating once dropped.
    pub fn dispose(&self) {
        self.subs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.pin_panes.clear();
    }
}
