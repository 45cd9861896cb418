//! Shared fakes for the integration tests: a prover connection that answers
//! from a script, and an editor that records every call.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use eyre::Result;
use proofview::client::{Connection, Transport, TransportError};
use proofview::editor::{Editor, FileDiagnostics, MessageKind};
use proofview_core::{ContentChange, Event, Location, Message, ServerStatus, Severity};
use serde_json::{Value, json};

/// Wire test logs through `RUST_LOG`. Safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Let spawned tasks and event cascades run to quiescence.
pub async fn settle() {
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
}

// ============================================================================
// Scripted prover connection
// ============================================================================

#[derive(Clone)]
enum Reply {
    Ok(Value),
    Err(String),
}

/// A [`Connection`] that answers requests synchronously, inside `send`.
///
/// Replies are looked up by the request's `command`: one-shot failures
/// queued with [`fail_next`](Self::fail_next) go first, then the sticky
/// body set with [`respond_ok`](Self::respond_ok), then an empty ok body.
/// Commands marked with [`hold`](Self::hold) stay unanswered until
/// [`release`](Self::release).
/// Unsolicited frames and transport errors are pushed with
/// [`emit`](Self::emit) / [`emit_error`](Self::emit_error).
pub struct ScriptedConnection {
    sent: Mutex<Vec<Value>>,
    queued: Mutex<HashMap<String, VecDeque<Reply>>>,
    sticky: Mutex<HashMap<String, Reply>>,
    holding: Mutex<HashMap<String, VecDeque<u64>>>,
    frames: Event<Value>,
    errors: Event<TransportError>,
    alive: AtomicBool,
}

impl ScriptedConnection {
    fn new() -> Arc<ScriptedConnection> {
        Arc::new(ScriptedConnection {
            sent: Mutex::new(Vec::new()),
            queued: Mutex::new(HashMap::new()),
            sticky: Mutex::new(HashMap::new()),
            holding: Mutex::new(HashMap::new()),
            frames: Event::new(),
            errors: Event::new(),
            alive: AtomicBool::new(true),
        })
    }

    /// Answer every `command` request with an ok frame carrying `body`.
    pub fn respond_ok(&self, command: &str, body: Value) {
        self.sticky
            .lock()
            .unwrap()
            .insert(command.to_owned(), Reply::Ok(body));
    }

    /// Fail the next `command` request with `message`, then fall back to
    /// whatever else is scripted.
    pub fn fail_next(&self, command: &str, message: &str) {
        self.queued
            .lock()
            .unwrap()
            .entry(command.to_owned())
            .or_default()
            .push_back(Reply::Err(message.to_owned()));
    }

    /// Leave `command` requests unanswered until [`release`](Self::release)
    /// is called for each.
    pub fn hold(&self, command: &str) {
        self.holding
            .lock()
            .unwrap()
            .entry(command.to_owned())
            .or_default();
    }

    /// Answer the oldest held `command` request with an ok frame carrying
    /// `body`. Panics if nothing is held.
    pub fn release(&self, command: &str, body: Value) {
        let seq_num = self
            .holding
            .lock()
            .unwrap()
            .get_mut(command)
            .and_then(VecDeque::pop_front)
            .expect("no held request to release");
        let mut response = json!({"response": "ok", "seq_num": seq_num});
        if let (Some(map), Some(extra)) = (response.as_object_mut(), body.as_object()) {
            for (key, value) in extra {
                map.insert(key.clone(), value.clone());
            }
        }
        self.frames.fire(&response);
    }

    /// Push an unsolicited frame, the way the prover reports messages and
    /// task activity.
    pub fn emit(&self, frame: Value) {
        self.frames.fire(&frame);
    }

    pub fn emit_error(&self, message: &str) {
        self.errors.fire(&TransportError::new(message));
    }

    /// Every frame sent so far, in order.
    pub fn sent(&self) -> Vec<Value> {
        self.sent.lock().unwrap().clone()
    }

    /// The frames sent for one command, in order.
    pub fn requests(&self, command: &str) -> Vec<Value> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|frame| frame["command"] == command)
            .cloned()
            .collect()
    }
}

impl Connection for ScriptedConnection {
    fn send(&self, frame: &Value) -> Result<()> {
        self.sent.lock().unwrap().push(frame.clone());
        let Some(command) = frame["command"].as_str().map(str::to_owned) else {
            return Ok(());
        };
        let Some(seq_num) = frame["seq_num"].as_u64() else {
            return Ok(());
        };
        {
            let mut holding = self.holding.lock().unwrap();
            if let Some(held) = holding.get_mut(&command) {
                held.push_back(seq_num);
                return Ok(());
            }
        }
        let reply = {
            let mut queued = self.queued.lock().unwrap();
            match queued.get_mut(&command).and_then(VecDeque::pop_front) {
                Some(reply) => reply,
                None => self
                    .sticky
                    .lock()
                    .unwrap()
                    .get(&command)
                    .cloned()
                    .unwrap_or(Reply::Ok(json!({}))),
            }
        };
        let response = match reply {
            Reply::Ok(body) => {
                let mut response = json!({"response": "ok", "seq_num": seq_num});
                if let (Some(map), Some(extra)) = (response.as_object_mut(), body.as_object()) {
                    for (key, value) in extra {
                        map.insert(key.clone(), value.clone());
                    }
                }
                response
            }
            Reply::Err(message) => json!({
                "response": "error",
                "seq_num": seq_num,
                "message": message,
            }),
        };
        self.frames.fire(&response);
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
        self.alive.store(false, Ordering::Release);
    }
}

struct ScriptedTransport {
    conn: Arc<ScriptedConnection>,
}

impl Transport for ScriptedTransport {
    fn connect(&self) -> Result<Arc<dyn Connection>> {
        // Reconnects hand out the same scripted connection, revived.
        self.conn.alive.store(true, Ordering::Release);
        Ok(Arc::clone(&self.conn) as Arc<dyn Connection>)
    }
}

/// A transport backed by a [`ScriptedConnection`], plus the handle for
/// scripting and inspecting it.
pub fn scripted() -> (Box<dyn Transport>, Arc<ScriptedConnection>) {
    let conn = ScriptedConnection::new();
    let transport = ScriptedTransport {
        conn: Arc::clone(&conn),
    };
    (Box::new(transport), conn)
}

// ============================================================================
// Recording editor
// ============================================================================

/// One recorded [`Editor`] call.
#[derive(Debug, Clone, PartialEq)]
pub enum EditorCall {
    Reveal(Location),
    InsertText(Location, String),
    ApplyEdit(String, ContentChange),
    CopyToClipboard(String),
    HighlightPosition(Location),
    ClearHighlight,
    SetDiagnostics(Vec<FileDiagnostics>),
    ShowProgress(ServerStatus),
    ShowMessage(MessageKind, String),
}

/// An [`Editor`] that does nothing but remember what it was asked.
pub struct RecordingEditor {
    calls: Mutex<Vec<EditorCall>>,
}

impl RecordingEditor {
    pub fn new() -> Arc<RecordingEditor> {
        Arc::new(RecordingEditor {
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<EditorCall> {
        self.calls.lock().unwrap().clone()
    }

    /// The most recent diagnostics replacement, if any.
    pub fn last_diagnostics(&self) -> Option<Vec<FileDiagnostics>> {
        self.calls().into_iter().rev().find_map(|call| match call {
            EditorCall::SetDiagnostics(diags) => Some(diags),
            _ => None,
        })
    }

    fn record(&self, call: EditorCall) {
        self.calls.lock().unwrap().push(call);
    }
}

impl Editor for RecordingEditor {
    fn reveal(&self, loc: &Location) {
        self.record(EditorCall::Reveal(loc.clone()));
    }

    fn insert_text(&self, loc: &Location, text: &str) {
        self.record(EditorCall::InsertText(loc.clone(), text.to_owned()));
    }

    fn apply_edit(&self, file_name: &str, change: &ContentChange) {
        self.record(EditorCall::ApplyEdit(file_name.to_owned(), change.clone()));
    }

    fn copy_to_clipboard(&self, text: &str) {
        self.record(EditorCall::CopyToClipboard(text.to_owned()));
    }

    fn highlight_position(&self, loc: &Location) {
        self.record(EditorCall::HighlightPosition(loc.clone()));
    }

    fn clear_highlight(&self) {
        self.record(EditorCall::ClearHighlight);
    }

    fn set_diagnostics(&self, diagnostics: Vec<FileDiagnostics>) {
        self.record(EditorCall::SetDiagnostics(diagnostics));
    }

    fn show_progress(&self, status: &ServerStatus) {
        self.record(EditorCall::ShowProgress(status.clone()));
    }

    fn show_message(&self, kind: MessageKind, text: &str) {
        self.record(EditorCall::ShowMessage(kind, text.to_owned()));
    }
}

// ============================================================================
// Frame builders
// ============================================================================

/// A minimal error message at `file`:`line`.
pub fn message(file: &str, line: u32, text: &str) -> Message {
    Message {
        file_name: file.to_owned(),
        pos_line: line,
        pos_col: 0,
        end_pos_line: None,
        end_pos_col: None,
        severity: Severity::Error,
        caption: String::new(),
        text: text.to_owned(),
    }
}

/// An `all_messages` frame replacing the diagnostic list with `msgs`.
pub fn all_messages_frame(msgs: &[Message]) -> Value {
    json!({"response": "all_messages", "msgs": msgs})
}

/// A `current_tasks` frame with one task spanning `start_line..end_line`.
pub fn busy_frame(file: &str, start_line: u32, end_line: u32) -> Value {
    json!({
        "response": "current_tasks",
        "is_running": true,
        "tasks": [{
            "file_name": file,
            "pos_line": start_line,
            "pos_col": 0,
            "end_pos_line": end_line,
            "end_pos_col": 0,
            "desc": "elaborating",
        }],
    })
}

/// A `current_tasks` frame with an empty queue.
pub fn idle_frame() -> Value {
    json!({"response": "current_tasks", "is_running": false, "tasks": []})
}
