//! Protocol definitions for the prover wire and the infoview channel.
//!
//! Everything here mirrors the wire byte for byte. The prover speaks
//! newline-free JSON frames: requests are `{seq_num, command, ...}`,
//! answered by `{response: "ok" | "error", seq_num, ...}`, with unsolicited
//! `all_messages` and `current_tasks` event frames in between. The infoview
//! channel carries one closed command set per direction, discriminated by
//! the `command` field; receivers drop anything that does not parse, so new
//! commands can ship on one side before the other.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// Core types that appear inside frames, re-exported so protocol consumers
// need only this crate.
pub use proofview_core::{
    Config, ConfigPatch, Location, Message, PinnedLocation, ServerStatus, Severity, TacticFilter,
    Task,
};

// ============================================================================
// Prover requests
// ============================================================================

/// One outgoing prover request, exactly as written to the connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestFrame {
    pub seq_num: u64,
    #[serde(flatten)]
    pub request: ProverRequest,
}

/// The prover commands this layer issues.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum ProverRequest {
    /// Point query: everything known about the given position.
    Info {
        file_name: String,
        line: u32,
        column: u32,
    },
    /// Identifier completion at a position.
    Complete {
        file_name: String,
        line: u32,
        column: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        skip_completions: Option<bool>,
    },
    /// Declaration search across the workspace.
    Search { query: String },
    /// Declarations of one file, for the outline view.
    Symbols { file_name: String },
    /// Every hole in a file with its applicable commands.
    AllHoleCommands { file_name: String },
    /// Run one hole command.
    Hole {
        file_name: String,
        line: u32,
        column: u32,
        action: String,
    },
    /// Replace the prover's view of a file. Without `content` the prover
    /// re-reads the file from disk.
    Sync {
        file_name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content: Option<String>,
    },
}

// ============================================================================
// Prover responses and events
// ============================================================================

/// Any frame arriving from the prover, routed by its `response` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "response", rename_all = "snake_case")]
pub enum ResponseFrame {
    Ok(OkFrame),
    Error(ErrorFrame),
    AllMessages(AllMessagesFrame),
    CurrentTasks(ServerStatus),
}

/// Successful command response. Which fields `body` holds depends on the
/// command; callers re-deserialize into the matching payload type below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OkFrame {
    pub seq_num: u64,
    #[serde(flatten)]
    pub body: serde_json::Map<String, Value>,
}

/// Command failure, or a global protocol error when `seq_num` is absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorFrame {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seq_num: Option<u64>,
    pub message: String,
}

/// Full replacement of the diagnostic message list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllMessagesFrame {
    pub msgs: Vec<Message>,
}

/// Error delivered to the caller of a failed prover command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProverError {
    pub message: String,
}

impl ProverError {
    pub fn new(message: impl Into<String>) -> Self {
        ProverError {
            message: message.into(),
        }
    }

    /// The prover answers queries it dropped in favor of newer input with
    /// this exact message; such failures are retried, not surfaced.
    pub fn is_interrupted(&self) -> bool {
        self.message == "interrupted"
    }
}

impl std::fmt::Display for ProverError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ProverError {}

// ============================================================================
// Ok-response payloads
// ============================================================================

/// `info` response payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InfoResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record: Option<InfoRecord>,
}

/// What the prover knows about one position. Every field is optional; an
/// empty record is a valid "nothing here" answer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InfoRecord {
    #[serde(rename = "full-id", default, skip_serializing_if = "Option::is_none")]
    pub full_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub ty: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
    /// Definition site of the symbol under the query position.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<InfoSource>,
    /// Rendered goal state at the position.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tactic_params: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub widget: Option<WidgetData>,
}

/// A definition site. `file` is absent when it is the queried file itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfoSource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    pub line: u32,
    pub column: u32,
}

/// An interactive widget attached to a position. Older provers omit the
/// position fields; the display layer stamps the queried location on them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WidgetData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
}

/// `complete` response payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompletionResponse {
    /// The already-typed fragment the candidates complete.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    #[serde(default)]
    pub completions: Vec<CompletionCandidate>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompletionCandidate {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub ty: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tactic_params: Option<Vec<String>>,
}

/// `symbols` response payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SymbolResponse {
    #[serde(default)]
    pub results: Vec<SymbolItem>,
}

/// One declaration in a file. `name_parts` is the namespace-qualified name
/// split on dots, for building the outline tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SymbolItem {
    pub name: String,
    #[serde(default)]
    pub name_parts: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<InfoSource>,
}

/// `search` response payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub results: Vec<SearchItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchItem {
    pub text: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub ty: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<InfoSource>,
}

/// `all_hole_commands` response payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AllHoleCommandsResponse {
    #[serde(default)]
    pub holes: Vec<HoleCommands>,
}

/// One hole and the commands applicable to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HoleCommands {
    pub file: String,
    pub start: HolePos,
    pub end: HolePos,
    pub results: Vec<HoleCommandAction>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HoleCommandAction {
    pub name: String,
    pub description: String,
}

/// `{line, column}` pair used by hole ranges, same coordinate convention as
/// [`Location`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HolePos {
    pub line: u32,
    pub column: u32,
}

/// `hole` response payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HoleResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replacements: Option<HoleReplacements>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HoleReplacements {
    pub start: HolePos,
    pub end: HolePos,
    pub alternatives: Vec<HoleAlternative>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HoleAlternative {
    pub code: String,
    pub description: String,
}

// ============================================================================
// Infoview channel
// ============================================================================

/// Commands the editor side sends into the infoview.
///
/// `server_event` / `server_error` carry a prover frame re-serialized as a
/// JSON string: the double encoding keeps the posted value shallow, since
/// deeply nested structures do not survive the sandbox boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum ToInfoview {
    ServerEvent { payload: String },
    ServerError { payload: String },
    /// The editor cursor moved.
    Position { loc: Location },
    /// Partial config update; the receiver overlays it on its mirror.
    OnConfigChange { config: ConfigPatch },
    /// Full replacement of the diagnostic message list.
    AllMessages { messages: Vec<Message> },
    ToggleAllMessages,
    /// Full replacement of the pin list.
    SyncPin { pins: Vec<PinnedLocation> },
    Pause,
    Continue,
    ToggleUpdating,
    CopyToComment,
    TogglePin,
    /// The prover connection was replaced.
    Restart,
}

/// Commands the infoview sends back to the editor side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum FromInfoview {
    /// Ask for the config/pin/position seed; sent once on startup.
    RequestConfig,
    /// Insert text at the start of `loc`'s line, or at the cursor when
    /// `loc` is absent.
    InsertText {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        loc: Option<Location>,
        text: String,
    },
    Reveal { loc: Location },
    HoverPosition { loc: Location },
    StopHover,
    CopyText { text: String },
    /// Full replacement of the pin list.
    SyncPin { pins: Vec<PinnedLocation> },
    /// A prover frame originated by the infoview's own client, re-serialized
    /// as a JSON string.
    ServerRequest { payload: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_frame_flattens_command() {
        let frame = RequestFrame {
            seq_num: 3,
            request: ProverRequest::Info {
                file_name: "a.lean".to_owned(),
                line: 3,
                column: 5,
            },
        };
        assert_eq!(
            serde_json::to_value(&frame).unwrap(),
            json!({
                "seq_num": 3,
                "command": "info",
                "file_name": "a.lean",
                "line": 3,
                "column": 5,
            })
        );
    }

    #[test]
    fn test_request_command_strings() {
        let cases = [
            (
                ProverRequest::Complete {
                    file_name: "a.lean".to_owned(),
                    line: 1,
                    column: 0,
                    skip_completions: None,
                },
                "complete",
            ),
            (
                ProverRequest::Search {
                    query: "nat".to_owned(),
                },
                "search",
            ),
            (
                ProverRequest::Symbols {
                    file_name: "a.lean".to_owned(),
                },
                "symbols",
            ),
            (
                ProverRequest::AllHoleCommands {
                    file_name: "a.lean".to_owned(),
                },
                "all_hole_commands",
            ),
            (
                ProverRequest::Hole {
                    file_name: "a.lean".to_owned(),
                    line: 1,
                    column: 0,
                    action: "Use".to_owned(),
                },
                "hole",
            ),
            (
                ProverRequest::Sync {
                    file_name: "a.lean".to_owned(),
                    content: Some("def x := 1".to_owned()),
                },
                "sync",
            ),
        ];
        for (request, command) in cases {
            let value = serde_json::to_value(&request).unwrap();
            assert_eq!(value["command"], command);
        }
    }

    #[test]
    fn test_response_routing() {
        let ok: ResponseFrame =
            serde_json::from_value(json!({"response": "ok", "seq_num": 1, "record": {"state": "⊢ true"}}))
                .unwrap();
        match ok {
            ResponseFrame::Ok(frame) => {
                assert_eq!(frame.seq_num, 1);
                let info: InfoResponse =
                    serde_json::from_value(Value::Object(frame.body)).unwrap();
                assert_eq!(info.record.unwrap().state.as_deref(), Some("⊢ true"));
            }
            other => panic!("routed wrong: {other:?}"),
        }

        let err: ResponseFrame =
            serde_json::from_value(json!({"response": "error", "message": "parse error"})).unwrap();
        match err {
            ResponseFrame::Error(frame) => {
                assert_eq!(frame.seq_num, None);
                assert_eq!(frame.message, "parse error");
            }
            other => panic!("routed wrong: {other:?}"),
        }

        let tasks: ResponseFrame = serde_json::from_value(json!({
            "response": "current_tasks",
            "is_running": true,
            "tasks": [],
        }))
        .unwrap();
        match tasks {
            ResponseFrame::CurrentTasks(status) => assert!(status.is_running),
            other => panic!("routed wrong: {other:?}"),
        }

        let msgs: ResponseFrame = serde_json::from_value(json!({
            "response": "all_messages",
            "msgs": [{
                "file_name": "a.lean",
                "pos_line": 1,
                "pos_col": 0,
                "severity": "error",
                "text": "boom",
            }],
        }))
        .unwrap();
        match msgs {
            ResponseFrame::AllMessages(frame) => assert_eq!(frame.msgs.len(), 1),
            other => panic!("routed wrong: {other:?}"),
        }
    }

    #[test]
    fn test_info_record_wire_renames() {
        let record: InfoRecord = serde_json::from_value(json!({
            "full-id": "nat.add",
            "type": "ℕ → ℕ → ℕ",
            "source": {"line": 12, "column": 0},
        }))
        .unwrap();
        assert_eq!(record.full_id.as_deref(), Some("nat.add"));
        assert_eq!(record.ty.as_deref(), Some("ℕ → ℕ → ℕ"));
        assert_eq!(record.source.as_ref().unwrap().file, None);
        let value = serde_json::to_value(&record).unwrap();
        assert!(value.get("full-id").is_some());
        assert!(value.get("full_id").is_none());
    }

    #[test]
    fn test_to_infoview_command_strings() {
        let loc = Location::new("a.lean", 3, 5);
        let cases: Vec<(ToInfoview, &str)> = vec![
            (ToInfoview::Position { loc: loc.clone() }, "position"),
            (
                ToInfoview::OnConfigChange {
                    config: ConfigPatch::default(),
                },
                "on_config_change",
            ),
            (ToInfoview::AllMessages { messages: vec![] }, "all_messages"),
            (ToInfoview::ToggleAllMessages, "toggle_all_messages"),
            (ToInfoview::SyncPin { pins: vec![] }, "sync_pin"),
            (ToInfoview::Pause, "pause"),
            (ToInfoview::Continue, "continue"),
            (ToInfoview::ToggleUpdating, "toggle_updating"),
            (ToInfoview::CopyToComment, "copy_to_comment"),
            (ToInfoview::TogglePin, "toggle_pin"),
            (ToInfoview::Restart, "restart"),
            (
                ToInfoview::ServerEvent {
                    payload: "{}".to_owned(),
                },
                "server_event",
            ),
            (
                ToInfoview::ServerError {
                    payload: "{}".to_owned(),
                },
                "server_error",
            ),
        ];
        for (message, command) in cases {
            let value = serde_json::to_value(&message).unwrap();
            assert_eq!(value["command"], command, "for {message:?}");
            let back: ToInfoview = serde_json::from_value(value).unwrap();
            assert_eq!(back, message);
        }
    }

    #[test]
    fn test_from_infoview_command_strings() {
        let loc = Location::new("a.lean", 3, 5);
        let cases: Vec<(FromInfoview, &str)> = vec![
            (FromInfoview::RequestConfig, "request_config"),
            (
                FromInfoview::InsertText {
                    loc: None,
                    text: "sorry".to_owned(),
                },
                "insert_text",
            ),
            (FromInfoview::Reveal { loc: loc.clone() }, "reveal"),
            (
                FromInfoview::HoverPosition { loc: loc.clone() },
                "hover_position",
            ),
            (FromInfoview::StopHover, "stop_hover"),
            (
                FromInfoview::CopyText {
                    text: "⊢ true".to_owned(),
                },
                "copy_text",
            ),
            (FromInfoview::SyncPin { pins: vec![] }, "sync_pin"),
            (
                FromInfoview::ServerRequest {
                    payload: "{}".to_owned(),
                },
                "server_request",
            ),
        ];
        for (message, command) in cases {
            let value = serde_json::to_value(&message).unwrap();
            assert_eq!(value["command"], command, "for {message:?}");
            let back: FromInfoview = serde_json::from_value(value).unwrap();
            assert_eq!(back, message);
        }
    }

    #[test]
    fn test_insert_text_without_loc_omits_field() {
        let message = FromInfoview::InsertText {
            loc: None,
            text: "exact rfl".to_owned(),
        };
        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value, json!({"command": "insert_text", "text": "exact rfl"}));
    }

    #[test]
    fn test_unknown_command_does_not_parse() {
        let value = json!({"command": "warp_drive", "factor": 9});
        assert!(serde_json::from_value::<ToInfoview>(value.clone()).is_err());
        assert!(serde_json::from_value::<FromInfoview>(value).is_err());
    }

    #[test]
    fn test_server_request_payload_round_trips_bit_for_bit() {
        let frame = RequestFrame {
            seq_num: 42,
            request: ProverRequest::Info {
                file_name: "a.lean".to_owned(),
                line: 3,
                column: 5,
            },
        };
        let payload = serde_json::to_string(&frame).unwrap();
        let wrapped = FromInfoview::ServerRequest {
            payload: payload.clone(),
        };
        let posted = serde_json::to_string(&wrapped).unwrap();
        let received: FromInfoview = serde_json::from_str(&posted).unwrap();
        match received {
            FromInfoview::ServerRequest { payload: unwrapped } => {
                assert_eq!(unwrapped, payload);
                let back: RequestFrame = serde_json::from_str(&unwrapped).unwrap();
                assert_eq!(back, frame);
            }
            other => panic!("routed wrong: {other:?}"),
        }
    }

    #[test]
    fn test_interrupted_recognizer() {
        assert!(ProverError::new("interrupted").is_interrupted());
        assert!(!ProverError::new("file invalidated").is_interrupted());
    }

    #[test]
    fn test_hole_payloads() {
        let holes: AllHoleCommandsResponse = serde_json::from_value(json!({
            "holes": [{
                "file": "a.lean",
                "start": {"line": 4, "column": 2},
                "end": {"line": 4, "column": 5},
                "results": [{"name": "Use", "description": "Use the only constructor"}],
            }],
        }))
        .unwrap();
        assert_eq!(holes.holes[0].results[0].name, "Use");

        let res: HoleResponse = serde_json::from_value(json!({
            "replacements": {
                "start": {"line": 4, "column": 2},
                "end": {"line": 4, "column": 5},
                "alternatives": [{"code": "⟨rfl⟩", "description": "anonymous constructor"}],
            },
        }))
        .unwrap();
        assert_eq!(res.replacements.unwrap().alternatives.len(), 1);
        assert_eq!(res.message, None);
    }
}
