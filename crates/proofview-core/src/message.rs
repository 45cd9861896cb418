//! Prover messages and the slices of them the view shows

use serde::{Deserialize, Serialize};

use crate::{Config, Location};

/// Cap on how many messages survive [`truncate_messages`].
pub const MAX_MESSAGES: usize = 1 << 13;
/// Cap on one message's text, in code points.
pub const MAX_MESSAGE_SIZE: usize = 1 << 18;

/// Message severity. Anything the prover sends that we don't recognize
/// parses as [`Severity::Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Information,
    Warning,
    #[serde(other)]
    Error,
}

/// One message from the prover, anchored to a source position.
///
/// End positions are optional; older prover versions omit them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub file_name: String,
    pub pos_line: u32,
    pub pos_col: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_pos_line: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_pos_col: Option<u32>,
    pub severity: Severity,
    #[serde(default)]
    pub caption: String,
    pub text: String,
}

impl Message {
    /// Whether two messages render the same. End positions don't affect
    /// display, so they are ignored here.
    pub fn same_display(&self, other: &Message) -> bool {
        self.file_name == other.file_name
            && self.pos_line == other.pos_line
            && self.pos_col == other.pos_col
            && self.severity == other.severity
            && self.caption == other.caption
            && self.text == other.text
    }
}

/// Whether two message lists render the same, position by position.
pub fn messages_equal(a: &[Message], b: &[Message]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.same_display(y))
}

/// Order messages for the all-messages panel.
pub fn sort_messages(msgs: &mut [Message]) {
    msgs.sort_by(|a, b| {
        (&a.file_name, a.pos_line, a.pos_col).cmp(&(&b.file_name, b.pos_line, b.pos_col))
    });
}

/// The messages a pane at `loc` should show.
///
/// Always restricted to `loc`'s file and line, sorted by column. With
/// `info_view_all_errors_on_line` off, the list further narrows to the
/// first position at or left of the cursor that has messages attached,
/// and everything on the line from there on.
pub fn messages_for(all: &[Message], loc: &Location, config: &Config) -> Vec<Message> {
    let mut msgs: Vec<Message> = all
        .iter()
        .filter(|m| m.file_name == loc.file_name && m.pos_line == loc.line)
        .cloned()
        .collect();
    msgs.sort_by_key(|m| m.pos_col);
    if !config.info_view_all_errors_on_line {
        let mut start_column = None;
        let mut start_pos = None;
        for (i, m) in msgs.iter().enumerate() {
            if loc.column < m.pos_col {
                break;
            }
            if loc.column == m.pos_col {
                start_pos = Some(i);
                break;
            }
            if start_column.is_none_or(|c| c < m.pos_col) {
                start_column = Some(m.pos_col);
                start_pos = Some(i);
            }
        }
        if let Some(start) = start_pos {
            msgs.drain(..start);
        }
    }
    msgs
}

/// Bound the message list for publishing as diagnostics.
///
/// The first `MAX_MESSAGES - 1` entries pass through untouched; if there
/// were more, the next one is replaced by an error noting the cut, so the
/// result never exceeds `MAX_MESSAGES` entries. Any surviving text longer
/// than `MAX_MESSAGE_SIZE` code points is cut there with a note appended.
pub fn truncate_messages(msgs: &[Message]) -> Vec<Message> {
    let mut msgs: Vec<Message> = if msgs.len() >= MAX_MESSAGES {
        let mut kept = msgs[..MAX_MESSAGES].to_vec();
        if let Some(last) = kept.last_mut() {
            last.severity = Severity::Error;
            last.caption = String::new();
            last.text = format!("Too many errors, only showing the first {MAX_MESSAGES}.");
        }
        kept
    } else {
        msgs.to_vec()
    };
    for msg in &mut msgs {
        // Byte length bounds code-point length, so short texts skip the scan.
        if msg.text.len() <= MAX_MESSAGE_SIZE {
            continue;
        }
        if let Some((cut, _)) = msg.text.char_indices().nth(MAX_MESSAGE_SIZE) {
            msg.text.truncate(cut);
            msg.text.push_str(&format!(
                "\n(message too long, truncated at {MAX_MESSAGE_SIZE} characters)"
            ));
        }
    }
    msgs
}
