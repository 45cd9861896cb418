//! Prover messages republished as editor diagnostics

use std::sync::Arc;

use proofview_core::{Message, Subscription, truncate_messages};

use crate::client::Server;
use crate::editor::{Diagnostic, Editor, FileDiagnostics};

/// Mirrors the prover's message list into the editor, wholesale on every
/// `all_messages` frame. Dropping the publisher stops the mirroring.
pub struct DiagnosticsPublisher {
    _subs: Vec<Subscription>,
}

impl DiagnosticsPublisher {
    pub fn new(server: &Server, editor: &Arc<dyn Editor>) -> Self {
        let mut subs = Vec::new();

        let sink = Arc::clone(editor);
        subs.push(server.all_messages.on(move |messages: &Vec<Message>| {
            let capped = truncate_messages(messages);
            sink.set_diagnostics(group_diagnostics(&capped));
        }));

        // A fresh prover has no messages yet; clear the stale set.
        let sink = Arc::clone(editor);
        subs.push(
            server
                .restarted
                .on(move |()| sink.set_diagnostics(Vec::new())),
        );

        DiagnosticsPublisher { _subs: subs }
    }
}

/// Groups messages by file, keeping files in order of first appearance.
fn group_diagnostics(messages: &[Message]) -> Vec<FileDiagnostics> {
    let mut files: Vec<FileDiagnostics> = Vec::new();
    for message in messages {
        let diagnostic = Diagnostic {
            pos_line: message.pos_line,
            pos_col: message.pos_col,
            end_pos_line: message.end_pos_line,
            end_pos_col: message.end_pos_col,
            severity: message.severity,
            text: message.text.clone(),
        };
        match files.iter_mut().find(|f| f.file_name == message.file_name) {
            Some(file) => file.diagnostics.push(diagnostic),
            None => files.push(FileDiagnostics {
                file_name: message.file_name.clone(),
                diagnostics: vec![diagnostic],
            }),
        }
    }
    files
}
