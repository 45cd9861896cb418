//! Prover activity relayed to the editor's progress indicator

use std::sync::Arc;

use proofview_core::{ServerStatus, Subscription};

use crate::client::Server;
use crate::editor::Editor;

/// Forwards every `current_tasks` update to [`Editor::show_progress`].
/// Dropping the reporter stops the updates.
pub struct ProgressReporter {
    _subs: Vec<Subscription>,
}

impl ProgressReporter {
    pub fn new(server: &Server, editor: &Arc<dyn Editor>) -> Self {
        let mut subs = Vec::new();

        let sink = Arc::clone(editor);
        subs.push(
            server
                .status_changed
                .on(move |status: &ServerStatus| sink.show_progress(status)),
        );

        // A replaced connection starts idle until it says otherwise.
        let sink = Arc::clone(editor);
        subs.push(
            server
                .restarted
                .on(move |()| sink.show_progress(&ServerStatus::default())),
        );

        ProgressReporter { _subs: subs }
    }
}
