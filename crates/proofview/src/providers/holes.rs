//! Hole commands: prover-suggested edits for `{! !}` placeholders

use std::sync::Arc;

use proofview_core::{ContentChange, Location};
use proofview_proto::{HoleCommands, HolePos, HoleReplacements, ProverError};

use crate::client::Server;
use crate::editor::{Editor, MessageKind};

/// Every hole in `file_name`, each with the commands the prover offers for it.
pub async fn hole_commands(
    server: &Server,
    file_name: &str,
) -> Result<Vec<HoleCommands>, ProverError> {
    let response = server.all_hole_commands(file_name).await?;
    Ok(response.holes)
}

/// The holes from `all` whose range contains `loc`. Ranges are inclusive on
/// both ends.
pub fn commands_at<'a>(all: &'a [HoleCommands], loc: &Location) -> Vec<&'a HoleCommands> {
    all.iter()
        .filter(|hole| hole.file == loc.file_name && contains(&hole.start, &hole.end, loc))
        .collect()
}

fn contains(start: &HolePos, end: &HolePos, loc: &Location) -> bool {
    (start.line, start.column) <= (loc.line, loc.column)
        && (loc.line, loc.column) <= (end.line, end.column)
}

/// Runs hole command `action` on the hole at `line`/`column`.
///
/// A single replacement alternative is applied to the document right away.
/// Several alternatives are returned instead, for the host to put in front of
/// the user; applying the chosen one goes through [`apply_alternative`].
pub async fn execute_hole(
    server: &Server,
    editor: &Arc<dyn Editor>,
    file_name: &str,
    line: u32,
    column: u32,
    action: &str,
) -> Result<Option<HoleReplacements>, ProverError> {
    let response = server.hole(file_name, line, column, action).await?;
    if let Some(message) = &response.message {
        editor.show_message(MessageKind::Info, message);
    }
    let Some(replacements) = response.replacements else {
        return Ok(None);
    };
    match replacements.alternatives.as_slice() {
        [] => Ok(None),
        [only] => {
            apply_alternative(
                editor,
                file_name,
                &replacements.start,
                &replacements.end,
                &only.code,
            );
            Ok(None)
        }
        _ => Ok(Some(replacements)),
    }
}

/// Replaces the hole's range with `code`.
pub fn apply_alternative(
    editor: &Arc<dyn Editor>,
    file_name: &str,
    start: &HolePos,
    end: &HolePos,
    code: &str,
) {
    let change = ContentChange {
        start_line: start.line,
        start_column: start.column,
        end_line: end.line,
        end_column: end.column,
        text: code.to_owned(),
    };
    editor.apply_edit(file_name, &change);
}
