//! Prover background tasks

use serde::{Deserialize, Serialize};

use crate::Location;

/// One region the prover is still working through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub file_name: String,
    pub pos_line: u32,
    pub pos_col: u32,
    pub end_pos_line: u32,
    pub end_pos_col: u32,
    pub desc: String,
}

/// Snapshot of the prover's task queue, pushed whenever it changes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerStatus {
    pub is_running: bool,
    pub tasks: Vec<Task>,
}

/// Whether the prover is still working on the region around `loc`.
///
/// Bounds are strict: a task whose range starts or ends exactly on `loc`'s
/// line does not count as covering it.
pub fn is_loading_at(status: &ServerStatus, loc: &Location) -> bool {
    status
        .tasks
        .iter()
        .any(|t| t.file_name == loc.file_name && t.pos_line < loc.line && loc.line < t.end_pos_line)
}

/// Whether the prover has nothing queued.
pub fn is_done(status: &ServerStatus) -> bool {
    status.tasks.is_empty()
}
