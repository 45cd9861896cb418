//! What the integration needs from the host editor

use proofview_core::{ContentChange, Location, ServerStatus, Severity};

/// One reported problem. Coordinates follow [`Location`]: lines are 1-based,
/// columns are 0-based code point offsets. A missing end position means the
/// prover reported a point; the host may widen it to a word range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub pos_line: u32,
    pub pos_col: u32,
    pub end_pos_line: Option<u32>,
    pub end_pos_col: Option<u32>,
    pub severity: Severity,
    pub text: String,
}

/// All diagnostics for one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDiagnostics {
    pub file_name: String,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Info,
    Error,
}

/// Host editor surface driven by the session and the providers.
///
/// Every method is fire-and-forget from the caller's point of view;
/// implementations must not block.
pub trait Editor: Send + Sync {
    /// Scroll the given location into view and focus it.
    fn reveal(&self, loc: &Location);

    /// Insert text at the start of the location's line.
    fn insert_text(&self, loc: &Location, text: &str);

    /// Apply one replacement to a file.
    fn apply_edit(&self, file_name: &str, change: &ContentChange);

    fn copy_to_clipboard(&self, text: &str);

    /// Start highlighting the range the infoview is hovering over.
    fn highlight_position(&self, loc: &Location);

    fn clear_highlight(&self);

    /// Replace the full set of published diagnostics.
    fn set_diagnostics(&self, diagnostics: Vec<FileDiagnostics>);

    /// Update the prover activity indicator.
    fn show_progress(&self, status: &ServerStatus);

    fn show_message(&self, kind: MessageKind, text: &str);
}
