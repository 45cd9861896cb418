//! Source positions and how edits move them

use serde::{Deserialize, Serialize};

/// A position in a source file.
///
/// Lines are 1-based, columns are 0-based and counted in Unicode code
/// points. That matches the prover's wire convention; hosts working in
/// UTF-16 or byte offsets convert at the boundary.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    pub file_name: String,
    pub line: u32,
    pub column: u32,
}

impl Location {
    pub fn new(file_name: impl Into<String>, line: u32, column: u32) -> Self {
        Location {
            file_name: file_name.into(),
            line,
            column,
        }
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.file_name, self.line, self.column)
    }
}

/// A pinned position plus the key that identifies it across both sides of
/// the view boundary. Serializes flat: `{file_name, line, column, key}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinnedLocation {
    #[serde(flatten)]
    pub loc: Location,
    pub key: u64,
}

/// One replaced range in a document, as reported by the host editor.
///
/// The range start/end use the same coordinates as [`Location`]; the end is
/// exclusive. `text` is what the range was replaced with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentChange {
    pub start_line: u32,
    pub start_column: u32,
    pub end_line: u32,
    pub end_column: u32,
    pub text: String,
}

/// Where `loc` ends up after `change` is applied to its document.
///
/// A change entirely after the location leaves it alone. A change entirely
/// at-or-before it shifts it by the net line/column delta; insertion exactly
/// at the location counts as before it, so the location slides right. A
/// change whose range contains the location collapses it to the range
/// start.
pub fn shift_location(loc: &Location, change: &ContentChange) -> Location {
    let pin = (loc.line, loc.column);
    let start = (change.start_line, change.start_column);
    let end = (change.end_line, change.end_column);
    if start > pin {
        return loc.clone();
    }
    if end > pin {
        return Location::new(loc.file_name.clone(), change.start_line, change.start_column);
    }
    let inserted = change.text.matches('\n').count() as i64;
    let removed = (change.end_line - change.start_line) as i64;
    let line = (loc.line as i64 + inserted - removed).max(1) as u32;
    let column = if change.end_line == loc.line {
        let tail = loc.column - change.end_column;
        match change.text.rfind('\n') {
            None => change.start_column + change.text.chars().count() as u32 + tail,
            Some(idx) => change.text[idx + 1..].chars().count() as u32 + tail,
        }
    } else {
        loc.column
    };
    Location::new(loc.file_name.clone(), line, column)
}

/// Drag every pin in `file_name` through `changes`, in order. Returns
/// whether any pin actually moved.
pub fn shift_pins(pins: &mut [PinnedLocation], file_name: &str, changes: &[ContentChange]) -> bool {
    let mut moved = false;
    for pin in pins.iter_mut() {
        if pin.loc.file_name != file_name {
            continue;
        }
        for change in changes {
            let shifted = shift_location(&pin.loc, change);
            if shifted != pin.loc {
                pin.loc = shifted;
                moved = true;
            }
        }
    }
    moved
}
