//! Editor query providers built on the prover client
//!
//! Each provider turns one prover command into editor-shaped data: hover
//! blocks, completion items, definition sites, outline symbols, workspace
//! search matches, hole commands. The diagnostics and progress publishers
//! are the two push-driven ones; they subscribe to the client's event buses
//! and write to the [`Editor`](crate::editor::Editor) surface directly.

pub mod completion;
pub mod definition;
pub mod diagnostics;
pub mod holes;
pub mod hover;
pub mod progress;
pub mod search;
pub mod symbols;
