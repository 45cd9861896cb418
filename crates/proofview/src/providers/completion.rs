//! Identifier completion at a position

use proofview_core::{Dispatcher, Location};
use proofview_proto::{CompletionCandidate, ProverError};

use crate::client::Server;

/// One completion item, editor-shaped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionItem {
    pub text: String,
    /// Prover-reported kind string, mapped to editor item kinds by the host.
    pub kind: Option<String>,
    /// Type, or the usage string for tactics.
    pub detail: Option<String>,
    pub documentation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completions {
    /// Length, in code points, of the already-typed fragment the items
    /// replace, counted back from the query column.
    pub prefix_len: u32,
    pub items: Vec<CompletionItem>,
}

pub async fn complete(
    server: &Server,
    dispatcher: &Dispatcher,
    loc: &Location,
) -> Result<Completions, ProverError> {
    let response = dispatcher
        .run(server.complete(&loc.file_name, loc.line, loc.column))
        .await?;
    let prefix_len = response
        .prefix
        .as_ref()
        .map(|p| p.chars().count() as u32)
        .unwrap_or(0);
    Ok(Completions {
        prefix_len,
        items: response.completions.into_iter().map(item_for).collect(),
    })
}

fn item_for(candidate: CompletionCandidate) -> CompletionItem {
    let detail = match candidate.tactic_params {
        Some(params) => Some(params.join(" ")),
        None => candidate.ty,
    };
    CompletionItem {
        text: candidate.text,
        kind: candidate.kind,
        detail,
        documentation: candidate.doc,
    }
}
