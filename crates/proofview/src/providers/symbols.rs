//! Document outline from the prover's symbol list

use proofview_core::Location;
use proofview_proto::{ProverError, SymbolItem};

use crate::client::Server;

use super::definition::source_location;

/// One outline entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentSymbol {
    pub name: String,
    /// Prover-reported kind string, mapped by the host.
    pub kind: Option<String>,
    /// Enclosing namespace, dotted. Empty for top-level names.
    pub container: String,
    pub loc: Location,
}

/// The outline of `file_name`. Symbols the prover cannot place are dropped.
pub async fn document_symbols(
    server: &Server,
    file_name: &str,
) -> Result<Vec<DocumentSymbol>, ProverError> {
    let response = server.symbols(file_name).await?;
    Ok(response.results.into_iter().filter_map(symbol_for).collect())
}

fn symbol_for(item: SymbolItem) -> Option<DocumentSymbol> {
    let loc = source_location(item.source?)?;
    let container = match item.name_parts.len() {
        0 | 1 => String::new(),
        n => item.name_parts[..n - 1].join("."),
    };
    Some(DocumentSymbol {
        name: item.name,
        kind: item.kind,
        container,
        loc,
    })
}
