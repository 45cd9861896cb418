//! Workspace-wide declaration search

use proofview_core::Location;
use proofview_proto::{ProverError, SearchItem};

use crate::client::Server;

use super::definition::source_location;

/// One declaration matching a search query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchMatch {
    pub name: String,
    pub ty: Option<String>,
    pub loc: Location,
}

/// Declarations whose name matches `query`, across every file the prover has
/// seen. Matches without a usable source location are dropped.
pub async fn search(server: &Server, query: &str) -> Result<Vec<SearchMatch>, ProverError> {
    let response = server.search(query).await?;
    Ok(response.results.into_iter().filter_map(match_for).collect())
}

fn match_for(item: SearchItem) -> Option<SearchMatch> {
    let loc = source_location(item.source?)?;
    Some(SearchMatch {
        name: item.text,
        ty: item.ty,
        loc,
    })
}
