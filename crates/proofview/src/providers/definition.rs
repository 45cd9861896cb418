//! Go-to-definition via the info query

use proofview_core::{Dispatcher, Location};
use proofview_proto::{InfoSource, ProverError};

use crate::client::Server;

/// Where the symbol at `loc` is defined. `None` when the prover has no
/// source for it (or the definition is in a file it cannot name).
pub async fn definition(
    server: &Server,
    dispatcher: &Dispatcher,
    loc: &Location,
) -> Result<Option<Location>, ProverError> {
    let response = dispatcher
        .run(server.info(&loc.file_name, loc.line, loc.column))
        .await?;
    Ok(response
        .record
        .and_then(|record| record.source)
        .and_then(source_location))
}

pub(crate) fn source_location(source: InfoSource) -> Option<Location> {
    let file = source.file?;
    Some(Location::new(file, source.line, source.column))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_with_file_becomes_location() {
        let loc = source_location(InfoSource {
            file: Some("lib/nat.lean".to_owned()),
            line: 12,
            column: 4,
        });
        assert_eq!(loc, Some(Location::new("lib/nat.lean", 12, 4)));
    }

    #[test]
    fn test_source_without_file_is_dropped() {
        let loc = source_location(InfoSource {
            file: None,
            line: 12,
            column: 4,
        });
        assert_eq!(loc, None);
    }
}
