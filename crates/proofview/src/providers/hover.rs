//! Hover content for a position

use proofview_core::{Dispatcher, Location};
use proofview_proto::{InfoRecord, ProverError};

use crate::client::Server;

/// One block of hover content, top to bottom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HoverBlock {
    /// Prover syntax, rendered with highlighting.
    Code(String),
    /// Plain text.
    Plain(String),
    /// A doc string, rendered as markdown.
    Markdown(String),
}

/// What to show when hovering `loc`; `None` means no hover. The point query
/// goes through `dispatcher` so it never overlaps another one.
pub async fn hover(
    server: &Server,
    dispatcher: &Dispatcher,
    loc: &Location,
) -> Result<Option<Vec<HoverBlock>>, ProverError> {
    let response = dispatcher
        .run(server.info(&loc.file_name, loc.line, loc.column))
        .await?;
    let blocks = match response.record {
        Some(record) => blocks_for(&record),
        None => Vec::new(),
    };
    Ok((!blocks.is_empty()).then_some(blocks))
}

fn blocks_for(record: &InfoRecord) -> Vec<HoverBlock> {
    let mut blocks = Vec::new();
    if let Some(name) = record.full_id.as_deref().or(record.text.as_deref()) {
        match &record.tactic_params {
            // Tactics carry a usage string instead of a type.
            Some(params) => blocks.push(HoverBlock::Plain(format!("{name} {}", params.join(" ")))),
            None => match record.ty.as_deref() {
                Some(ty) => blocks.push(HoverBlock::Code(format!("{name} : {ty}"))),
                None => blocks.push(HoverBlock::Code(name.to_owned())),
            },
        }
    }
    if let Some(doc) = &record.doc {
        blocks.push(HoverBlock::Markdown(doc.clone()));
    }
    // The goal state shows only when nothing else does.
    if blocks.is_empty() {
        if let Some(state) = &record.state {
            blocks.push(HoverBlock::Code(state.clone()));
        }
    }
    blocks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_term_shows_name_and_type() {
        let record = InfoRecord {
            full_id: Some("nat.add".to_owned()),
            ty: Some("ℕ → ℕ → ℕ".to_owned()),
            doc: Some("Addition of naturals.".to_owned()),
            ..InfoRecord::default()
        };
        assert_eq!(
            blocks_for(&record),
            vec![
                HoverBlock::Code("nat.add : ℕ → ℕ → ℕ".to_owned()),
                HoverBlock::Markdown("Addition of naturals.".to_owned()),
            ]
        );
    }

    #[test]
    fn test_tactic_shows_usage_not_type() {
        let record = InfoRecord {
            text: Some("cases".to_owned()),
            tactic_params: Some(vec!["e".to_owned(), "with...".to_owned()]),
            ty: Some("should not appear".to_owned()),
            ..InfoRecord::default()
        };
        assert_eq!(
            blocks_for(&record),
            vec![HoverBlock::Plain("cases e with...".to_owned())]
        );
    }

    #[test]
    fn test_full_id_preferred_over_text() {
        let record = InfoRecord {
            full_id: Some("list.map".to_owned()),
            text: Some("map".to_owned()),
            ty: Some("t".to_owned()),
            ..InfoRecord::default()
        };
        assert_eq!(
            blocks_for(&record),
            vec![HoverBlock::Code("list.map : t".to_owned())]
        );
    }

    #[test]
    fn test_goal_state_only_when_nothing_else() {
        let record = InfoRecord {
            state: Some("⊢ true".to_owned()),
            ..InfoRecord::default()
        };
        assert_eq!(
            blocks_for(&record),
            vec![HoverBlock::Code("⊢ true".to_owned())]
        );

        let with_name = InfoRecord {
            full_id: Some("x".to_owned()),
            ty: Some("ℕ".to_owned()),
            state: Some("⊢ true".to_owned()),
            ..InfoRecord::default()
        };
        assert_eq!(
            blocks_for(&with_name),
            vec![HoverBlock::Code("x : ℕ".to_owned())]
        );
    }

    #[test]
    fn test_empty_record_yields_nothing() {
        assert!(blocks_for(&InfoRecord::default()).is_empty());
    }
}
