use crate::{
    domain::{lifecycle, ordering, BoardId, CardId, CardIdGenerator, Snapshot},
    error::Result,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A user action, mapped one-to-one onto an ordering or lifecycle operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Intent {
    AddBoard {
        title: String,
    },
    RenameBoard {
        board: BoardId,
        title: String,
    },
    MoveBoard {
        board: BoardId,
        from_index: usize,
        to_index: usize,
    },
    RemoveBoard {
        board: BoardId,
    },
    AddCard {
        board: BoardId,
        text: String,
    },
    EditCard {
        board: BoardId,
        card: CardId,
        text: String,
    },
    MoveCard {
        card: CardId,
        from_board: BoardId,
        to_board: BoardId,
        from_index: usize,
        to_index: usize,
    },
    DeleteCard {
        board: BoardId,
        card: CardId,
    },
    ArchiveCard {
        record: CardId,
    },
    RestoreCard {
        record: CardId,
        board: BoardId,
        index: usize,
    },
    PurgeCard {
        record: CardId,
    },
}

impl Intent {
    /// Short name for logs
    pub fn name(&self) -> &'static str {
        match self {
            Self::AddBoard { .. } => "add_board",
            Self::RenameBoard { .. } => "rename_board",
            Self::MoveBoard { .. } => "move_board",
            Self::RemoveBoard { .. } => "remove_board",
            Self::AddCard { .. } => "add_card",
            Self::EditCard { .. } => "edit_card",
            Self::MoveCard { .. } => "move_card",
            Self::DeleteCard { .. } => "delete_card",
            Self::ArchiveCard { .. } => "archive_card",
            Self::RestoreCard { .. } => "restore_card",
            Self::PurgeCard { .. } => "purge_card",
        }
    }

    /// Computes the snapshot that results from this intent
    pub fn apply(
        &self,
        snapshot: &Snapshot,
        ids: &CardIdGenerator,
        now: DateTime<Utc>,
    ) -> Result<Snapshot> {
        let boards = snapshot.boards.as_slice();
        Ok(match self {
            Self::AddBoard { title } => snapshot.with_boards(ordering::add_board(boards, title)?),
            Self::RenameBoard { board, title } => {
                snapshot.with_boards(ordering::rename_board(boards, *board, title)?)
            }
            Self::MoveBoard {
                board,
                from_index,
                to_index,
            } => snapshot.with_boards(ordering::move_board(boards, *board, *from_index, *to_index)?),
            Self::RemoveBoard { board } => {
                snapshot.with_boards(ordering::remove_board(boards, *board)?)
            }
            Self::AddCard { board, text } => snapshot.with_boards(ordering::add_card(
                boards,
                *board,
                text,
                || allocate(snapshot, ids),
            )?),
            Self::EditCard { board, card, text } => {
                snapshot.with_boards(ordering::edit_card(boards, *board, *card, text)?)
            }
            Self::MoveCard {
                card,
                from_board,
                to_board,
                from_index,
                to_index,
            } => snapshot.with_boards(ordering::move_card(
                boards,
                *card,
                *from_board,
                *to_board,
                *from_index,
                *to_index,
            )?),
            Self::DeleteCard { board, card } => lifecycle::delete_card(snapshot, *board, *card, now)?,
            Self::ArchiveCard { record } => lifecycle::archive(snapshot, *record, now)?,
            Self::RestoreCard {
                record,
                board,
                index,
            } => lifecycle::restore(snapshot, *record, *board, *index, || allocate(snapshot, ids))?,
            Self::PurgeCard { record } => lifecycle::purge(snapshot, *record)?,
        })
    }
}

/// Next clock-based id, or the lowest free one once those run out
fn allocate(snapshot: &Snapshot, ids: &CardIdGenerator) -> Result<CardId> {
    match ids.next_after(snapshot.max_card_id()) {
        Ok(id) => Ok(id),
        Err(e) => {
            let id = snapshot.lowest_free_card_id();
            tracing::warn!(error = %e, %id, "card ids exhausted, reusing a free id");
            Ok(id)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{default_boards, Card};

    #[test]
    fn test_add_card_generates_unique_ids() {
        let ids = CardIdGenerator::new();
        let mut snapshot = Snapshot::new(default_boards(&["To Do"]));
        for text in ["a", "b", "c"] {
            snapshot = Intent::AddCard {
                board: BoardId::new(0),
                text: text.to_string(),
            }
            .apply(&snapshot, &ids, Utc::now())
            .unwrap();
        }

        let cards = &snapshot.boards[0].to_dos;
        assert_eq!(cards.len(), 3);
        assert!(cards[0].id < cards[1].id && cards[1].id < cards[2].id);
    }

    #[test]
    fn test_add_card_skips_id_allocation_for_blank_text() {
        let ids = CardIdGenerator::new();
        let snapshot = Snapshot::new(default_boards(&["To Do"]));
        let next = Intent::AddCard {
            board: BoardId::new(0),
            text: "  ".to_string(),
        }
        .apply(&snapshot, &ids, Utc::now())
        .unwrap();

        assert_eq!(next, snapshot);
    }

    #[test]
    fn test_blank_card_on_missing_board_is_not_found() {
        let ids = CardIdGenerator::new();
        let snapshot = Snapshot::new(default_boards(&["To Do"]));
        let err = Intent::AddCard {
            board: BoardId::new(9),
            text: " ".to_string(),
        }
        .apply(&snapshot, &ids, Utc::now())
        .unwrap_err();

        assert!(err.is_not_found());
    }

    #[test]
    fn test_add_card_after_largest_possible_id_stays_unique() {
        let ids = CardIdGenerator::new();
        let mut boards = default_boards(&["To Do"]);
        boards[0].to_dos.push(Card::new(CardId::new(i64::MAX), "edge"));
        let mut snapshot = Snapshot::new(boards);

        for text in ["a", "b"] {
            snapshot = Intent::AddCard {
                board: BoardId::new(0),
                text: text.to_string(),
            }
            .apply(&snapshot, &ids, Utc::now())
            .unwrap();
        }

        let found: Vec<i64> = snapshot.all_card_ids().map(|id| id.value()).collect();
        assert_eq!(found, vec![i64::MAX, 1, 2]);
    }

    #[test]
    fn test_intent_serialization() {
        let intent = Intent::MoveCard {
            card: CardId::new(5),
            from_board: BoardId::new(0),
            to_board: BoardId::new(1),
            from_index: 0,
            to_index: 2,
        };
        let json = serde_json::to_string(&intent).unwrap();
        assert!(json.starts_with(r#"{"type":"move_card""#));

        let back: Intent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, intent);
        assert_eq!(back.name(), "move_card");
    }
}
