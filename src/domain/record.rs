use crate::domain::{
    board::BoardId,
    card::{Card, CardId},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Detached snapshot of a card removed from the live boards
///
/// Lives in the deleted set after a delete and in the archive set after an
/// archive. `deletion_time` survives archiving.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletedRecord {
    pub id: CardId,
    pub board_id: BoardId,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deletion_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archive_time: Option<DateTime<Utc>>,
}

impl DeletedRecord {
    pub fn from_card(card: &Card, board_id: BoardId, deleted_at: DateTime<Utc>) -> Self {
        Self {
            id: card.id,
            board_id,
            text: card.text.clone(),
            deletion_time: Some(deleted_at),
            archive_time: None,
        }
    }

    pub fn mark_archived(&mut self, archived_at: DateTime<Utc>) {
        self.archive_time = Some(archived_at);
    }

    /// Rebuilds a live card, optionally under a different id
    pub fn to_card(&self, id: CardId) -> Card {
        Card::new(id, self.text.clone())
    }
}
