use crate::domain::card::{Card, CardId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a board in the root collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BoardId(i64);

impl BoardId {
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }

    /// The id following this one, used when appending a board
    pub fn successor(&self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl fmt::Display for BoardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A named, ordered list of cards
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Board {
    pub id: BoardId,
    pub title: String,
    pub to_dos: Vec<Card>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_deleted: Option<bool>,
}

impl Board {
    pub fn new(id: BoardId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            to_dos: Vec::new(),
            is_deleted: None,
        }
    }

    /// Position of a card within this board
    pub fn position_of(&self, card_id: CardId) -> Option<usize> {
        self.to_dos.iter().position(|card| card.id == card_id)
    }

    pub fn card(&self, card_id: CardId) -> Option<&Card> {
        self.to_dos.iter().find(|card| card.id == card_id)
    }
}

/// Builds the initial board sequence, numbering boards from 0 in the given order
pub fn default_boards<S: AsRef<str>>(titles: &[S]) -> Vec<Board> {
    titles
        .iter()
        .enumerate()
        .map(|(index, title)| Board::new(BoardId::new(index as i64), title.as_ref()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_boards() {
        let boards = default_boards(&["To Do", "Doing", "Done"]);

        assert_eq!(boards.len(), 3);
        assert_eq!(boards[0].id, BoardId::new(0));
        assert_eq!(boards[0].title, "To Do");
        assert_eq!(boards[2].id, BoardId::new(2));
        assert!(boards.iter().all(|board| board.to_dos.is_empty()));
    }

    #[test]
    fn test_card_lookup() {
        let mut board = Board::new(BoardId::new(0), "To Do");
        board.to_dos.push(Card::new(CardId::new(10), "a"));
        board.to_dos.push(Card::new(CardId::new(11), "b"));

        assert_eq!(board.position_of(CardId::new(11)), Some(1));
        assert_eq!(board.position_of(CardId::new(12)), None);
        assert_eq!(board.card(CardId::new(10)).map(|c| c.text.as_str()), Some("a"));
    }

    #[test]
    fn test_board_serialization_keeps_card_order() {
        let mut board = Board::new(BoardId::new(1), "Doing");
        board.to_dos.push(Card::new(CardId::new(30), "third"));
        board.to_dos.push(Card::new(CardId::new(10), "first"));

        let json = serde_json::to_string(&board).unwrap();
        assert_eq!(
            json,
            r#"{"id":1,"title":"Doing","toDos":[{"id":30,"text":"third"},{"id":10,"text":"first"}]}"#
        );

        let back: Board = serde_json::from_str(&json).unwrap();
        assert_eq!(back, board);
    }
}
