use crate::domain::{BoardId, CardId};
use std::fmt;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, BoardError>;

/// What a stale or mistaken reference pointed at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Missing {
    Board(BoardId),
    Card { board: BoardId, card: CardId },
    Record(CardId),
}

impl fmt::Display for Missing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Board(id) => write!(f, "board {}", id),
            Self::Card { board, card } => write!(f, "card {} in board {}", card, board),
            Self::Record(id) => write!(f, "record {}", id),
        }
    }
}

#[derive(Debug, Error)]
pub enum BoardError {
    #[error("Payload rejected: {0}")]
    ValidationRejected(String),

    #[error("Not found: {0}")]
    NotFound(Missing),

    #[error("Persistence write failed: {0}")]
    PersistenceWriteFailed(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Remote store closed")]
    Closed,
}

impl BoardError {
    /// NotFound is a reported no-op, never a failure of the session
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
