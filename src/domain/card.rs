use crate::error::{BoardError, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::{
    fmt,
    sync::atomic::{AtomicI64, Ordering},
};

/// Unique identifier for a card, shared across boards and the deleted/archive sets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CardId(i64);

impl CardId {
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single work item on a board
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: CardId,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_deleted: Option<bool>,
}

impl Card {
    pub fn new(id: CardId, text: impl Into<String>) -> Self {
        Self {
            id,
            text: text.into(),
            is_deleted: None,
        }
    }
}

/// Hands out card ids from the wall clock in milliseconds, never repeating and
/// never going backwards even if the clock does.
#[derive(Debug, Default)]
pub struct CardIdGenerator {
    last: AtomicI64,
}

impl CardIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns an id strictly greater than both the last id issued and `floor`
    ///
    /// `floor` is the largest id already present anywhere in the state, so ids
    /// loaded from a persistence tier are never reissued. Fails once no such
    /// id fits in an `i64`.
    pub fn next_after(&self, floor: Option<CardId>) -> Result<CardId> {
        let now = Utc::now().timestamp_millis();
        let floor = floor.map_or(i64::MIN, |id| id.0);
        let mut issued = 0;
        self.last
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                let above = last.max(floor).checked_add(1)?;
                issued = now.max(above);
                Some(issued)
            })
            .map(|_| CardId(issued))
            .map_err(|last| {
                BoardError::ValidationRejected(format!(
                    "no card id left above {}",
                    last.max(floor)
                ))
            })
    }
}
