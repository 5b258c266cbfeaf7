use crate::domain::{
    board::Board,
    card::CardId,
    record::DeletedRecord,
};
use std::{collections::HashSet, fmt, sync::Arc};

/// One of the independently persisted collections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Boards,
    Deleted,
    Archive,
}

impl Collection {
    pub const ALL: [Collection; 3] = [Self::Boards, Self::Deleted, Self::Archive];
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boards => write!(f, "boards"),
            Self::Deleted => write!(f, "deleted"),
            Self::Archive => write!(f, "archive"),
        }
    }
}

/// Immutable state of every collection at one instant
///
/// Collections are shared, so cloning a snapshot never copies cards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub boards: Arc<Vec<Board>>,
    pub deleted: Arc<Vec<DeletedRecord>>,
    pub archive: Arc<Vec<DeletedRecord>>,
}

impl Snapshot {
    pub fn new(boards: Vec<Board>) -> Self {
        Self {
            boards: Arc::new(boards),
            ..Default::default()
        }
    }

    pub fn with_boards(&self, boards: Vec<Board>) -> Self {
        Self {
            boards: Arc::new(boards),
            ..self.clone()
        }
    }

    pub fn with_deleted(&self, deleted: Vec<DeletedRecord>) -> Self {
        Self {
            deleted: Arc::new(deleted),
            ..self.clone()
        }
    }

    pub fn with_archive(&self, archive: Vec<DeletedRecord>) -> Self {
        Self {
            archive: Arc::new(archive),
            ..self.clone()
        }
    }

    /// Every card id in the live boards and both record sets, in that order
    pub fn all_card_ids(&self) -> impl Iterator<Item = CardId> + '_ {
        self.boards
            .iter()
            .flat_map(|board| board.to_dos.iter().map(|card| card.id))
            .chain(self.deleted.iter().map(|record| record.id))
            .chain(self.archive.iter().map(|record| record.id))
    }

    pub fn max_card_id(&self) -> Option<CardId> {
        self.all_card_ids().max()
    }

    pub fn contains_card_id(&self, id: CardId) -> bool {
        self.all_card_ids().any(|candidate| candidate == id)
    }

    /// Smallest positive id not used anywhere in the state
    pub fn lowest_free_card_id(&self) -> CardId {
        let used: HashSet<i64> = self.all_card_ids().map(|id| id.value()).collect();
        // n used ids leave at least one of 1..=n+1 free
        let free = (1..).find(|candidate| !used.contains(candidate)).unwrap_or(1);
        CardId::new(free)
    }

    /// Collections whose contents differ between `self` and `other`
    pub fn changed_since(&self, other: &Snapshot) -> Vec<Collection> {
        let mut changed = Vec::new();
        if !same(&self.boards, &other.boards) {
            changed.push(Collection::Boards);
        }
        if !same(&self.deleted, &other.deleted) {
            changed.push(Collection::Deleted);
        }
        if !same(&self.archive, &other.archive) {
            changed.push(Collection::Archive);
        }
        changed
    }
}

fn same<T: PartialEq>(a: &Arc<T>, b: &Arc<T>) -> bool {
    Arc::ptr_eq(a, b) || a == b
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        board::{default_boards, BoardId},
        card::Card,
    };
    use chrono::Utc;

    #[test]
    fn test_changed_since_detects_only_touched_collections() {
        let base = Snapshot::new(default_boards(&["To Do"]));
        let record = DeletedRecord::from_card(
            &Card::new(CardId::new(1), "x"),
            BoardId::new(0),
            Utc::now(),
        );
        let next = base.with_deleted(vec![record]);

        assert_eq!(next.changed_since(&base), vec![Collection::Deleted]);
        assert!(base.changed_since(&base.clone()).is_empty());
    }

    #[test]
    fn test_equal_content_is_not_a_change() {
        let base = Snapshot::new(default_boards(&["To Do"]));
        let rebuilt = base.with_boards(default_boards(&["To Do"]));

        assert!(rebuilt.changed_since(&base).is_empty());
    }

    #[test]
    fn test_lowest_free_card_id() {
        let mut boards = default_boards(&["To Do"]);
        boards[0].to_dos = vec![
            Card::new(CardId::new(1), "a"),
            Card::new(CardId::new(i64::MAX), "b"),
            Card::new(CardId::new(2), "c"),
        ];
        let snapshot = Snapshot::new(boards);
        assert_eq!(snapshot.lowest_free_card_id(), CardId::new(3));
        assert_eq!(Snapshot::default().lowest_free_card_id(), CardId::new(1));
    }

    #[test]
    fn test_card_ids_span_all_collections() {
        let mut boards = default_boards(&["To Do"]);
        boards[0].to_dos.push(Card::new(CardId::new(3), "live"));
        let gone = DeletedRecord::from_card(
            &Card::new(CardId::new(9), "gone"),
            BoardId::new(0),
            Utc::now(),
        );
        let snapshot = Snapshot::new(boards).with_archive(vec![gone]);

        assert_eq!(snapshot.max_card_id(), Some(CardId::new(9)));
        assert!(snapshot.contains_card_id(CardId::new(3)));
        assert!(!snapshot.contains_card_id(CardId::new(4)));
    }
}
