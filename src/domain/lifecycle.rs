//! Soft-delete lifecycle of cards.
//!
//! `Active -> Deleted -> Archived -> (Active | gone)`. A deleted record may
//! also be restored straight from the deleted set. Whole boards never pass
//! through here, see [`crate::domain::ordering::remove_board`].

use crate::{
    domain::{
        board::BoardId,
        card::CardId,
        record::DeletedRecord,
        snapshot::Snapshot,
    },
    error::{BoardError, Missing, Result},
};
use chrono::{DateTime, Utc};
use std::fmt;

/// Where a card currently lives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardState {
    Active(BoardId),
    Deleted,
    Archived,
}

impl fmt::Display for CardState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active(board) => write!(f, "active in board {}", board),
            Self::Deleted => write!(f, "deleted"),
            Self::Archived => write!(f, "archived"),
        }
    }
}

/// Finds a card across the live boards and both record sets; `None` once purged
pub fn state_of(snapshot: &Snapshot, card_id: CardId) -> Option<CardState> {
    if let Some(board) = snapshot
        .boards
        .iter()
        .find(|board| board.position_of(card_id).is_some())
    {
        return Some(CardState::Active(board.id));
    }
    if snapshot.deleted.iter().any(|record| record.id == card_id) {
        return Some(CardState::Deleted);
    }
    if snapshot.archive.iter().any(|record| record.id == card_id) {
        return Some(CardState::Archived);
    }
    None
}

/// Active -> Deleted
pub fn delete_card(
    snapshot: &Snapshot,
    board_id: BoardId,
    card_id: CardId,
    now: DateTime<Utc>,
) -> Result<Snapshot> {
    let board_index = snapshot
        .boards
        .iter()
        .position(|board| board.id == board_id)
        .ok_or(BoardError::NotFound(Missing::Board(board_id)))?;
    let position = snapshot.boards[board_index]
        .position_of(card_id)
        .ok_or(BoardError::NotFound(Missing::Card {
            board: board_id,
            card: card_id,
        }))?;

    let mut boards = snapshot.boards.as_ref().clone();
    let card = boards[board_index].to_dos.remove(position);

    let mut deleted = snapshot.deleted.as_ref().clone();
    deleted.push(DeletedRecord::from_card(&card, board_id, now));

    Ok(snapshot.with_boards(boards).with_deleted(deleted))
}

/// Deleted -> Archived
pub fn archive(snapshot: &Snapshot, record_id: CardId, now: DateTime<Utc>) -> Result<Snapshot> {
    let mut deleted = snapshot.deleted.as_ref().clone();
    let mut record = take(&mut deleted, record_id)?;
    record.mark_archived(now);

    let mut archive = snapshot.archive.as_ref().clone();
    archive.push(record);

    Ok(snapshot.with_deleted(deleted).with_archive(archive))
}

/// Deleted or Archived -> Active
///
/// The card keeps its original id unless a live card already took it, in
/// which case `fresh_id` supplies a new one. `target_index` past the end of
/// the board appends. A copy of the same record left in the other set is
/// dropped as well.
pub fn restore(
    snapshot: &Snapshot,
    record_id: CardId,
    target_board: BoardId,
    target_index: usize,
    fresh_id: impl FnOnce() -> Result<CardId>,
) -> Result<Snapshot> {
    let board_index = snapshot
        .boards
        .iter()
        .position(|board| board.id == target_board)
        .ok_or(BoardError::NotFound(Missing::Board(target_board)))?;

    let mut deleted = snapshot.deleted.as_ref().clone();
    let mut archive = snapshot.archive.as_ref().clone();
    let record = match take(&mut archive, record_id) {
        Ok(record) => record,
        Err(_) => take(&mut deleted, record_id)?,
    };
    archive.retain(|other| other.id != record_id);
    deleted.retain(|other| other.id != record_id);

    let id_taken = snapshot
        .boards
        .iter()
        .any(|board| board.position_of(record.id).is_some());
    let id = if id_taken { fresh_id()? } else { record.id };

    let mut boards = snapshot.boards.as_ref().clone();
    let to_dos = &mut boards[board_index].to_dos;
    let at = target_index.min(to_dos.len());
    to_dos.insert(at, record.to_card(id));

    Ok(snapshot
        .with_boards(boards)
        .with_deleted(deleted)
        .with_archive(archive))
}

/// Archived -> gone, irreversibly
pub fn purge(snapshot: &Snapshot, record_id: CardId) -> Result<Snapshot> {
    let mut archive = snapshot.archive.as_ref().clone();
    take(&mut archive, record_id)?;
    Ok(snapshot.with_archive(archive))
}

fn take(records: &mut Vec<DeletedRecord>, record_id: CardId) -> Result<DeletedRecord> {
    let position = records
        .iter()
        .position(|record| record.id == record_id)
        .ok_or(BoardError::NotFound(Missing::Record(record_id)))?;
    Ok(records.remove(position))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{board::default_boards, card::Card};

    fn snapshot_with(cards: &[(i64, &str)]) -> Snapshot {
        let mut boards = default_boards(&["To Do", "Done"]);
        boards[0].to_dos = cards
            .iter()
            .map(|(id, text)| Card::new(CardId::new(*id), *text))
            .collect();
        Snapshot::new(boards)
    }

    fn unreachable_id() -> Result<CardId> {
        panic!("original id should be reused")
    }

    #[test]
    fn test_delete_moves_card_to_deleted_set() {
        let snapshot = snapshot_with(&[(1, "a"), (2, "b")]);
        let now = Utc::now();
        let next = delete_card(&snapshot, BoardId::new(0), CardId::new(1), now).unwrap();

        assert_eq!(next.boards[0].to_dos.len(), 1);
        assert_eq!(next.deleted.len(), 1);
        assert_eq!(next.deleted[0].text, "a");
        assert_eq!(next.deleted[0].board_id, BoardId::new(0));
        assert_eq!(next.deleted[0].deletion_time, Some(now));
        assert_eq!(state_of(&next, CardId::new(1)), Some(CardState::Deleted));
    }

    #[test]
    fn test_delete_unknown_card() {
        let snapshot = snapshot_with(&[(1, "a")]);
        let err = delete_card(&snapshot, BoardId::new(1), CardId::new(1), Utc::now()).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_full_lifecycle() {
        let snapshot = snapshot_with(&[(1, "a")]);
        let deleted_at = Utc::now();
        let archived_at = deleted_at + chrono::Duration::seconds(30);

        let deleted = delete_card(&snapshot, BoardId::new(0), CardId::new(1), deleted_at).unwrap();
        let archived = archive(&deleted, CardId::new(1), archived_at).unwrap();

        assert!(archived.deleted.is_empty());
        assert_eq!(archived.archive[0].deletion_time, Some(deleted_at));
        assert_eq!(archived.archive[0].archive_time, Some(archived_at));
        assert_eq!(state_of(&archived, CardId::new(1)), Some(CardState::Archived));

        let restored = restore(&archived, CardId::new(1), BoardId::new(1), 0, unreachable_id).unwrap();
        assert!(restored.archive.is_empty());
        assert_eq!(restored.boards[1].to_dos, vec![Card::new(CardId::new(1), "a")]);
        assert_eq!(
            state_of(&restored, CardId::new(1)),
            Some(CardState::Active(BoardId::new(1)))
        );
    }

    #[test]
    fn test_restore_directly_from_deleted() {
        let snapshot = snapshot_with(&[(1, "a"), (2, "b")]);
        let deleted = delete_card(&snapshot, BoardId::new(0), CardId::new(1), Utc::now()).unwrap();

        let restored = restore(&deleted, CardId::new(1), BoardId::new(0), 99, unreachable_id).unwrap();
        assert!(restored.deleted.is_empty());
        let order: Vec<i64> = restored.boards[0].to_dos.iter().map(|c| c.id.value()).collect();
        assert_eq!(order, vec![2, 1]);
    }

    #[test]
    fn test_restore_with_taken_id_uses_fresh_id() {
        let snapshot = snapshot_with(&[(1, "a")]);
        let deleted = delete_card(&snapshot, BoardId::new(0), CardId::new(1), Utc::now()).unwrap();

        // another client re-added a card under the same id
        let mut boards = deleted.boards.as_ref().clone();
        boards[1].to_dos.push(Card::new(CardId::new(1), "other"));
        let clashing = deleted.with_boards(boards);

        let restored = restore(&clashing, CardId::new(1), BoardId::new(0), 0, || Ok(CardId::new(50))).unwrap();
        assert_eq!(restored.boards[0].to_dos[0].id, CardId::new(50));
        assert_eq!(restored.boards[0].to_dos[0].text, "a");
    }

    #[test]
    fn test_restore_drops_copy_left_in_other_set() {
        let snapshot = snapshot_with(&[(1, "a")]);
        let deleted = delete_card(&snapshot, BoardId::new(0), CardId::new(1), Utc::now()).unwrap();
        let archived = archive(&deleted, CardId::new(1), Utc::now()).unwrap();

        // a remote replace brought the deleted copy back alongside the archived one
        let doubled = archived.with_deleted(deleted.deleted.as_ref().clone());
        assert_eq!(doubled.deleted.len(), 1);
        assert_eq!(doubled.archive.len(), 1);

        let restored = restore(&doubled, CardId::new(1), BoardId::new(0), 0, unreachable_id).unwrap();
        assert!(restored.deleted.is_empty());
        assert!(restored.archive.is_empty());
        let ids: Vec<CardId> = restored.all_card_ids().collect();
        assert_eq!(ids, vec![CardId::new(1)]);
    }

    #[test]
    fn test_restore_fails_when_no_fresh_id_is_left() {
        let snapshot = snapshot_with(&[(1, "a")]);
        let deleted = delete_card(&snapshot, BoardId::new(0), CardId::new(1), Utc::now()).unwrap();
        let mut boards = deleted.boards.as_ref().clone();
        boards[1].to_dos.push(Card::new(CardId::new(1), "other"));
        let clashing = deleted.with_boards(boards);

        let err = restore(&clashing, CardId::new(1), BoardId::new(0), 0, || {
            Err(BoardError::ValidationRejected("no ids".to_string()))
        })
        .unwrap_err();
        assert!(matches!(err, BoardError::ValidationRejected(_)));
    }

    #[test]
    fn test_missing_records_are_not_found() {
        let snapshot = snapshot_with(&[(1, "a")]);
        let deleted = delete_card(&snapshot, BoardId::new(0), CardId::new(1), Utc::now()).unwrap();

        // purge only reaches the archive
        assert!(purge(&deleted, CardId::new(1)).unwrap_err().is_not_found());
        assert!(archive(&deleted, CardId::new(7), Utc::now()).unwrap_err().is_not_found());
        assert!(restore(&deleted, CardId::new(7), BoardId::new(0), 0, unreachable_id)
            .unwrap_err()
            .is_not_found());
        assert!(restore(&deleted, CardId::new(1), BoardId::new(9), 0, unreachable_id)
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn test_purge_is_final() {
        let snapshot = snapshot_with(&[(1, "a")]);
        let deleted = delete_card(&snapshot, BoardId::new(0), CardId::new(1), Utc::now()).unwrap();
        let archived = archive(&deleted, CardId::new(1), Utc::now()).unwrap();
        let purged = purge(&archived, CardId::new(1)).unwrap();

        assert!(purged.archive.is_empty());
        assert_eq!(state_of(&purged, CardId::new(1)), None);
        assert!(purge(&purged, CardId::new(1)).unwrap_err().is_not_found());
    }
}
