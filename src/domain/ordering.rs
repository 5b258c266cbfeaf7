//! Pure transformations over the board sequence.
//!
//! Each operation takes the current boards and returns a new sequence, leaving
//! the input untouched. Operations that have nothing to do return a sequence
//! equal to the input so the caller can tell no change happened.

use crate::{
    domain::{
        board::{Board, BoardId},
        card::{Card, CardId},
    },
    error::{BoardError, Missing, Result},
};

fn board_index(boards: &[Board], board_id: BoardId) -> Result<usize> {
    boards
        .iter()
        .position(|board| board.id == board_id)
        .ok_or(BoardError::NotFound(Missing::Board(board_id)))
}

/// Appends a card to the tail of a board
///
/// The board must exist even when there is nothing to add. Text that trims to
/// empty is ignored, and `id` is only called for a card that gets added.
pub fn add_card(
    boards: &[Board],
    board_id: BoardId,
    text: &str,
    id: impl FnOnce() -> Result<CardId>,
) -> Result<Vec<Board>> {
    let index = board_index(boards, board_id)?;
    if text.trim().is_empty() {
        return Ok(boards.to_vec());
    }

    let mut next = boards.to_vec();
    next[index].to_dos.push(Card::new(id()?, text));
    Ok(next)
}

/// Replaces the text of a card in place
pub fn edit_card(
    boards: &[Board],
    board_id: BoardId,
    card_id: CardId,
    text: &str,
) -> Result<Vec<Board>> {
    let index = board_index(boards, board_id)?;
    let position = boards[index].position_of(card_id).ok_or(BoardError::NotFound(Missing::Card {
        board: board_id,
        card: card_id,
    }))?;

    if text.trim().is_empty() || boards[index].to_dos[position].text == text {
        return Ok(boards.to_vec());
    }

    let mut next = boards.to_vec();
    next[index].to_dos[position].text = text.to_string();
    Ok(next)
}

/// Moves the card at `from_index` of one board to `to_index` of another (or the same) board
///
/// The card is removed first and `to_index` is applied to the sequence left
/// after the removal, clamped to an append. The card found at `from_index`
/// must be `card_id`, otherwise the reference is stale and nothing moves.
pub fn move_card(
    boards: &[Board],
    card_id: CardId,
    from_board: BoardId,
    to_board: BoardId,
    from_index: usize,
    to_index: usize,
) -> Result<Vec<Board>> {
    let source = board_index(boards, from_board)?;
    let destination = board_index(boards, to_board)?;

    match boards[source].to_dos.get(from_index) {
        Some(card) if card.id == card_id => {}
        _ => {
            return Err(BoardError::NotFound(Missing::Card {
                board: from_board,
                card: card_id,
            }))
        }
    }

    if source == destination {
        let last = boards[source].to_dos.len() - 1;
        if to_index.min(last) == from_index {
            return Ok(boards.to_vec());
        }
    }

    let mut next = boards.to_vec();
    let card = next[source].to_dos.remove(from_index);
    let target = &mut next[destination].to_dos;
    let at = to_index.min(target.len());
    target.insert(at, card);
    Ok(next)
}

/// Reorders the root board sequence without touching any card order
pub fn move_board(
    boards: &[Board],
    board_id: BoardId,
    from_index: usize,
    to_index: usize,
) -> Result<Vec<Board>> {
    match boards.get(from_index) {
        Some(board) if board.id == board_id => {}
        _ => return Err(BoardError::NotFound(Missing::Board(board_id))),
    }

    let at = to_index.min(boards.len() - 1);
    if at == from_index {
        return Ok(boards.to_vec());
    }

    let mut next = boards.to_vec();
    let board = next.remove(from_index);
    next.insert(at, board);
    Ok(next)
}

/// Renames a board to the trimmed title; empty or unchanged titles are ignored
pub fn rename_board(boards: &[Board], board_id: BoardId, title: &str) -> Result<Vec<Board>> {
    let index = board_index(boards, board_id)?;
    let title = title.trim();
    if title.is_empty() || boards[index].title == title {
        return Ok(boards.to_vec());
    }

    let mut next = boards.to_vec();
    next[index].title = title.to_string();
    Ok(next)
}

/// Appends an empty board numbered after the largest existing board id
pub fn add_board(boards: &[Board], title: &str) -> Result<Vec<Board>> {
    if title.trim().is_empty() {
        return Ok(boards.to_vec());
    }

    let id = boards
        .iter()
        .map(|board| board.id)
        .max()
        .map(|id| id.successor())
        .unwrap_or_else(|| BoardId::new(0));

    let mut next = boards.to_vec();
    next.push(Board::new(id, title));
    Ok(next)
}

/// Drops a board and every card in it
///
/// Board removal is immediate: the cards do not enter the deleted set and
/// there is no way back.
pub fn remove_board(boards: &[Board], board_id: BoardId) -> Result<Vec<Board>> {
    let index = board_index(boards, board_id)?;
    let mut next = boards.to_vec();
    next.remove(index);
    Ok(next)
}
