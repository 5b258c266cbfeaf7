//! Shape checks for payloads coming out of a persistence tier.
//!
//! Every tier is untrusted. A payload is walked as plain JSON before any typed
//! decoding happens, and a rejected payload is never partially applied.

use crate::{
    domain::{board::Board, record::DeletedRecord},
    error::{BoardError, Result},
};
use chrono::DateTime;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::HashSet;

type Check = std::result::Result<(), String>;

/// Checks that `value` is an ordered sequence of well-formed boards
pub fn check_boards(value: &Value) -> Check {
    let boards = value
        .as_array()
        .ok_or_else(|| format!("expected an array of boards, got {}", kind(value)))?;

    let mut board_ids = HashSet::new();
    let mut card_ids = HashSet::new();

    for (index, board) in boards.iter().enumerate() {
        let board = object(board).map_err(|e| format!("board {}: {}", index, e))?;
        let id = integer(board, "id").map_err(|e| format!("board {}: {}", index, e))?;
        string(board, "title").map_err(|e| format!("board {}: {}", index, e))?;
        optional_bool(board, "isDeleted").map_err(|e| format!("board {}: {}", index, e))?;

        if !board_ids.insert(id) {
            return Err(format!("board {}: duplicate board id {}", index, id));
        }

        let cards = match board.get("toDos") {
            Some(Value::Array(cards)) => cards,
            Some(other) => {
                return Err(format!(
                    "board {}: toDos must be an array, got {}",
                    index,
                    kind(other)
                ))
            }
            None => return Err(format!("board {}: missing toDos", index)),
        };

        for (position, card) in cards.iter().enumerate() {
            let at = |e: String| format!("board {} card {}: {}", index, position, e);
            let card = object(card).map_err(at)?;
            let card_id = integer(card, "id").map_err(at)?;
            string(card, "text").map_err(at)?;
            optional_bool(card, "isDeleted").map_err(at)?;

            if !card_ids.insert(card_id) {
                return Err(at(format!("duplicate card id {}", card_id)));
            }
        }
    }

    Ok(())
}

/// Checks that `value` is an ordered sequence of deleted/archived records
pub fn check_records(value: &Value) -> Check {
    let records = value
        .as_array()
        .ok_or_else(|| format!("expected an array of records, got {}", kind(value)))?;

    let mut ids = HashSet::new();
    for (index, record) in records.iter().enumerate() {
        let at = |e: String| format!("record {}: {}", index, e);
        let record = object(record).map_err(at)?;
        let id = integer(record, "id").map_err(at)?;
        integer(record, "boardId").map_err(at)?;
        string(record, "text").map_err(at)?;
        optional_timestamp(record, "deletionTime").map_err(at)?;
        optional_timestamp(record, "archiveTime").map_err(at)?;

        if !ids.insert(id) {
            return Err(at(format!("duplicate record id {}", id)));
        }
    }

    Ok(())
}

pub fn is_board_sequence(value: &Value) -> bool {
    check_boards(value).is_ok()
}

pub fn is_record_sequence(value: &Value) -> bool {
    check_records(value).is_ok()
}

/// Guards then decodes a board sequence
pub fn decode_boards(value: &Value) -> Result<Vec<Board>> {
    check_boards(value).map_err(BoardError::ValidationRejected)?;
    typed(value)
}

/// Guards then decodes a record sequence
pub fn decode_records(value: &Value) -> Result<Vec<DeletedRecord>> {
    check_records(value).map_err(BoardError::ValidationRejected)?;
    typed(value)
}

/// Parses raw text from a cache entry before guarding it
pub fn parse(raw: &str) -> Result<Value> {
    serde_json::from_str(raw).map_err(|e| BoardError::ValidationRejected(format!("not JSON: {}", e)))
}

fn typed<T: DeserializeOwned>(value: &Value) -> Result<T> {
    T::deserialize(value).map_err(|e| BoardError::ValidationRejected(e.to_string()))
}

fn object(value: &Value) -> std::result::Result<&Map<String, Value>, String> {
    value
        .as_object()
        .ok_or_else(|| format!("expected an object, got {}", kind(value)))
}

fn integer(map: &Map<String, Value>, field: &str) -> std::result::Result<i64, String> {
    match map.get(field) {
        Some(value) => value
            .as_i64()
            .ok_or_else(|| format!("{} must be an integer, got {}", field, kind(value))),
        None => Err(format!("missing {}", field)),
    }
}

fn string(map: &Map<String, Value>, field: &str) -> Check {
    match map.get(field) {
        Some(Value::String(_)) => Ok(()),
        Some(value) => Err(format!("{} must be a string, got {}", field, kind(value))),
        None => Err(format!("missing {}", field)),
    }
}

fn optional_bool(map: &Map<String, Value>, field: &str) -> Check {
    match map.get(field) {
        None | Some(Value::Null) | Some(Value::Bool(_)) => Ok(()),
        Some(value) => Err(format!("{} must be a boolean, got {}", field, kind(value))),
    }
}

fn optional_timestamp(map: &Map<String, Value>, field: &str) -> Check {
    match map.get(field) {
        None | Some(Value::Null) => Ok(()),
        Some(Value::String(raw)) => DateTime::parse_from_rfc3339(raw)
            .map(|_| ())
            .map_err(|e| format!("{} is not a timestamp: {}", field, e)),
        Some(value) => Err(format!("{} must be a string, got {}", field, kind(value))),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
