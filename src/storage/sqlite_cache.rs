use crate::{
    error::{BoardError, Result},
    storage::LocalCache,
};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Mutex, PoisonError};

/// SQLite-backed local cache holding a single key/value table
pub struct SqliteCache {
    connection: Mutex<Connection>,
}

impl SqliteCache {
    /// Opens (or creates) the cache database; `":memory:"` gives a private in-memory cache
    pub fn new(database_path: &str) -> Result<Self> {
        let connection = Connection::open(database_path).map_err(storage_error)?;
        connection
            .execute(
                "CREATE TABLE IF NOT EXISTS cache (key TEXT PRIMARY KEY, value TEXT NOT NULL)",
                [],
            )
            .map_err(storage_error)?;

        Ok(Self {
            connection: Mutex::new(connection),
        })
    }
}

fn storage_error(e: rusqlite::Error) -> BoardError {
    BoardError::PersistenceWriteFailed(e.to_string())
}

impl LocalCache for SqliteCache {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let connection = self.connection.lock().unwrap_or_else(PoisonError::into_inner);
        connection
            .query_row("SELECT value FROM cache WHERE key = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()
            .map_err(storage_error)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let connection = self.connection.lock().unwrap_or_else(PoisonError::into_inner);
        connection
            .execute(
                "INSERT INTO cache (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![key, value],
            )
            .map_err(storage_error)?;
        Ok(())
    }
}
