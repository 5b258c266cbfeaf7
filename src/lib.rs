//! # Cardboard Core
//!
//! Ordered boards of cards, kept consistent across an in-memory state
//! container, a synchronous local cache and an asynchronous remote store.
//!
//! Boards and cards are rearranged through pure transformations. Deleted cards
//! move through a deleted set and an archive set before being purged, and can
//! be restored from either. Every accepted change is written to the local
//! cache and queued for the remote store; remote notifications are
//! shape-checked before they replace a collection.

pub mod bridge;
pub mod config;
pub mod domain;
pub mod error;
pub mod intent;
pub mod metrics;
pub mod session;
pub mod state;
pub mod storage;

// Re-export commonly used types
pub use config::SyncConfig;
pub use domain::{
    Board, BoardId, Card, CardId, CardState, Collection, DeletedRecord, Snapshot,
};
pub use error::{BoardError, Missing, Result};
pub use intent::Intent;
pub use session::Session;
pub use state::{Origin, StateChange};
pub use storage::{LocalCache, MemoryCache, MemoryRemote, RemoteStore};
