use crate::{domain::Collection, error::Result};
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use tokio::sync::mpsc;
use uuid::Uuid;

#[cfg(feature = "file-cache")]
pub mod file_cache;
pub mod memory_cache;
pub mod memory_remote;

#[cfg(feature = "sqlite-cache")]
pub mod sqlite_cache;

#[cfg(feature = "file-cache")]
pub use file_cache::FileCache;
pub use memory_cache::MemoryCache;
pub use memory_remote::MemoryRemote;

#[cfg(feature = "sqlite-cache")]
pub use sqlite_cache::SqliteCache;

/// Synchronous key/value cache on the local device
///
/// A convenience tier: callers log and swallow write failures.
pub trait LocalCache: Send + Sync {
    /// Returns the stored value, or `None` if the key was never set
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Stores a value, replacing any previous one
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// Asynchronous document/collection store with change notifications
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Follows a single document; every change delivers the full document
    fn subscribe_document(&self, name: &str, feed: RemoteFeed) -> RemoteSubscription;

    /// Follows a collection; every change delivers all members as an array
    fn subscribe_collection(&self, name: &str, feed: RemoteFeed) -> RemoteSubscription;

    /// Replaces a document
    async fn write_document(&self, name: &str, value: Value) -> Result<()>;

    /// Creates or replaces one member of a collection
    async fn write_collection_member(&self, name: &str, id: &str, value: Value) -> Result<()>;

    /// Removes one member of a collection; removing an absent member is not an error
    async fn remove_collection_member(&self, name: &str, id: &str) -> Result<()>;
}

/// A payload published by the remote store, tagged with what it replaces
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteNotification {
    pub collection: Collection,
    pub payload: Value,
}

/// Sending half handed to a subscription
///
/// Feeds for different collections may share one channel; their payloads
/// then come out in the order the store published them.
#[derive(Debug, Clone)]
pub struct RemoteFeed {
    collection: Collection,
    sender: mpsc::UnboundedSender<RemoteNotification>,
}

impl RemoteFeed {
    pub fn new(collection: Collection, sender: mpsc::UnboundedSender<RemoteNotification>) -> Self {
        Self { collection, sender }
    }

    pub fn collection(&self) -> Collection {
        self.collection
    }

    /// Returns false once the receiving side is gone
    pub fn send(&self, payload: Value) -> bool {
        self.sender
            .send(RemoteNotification {
                collection: self.collection,
                payload,
            })
            .is_ok()
    }
}

type Unsubscribe = Box<dyn FnOnce() + Send>;

/// Registration of a [`RemoteFeed`] with the store
///
/// Dropping the subscription unsubscribes it.
pub struct RemoteSubscription {
    id: Uuid,
    unsubscribe: Option<Unsubscribe>,
}

impl RemoteSubscription {
    pub fn new(id: Uuid, unsubscribe: impl FnOnce() + Send + 'static) -> Self {
        Self {
            id,
            unsubscribe: Some(Box::new(unsubscribe)),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Stops delivery to the feed
    pub fn unsubscribe(mut self) {
        self.teardown();
    }

    fn teardown(&mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
        }
    }
}

impl Drop for RemoteSubscription {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl fmt::Debug for RemoteSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteSubscription")
            .field("id", &self.id)
            .field("active", &self.unsubscribe.is_some())
            .finish()
    }
}
