use crate::{
    error::{BoardError, Result},
    storage::{RemoteFeed, RemoteStore, RemoteSubscription},
};
use async_trait::async_trait;
use serde_json::Value;
use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Target {
    Document(String),
    Collection(String),
}

#[derive(Default)]
struct RemoteInner {
    documents: HashMap<String, Value>,
    // insertion-ordered members
    collections: HashMap<String, Vec<(String, Value)>>,
    subscribers: HashMap<Target, Vec<(Uuid, RemoteFeed)>>,
    write_delays: VecDeque<Duration>,
    simulate_write_error: bool,
    document_writes: Vec<(String, Value)>,
}

impl RemoteInner {
    fn current(&self, target: &Target) -> Option<Value> {
        match target {
            Target::Document(name) => self.documents.get(name).cloned(),
            Target::Collection(name) => self
                .collections
                .get(name)
                .map(|members| Value::Array(members.iter().map(|(_, v)| v.clone()).collect())),
        }
    }

    fn publish(&mut self, target: &Target) {
        let Some(payload) = self.current(target) else {
            return;
        };
        if let Some(subscribers) = self.subscribers.get_mut(target) {
            subscribers.retain(|(_, feed)| feed.send(payload.clone()));
        }
    }
}

/// In-process remote store
///
/// Clones share the same data, so one clone can play a second client while
/// another is handed to a session. Subscribers receive the current value
/// immediately if one exists, then every later change.
#[derive(Clone, Default)]
pub struct MemoryRemote {
    inner: Arc<Mutex<RemoteInner>>,
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, RemoteInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queues a latency for the next write; later writes use later entries
    pub fn push_write_delay(&self, delay: Duration) {
        self.lock().write_delays.push_back(delay);
    }

    /// Makes every write fail until turned off
    pub fn set_simulate_write_error(&self, simulate: bool) {
        self.lock().simulate_write_error = simulate;
    }

    pub fn document(&self, name: &str) -> Option<Value> {
        self.lock().documents.get(name).cloned()
    }

    pub fn collection(&self, name: &str) -> Option<Value> {
        self.lock().current(&Target::Collection(name.to_string()))
    }

    /// Every document write in completion order
    pub fn document_writes(&self) -> Vec<(String, Value)> {
        self.lock().document_writes.clone()
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().subscribers.values().map(Vec::len).sum()
    }

    fn subscribe(&self, target: Target, feed: RemoteFeed) -> RemoteSubscription {
        let id = Uuid::new_v4();

        {
            let mut inner = self.lock();
            if let Some(current) = inner.current(&target) {
                if !feed.send(current) {
                    return RemoteSubscription::new(id, || {});
                }
            }
            inner
                .subscribers
                .entry(target.clone())
                .or_default()
                .push((id, feed));
        }

        let weak = Arc::downgrade(&self.inner);
        RemoteSubscription::new(id, move || {
            if let Some(inner) = weak.upgrade() {
                let mut inner = inner.lock().unwrap_or_else(PoisonError::into_inner);
                if let Some(subscribers) = inner.subscribers.get_mut(&target) {
                    subscribers.retain(|(candidate, _)| *candidate != id);
                }
            }
        })
    }

    async fn before_write(&self) -> Result<()> {
        let delay = self.lock().write_delays.pop_front();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.lock().simulate_write_error {
            return Err(BoardError::PersistenceWriteFailed(
                "Simulated remote rejection".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteStore for MemoryRemote {
    fn subscribe_document(&self, name: &str, feed: RemoteFeed) -> RemoteSubscription {
        self.subscribe(Target::Document(name.to_string()), feed)
    }

    fn subscribe_collection(&self, name: &str, feed: RemoteFeed) -> RemoteSubscription {
        self.subscribe(Target::Collection(name.to_string()), feed)
    }

    async fn write_document(&self, name: &str, value: Value) -> Result<()> {
        self.before_write().await?;

        let mut inner = self.lock();
        inner.documents.insert(name.to_string(), value.clone());
        inner.document_writes.push((name.to_string(), value));
        inner.publish(&Target::Document(name.to_string()));
        Ok(())
    }

    async fn write_collection_member(&self, name: &str, id: &str, value: Value) -> Result<()> {
        self.before_write().await?;

        let mut inner = self.lock();
        let members = inner.collections.entry(name.to_string()).or_default();
        match members.iter_mut().find(|(member, _)| member == id) {
            Some((_, existing)) => *existing = value,
            None => members.push((id.to_string(), value)),
        }
        inner.publish(&Target::Collection(name.to_string()));
        Ok(())
    }

    async fn remove_collection_member(&self, name: &str, id: &str) -> Result<()> {
        self.before_write().await?;

        let mut inner = self.lock();
        let removed = match inner.collections.get_mut(name) {
            Some(members) => {
                let before = members.len();
                members.retain(|(member, _)| member != id);
                members.len() != before
            }
            None => false,
        };
        if removed {
            inner.publish(&Target::Collection(name.to_string()));
        }
        Ok(())
    }
}
