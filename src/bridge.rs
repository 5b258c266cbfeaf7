//! Keeps the state container in step with the local cache and the remote store.
//!
//! Both channels are subscribers of the container. The local channel writes
//! synchronously; the remote channel queues writes for a single writer task
//! so they reach the store in intent order. Remote notifications for all three
//! collections share one queue and go through the schema guard one at a time,
//! in the order they arrived.
//!
//! Remote notifications replace a whole collection. A notification produced by
//! an older write can land after a newer local change and overwrite it; the
//! next echo of the newer write brings it back. No conflict resolution beyond
//! that is attempted.

use crate::{
    config::{LocalKeys, RemoteNames},
    domain::{guard, Board, Collection, DeletedRecord, Snapshot},
    error::{BoardError, Result},
    metrics::BridgeMetrics,
    state::{Origin, SharedState, StateChange, SubscriberId},
    storage::{LocalCache, RemoteFeed, RemoteNotification, RemoteStore, RemoteSubscription},
};
use serde_json::Value;
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
};

/// A guarded payload ready to replace one collection
#[derive(Debug, Clone, PartialEq)]
enum Decoded {
    Boards(Vec<Board>),
    Deleted(Vec<DeletedRecord>),
    Archive(Vec<DeletedRecord>),
}

impl Decoded {
    fn decode(collection: Collection, payload: &Value) -> Result<Self> {
        Ok(match collection {
            Collection::Boards => Self::Boards(guard::decode_boards(payload)?),
            Collection::Deleted => Self::Deleted(guard::decode_records(payload)?),
            Collection::Archive => Self::Archive(guard::decode_records(payload)?),
        })
    }

    fn install(self, snapshot: &Snapshot) -> Snapshot {
        match self {
            Self::Boards(boards) => snapshot.with_boards(boards),
            Self::Deleted(records) => snapshot.with_deleted(records),
            Self::Archive(records) => snapshot.with_archive(records),
        }
    }
}

fn encode(collection: Collection, snapshot: &Snapshot) -> serde_json::Result<String> {
    match collection {
        Collection::Boards => serde_json::to_string(snapshot.boards.as_ref()),
        Collection::Deleted => serde_json::to_string(snapshot.deleted.as_ref()),
        Collection::Archive => serde_json::to_string(snapshot.archive.as_ref()),
    }
}

/// Outcome of seeding the container from the local cache
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub loaded: Vec<Collection>,
    pub rejected: Vec<Collection>,
}

/// Seeds the container from whatever the cache holds
///
/// Each collection is read and guarded on its own; a rejected or unreadable
/// entry leaves that collection as it was.
pub fn load_local(
    state: &SharedState,
    cache: &dyn LocalCache,
    keys: &LocalKeys,
    metrics: &BridgeMetrics,
) -> LoadReport {
    let mut report = LoadReport::default();

    for collection in Collection::ALL {
        let key = keys.key_for(collection);
        let raw = match cache.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => continue,
            Err(e) => {
                tracing::warn!(key, error = %e, "local cache read failed");
                report.rejected.push(collection);
                continue;
            }
        };

        let decoded = guard::parse(&raw).and_then(|value| Decoded::decode(collection, &value));
        match decoded {
            Ok(decoded) => {
                // install cannot fail, so neither can apply
                let _ = state.apply(Origin::Load, |s| Ok(decoded.install(s)));
                report.loaded.push(collection);
            }
            Err(e) => {
                metrics.record_rejected_payload();
                tracing::warn!(key, error = %e, "discarding cached {}", collection);
                report.rejected.push(collection);
            }
        }
    }

    tracing::debug!(?report, "local cache loaded");
    report
}

/// Mirrors every local and remote change into the cache
///
/// Write failures are logged and counted, never returned.
pub fn attach_local(
    state: &SharedState,
    cache: Arc<dyn LocalCache>,
    keys: LocalKeys,
    metrics: Arc<BridgeMetrics>,
) -> SubscriberId {
    state.subscribe(move |change| {
        if change.origin == Origin::Load {
            return;
        }
        for collection in &change.changed {
            let key = keys.key_for(*collection);
            let written = encode(*collection, &change.current)
                .map_err(BoardError::from)
                .and_then(|raw| cache.set(key, &raw));
            match written {
                Ok(()) => metrics.record_local_write(true),
                Err(e) => {
                    metrics.record_local_write(false);
                    tracing::warn!(key, error = %e, "local cache write failed");
                }
            }
        }
    })
}

#[derive(Debug)]
enum RemoteWrite {
    Document { name: String, value: Value },
    Member { name: String, id: String, value: Value },
    Remove { name: String, id: String },
    Flush(oneshot::Sender<()>),
}

/// Translates a local change into remote writes, in a stable order
fn remote_writes(names: &RemoteNames, change: &StateChange) -> Vec<RemoteWrite> {
    let mut writes = Vec::new();
    for collection in &change.changed {
        let name = names.name_for(*collection).to_string();
        match collection {
            Collection::Boards => match serde_json::to_value(change.current.boards.as_ref()) {
                Ok(value) => writes.push(RemoteWrite::Document { name, value }),
                Err(e) => tracing::warn!(error = %e, "cannot encode boards for remote"),
            },
            Collection::Deleted => {
                record_diff(name, &change.previous.deleted, &change.current.deleted, &mut writes)
            }
            Collection::Archive => {
                record_diff(name, &change.previous.archive, &change.current.archive, &mut writes)
            }
        }
    }
    writes
}

fn record_diff(
    name: String,
    previous: &[DeletedRecord],
    current: &[DeletedRecord],
    writes: &mut Vec<RemoteWrite>,
) {
    for old in previous {
        if !current.iter().any(|record| record.id == old.id) {
            writes.push(RemoteWrite::Remove {
                name: name.clone(),
                id: old.id.to_string(),
            });
        }
    }
    for record in current {
        if previous.iter().find(|old| old.id == record.id) == Some(record) {
            continue;
        }
        match serde_json::to_value(record) {
            Ok(value) => writes.push(RemoteWrite::Member {
                name: name.clone(),
                id: record.id.to_string(),
                value,
            }),
            Err(e) => tracing::warn!(id = %record.id, error = %e, "cannot encode record for remote"),
        }
    }
}

async fn run_writer(
    remote: Arc<dyn RemoteStore>,
    mut queue: mpsc::UnboundedReceiver<RemoteWrite>,
    metrics: Arc<BridgeMetrics>,
) {
    while let Some(write) = queue.recv().await {
        let (target, result) = match write {
            RemoteWrite::Flush(done) => {
                let _ = done.send(());
                continue;
            }
            RemoteWrite::Document { name, value } => {
                let result = remote.write_document(&name, value).await;
                (name, result)
            }
            RemoteWrite::Member { name, id, value } => {
                let result = remote.write_collection_member(&name, &id, value).await;
                (format!("{}/{}", name, id), result)
            }
            RemoteWrite::Remove { name, id } => {
                let result = remote.remove_collection_member(&name, &id).await;
                (format!("{}/{}", name, id), result)
            }
        };

        match result {
            Ok(()) => metrics.record_remote_write(true),
            Err(e) => {
                metrics.record_remote_write(false);
                tracing::warn!(target = %target, error = %e, "remote write failed");
            }
        }
    }
    tracing::debug!("remote writer drained");
}

fn merge_remote(
    state: &SharedState,
    active: &AtomicBool,
    notification: &RemoteNotification,
    metrics: &BridgeMetrics,
) {
    let collection = notification.collection;
    let decoded = match Decoded::decode(collection, &notification.payload) {
        Ok(decoded) => decoded,
        Err(e) => {
            metrics.record_rejected_payload();
            tracing::warn!(%collection, error = %e, "remote payload rejected, keeping current state");
            return;
        }
    };

    // checked under the container lock so a detach in between wins
    let mut applied = false;
    let _ = state.apply(Origin::Remote, |s| {
        if !active.load(Ordering::SeqCst) {
            return Ok(s.clone());
        }
        applied = true;
        Ok(decoded.install(s))
    });
    if applied {
        metrics.record_remote_applied();
    }
}

/// The three subscriptions of one channel; dropping it unsubscribes them all
struct Feeds {
    _boards: RemoteSubscription,
    _deleted: RemoteSubscription,
    _archive: RemoteSubscription,
}

async fn run_applier(
    state: SharedState,
    active: Arc<AtomicBool>,
    feeds: Feeds,
    mut arrivals: mpsc::UnboundedReceiver<RemoteNotification>,
    mut shutdown: oneshot::Receiver<()>,
    metrics: Arc<BridgeMetrics>,
) {
    loop {
        let notification = tokio::select! {
            biased;
            _ = &mut shutdown => break,
            Some(notification) = arrivals.recv() => notification,
            else => break,
        };
        merge_remote(&state, &active, &notification, &metrics);
    }

    drop(feeds);
    tracing::debug!("remote applier stopped");
}

/// Handle on an attached remote store
///
/// Dropping it detaches the store as well.
pub struct RemoteChannel {
    state: SharedState,
    active: Arc<AtomicBool>,
    subscriber: SubscriberId,
    writes: mpsc::UnboundedSender<RemoteWrite>,
    shutdown: Option<oneshot::Sender<()>>,
    applier: JoinHandle<()>,
}

/// Subscribes to the remote store and starts mirroring local changes to it
///
/// Must be called from within a tokio runtime.
pub fn attach_remote(
    state: &SharedState,
    remote: Arc<dyn RemoteStore>,
    names: RemoteNames,
    metrics: Arc<BridgeMetrics>,
) -> RemoteChannel {
    let active = Arc::new(AtomicBool::new(true));
    let (writes, queue) = mpsc::unbounded_channel();
    let (shutdown, shutdown_rx) = oneshot::channel();

    tokio::spawn(run_writer(remote.clone(), queue, metrics.clone()));

    let subscriber = {
        let writes = writes.clone();
        let names = names.clone();
        state.subscribe(move |change| {
            if change.origin != Origin::Local {
                return;
            }
            for write in remote_writes(&names, change) {
                if writes.send(write).is_err() {
                    tracing::warn!("remote writer is gone, dropping write");
                    break;
                }
            }
        })
    };

    let (arrived, arrivals) = mpsc::unbounded_channel();
    let feed = |collection| RemoteFeed::new(collection, arrived.clone());
    let feeds = Feeds {
        _boards: remote.subscribe_document(
            names.name_for(Collection::Boards),
            feed(Collection::Boards),
        ),
        _deleted: remote.subscribe_collection(
            names.name_for(Collection::Deleted),
            feed(Collection::Deleted),
        ),
        _archive: remote.subscribe_collection(
            names.name_for(Collection::Archive),
            feed(Collection::Archive),
        ),
    };
    let applier = tokio::spawn(run_applier(
        state.clone(),
        active.clone(),
        feeds,
        arrivals,
        shutdown_rx,
        metrics,
    ));

    tracing::info!(document = %names.boards_document, "remote store attached");

    RemoteChannel {
        state: state.clone(),
        active,
        subscriber,
        writes,
        shutdown: Some(shutdown),
        applier,
    }
}

impl RemoteChannel {
    /// Resolves once every write queued so far has completed or failed
    ///
    /// Fails with `Closed` if the writer task is no longer running.
    pub async fn flush(&self) -> Result<()> {
        let (done, wait) = oneshot::channel();
        self.writes
            .send(RemoteWrite::Flush(done))
            .map_err(|_| BoardError::Closed)?;
        wait.await.map_err(|_| BoardError::Closed)
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Stops applying remote notifications at once; queued writes still go out
    pub fn detach(mut self) {
        self.teardown();
    }

    fn teardown(&mut self) {
        let Some(shutdown) = self.shutdown.take() else {
            return;
        };
        {
            let mut container = self.state.lock();
            self.active.store(false, Ordering::SeqCst);
            container.unsubscribe(self.subscriber);
        }
        let _ = shutdown.send(());
        self.applier.abort();
        tracing::info!("remote store detached");
    }
}

impl Drop for RemoteChannel {
    fn drop(&mut self) {
        self.teardown();
    }
}
