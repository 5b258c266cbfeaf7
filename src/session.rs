//! The context object a client builds once and hands to whatever needs state.

use crate::{
    bridge::{self, LoadReport, RemoteChannel},
    config::SyncConfig,
    domain::{default_boards, CardIdGenerator, Snapshot},
    error::Result,
    intent::Intent,
    metrics::{BridgeMetrics, MetricsSnapshot},
    state::{Origin, SharedState, StateChange, StateContainer, SubscriberId},
    storage::{LocalCache, RemoteStore},
};
use chrono::Utc;
use std::sync::Arc;

/// Owns the state container and both persistence channels for one user session
pub struct Session {
    config: SyncConfig,
    state: SharedState,
    ids: CardIdGenerator,
    metrics: Arc<BridgeMetrics>,
    local: Option<SubscriberId>,
    remote: Option<RemoteChannel>,
}

impl Session {
    /// Starts a session holding the configured default boards
    pub fn new(config: SyncConfig) -> Result<Self> {
        config.validate()?;
        let initial = Snapshot::new(default_boards(&config.default_boards));

        Ok(Self {
            config,
            state: StateContainer::shared(initial),
            ids: CardIdGenerator::new(),
            metrics: Arc::new(BridgeMetrics::new()),
            local: None,
            remote: None,
        })
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Loads whatever the cache holds, then mirrors every later change into it
    ///
    /// Replaces any cache attached earlier.
    pub fn attach_local_cache(&mut self, cache: Arc<dyn LocalCache>) -> LoadReport {
        if let Some(previous) = self.local.take() {
            self.state.unsubscribe(previous);
        }

        let report = bridge::load_local(&self.state, cache.as_ref(), &self.config.local, &self.metrics);
        self.local = Some(bridge::attach_local(
            &self.state,
            cache,
            self.config.local.clone(),
            self.metrics.clone(),
        ));
        tracing::info!(loaded = ?report.loaded, rejected = ?report.rejected, "local cache attached");
        report
    }

    /// Follows the remote store and mirrors local changes to it
    ///
    /// Must be called from within a tokio runtime. Replaces any store attached earlier.
    pub fn connect_remote(&mut self, remote: Arc<dyn RemoteStore>) {
        self.disconnect_remote();
        self.remote = Some(bridge::attach_remote(
            &self.state,
            remote,
            self.config.remote.clone(),
            self.metrics.clone(),
        ));
    }

    /// Stops applying remote notifications; writes already queued still complete
    pub fn disconnect_remote(&mut self) {
        if let Some(channel) = self.remote.take() {
            channel.detach();
        }
    }

    pub fn is_remote_connected(&self) -> bool {
        self.remote.as_ref().is_some_and(RemoteChannel::is_active)
    }

    /// Waits for every remote write queued so far
    pub async fn flush_remote(&self) -> Result<()> {
        match &self.remote {
            Some(channel) => channel.flush().await,
            None => Ok(()),
        }
    }

    pub fn read(&self) -> Snapshot {
        self.state.read()
    }

    /// Applies a user intent
    ///
    /// Returns the resulting snapshot. A stale reference comes back as a
    /// `NotFound` error with the state untouched.
    pub fn dispatch(&self, intent: Intent) -> Result<Snapshot> {
        let result = self.state.apply(Origin::Local, |snapshot| {
            intent.apply(snapshot, &self.ids, Utc::now())
        });

        match &result {
            Ok(_) => tracing::debug!(intent = intent.name(), "intent applied"),
            Err(e) if e.is_not_found() => {
                tracing::debug!(intent = intent.name(), error = %e, "stale reference, nothing to do")
            }
            Err(e) => tracing::warn!(intent = intent.name(), error = %e, "intent failed"),
        }
        result
    }

    /// Registers a callback run after every accepted change
    ///
    /// Callbacks run with the state unlocked and may read, subscribe or
    /// dispatch. A dispatch from inside a callback returns its snapshot at
    /// once; its own notification follows the one being delivered.
    pub fn subscribe<F>(&self, subscriber: F) -> SubscriberId
    where
        F: Fn(&StateChange) + Send + Sync + 'static,
    {
        self.state.subscribe(subscriber)
    }

    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        self.state.unsubscribe(id)
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.disconnect_remote();
        tracing::debug!(metrics = %self.metrics.snapshot().summary(), "session closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{BoardId, CardState},
        domain::lifecycle::state_of,
        storage::MemoryCache,
    };
    use std::{
        sync::{mpsc, Mutex},
        thread,
        time::Duration,
    };

    #[test]
    fn test_new_session_has_default_boards() {
        let session = Session::new(SyncConfig::default()).unwrap();
        let titles: Vec<String> = session.read().boards.iter().map(|b| b.title.clone()).collect();
        assert_eq!(titles, vec!["To Do", "Doing", "Done"]);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = SyncConfig::default();
        config.local.archive = config.local.deleted.clone();
        assert!(Session::new(config).is_err());
    }

    #[test]
    fn test_dispatch_reports_not_found() {
        let session = Session::new(SyncConfig::default()).unwrap();
        let before = session.read();

        let err = session
            .dispatch(Intent::RenameBoard {
                board: BoardId::new(42),
                title: "x".to_string(),
            })
            .unwrap_err();

        assert!(err.is_not_found());
        assert_eq!(session.read(), before);
    }

    #[test]
    fn test_session_writes_through_to_cache() {
        let mut session = Session::new(SyncConfig::default()).unwrap();
        let cache = Arc::new(MemoryCache::new());
        let report = session.attach_local_cache(cache.clone());
        assert!(report.loaded.is_empty());

        let snapshot = session
            .dispatch(Intent::AddCard {
                board: BoardId::new(1),
                text: "cached".to_string(),
            })
            .unwrap();
        let card = snapshot.boards[1].to_dos[0].id;

        session
            .dispatch(Intent::DeleteCard {
                board: BoardId::new(1),
                card,
            })
            .unwrap();

        let mut reopened = Session::new(SyncConfig::default()).unwrap();
        reopened.attach_local_cache(cache);
        let restored = reopened.read();
        assert_eq!(state_of(&restored, card), Some(CardState::Deleted));
        assert_eq!(restored.deleted[0].text, "cached");
    }

    #[test]
    fn test_reattaching_cache_replaces_subscriber() {
        let mut session = Session::new(SyncConfig::default()).unwrap();
        let first = Arc::new(MemoryCache::new());
        let second = Arc::new(MemoryCache::new());
        session.attach_local_cache(first.clone());
        session.attach_local_cache(second.clone());

        session
            .dispatch(Intent::AddBoard {
                title: "Later".to_string(),
            })
            .unwrap();

        assert_eq!(first.get("trello-clone-to-dos").unwrap(), None);
        assert!(second.get("trello-clone-to-dos").unwrap().is_some());
    }

    #[test]
    fn test_subscriber_can_call_back_into_session() {
        let session = Arc::new(Session::new(SyncConfig::default()).unwrap());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let (weak, sink) = (Arc::downgrade(&session), seen.clone());
        session.subscribe(move |change| {
            let Some(session) = weak.upgrade() else {
                return;
            };
            sink.lock().unwrap().push(session.read().boards.len());
            if change.current.boards[3].title == "Later" {
                session
                    .dispatch(Intent::RenameBoard {
                        board: BoardId::new(3),
                        title: "Renamed".to_string(),
                    })
                    .unwrap();
            }
        });

        let (done, finished) = mpsc::channel();
        let worker = session.clone();
        thread::spawn(move || {
            worker
                .dispatch(Intent::AddBoard {
                    title: "Later".to_string(),
                })
                .unwrap();
            let _ = done.send(());
        });

        finished.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(session.read().boards[3].title, "Renamed");
        assert_eq!(*seen.lock().unwrap(), vec![4, 4]);
    }
}
