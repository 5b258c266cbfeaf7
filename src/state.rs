//! The single in-memory owner of the board, deleted and archive collections.
//!
//! Everything else proposes transformations or reads snapshots. Subscribers
//! are plain callbacks, run after each accepted change with the container
//! unlocked, so they may read or dispatch again. Changes reach subscribers in
//! the order they were accepted; a change made from inside a subscriber is
//! delivered once the current delivery round gets to it.

use crate::{
    domain::{Collection, Snapshot},
    error::Result,
};
use std::{
    collections::VecDeque,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};
use uuid::Uuid;

/// Where a change came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// A user intent applied on this side
    Local,
    /// A notification from the remote store
    Remote,
    /// Initial seeding from a persistence tier
    Load,
}

/// Delivered to every subscriber after an accepted change
#[derive(Debug, Clone)]
pub struct StateChange {
    pub origin: Origin,
    pub changed: Vec<Collection>,
    pub previous: Snapshot,
    pub current: Snapshot,
}

impl StateChange {
    pub fn touches(&self, collection: Collection) -> bool {
        self.changed.contains(&collection)
    }
}

pub type SubscriberId = Uuid;

type Subscriber = Arc<dyn Fn(&StateChange) + Send + Sync>;

/// A change together with the subscribers registered when it was accepted
struct Delivery {
    change: StateChange,
    subscribers: Vec<Subscriber>,
}

pub struct StateContainer {
    snapshot: Snapshot,
    subscribers: Vec<(SubscriberId, Subscriber)>,
    outbox: VecDeque<Delivery>,
    delivering: bool,
}

impl StateContainer {
    pub fn new(initial: Snapshot) -> Self {
        Self {
            snapshot: initial,
            subscribers: Vec::new(),
            outbox: VecDeque::new(),
            delivering: false,
        }
    }

    pub fn shared(initial: Snapshot) -> SharedState {
        SharedState {
            inner: Arc::new(Mutex::new(Self::new(initial))),
        }
    }

    /// Current snapshot; cheap to clone and never mutated afterwards
    pub fn read(&self) -> Snapshot {
        self.snapshot.clone()
    }

    pub fn subscribe<F>(&mut self, subscriber: F) -> SubscriberId
    where
        F: Fn(&StateChange) + Send + Sync + 'static,
    {
        let id = Uuid::new_v4();
        self.subscribers.push((id, Arc::new(subscriber)));
        id
    }

    /// Returns false if the subscriber was already gone
    pub fn unsubscribe(&mut self, id: SubscriberId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(candidate, _)| *candidate != id);
        self.subscribers.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Runs a transformation against the held snapshot
    ///
    /// On error the held snapshot is untouched and nobody is notified. A
    /// result equal to the current snapshot is accepted silently, so no-op
    /// intents never reach the persistence tiers. An accepted change is only
    /// queued here; [`SharedState::apply`] hands it to subscribers.
    fn stage<F>(&mut self, origin: Origin, transform: F) -> Result<Snapshot>
    where
        F: FnOnce(&Snapshot) -> Result<Snapshot>,
    {
        let next = transform(&self.snapshot)?;
        let changed = next.changed_since(&self.snapshot);
        if changed.is_empty() {
            tracing::debug!(?origin, "transformation left state unchanged");
            return Ok(self.snapshot.clone());
        }

        let previous = std::mem::replace(&mut self.snapshot, next);
        tracing::debug!(?origin, ?changed, "state changed");

        self.outbox.push_back(Delivery {
            change: StateChange {
                origin,
                changed,
                previous,
                current: self.snapshot.clone(),
            },
            subscribers: self.subscribers.iter().map(|(_, s)| s.clone()).collect(),
        });
        Ok(self.snapshot.clone())
    }
}

/// The container as shared by the session, the bridge and its tasks
#[derive(Clone)]
pub struct SharedState {
    inner: Arc<Mutex<StateContainer>>,
}

impl SharedState {
    /// Locks the container, recovering from a panicked subscriber
    ///
    /// Never call a subscriber while holding this.
    pub fn lock(&self) -> MutexGuard<'_, StateContainer> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn read(&self) -> Snapshot {
        self.lock().read()
    }

    pub fn subscribe<F>(&self, subscriber: F) -> SubscriberId
    where
        F: Fn(&StateChange) + Send + Sync + 'static,
    {
        self.lock().subscribe(subscriber)
    }

    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        self.lock().unsubscribe(id)
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().subscriber_count()
    }

    /// Applies a transformation and notifies subscribers with the lock released
    ///
    /// Called from inside a subscriber, the change is accepted at once and
    /// delivered after the subscribers of the change being delivered.
    pub fn apply<F>(&self, origin: Origin, transform: F) -> Result<Snapshot>
    where
        F: FnOnce(&Snapshot) -> Result<Snapshot>,
    {
        let result = self.lock().stage(origin, transform);
        self.deliver();
        result
    }

    /// Drains the outbox unless another caller is already draining it
    fn deliver(&self) {
        {
            let mut container = self.lock();
            if container.delivering || container.outbox.is_empty() {
                return;
            }
            container.delivering = true;
        }
        let _round = DeliveryRound(self);

        loop {
            let delivery = {
                let mut container = self.lock();
                match container.outbox.pop_front() {
                    Some(delivery) => delivery,
                    None => {
                        container.delivering = false;
                        return;
                    }
                }
            };
            for subscriber in &delivery.subscribers {
                subscriber(&delivery.change);
            }
        }
    }
}

/// Releases the delivery role if a subscriber panics mid-round
struct DeliveryRound<'a>(&'a SharedState);

impl Drop for DeliveryRound<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.0.lock().delivering = false;
        }
    }
}
