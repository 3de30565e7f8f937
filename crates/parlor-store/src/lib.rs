pub mod store;

pub use store::{Action, Noop, Outcome, Removal, Store};

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::broadcast;
use tracing::{debug, trace, warn};

use parlor_types::Snapshot;

/// Shared access to the session store.
///
/// All writes go through [`StoreHandle::dispatch`]; readers get a borrowed
/// view through [`StoreHandle::read`] and change notifications through
/// [`StoreHandle::subscribe`]. The lock is never held across an await.
#[derive(Clone)]
pub struct StoreHandle {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    store: Mutex<Store>,

    /// Applied changes, in the order they were applied
    changes: broadcast::Sender<Outcome>,
}

impl StoreHandle {
    pub fn new(store: Store) -> Self {
        let (changes, _) = broadcast::channel(256);
        Self {
            inner: Arc::new(StoreInner {
                store: Mutex::new(store),
                changes,
            }),
        }
    }

    pub fn seeded(snapshot: Snapshot) -> Self {
        debug!(
            "Seeding store with {} channels, {} messages",
            snapshot.channels.len(),
            snapshot.messages.len()
        );
        Self::new(Store::from_snapshot(snapshot))
    }

    fn lock(&self) -> MutexGuard<'_, Store> {
        // Reducers never panic half-way, so a poisoned store is still consistent.
        self.inner.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply one action and notify subscribers of everything it changed.
    pub fn dispatch(&self, action: Action) -> Outcome {
        let mut store = self.lock();
        let outcome = store.apply(action);

        match &outcome {
            Outcome::Unchanged(noop) => trace!("Store unchanged: {:?}", noop),
            changed => self.publish(changed),
        }
        for followup in store.take_followups() {
            self.publish(&followup);
        }

        outcome
    }

    // Called under the lock so subscribers see changes in apply order.
    fn publish(&self, outcome: &Outcome) {
        match outcome {
            Outcome::ChannelDisplaced { id, by, .. } => {
                warn!("Channel {} hidden until it gives up its name to channel {}", id, by);
            }
            changed => trace!("Store changed: {:?}", changed),
        }
        let _ = self.inner.changes.send(outcome.clone());
    }

    pub fn read<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&Store) -> T,
    {
        f(&self.lock())
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Outcome> {
        self.inner.changes.subscribe()
    }
}
