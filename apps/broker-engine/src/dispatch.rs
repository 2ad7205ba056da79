//! Snapshot fan-out to registered observers.
//!
//! Subscribers are plain callbacks invoked synchronously, in registration
//! order, with a full registry snapshot. Each dispatch pass iterates over a
//! stable copy of the subscriber list, so subscribing or unsubscribing from
//! inside a callback never corrupts the pass in progress.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::domain::connection::BrokerConnection;

/// Callback invoked with a registry snapshot after each committed batch.
pub type SnapshotCallback = dyn Fn(&[BrokerConnection]) + Send + Sync;

struct Entry {
    id: u64,
    callback: Arc<SnapshotCallback>,
}

/// Ordered list of snapshot subscribers.
#[derive(Default)]
pub struct SubscriberHub {
    entries: Mutex<Vec<Entry>>,
    next_id: AtomicU64,
}

impl SubscriberHub {
    /// Create an empty hub.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback; returns a handle that removes it again.
    pub fn subscribe(
        hub: &Arc<Self>,
        callback: impl Fn(&[BrokerConnection]) + Send + Sync + 'static,
    ) -> Subscription {
        let id = hub.next_id.fetch_add(1, Ordering::Relaxed);
        hub.entries.lock().push(Entry {
            id,
            callback: Arc::new(callback),
        });
        Subscription {
            hub: Arc::clone(hub),
            id,
        }
    }

    /// Notify every subscriber, in registration order, with the snapshot.
    pub fn notify(&self, snapshot: &[BrokerConnection]) {
        // Stable copy; the lock is not held while callbacks run.
        let callbacks: Vec<Arc<SnapshotCallback>> = self
            .entries
            .lock()
            .iter()
            .map(|entry| Arc::clone(&entry.callback))
            .collect();

        for callback in callbacks {
            callback(snapshot);
        }
    }

    /// Number of registered subscribers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether no subscribers are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Remove all subscribers.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    fn remove(&self, id: u64) {
        self.entries.lock().retain(|entry| entry.id != id);
    }
}

impl std::fmt::Debug for SubscriberHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriberHub")
            .field("subscribers", &self.len())
            .finish()
    }
}

/// Handle that removes exactly one subscriber when invoked.
///
/// Safe to invoke any number of times; calls after the first are no-ops.
pub struct Subscription {
    hub: Arc<SubscriberHub>,
    id: u64,
}

impl Subscription {
    /// Remove the associated subscriber.
    pub fn unsubscribe(&self) {
        self.hub.remove(self.id);
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
