//! Live query subscriptions.
//!
//! A [`Subscription`] is registered with the store it came from and removed
//! again when it is cancelled or dropped, so a torn-down view never keeps
//! receiving snapshots.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use serde::de::DeserializeOwned;
use tokio::sync::mpsc;

use super::state::StoreState;
use super::{CollectionPath, Document, Filter};
use crate::error::{GroupCalError, GroupCalResult};

struct Subscriber {
    path: CollectionPath,
    filters: Vec<Filter>,
    tx: mpsc::UnboundedSender<Vec<Document>>,
}

#[derive(Default)]
pub(crate) struct SubscriberRegistry {
    next_id: AtomicU64,
    subscribers: Mutex<HashMap<u64, Subscriber>>,
}

impl SubscriberRegistry {
    /// Register a subscriber and hand it its first snapshot from `state`.
    pub fn register(
        self: &Arc<Self>,
        state: &StoreState,
        path: &CollectionPath,
        filters: Vec<Filter>,
    ) -> GroupCalResult<Subscription> {
        let mut subscribers = self
            .subscribers
            .lock()
            .map_err(|_| GroupCalError::Store("subscriber registry lock poisoned".into()))?;

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();

        // The receiver is alive, so this cannot fail.
        let _ = tx.send(state.query(path, &filters, None));

        subscribers.insert(
            id,
            Subscriber {
                path: path.clone(),
                filters,
                tx,
            },
        );
        tracing::debug!(subscription = id, %path, "subscribed");

        Ok(Subscription {
            id,
            rx,
            registry: Arc::downgrade(self),
        })
    }

    /// Push a fresh snapshot to every subscriber of a touched collection.
    pub fn publish(&self, state: &StoreState, touched: &BTreeSet<CollectionPath>) {
        let Ok(mut subscribers) = self.subscribers.lock() else {
            return;
        };
        subscribers.retain(|id, sub| {
            if !touched.contains(&sub.path) {
                return true;
            }
            let alive = sub.tx.send(state.query(&sub.path, &sub.filters, None)).is_ok();
            if !alive {
                tracing::debug!(subscription = id, "dropping closed subscriber");
            }
            alive
        });
    }

    fn remove(&self, id: u64) {
        let removed = self
            .subscribers
            .lock()
            .map(|mut s| s.remove(&id).is_some())
            .unwrap_or(false);
        if removed {
            tracing::debug!(subscription = id, "unsubscribed");
        }
    }

    pub fn len(&self) -> usize {
        self.subscribers.lock().map(|s| s.len()).unwrap_or(0)
    }
}

/// Handle on a live query. Dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    rx: mpsc::UnboundedReceiver<Vec<Document>>,
    registry: Weak<SubscriberRegistry>,
}

impl Subscription {
    /// Wait for the next snapshot. `None` once the store has gone away.
    pub async fn next(&mut self) -> Option<Vec<Document>> {
        self.rx.recv().await
    }

    /// Next snapshot decoded into records.
    pub async fn next_as<T: DeserializeOwned>(&mut self) -> Option<GroupCalResult<Vec<T>>> {
        let docs = self.next().await?;
        Some(docs.iter().map(Document::decode).collect())
    }

    /// A snapshot that is already waiting, if any.
    pub fn try_next(&mut self) -> Option<Vec<Document>> {
        self.rx.try_recv().ok()
    }

    /// Stop receiving snapshots.
    pub fn cancel(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(self.id);
        }
    }
}
